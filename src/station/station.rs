use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, error, info, warn};

use super::anemometer::SpeedCalculator;
use super::atmosphere::{AtmosphericReading, AtmosphericSensor};
use super::circular;
use super::pulse::PulseCounter;
use super::rain::RainGauge;
use super::vane::{AnalogInput, AngleSampler};
use super::{round_to, Record, Sample, WindDirection};
use crate::clock::Clock;
use crate::config::Timing;
use crate::error::{Result, StationError};
use crate::sink::Persistence;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Accumulating,
    Reducing,
}

/// Wind figures reduced from one interval's samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindSummary {
    pub direction: f64,
    pub direction_name: &'static str,
    pub speed_avg: f64,
    pub gust: f64,
}

/// Reduces an interval's samples: arithmetic mean and max of the speeds,
/// circular mean of the headings. All rounded to one decimal.
pub fn summarize(samples: &[Sample]) -> Result<WindSummary> {
    if samples.is_empty() {
        return Err(StationError::EmptyBuffer);
    }

    let gust = samples
        .iter()
        .map(|s| s.speed_mph)
        .fold(f64::NEG_INFINITY, f64::max);
    let speed_avg = samples.iter().map(|s| s.speed_mph).sum::<f64>() / samples.len() as f64;

    let angles: Vec<f64> = samples.iter().map(|s| s.angle_degrees).collect();
    let direction = round_to(circular::average(&angles), 1);
    // rounding can carry 359.96 up to 360.0
    let direction = if direction >= 360.0 { 0.0 } else { direction };

    Ok(WindSummary {
        direction,
        direction_name: WindDirection::nearest(direction).as_str(),
        speed_avg: round_to(speed_avg, 1),
        gust: round_to(gust, 1),
    })
}

/// Everything the loop reads from.
pub struct Instruments<A: AnalogInput> {
    pub vane: AngleSampler<A>,
    pub wind: Arc<PulseCounter>,
    pub speed: SpeedCalculator,
    pub rain: RainGauge,
    pub atmosphere: Box<dyn AtmosphericSensor>,
}

/// The sampling loop: accumulate wind samples on a fixed sub-interval, then
/// reduce them together with one atmospheric read into a [`Record`].
pub struct WeatherStation<A: AnalogInput, C: Clock> {
    timing: Timing,
    instruments: Instruments<A>,
    clock: C,
    sinks: Vec<Box<dyn Persistence>>,
    stop: Arc<AtomicBool>,
    buffer: Vec<Sample>,
    next_sequence: u64,
    state: LoopState,
}

impl<A: AnalogInput, C: Clock> WeatherStation<A, C> {
    pub fn new(
        timing: Timing,
        mut instruments: Instruments<A>,
        clock: C,
        sinks: Vec<Box<dyn Persistence>>,
        stop: Arc<AtomicBool>,
    ) -> WeatherStation<A, C> {
        // the rainfall day starts when the station does
        instruments.rain.roll_over(clock.now().date_naive());

        WeatherStation {
            buffer: Vec::with_capacity(timing.samples_per_record()),
            timing,
            instruments,
            clock,
            sinks,
            stop,
            next_sequence: 1,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Runs until the stop flag is raised. A partially filled interval is
    /// still reduced and emitted before returning.
    pub fn run(&mut self) -> Result<()> {
        info!(
            "Readings will be accumulated every {} seconds",
            self.timing.accumulation_interval.as_secs_f64()
        );
        info!(
            "The data will be written every {} seconds",
            self.timing.log_interval.as_secs_f64()
        );

        while !self.stop_requested() {
            self.run_interval()?;
        }

        info!("The weather station has been stopped");
        Ok(())
    }

    /// One `Idle -> Accumulating -> Reducing -> Idle` cycle. `None` if a stop
    /// was requested before the first sample was taken.
    pub fn run_interval(&mut self) -> Result<Option<Record>> {
        self.state = LoopState::Accumulating;
        self.accumulate()?;

        if self.buffer.is_empty() && self.stop_requested() {
            self.state = LoopState::Idle;
            return Ok(None);
        }

        self.state = LoopState::Reducing;
        let record = self.reduce()?;
        self.state = LoopState::Idle;
        Ok(Some(record))
    }

    fn accumulate(&mut self) -> Result<()> {
        debug!("Accumulating the sensor readings");
        let interval = self.timing.accumulation_interval;

        // pulses that arrived while the previous record was being written are not part of this one
        self.instruments.wind.reset();

        for _ in 0..self.timing.samples_per_record() {
            if self.stop_requested() {
                break;
            }

            self.clock.sleep(interval);

            let half_rotations = self.instruments.wind.take();
            let speed_mph = self
                .instruments
                .speed
                .speed(half_rotations, interval.as_secs_f64());
            let angle_degrees = self.instruments.vane.sample()?;

            debug!("Sample: {angle_degrees} deg, {speed_mph:.2} mph ({half_rotations} half rotations)");
            self.buffer.push(Sample {
                angle_degrees,
                speed_mph,
            });
        }

        Ok(())
    }

    fn reduce(&mut self) -> Result<Record> {
        let samples = std::mem::take(&mut self.buffer);
        let wind = summarize(&samples)?;

        debug!("Obtaining the humidity, pressure, and temperature readings");
        let atmosphere = match self.instruments.atmosphere.read_all() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Reading the atmospheric sensor failed: {e}");
                AtmosphericReading::sentinel()
            }
        };

        let timestamp = self.clock.now();
        let record = Record {
            sequence_number: self.next_sequence,
            timestamp,
            temperature: atmosphere.temperature,
            pressure: atmosphere.pressure,
            humidity: atmosphere.humidity,
            wind_dir_degrees: wind.direction,
            wind_dir_string: wind.direction_name,
            wind_speed_avg: wind.speed_avg,
            wind_gust_max: wind.gust,
            precipitation_total: self.instruments.rain.precipitation(),
            sample_count: samples.len(),
        };
        self.next_sequence += 1;

        log_record(&record);
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.emit(&record) {
                error!("Writing record {} to the {} failed: {e}", record.sequence_number, sink.name());
            }
        }

        // keep the buffer's allocation for the next interval
        self.buffer = samples;
        self.buffer.clear();

        self.instruments.rain.roll_over(timestamp.date_naive());

        Ok(record)
    }
}

fn log_record(record: &Record) {
    info!("Record Number:            {}", record.sequence_number);
    info!("Time:                     {}", record.timestamp.format("%Y-%m-%d %H:%M:%S"));
    info!("Temperature (F):          {}", record.temperature);
    info!("Pressure (mbar):          {}", record.pressure);
    info!("Relative Humidity (%):    {}", record.humidity);
    info!("Wind Direction (Degrees): {}", record.wind_dir_degrees);
    info!("Wind Direction (String):  {}", record.wind_dir_string);
    info!("Avg. Wind Speed (MPH):    {}", record.wind_speed_avg);
    info!("Wind Gust (MPH):          {}", record.wind_gust_max);
    info!("Precipitation (Inches):   {}", record.precipitation_total);
    info!("Samples:                  {}", record.sample_count);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(angle_degrees: f64, speed_mph: f64) -> Sample {
        Sample {
            angle_degrees,
            speed_mph,
        }
    }

    #[test]
    fn summary_of_wraparound_samples() {
        let wind = summarize(&[sample(10.0, 5.0), sample(350.0, 15.0)]).unwrap();
        assert_eq!(wind.direction, 0.0);
        assert_eq!(wind.direction_name, "N");
        assert_eq!(wind.speed_avg, 10.0);
        assert_eq!(wind.gust, 15.0);
    }

    #[test]
    fn summary_of_calm_interval() {
        let wind = summarize(&[sample(270.0, 0.0), sample(270.0, 0.0)]).unwrap();
        assert_eq!(wind.direction, 270.0);
        assert_eq!(wind.direction_name, "W");
        assert_eq!(wind.speed_avg, 0.0);
        assert_eq!(wind.gust, 0.0);
    }

    #[test]
    fn summary_rounds_to_one_decimal() {
        let wind = summarize(&[sample(0.0, 1.04), sample(0.0, 2.0), sample(0.0, 3.0)]).unwrap();
        assert_eq!(wind.speed_avg, 2.0);
        assert_eq!(wind.gust, 3.0);
    }

    #[test]
    fn empty_buffer_is_a_logic_error() {
        assert!(matches!(summarize(&[]), Err(StationError::EmptyBuffer)));
    }
}
