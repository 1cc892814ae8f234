use std::path::PathBuf;
use std::time::Duration;

use log::warn;

use crate::cli::{Cli, SensorKind};
use crate::error::{Result, StationError};
use crate::station::anemometer::SpeedCalculator;
use crate::station::atmosphere::Calibration;

/// How often samples are taken and how often they are reduced into a record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    pub log_interval: Duration,
    pub accumulation_interval: Duration,
}

impl Timing {
    pub fn new(log_interval: Duration, accumulation_interval: Duration) -> Result<Timing> {
        if accumulation_interval.is_zero() {
            return Err(StationError::Config(
                "accumulation interval must be positive".into(),
            ));
        }
        if log_interval < accumulation_interval {
            return Err(StationError::Config(format!(
                "log interval ({}s) is shorter than the accumulation interval ({}s)",
                log_interval.as_secs_f64(),
                accumulation_interval.as_secs_f64()
            )));
        }
        let timing = Timing {
            log_interval,
            accumulation_interval,
        };
        if timing.record_period() != log_interval {
            warn!(
                "log interval ({}s) is not a multiple of the accumulation interval ({}s), \
                 a record is written every {}s",
                log_interval.as_secs_f64(),
                accumulation_interval.as_secs_f64(),
                timing.record_period().as_secs_f64()
            );
        }
        Ok(timing)
    }

    /// Samples per record; always at least one.
    pub fn samples_per_record(&self) -> usize {
        (self.log_interval.as_secs_f64() / self.accumulation_interval.as_secs_f64()).floor() as usize
    }

    /// Time actually covered by one record.
    pub fn record_period(&self) -> Duration {
        self.accumulation_interval * self.samples_per_record() as u32
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SensorConfig {
    Bme280 {
        i2c_path: String,
        address: u16,
    },
    Bmp280 {
        i2c_path: String,
        address: u16,
        humidity_input: PathBuf,
    },
    Iio {
        device: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pins {
    pub anemometer: u8,
    pub rain_gauge: u8,
    pub adc_channel: u8,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub location: String,
}

#[derive(Clone, Debug)]
pub struct StationConfig {
    pub timing: Timing,
    pub data_dir: PathBuf,
    pub mirror_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub database: Option<DatabaseConfig>,
    pub sensor: SensorConfig,
    pub calibration: Calibration,
    pub pins: Pins,
    pub speed: SpeedCalculator,
    pub bucket_size: f64,
}

impl StationConfig {
    pub fn from_cli(cli: Cli) -> Result<StationConfig> {
        let timing = Timing::new(
            Duration::from_secs(cli.log_interval),
            Duration::from_secs(cli.accumulation_interval),
        )?;

        if !(cli.anemometer_radius_cm > 0.0) {
            return Err(StationError::Config(
                "anemometer radius must be positive".into(),
            ));
        }
        if !(cli.wind_calibration > 0.0) {
            return Err(StationError::Config(
                "wind calibration factor must be positive".into(),
            ));
        }
        if !(cli.bucket_size > 0.0) {
            return Err(StationError::Config("bucket size must be positive".into()));
        }
        if cli.anemometer_pin == cli.rain_pin {
            return Err(StationError::Config(format!(
                "anemometer and rain gauge both on BCM {}",
                cli.rain_pin
            )));
        }

        let sensor = match cli.sensor {
            SensorKind::Bme280 => SensorConfig::Bme280 {
                i2c_path: cli.i2c_path,
                address: cli.i2c_address,
            },
            SensorKind::Bmp280 => SensorConfig::Bmp280 {
                i2c_path: cli.i2c_path,
                address: cli.i2c_address,
                humidity_input: cli.iio_device.join("in_humidityrelative_input"),
            },
            SensorKind::Iio => SensorConfig::Iio {
                device: cli.iio_device,
            },
        };

        let database = cli
            .database_url
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig {
                url,
                location: cli.location,
            });

        Ok(StationConfig {
            timing,
            data_dir: cli.data_dir,
            mirror_dir: cli.mirror_dir,
            log_file: cli.log_file,
            database,
            sensor,
            calibration: Calibration {
                pressure_offset_mbar: cli.pressure_offset,
                fahrenheit: !cli.celsius,
            },
            pins: Pins {
                anemometer: cli.anemometer_pin,
                rain_gauge: cli.rain_pin,
                adc_channel: cli.adc_channel,
            },
            speed: SpeedCalculator::new(cli.anemometer_radius_cm, cli.wind_calibration),
            bucket_size: cli.bucket_size,
        })
    }
}
