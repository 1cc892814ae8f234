use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use super::round_to;
use crate::error::{Result, StationError};

/// Supply voltage of the vane's divider and the ADC reference.
pub const REFERENCE_VOLTAGE: f64 = 3.3;

/// Divider output voltages for a 4.7 kOhm resistor against each of the vane's
/// 16 reed positions, mapped to headings in degrees.
const DEFAULT_VOLTAGES: [(f64, f64); 16] = [
    (0.4, 0.0),
    (1.4, 22.5),
    (1.2, 45.0),
    (2.8, 67.5),
    (2.7, 90.0),
    (2.9, 112.5),
    (2.2, 135.0),
    (2.5, 157.5),
    (1.8, 180.0),
    (2.0, 202.5),
    (0.7, 225.0),
    (0.8, 247.5),
    (0.1, 270.0),
    (0.3, 292.5),
    (0.2, 315.0),
    (0.6, 337.5),
];

/// Voltage to heading lookup for the wind vane. Fixed for the life of the process.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationTable {
    entries: Vec<(f64, f64)>,
}

impl CalibrationTable {
    pub fn new(entries: Vec<(f64, f64)>) -> Result<CalibrationTable> {
        if entries.is_empty() {
            return Err(StationError::Calibration);
        }
        if let Some((volts, heading)) = entries
            .iter()
            .find(|(v, h)| !v.is_finite() || !h.is_finite() || !(0.0..360.0).contains(h))
        {
            return Err(StationError::Config(format!(
                "calibration entry {volts} V -> {heading} deg is out of range"
            )));
        }
        Ok(CalibrationTable { entries })
    }

    /// Heading of the entry closest to `voltage`. On a tie the entry that
    /// comes first in the table wins.
    pub fn heading_for(&self, voltage: f64) -> f64 {
        let mut best = self.entries[0];
        for entry in &self.entries[1..] {
            if (entry.0 - voltage).abs() < (best.0 - voltage).abs() {
                best = *entry;
            }
        }
        best.1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        CalibrationTable {
            entries: DEFAULT_VOLTAGES.to_vec(),
        }
    }
}

/// A polled analog channel returning a fraction of the reference voltage.
pub trait AnalogInput {
    fn read_normalized(&mut self) -> Result<f64>;
}

/// MCP3208 12-bit ADC on the Pi's SPI0 bus.
pub struct Mcp3208 {
    spi: Spi,
    channel: u8,
}

impl Mcp3208 {
    const MAX_VALUE: f64 = 4095.0;

    pub fn new(channel: u8) -> Result<Mcp3208> {
        if channel > 7 {
            return Err(StationError::Config(format!(
                "MCP3208 has channels 0-7, got {channel}"
            )));
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, 1_000_000, Mode::Mode0)?;
        Ok(Mcp3208 { spi, channel })
    }
}

impl AnalogInput for Mcp3208 {
    fn read_normalized(&mut self) -> Result<f64> {
        //start bit, single-ended, then the 3 channel bits straddling the first two bytes
        let write = [0x06 | (self.channel >> 2), (self.channel & 0x03) << 6, 0x00];
        let mut read = [0u8; 3];
        self.spi.transfer(&mut read, &write)?;

        let raw = (((read[1] & 0x0F) as u16) << 8) | read[2] as u16;
        Ok(raw as f64 / Self::MAX_VALUE)
    }
}

/// Wind vane: one ADC read mapped to one of the calibrated headings.
pub struct AngleSampler<A: AnalogInput> {
    adc: A,
    table: CalibrationTable,
}

impl<A: AnalogInput> AngleSampler<A> {
    pub fn new(adc: A, table: CalibrationTable) -> AngleSampler<A> {
        AngleSampler { adc, table }
    }

    pub fn sample(&mut self) -> Result<f64> {
        let voltage = round_to(self.adc.read_normalized()? * REFERENCE_VOLTAGE, 3);
        Ok(self.table.heading_for(voltage))
    }
}
