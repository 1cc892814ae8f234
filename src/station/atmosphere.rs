use std::path::{Path, PathBuf};

use bme280::i2c::BME280;
use bmp280::{Bmp280, Bmp280Builder};
use linux_embedded_hal::{Delay, I2cdev};

use super::round_to;
use crate::error::{Result, StationError};

/// Pressure added to the raw barometer reading to correct for the station's elevation.
pub const DEFAULT_PRESSURE_OFFSET_MBAR: f64 = 157.3826;

/// Value substituted for each field when the module cannot be read.
pub const SENTINEL: f64 = -1000.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtmosphericReading {
    pub humidity: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl AtmosphericReading {
    pub fn sentinel() -> AtmosphericReading {
        AtmosphericReading {
            humidity: SENTINEL,
            pressure: SENTINEL,
            temperature: SENTINEL,
        }
    }
}

/// Temperature, humidity and pressure module. A read succeeds or fails as a whole.
pub trait AtmosphericSensor {
    fn read_all(&mut self) -> Result<AtmosphericReading>;
}

/// Corrections applied to raw metric readings before they are logged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    pub pressure_offset_mbar: f64,
    pub fahrenheit: bool,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            pressure_offset_mbar: DEFAULT_PRESSURE_OFFSET_MBAR,
            fahrenheit: true,
        }
    }
}

impl Calibration {
    pub fn apply(&self, humidity: f64, pressure_mbar: f64, temperature_c: f64) -> AtmosphericReading {
        let temperature_c = round_to(temperature_c, 1);
        let temperature = if self.fahrenheit {
            round_to(temperature_c * 1.8 + 32.0, 1)
        } else {
            temperature_c
        };

        AtmosphericReading {
            humidity: round_to(humidity, 1),
            pressure: round_to(pressure_mbar + self.pressure_offset_mbar, 1),
            temperature,
        }
    }
}

/// Reads one value exported by a Linux IIO driver.
fn read_iio_value(path: &Path) -> Result<f64> {
    let raw = std::fs::read_to_string(path).map_err(|source| StationError::SensorFile {
        path: path.to_path_buf(),
        source,
    })?;
    raw.trim_end()
        .parse::<f64>()
        .map_err(|source| StationError::SensorValue {
            path: path.to_path_buf(),
            source,
        })
}

/// A BME280 driven from userspace I2C. Temperature, pressure and humidity
/// come from one forced measurement.
pub struct Bme280Module {
    sensor: BME280<I2cdev>,
    delay: Delay,
    calibration: Calibration,
}

impl Bme280Module {
    pub fn new(i2c_path: &str, address: u16, calibration: Calibration) -> Result<Bme280Module> {
        let address = u8::try_from(address).map_err(|_| {
            StationError::Config(format!("bme280 address {address:#x} is not a 7-bit address"))
        })?;
        let i2c = I2cdev::new(i2c_path).map_err(|e| StationError::I2c {
            path: i2c_path.to_string(),
            source: Box::new(e),
        })?;

        let mut sensor = BME280::new(i2c, address);
        let mut delay = Delay;
        sensor
            .init(&mut delay)
            .map_err(|e| StationError::Sensor(format!("bme280 init on {i2c_path}: {e:?}")))?;

        Ok(Bme280Module {
            sensor,
            delay,
            calibration,
        })
    }
}

impl AtmosphericSensor for Bme280Module {
    fn read_all(&mut self) -> Result<AtmosphericReading> {
        let m = self
            .sensor
            .measure(&mut self.delay)
            .map_err(|e| StationError::Sensor(format!("bme280 measure: {e:?}")))?;

        // pascals to mbar
        Ok(self.calibration.apply(
            m.humidity as f64,
            m.pressure as f64 / 100.0,
            m.temperature as f64,
        ))
    }
}

/// A BME280 bound to the kernel's bmp280 IIO driver.
pub struct IioModule {
    device: PathBuf,
    calibration: Calibration,
}

impl IioModule {
    pub fn new(device: impl Into<PathBuf>, calibration: Calibration) -> IioModule {
        IioModule {
            device: device.into(),
            calibration,
        }
    }
}

impl AtmosphericSensor for IioModule {
    fn read_all(&mut self) -> Result<AtmosphericReading> {
        let temperature_c = read_iio_value(&self.device.join("in_temp_input"))? / 1000.0;
        let pressure_kpa = read_iio_value(&self.device.join("in_pressure_input"))?;
        let humidity = read_iio_value(&self.device.join("in_humidityrelative_input"))? / 1000.0;

        Ok(self
            .calibration
            .apply(humidity, pressure_kpa * 10.0, temperature_c))
    }
}

/// A BMP280 read over userspace I2C, with relative humidity taken from a
/// separate IIO humidity node.
pub struct Bmp280Module {
    controller: Bmp280,
    humidity_input: PathBuf,
    calibration: Calibration,
}

impl Bmp280Module {
    pub fn new(
        i2c_path: &str,
        address: u16,
        humidity_input: impl Into<PathBuf>,
        calibration: Calibration,
    ) -> Result<Bmp280Module> {
        let controller = Bmp280Builder::new()
            .path(i2c_path)
            .address(address)
            .build()
            .map_err(|e| StationError::Config(format!("bmp280 on {i2c_path}: {e:?}")))?;

        Ok(Bmp280Module {
            controller,
            humidity_input: humidity_input.into(),
            calibration,
        })
    }
}

impl AtmosphericSensor for Bmp280Module {
    fn read_all(&mut self) -> Result<AtmosphericReading> {
        let pressure_kpa = self
            .controller
            .pressure_kpa()
            .map_err(|e| StationError::Sensor(format!("bmp280 pressure: {e:?}")))?;
        let temperature_c = self
            .controller
            .temperature_celsius()
            .map_err(|e| StationError::Sensor(format!("bmp280 temperature: {e:?}")))?;
        let humidity = read_iio_value(&self.humidity_input)? / 1000.0;

        Ok(self
            .calibration
            .apply(humidity, pressure_kpa as f64 * 10.0, temperature_c as f64))
    }
}
