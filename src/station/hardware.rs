use log::info;
use rppal::gpio::Gpio;

use super::atmosphere::{AtmosphericSensor, Bme280Module, Bmp280Module, IioModule};
use super::pulse::PulseInput;
use super::rain::RainGauge;
use super::station::Instruments;
use super::vane::{AngleSampler, CalibrationTable, Mcp3208};
use crate::config::{SensorConfig, StationConfig};
use crate::error::Result;

/// Owns the GPIO inputs whose interrupts feed the pulse counters. Must be
/// kept alive for as long as the station runs.
pub struct Hardware {
    _anemometer: PulseInput,
    _rain_gauge: PulseInput,
}

impl Hardware {
    pub fn open(config: &StationConfig) -> Result<(Hardware, Instruments<Mcp3208>)> {
        let gpio = Gpio::new()?;

        let anemometer = PulseInput::bind(&gpio, config.pins.anemometer, "anemometer")?;
        let rain_gauge = PulseInput::bind(&gpio, config.pins.rain_gauge, "rain gauge")?;
        info!(
            "Anemometer on BCM {}, rain gauge on BCM {}",
            config.pins.anemometer, config.pins.rain_gauge
        );

        let adc = Mcp3208::new(config.pins.adc_channel)?;
        let vane = AngleSampler::new(adc, CalibrationTable::default());

        let atmosphere: Box<dyn AtmosphericSensor> = match &config.sensor {
            SensorConfig::Bme280 { i2c_path, address } => {
                info!("Using BME280 on {i2c_path} at {address:#04x}");
                Box::new(Bme280Module::new(i2c_path, *address, config.calibration)?)
            }
            SensorConfig::Bmp280 {
                i2c_path,
                address,
                humidity_input,
            } => {
                info!("Using BMP280 on {i2c_path} at {address:#04x}");
                Box::new(Bmp280Module::new(
                    i2c_path,
                    *address,
                    humidity_input,
                    config.calibration,
                )?)
            }
            SensorConfig::Iio { device } => {
                info!("Using IIO device {}", device.display());
                Box::new(IioModule::new(device, config.calibration))
            }
        };

        let instruments = Instruments {
            vane,
            wind: anemometer.counter(),
            speed: config.speed,
            rain: RainGauge::new(rain_gauge.counter(), config.bucket_size),
            atmosphere,
        };

        Ok((
            Hardware {
                _anemometer: anemometer,
                _rain_gauge: rain_gauge,
            },
            instruments,
        ))
    }
}
