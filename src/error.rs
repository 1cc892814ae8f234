use std::num::ParseFloatError;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StationError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("wind vane calibration table is empty")]
    Calibration,
    #[error("gpio error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
    #[error("spi error: {0}")]
    Spi(#[from] rppal::spi::Error),
    #[error("opening i2c bus {path}")]
    I2c {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Driver errors that only implement `Debug`.
    #[error("atmospheric sensor read failed: {0}")]
    Sensor(String),
    #[error("reading {}", path.display())]
    SensorFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {}", path.display())]
    SensorValue {
        path: PathBuf,
        #[source]
        source: ParseFloatError,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database writer: {0}")]
    Database(String),
    #[error("database {context}")]
    Postgres {
        context: &'static str,
        #[source]
        source: tokio_postgres::Error,
    },
    #[error("accumulation buffer was empty at reduction time")]
    EmptyBuffer,
}

pub type Result<T> = std::result::Result<T, StationError>;
