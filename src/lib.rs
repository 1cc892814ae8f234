pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod sink;
pub mod station;

pub use error::{Result, StationError};
