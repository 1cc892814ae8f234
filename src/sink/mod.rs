pub mod csv;
pub mod database;

use crate::error::Result;
use crate::station::Record;

/// Somewhere a finished record is handed off to. The loop does not wait for
/// anything beyond `emit` returning.
pub trait Persistence {
    fn name(&self) -> &str;
    fn emit(&mut self, record: &Record) -> Result<()>;
}
