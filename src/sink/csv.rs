use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{debug, warn};

use super::Persistence;
use crate::error::Result;
use crate::station::Record;

pub const HEADER: &str = "Record Number,Time,Temperature (F),Pressure (mbars),Relative Humidity (%),\
Wind Direction (Degrees),Wind Direction (String),Wind Speed (MPH),Wind Gust (MPH),Precipitation (Inches)";

pub fn format_row(record: &Record) -> String {
    format!(
        "{},{},{:.1},{:.1},{:.1},{:.1},{},{:.1},{:.1},{:.4}",
        record.sequence_number,
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.temperature,
        record.pressure,
        record.humidity,
        record.wind_dir_degrees,
        record.wind_dir_string,
        record.wind_speed_avg,
        record.wind_gust_max,
        record.precipitation_total,
    )
}

/// Append-only CSV data file, one per station run, optionally copied to a
/// removable drive after every record.
pub struct CsvLog {
    path: PathBuf,
    backup: PathBuf,
    mirror_dir: Option<PathBuf>,
}

impl CsvLog {
    /// Creates `<MM-DD-YYYY--HH-MM-SS>.csv` in `data_dir` and writes the header.
    pub fn create(
        data_dir: &Path,
        started: DateTime<Local>,
        mirror_dir: Option<PathBuf>,
    ) -> Result<CsvLog> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(format!("{}.csv", started.format("%m-%d-%Y--%H-%M-%S")));

        let mut file = File::create(&path)?;
        writeln!(file, "{HEADER}")?;

        let mut backup = path.clone().into_os_string();
        backup.push(".bak");

        Ok(CsvLog {
            path,
            backup: backup.into(),
            mirror_dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mirror(&self) {
        let Some(dir) = &self.mirror_dir else {
            return;
        };
        if !dir.is_dir() {
            warn!(
                "The data is not being backed up, {} is not mounted",
                dir.display()
            );
            return;
        }
        let Some(file_name) = self.path.file_name() else {
            return;
        };
        if let Err(e) = fs::copy(&self.path, dir.join(file_name)) {
            warn!("Could not copy the data file to {}: {e}", dir.display());
        }
    }
}

impl Persistence for CsvLog {
    fn name(&self) -> &str {
        "csv"
    }

    fn emit(&mut self, record: &Record) -> Result<()> {
        debug!("Creating a temporary backup of the data at {}", self.backup.display());
        fs::copy(&self.path, &self.backup)?;

        debug!("Writing record {} to {}", record.sequence_number, self.path.display());
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", format_row(record))?;
        file.sync_data()?;

        fs::remove_file(&self.backup)?;
        self.mirror();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(n: u64) -> Record {
        Record {
            sequence_number: n,
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 14, 30, 5).unwrap(),
            temperature: 68.04,
            pressure: 1013.0,
            humidity: 40.0,
            wind_dir_degrees: 0.0,
            wind_dir_string: "N",
            wind_speed_avg: 10.0,
            wind_gust_max: 15.26,
            precipitation_total: 0.033,
            sample_count: 2,
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("weather_station_csv_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn row_formatting() {
        assert_eq!(
            format_row(&record(1)),
            "1,2024-05-01 14:30:05,68.0,1013.0,40.0,0.0,N,10.0,15.3,0.0330"
        );
    }

    #[test]
    fn writes_header_then_rows_and_mirrors() {
        let data = scratch_dir("data");
        let mirror = scratch_dir("mirror");
        fs::create_dir_all(&mirror).unwrap();

        let started = Local.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap();
        let mut log = CsvLog::create(&data, started, Some(mirror.clone())).unwrap();
        assert_eq!(log.path().file_name().unwrap(), "05-01-2024--14-00-00.csv");

        log.emit(&record(1)).unwrap();
        log.emit(&record(2)).unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("1,"));
        assert!(lines[2].starts_with("2,"));

        let mirrored = fs::read_to_string(mirror.join("05-01-2024--14-00-00.csv")).unwrap();
        assert_eq!(mirrored, contents);
        assert!(!log.backup.exists());

        fs::remove_dir_all(data).unwrap();
        fs::remove_dir_all(mirror).unwrap();
    }

    #[test]
    fn missing_mirror_is_not_an_error() {
        let data = scratch_dir("unmounted");
        let started = Local.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap();
        let mut log =
            CsvLog::create(&data, started, Some(PathBuf::from("/nonexistent/usb1"))).unwrap();
        log.emit(&record(1)).unwrap();
        fs::remove_dir_all(data).unwrap();
    }
}
