use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use weather_station::cli::Cli;
use weather_station::clock::{Clock, SystemClock};
use weather_station::config::StationConfig;
use weather_station::sink::csv::CsvLog;
use weather_station::sink::database::DatabaseSink;
use weather_station::sink::Persistence;
use weather_station::station::hardware::Hardware;
use weather_station::station::station::WeatherStation;

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs();

    if let Some(path) = log_file {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

/// Raises `stop` on Ctrl-C so the loop can flush the interval it is in. A
/// second Ctrl-C exits immediately.
fn watch_for_shutdown(stop: Arc<AtomicBool>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("shutdown".into())
        .spawn(move || {
            runtime.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl+C: {e}");
                    return;
                }
                info!("Stop requested, finishing the current record (Ctrl+C again to quit now)");
                stop.store(true, Ordering::Release);

                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Second Ctrl+C, exiting without flushing");
                    std::process::exit(130);
                }
            })
        })?;
    Ok(())
}

fn run(config: StationConfig) -> Result<()> {
    let clock = SystemClock;

    let (_hardware, instruments) =
        Hardware::open(&config).context("initializing the station hardware")?;

    let csv = CsvLog::create(&config.data_dir, clock.now(), config.mirror_dir.clone())
        .with_context(|| format!("creating the data file in {}", config.data_dir.display()))?;
    info!("The data file is located here: {}", csv.path().display());

    let mut sinks: Vec<Box<dyn Persistence>> = vec![Box::new(csv)];
    match config.database.clone() {
        Some(database) => {
            sinks.push(Box::new(
                DatabaseSink::start_thread(database).context("starting the database writer")?,
            ));
        }
        None => warn!("DATABASE_URL not set, records are only written to the CSV"),
    }
    if config.mirror_dir.is_none() {
        warn!("The data is not being backed up, no mirror directory configured");
    }

    let stop = Arc::new(AtomicBool::new(false));
    watch_for_shutdown(stop.clone())?;

    let mut station = WeatherStation::new(config.timing, instruments, clock, sinks, stop);
    info!(
        "The weather station has been started, one record every {}s",
        config.timing.record_period().as_secs()
    );
    station.run()?;
    Ok(())
}

fn main() -> Result<()> {
    //values in .env are picked up by clap's env fallbacks
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.log_file.as_deref())?;

    let config = match StationConfig::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };

    if let Err(e) = run(config) {
        error!("An unhandled error occurred causing a crash: {e:#}");
        return Err(e);
    }
    Ok(())
}
