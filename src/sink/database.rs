use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_postgres::{Client, NoTls};

use super::Persistence;
use crate::config::DatabaseConfig;
use crate::error::{Result, StationError};
use crate::station::Record;

const QUEUE_DEPTH: usize = 16;
const MAX_RETRIES: usize = 5;
const WAIT_BETWEEN_RETRIES: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a closing writer keeps trying to store what is still queued.
const DRAIN_DEADLINE: Duration = Duration::from_secs(15);

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS weather (
    time timestamptz NOT NULL,
    location text NOT NULL,
    record_number bigint NOT NULL,
    temperature double precision,
    pressure double precision,
    humidity double precision,
    wind_direction double precision,
    wind_direction_string text,
    wind_speed double precision,
    wind_gust double precision,
    precipitation double precision
)";

const INSERT: &str = "INSERT INTO weather (time, location, record_number, temperature, pressure,
    humidity, wind_direction, wind_direction_string, wind_speed, wind_gust, precipitation)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";

/// A record as it is stored in the database. The time is UTC at hand-off,
/// which is a few milliseconds later than the local time written to the CSV.
#[derive(Clone, Debug)]
struct WeatherRow {
    time: DateTime<Utc>,
    record: Record,
}

/// Writes records to PostgreSQL/TimescaleDB from a background thread so the
/// sampling loop never waits on the network.
pub struct DatabaseSink {
    tx: Option<Sender<WeatherRow>>,
    closing: watch::Sender<bool>,
    thread_handler: Option<JoinHandle<()>>,
}

impl DatabaseSink {
    pub fn start_thread(config: DatabaseConfig) -> Result<DatabaseSink> {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let (closing, closing_rx) = watch::channel(false);
        let writer = Writer::new(&config, closing_rx)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let thread_handler = thread::Builder::new()
            .name("database".into())
            .spawn(move || runtime.block_on(thread_loop(rx, writer)))?;

        Ok(DatabaseSink {
            tx: Some(tx),
            closing,
            thread_handler: Some(thread_handler),
        })
    }
}

impl Persistence for DatabaseSink {
    fn name(&self) -> &str {
        "database"
    }

    fn emit(&mut self, record: &Record) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| StationError::Database("already stopped".into()))?;

        let row = WeatherRow {
            time: Utc::now(),
            record: record.clone(),
        };
        match tx.try_send(row) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(row)) => {
                warn!(
                    "Database writer is behind, record {} is only in the CSV",
                    row.record.sequence_number
                );
                Ok(())
            }
            Err(TrySendError::Closed(_)) => {
                Err(StationError::Database("thread has exited".into()))
            }
        }
    }
}

impl Drop for DatabaseSink {
    fn drop(&mut self) {
        //wakes a writer waiting between retries; queued rows get one attempt each
        let _ = self.closing.send(true);
        self.tx.take();
        if let Some(handle) = self.thread_handler.take() {
            if handle.join().is_err() {
                error!("Database writer thread panicked");
            }
        }
    }
}

async fn thread_loop(mut rx: Receiver<WeatherRow>, mut writer: Writer) {
    let mut drain_until: Option<Instant> = None;

    while let Some(row) = rx.recv().await {
        let number = row.record.sequence_number;

        let result = if writer.is_closing() {
            let deadline = *drain_until.get_or_insert_with(|| Instant::now() + DRAIN_DEADLINE);
            match tokio::time::timeout_at(deadline, writer.store(&row)).await {
                Ok(result) => result,
                Err(_) => {
                    let mut abandoned = 1;
                    while rx.try_recv().is_ok() {
                        abandoned += 1;
                    }
                    error!("Database drain timed out, {abandoned} record(s) are only in the CSV");
                    break;
                }
            }
        } else {
            writer.store(&row).await
        };

        match result {
            Ok(()) => info!("Stored record {number} in the database"),
            Err(e) => error!("Giving up on record {number}: {e}"),
        }
    }

    info!("Database writer stopped");
}

/// Connection state of the writer thread.
struct Writer {
    settings: tokio_postgres::Config,
    location: String,
    client: Option<Client>,
    closing: watch::Receiver<bool>,
}

impl Writer {
    fn new(config: &DatabaseConfig, closing: watch::Receiver<bool>) -> Result<Writer> {
        let mut settings = config
            .url
            .parse::<tokio_postgres::Config>()
            .map_err(|source| StationError::Postgres {
                context: "url",
                source,
            })?;
        settings.connect_timeout(CONNECT_TIMEOUT);

        Ok(Writer {
            settings,
            location: config.location.clone(),
            client: None,
            closing,
        })
    }

    fn is_closing(&self) -> bool {
        *self.closing.borrow()
    }

    /// Up to `MAX_RETRIES` attempts, or a single one once the sink is closing.
    async fn store(&mut self, row: &WeatherRow) -> Result<()> {
        let attempts = if self.is_closing() { 1 } else { MAX_RETRIES };
        let mut attempt = 1;
        loop {
            let e = match self.try_store(row).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            if attempt >= attempts || self.is_closing() {
                return Err(e);
            }
            warn!("Attempt {attempt}/{attempts}: {e}");
            attempt += 1;
            self.pause().await;
        }
    }

    async fn try_store(&mut self, row: &WeatherRow) -> Result<()> {
        let client = match self.client.take().filter(|c| !c.is_closed()) {
            Some(client) => client,
            None => connect(&self.settings).await?,
        };
        insert(&client, &self.location, row)
            .await
            .map_err(|source| StationError::Postgres {
                context: "insert",
                source,
            })?;
        self.client = Some(client);
        Ok(())
    }

    async fn pause(&mut self) {
        tokio::select! {
            _ = tokio::time::sleep(WAIT_BETWEEN_RETRIES) => {}
            _ = self.closing.changed() => {}
        }
    }
}

async fn connect(settings: &tokio_postgres::Config) -> Result<Client> {
    let (client, connection) =
        settings
            .connect(NoTls)
            .await
            .map_err(|source| StationError::Postgres {
                context: "connect",
                source,
            })?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("Connection error: {e}");
        }
    });

    client
        .batch_execute(CREATE_TABLE)
        .await
        .map_err(|source| StationError::Postgres {
            context: "creating table",
            source,
        })?;

    Ok(client)
}

async fn insert(
    client: &Client,
    location: &str,
    row: &WeatherRow,
) -> std::result::Result<u64, tokio_postgres::Error> {
    let r = &row.record;
    client
        .execute(
            INSERT,
            &[
                &row.time,
                &location,
                &(r.sequence_number as i64),
                &r.temperature,
                &r.pressure,
                &r.humidity,
                &r.wind_dir_degrees,
                &r.wind_dir_string,
                &r.wind_speed_avg,
                &r.wind_gust_max,
                &r.precipitation_total,
            ],
        )
        .await
}
