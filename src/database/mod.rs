use crate::config::Config;
use crate::errors::AppResult;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

pub mod schema;

use schema::{MigrationOutcome, SchemaVersion};

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Storage handles: one writable connection, a pool of readers.
///
/// Every mutation goes through `writer`, which holds exactly one connection,
/// so SQLite never sees two concurrent writers from this process.
#[derive(Clone)]
pub struct Database {
    writer: SqlitePool,
    reader: SqlitePool,
    version: SchemaVersion,
    legacy_logo_path: PathBuf,
}

impl Database {
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let version = SchemaVersion::try_from(config.schema.version)?;
        let url = config.database.url.as_str();

        let (writer, reader) = if is_memory_url(url) {
            // Uniquely named shared-cache database so parallel stores never
            // see each other. A single connection serves reads and writes.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:tv-store-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );
            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true)
                .foreign_keys(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?;
            (pool.clone(), pool)
        } else {
            let options = SqliteConnectOptions::from_str(url)?
                .create_if_missing(true)
                .foreign_keys(true)
                .journal_mode(SqliteJournalMode::Wal);
            let writer = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options.clone())
                .await?;
            let reader = SqlitePoolOptions::new()
                .max_connections(config.database.max_read_connections.max(1))
                .connect_with(options)
                .await?;
            (writer, reader)
        };

        info!("Database connected: {} (schema {})", url, version);

        Ok(Self {
            writer,
            reader,
            version,
            legacy_logo_path: config.storage.legacy_logo_path.clone(),
        })
    }

    pub async fn migrate(&self) -> AppResult<MigrationOutcome> {
        schema::migrate(&self.writer, self.version, &self.legacy_logo_path).await
    }

    /// The single writable handle
    pub fn writer(&self) -> &SqlitePool {
        &self.writer
    }

    pub fn reader(&self) -> &SqlitePool {
        &self.reader
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }
}

fn is_memory_url(url: &str) -> bool {
    matches!(url, ":memory:" | "sqlite::memory:" | "sqlite://:memory:")
}
