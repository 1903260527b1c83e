//! Table declarations and the versioned, destructive migration
//!
//! The store keeps no data across schema generations: any version change
//! drops all three tables and recreates them. The schema generation is
//! recorded in SQLite's `user_version` pragma.

use crate::errors::{AppError, AppResult};
use sqlx::SqlitePool;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Supported schema generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaVersion {
    V14,
    /// Adds `programs.video_resolution` and the input passthrough route
    V15,
}

impl SchemaVersion {
    pub const CURRENT: SchemaVersion = SchemaVersion::V15;

    pub fn number(self) -> u32 {
        match self {
            SchemaVersion::V14 => 14,
            SchemaVersion::V15 => 15,
        }
    }

    pub fn has_video_resolution(self) -> bool {
        self >= SchemaVersion::V15
    }

    pub fn has_passthrough_route(self) -> bool {
        self >= SchemaVersion::V15
    }

    fn create_statements(self) -> Vec<&'static str> {
        let programs = if self.has_video_resolution() {
            CREATE_PROGRAMS_V15
        } else {
            CREATE_PROGRAMS_V14
        };
        let mut statements = vec![CREATE_CHANNELS, programs, CREATE_WATCHED_PROGRAMS];
        statements.extend_from_slice(CREATE_INDEXES);
        statements
    }
}

impl TryFrom<u32> for SchemaVersion {
    type Error = AppError;

    fn try_from(version: u32) -> Result<Self, Self::Error> {
        match version {
            14 => Ok(SchemaVersion::V14),
            15 => Ok(SchemaVersion::V15),
            other => Err(AppError::configuration(format!(
                "Unsupported schema version {other}, expected 14 or 15"
            ))),
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// What [`migrate`] did to the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    UpToDate,
    Created,
    Recreated { from: u32, to: u32 },
}

const CREATE_CHANNELS: &str = r#"
CREATE TABLE channels (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_name TEXT NOT NULL,
    input_id TEXT NOT NULL,
    type INTEGER NOT NULL DEFAULT 0,
    service_type INTEGER NOT NULL DEFAULT 1,
    original_network_id INTEGER,
    transport_stream_id INTEGER,
    service_id INTEGER,
    display_number TEXT,
    display_name TEXT,
    description TEXT,
    browsable INTEGER NOT NULL DEFAULT 1,
    searchable INTEGER NOT NULL DEFAULT 1,
    internal_provider_data BLOB,
    logo BLOB,
    version_number INTEGER,
    UNIQUE(_id, package_name)
)
"#;

const CREATE_PROGRAMS_V14: &str = r#"
CREATE TABLE programs (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_name TEXT NOT NULL,
    channel_id INTEGER,
    title TEXT,
    season_number INTEGER,
    episode_number INTEGER,
    episode_title TEXT,
    start_time_utc_millis INTEGER,
    end_time_utc_millis INTEGER,
    broadcast_genre TEXT,
    canonical_genre TEXT,
    short_description TEXT,
    long_description TEXT,
    content_rating TEXT,
    poster_art_uri TEXT,
    thumbnail_uri TEXT,
    internal_provider_data BLOB,
    version_number INTEGER,
    FOREIGN KEY(channel_id, package_name) REFERENCES channels(_id, package_name)
        ON UPDATE CASCADE ON DELETE CASCADE
)
"#;

const CREATE_PROGRAMS_V15: &str = r#"
CREATE TABLE programs (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_name TEXT NOT NULL,
    channel_id INTEGER,
    title TEXT,
    season_number INTEGER,
    episode_number INTEGER,
    episode_title TEXT,
    start_time_utc_millis INTEGER,
    end_time_utc_millis INTEGER,
    broadcast_genre TEXT,
    canonical_genre TEXT,
    short_description TEXT,
    long_description TEXT,
    video_resolution TEXT,
    content_rating TEXT,
    poster_art_uri TEXT,
    thumbnail_uri TEXT,
    internal_provider_data BLOB,
    version_number INTEGER,
    FOREIGN KEY(channel_id, package_name) REFERENCES channels(_id, package_name)
        ON UPDATE CASCADE ON DELETE CASCADE
)
"#;

// The watch log is written by the system, not by the channel owner, so its
// owner column cannot be part of the key.
const CREATE_WATCHED_PROGRAMS: &str = r#"
CREATE TABLE watched_programs (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_name TEXT NOT NULL,
    watch_start_time_utc_millis INTEGER,
    watch_end_time_utc_millis INTEGER,
    channel_id INTEGER,
    title TEXT,
    start_time_utc_millis INTEGER,
    end_time_utc_millis INTEGER,
    description TEXT,
    tune_params BLOB,
    FOREIGN KEY(channel_id) REFERENCES channels(_id)
        ON UPDATE CASCADE ON DELETE CASCADE
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX idx_channels_input_id ON channels(input_id)",
    "CREATE INDEX idx_programs_channel_time ON programs(channel_id, start_time_utc_millis)",
    "CREATE INDEX idx_watched_programs_channel_id ON watched_programs(channel_id)",
];

const DROP_TABLES: &[&str] = &[
    "DROP TABLE IF EXISTS watched_programs",
    "DROP TABLE IF EXISTS programs",
    "DROP TABLE IF EXISTS channels",
];

/// Schema generation currently recorded in the database (0 when empty).
pub async fn current_version(pool: &SqlitePool) -> AppResult<u32> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(u32::try_from(version).unwrap_or_default())
}

/// Bring the database to `target`, recreating every table when the recorded
/// generation differs. Recreating also empties the legacy logo directory.
pub async fn migrate(
    pool: &SqlitePool,
    target: SchemaVersion,
    legacy_logo_path: &Path,
) -> AppResult<MigrationOutcome> {
    let current = current_version(pool).await?;
    if current == target.number() {
        debug!("Schema already at version {}", target);
        return Ok(MigrationOutcome::UpToDate);
    }

    if current == 0 {
        info!("Creating database schema version {}", target);
    } else {
        info!("Upgrading database from {} to {}", current, target);
    }

    let mut transaction = pool.begin().await?;
    for statement in DROP_TABLES {
        sqlx::query(statement).execute(&mut *transaction).await?;
    }
    for statement in target.create_statements() {
        sqlx::query(statement).execute(&mut *transaction).await?;
    }
    sqlx::query(&format!("PRAGMA user_version = {}", target.number()))
        .execute(&mut *transaction)
        .await?;
    transaction.commit().await?;

    if current == 0 {
        return Ok(MigrationOutcome::Created);
    }

    clear_legacy_logos(legacy_logo_path).await;
    Ok(MigrationOutcome::Recreated {
        from: current,
        to: target.number(),
    })
}

async fn clear_legacy_logos(path: &Path) {
    match tokio::fs::try_exists(path).await {
        Ok(true) => match tokio::fs::remove_dir_all(path).await {
            Ok(()) => info!("Removed legacy logo directory {}", path.display()),
            Err(e) => warn!("Failed to remove legacy logo directory {}: {}", path.display(), e),
        },
        Ok(false) => {}
        Err(e) => warn!("Failed to check legacy logo directory {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_numbers() {
        assert_eq!(SchemaVersion::try_from(15).unwrap(), SchemaVersion::V15);
        assert_eq!(SchemaVersion::try_from(14).unwrap(), SchemaVersion::V14);
        assert!(SchemaVersion::try_from(13).is_err());
        assert_eq!(SchemaVersion::CURRENT.number(), 15);
    }

    #[test]
    fn test_v14_has_no_video_resolution() {
        let ddl = SchemaVersion::V14.create_statements().join("\n");
        assert!(!ddl.contains("video_resolution"));
        let ddl = SchemaVersion::V15.create_statements().join("\n");
        assert!(ddl.contains("video_resolution TEXT"));
    }
}
