use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logo: LogoConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Size of the read pool; writes always go through a single connection
    pub max_read_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema generation to create and route for (14 or 15)
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory used by old installations to keep logos as files.
    /// Emptied when a schema upgrade recreates the tables.
    pub legacy_logo_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoConfig {
    pub max_dimension: u32,
    pub ingest_workers: usize,
    pub pipe_capacity: usize,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    #[serde(with = "duration_serde")]
    pub program_max_age: Duration,
    #[serde(with = "duration_serde")]
    pub watch_history_max_age: Duration,
    pub max_watch_history_rows: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_read_connections: DEFAULT_MAX_READ_CONNECTIONS,
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_SCHEMA_VERSION,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            legacy_logo_path: PathBuf::from(DEFAULT_LEGACY_LOGO_PATH),
        }
    }
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_LOGO_MAX_DIMENSION,
            ingest_workers: DEFAULT_LOGO_INGEST_WORKERS,
            pipe_capacity: DEFAULT_LOGO_PIPE_CAPACITY,
            max_upload_bytes: DEFAULT_LOGO_MAX_UPLOAD_BYTES,
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            program_max_age: DEFAULT_PROGRAM_MAX_AGE,
            watch_history_max_age: DEFAULT_WATCH_HISTORY_MAX_AGE,
            max_watch_history_rows: DEFAULT_MAX_WATCH_HISTORY_ROWS,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }

    /// Configuration for an isolated store, used by tests and tooling.
    pub fn for_database(url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.database.url = url.into();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [database]
            url = "sqlite://./other.db"
            max_read_connections = 2

            [logo]
            max_dimension = 128
            ingest_workers = 1
            pipe_capacity = 4
            max_upload_bytes = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.database.url, "sqlite://./other.db");
        assert_eq!(config.logo.max_dimension, 128);
        assert_eq!(config.schema.version, DEFAULT_SCHEMA_VERSION);
        assert_eq!(
            config.cleanup.program_max_age,
            Duration::from_secs(7 * 86_400)
        );
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.cleanup.max_watch_history_rows, DEFAULT_MAX_WATCH_HISTORY_ROWS);
        assert_eq!(parsed.cleanup.program_max_age, DEFAULT_PROGRAM_MAX_AGE);
        assert_eq!(
            parsed.cleanup.watch_history_max_age,
            Duration::from_secs(30 * 86_400)
        );
        assert_eq!(parsed.storage.legacy_logo_path, PathBuf::from(DEFAULT_LEGACY_LOGO_PATH));
    }
}
