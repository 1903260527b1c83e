use std::time::Duration;

/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./tv-store.db";
pub const DEFAULT_MAX_READ_CONNECTIONS: u32 = 4;

// Schema defaults
pub const DEFAULT_SCHEMA_VERSION: u32 = 15;

// Storage defaults
pub const DEFAULT_LEGACY_LOGO_PATH: &str = "./data/logo";

// Logo ingestion defaults
pub const DEFAULT_LOGO_MAX_DIMENSION: u32 = 256;
pub const DEFAULT_LOGO_INGEST_WORKERS: usize = 2;
pub const DEFAULT_LOGO_PIPE_CAPACITY: usize = 16;
pub const DEFAULT_LOGO_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10MB

// EPG cleanup defaults
pub const DEFAULT_PROGRAM_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 3600);
pub const DEFAULT_WATCH_HISTORY_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 3600);
pub const DEFAULT_MAX_WATCH_HISTORY_ROWS: u32 = 10_000;
