use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A channel row, without its logo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Channel {
    #[sqlx(rename = "_id")]
    #[serde(rename = "_id")]
    pub id: i64,
    pub package_name: String,
    pub input_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub channel_type: i64,
    pub service_type: i64,
    pub original_network_id: Option<i64>,
    pub transport_stream_id: Option<i64>,
    pub service_id: Option<i64>,
    pub display_number: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub browsable: bool,
    pub searchable: bool,
    pub internal_provider_data: Option<Vec<u8>>,
    pub version_number: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Program {
    #[sqlx(rename = "_id")]
    #[serde(rename = "_id")]
    pub id: i64,
    pub package_name: String,
    pub channel_id: Option<i64>,
    pub title: Option<String>,
    pub season_number: Option<i64>,
    pub episode_number: Option<i64>,
    pub episode_title: Option<String>,
    pub start_time_utc_millis: Option<i64>,
    pub end_time_utc_millis: Option<i64>,
    pub broadcast_genre: Option<String>,
    pub canonical_genre: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    /// Absent on schema 14
    #[sqlx(default)]
    pub video_resolution: Option<String>,
    pub content_rating: Option<String>,
    pub poster_art_uri: Option<String>,
    pub thumbnail_uri: Option<String>,
    pub internal_provider_data: Option<Vec<u8>>,
    pub version_number: Option<i64>,
}

/// A watch-log entry. Title and times are a snapshot taken at watch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WatchedProgram {
    #[sqlx(rename = "_id")]
    #[serde(rename = "_id")]
    pub id: i64,
    pub package_name: String,
    pub watch_start_time_utc_millis: Option<i64>,
    pub watch_end_time_utc_millis: Option<i64>,
    pub channel_id: Option<i64>,
    pub title: Option<String>,
    pub start_time_utc_millis: Option<i64>,
    pub end_time_utc_millis: Option<i64>,
    pub description: Option<String>,
    pub tune_params: Option<Vec<u8>>,
}

impl Program {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time_utc_millis.and_then(from_millis)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time_utc_millis.and_then(from_millis)
    }

    pub fn canonical_genres(&self) -> Vec<String> {
        self.canonical_genre
            .as_deref()
            .map(crate::genres::decode)
            .unwrap_or_default()
    }
}

impl WatchedProgram {
    pub fn watch_start_time(&self) -> Option<DateTime<Utc>> {
        self.watch_start_time_utc_millis.and_then(from_millis)
    }
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Current wall-clock time in UTC milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
