//! Table and column catalogue
//!
//! Projection, sort and write columns are validated against these lists
//! before any SQL is built, so caller-supplied names never reach a statement
//! unchecked.

use super::ResourceUri;
use crate::database::schema::SchemaVersion;
use strum::{AsRefStr, Display, EnumIter, EnumString};

pub const COLUMN_ID: &str = "_id";
pub const COLUMN_PACKAGE_NAME: &str = "package_name";
pub const COLUMN_LOGO: &str = "logo";
pub const COLUMN_CHANNEL_ID: &str = "channel_id";
pub const COLUMN_INPUT_ID: &str = "input_id";
pub const COLUMN_BROWSABLE: &str = "browsable";
pub const COLUMN_START_TIME_UTC_MILLIS: &str = "start_time_utc_millis";
pub const COLUMN_END_TIME_UTC_MILLIS: &str = "end_time_utc_millis";
pub const COLUMN_BROADCAST_GENRE: &str = "broadcast_genre";
pub const COLUMN_CANONICAL_GENRE: &str = "canonical_genre";
pub const COLUMN_VIDEO_RESOLUTION: &str = "video_resolution";
pub const COLUMN_WATCH_START_TIME_UTC_MILLIS: &str = "watch_start_time_utc_millis";

const CHANNEL_COLUMNS: &[&str] = &[
    COLUMN_ID,
    COLUMN_PACKAGE_NAME,
    COLUMN_INPUT_ID,
    "type",
    "service_type",
    "original_network_id",
    "transport_stream_id",
    "service_id",
    "display_number",
    "display_name",
    "description",
    COLUMN_BROWSABLE,
    "searchable",
    "internal_provider_data",
    "version_number",
];

const PROGRAM_COLUMNS_V14: &[&str] = &[
    COLUMN_ID,
    COLUMN_PACKAGE_NAME,
    COLUMN_CHANNEL_ID,
    "title",
    "season_number",
    "episode_number",
    "episode_title",
    COLUMN_START_TIME_UTC_MILLIS,
    COLUMN_END_TIME_UTC_MILLIS,
    COLUMN_BROADCAST_GENRE,
    COLUMN_CANONICAL_GENRE,
    "short_description",
    "long_description",
    "content_rating",
    "poster_art_uri",
    "thumbnail_uri",
    "internal_provider_data",
    "version_number",
];

const PROGRAM_COLUMNS_V15: &[&str] = &[
    COLUMN_ID,
    COLUMN_PACKAGE_NAME,
    COLUMN_CHANNEL_ID,
    "title",
    "season_number",
    "episode_number",
    "episode_title",
    COLUMN_START_TIME_UTC_MILLIS,
    COLUMN_END_TIME_UTC_MILLIS,
    COLUMN_BROADCAST_GENRE,
    COLUMN_CANONICAL_GENRE,
    "short_description",
    "long_description",
    COLUMN_VIDEO_RESOLUTION,
    "content_rating",
    "poster_art_uri",
    "thumbnail_uri",
    "internal_provider_data",
    "version_number",
];

const WATCHED_PROGRAM_COLUMNS: &[&str] = &[
    COLUMN_ID,
    COLUMN_PACKAGE_NAME,
    COLUMN_WATCH_START_TIME_UTC_MILLIS,
    "watch_end_time_utc_millis",
    COLUMN_CHANNEL_ID,
    "title",
    COLUMN_START_TIME_UTC_MILLIS,
    COLUMN_END_TIME_UTC_MILLIS,
    "description",
    "tune_params",
];

/// Physical tables of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Channels,
    Programs,
    WatchedPrograms,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Channels => "channels",
            Table::Programs => "programs",
            Table::WatchedPrograms => "watched_programs",
        }
    }

    /// Columns a generic query may project or sort on. The logo is only
    /// reachable through the dedicated logo path.
    pub fn columns(self, version: SchemaVersion) -> &'static [&'static str] {
        match self {
            Table::Channels => CHANNEL_COLUMNS,
            Table::Programs if version.has_video_resolution() => PROGRAM_COLUMNS_V15,
            Table::Programs => PROGRAM_COLUMNS_V14,
            Table::WatchedPrograms => WATCHED_PROGRAM_COLUMNS,
        }
    }

    pub fn has_column(self, version: SchemaVersion, column: &str) -> bool {
        self.columns(version).contains(&column)
    }

    pub fn default_sort_order(self) -> &'static str {
        match self {
            Table::Channels => "display_number ASC",
            Table::Programs => "start_time_utc_millis ASC",
            Table::WatchedPrograms => "watch_start_time_utc_millis DESC",
        }
    }

    pub fn collection_uri(self) -> ResourceUri {
        match self {
            Table::Channels => ResourceUri::channels(),
            Table::Programs => ResourceUri::programs(),
            Table::WatchedPrograms => ResourceUri::watched_programs(),
        }
    }

    pub fn item_uri(self, id: i64) -> ResourceUri {
        match self {
            Table::Channels => ResourceUri::channel(id),
            Table::Programs => ResourceUri::program(id),
            Table::WatchedPrograms => ResourceUri::watched_program(id),
        }
    }

    /// Qualified column reference, e.g. `channels._id`.
    pub fn column(self, column: &str) -> String {
        format!("{}.{}", self.name(), column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_resolution_only_in_v15() {
        assert!(Table::Programs.has_column(SchemaVersion::V15, COLUMN_VIDEO_RESOLUTION));
        assert!(!Table::Programs.has_column(SchemaVersion::V14, COLUMN_VIDEO_RESOLUTION));
    }

    #[test]
    fn test_logo_is_not_a_generic_column() {
        assert!(!Table::Channels.has_column(SchemaVersion::V15, COLUMN_LOGO));
    }

    #[test]
    fn test_table_names_match_strum() {
        assert_eq!(Table::WatchedPrograms.to_string(), Table::WatchedPrograms.name());
        assert_eq!("programs".parse::<Table>().unwrap(), Table::Programs);
    }
}
