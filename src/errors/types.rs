//! Error type definitions for the TV metadata store
//!
//! The hierarchy mirrors how failures reach a caller: malformed requests are
//! rejected before storage is touched, storage failures bubble up from sqlx,
//! and logo ingestion has its own asynchronous failure channel.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Caller-correctable request errors, raised before any storage access
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Errors reported back through a logo writer
    #[error("Logo error: {0}")]
    Logo(#[from] LogoError),

    /// Bundled genre mapping tables could not be loaded
    #[error("Genre mapping error: {0}")]
    GenreMapping(#[from] GenreMappingError),

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Storage accepted the statement but produced no row
    #[error("Failed to insert row into {uri}")]
    WriteFailed { uri: String },

    /// One operation of a batch failed; the whole batch was rolled back
    #[error("Batch operation {index} failed: {source}")]
    BatchOperationFailed {
        index: usize,
        source: Box<AppError>,
    },

    /// The sequence already failed and refuses further work
    #[error("Atomic sequence was aborted by an earlier failure")]
    SequenceAborted,

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Malformed request errors
///
/// All of these are detected while routing or composing predicates, so a
/// request that fails with one of them never reaches the database.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Identifier does not match any known shape for the configured schema
    #[error("Unknown URI: {uri}")]
    UnknownResource { uri: String },

    /// Shape exists but does not accept this operation
    #[error("{operation} not supported for {uri}")]
    UnsupportedOperation { operation: String, uri: String },

    /// Caller filter supplied while ownership scoping is active
    #[error("Selection not allowed for {uri}")]
    SelectionNotAllowed { uri: String },

    /// Caller sort order supplied while ownership scoping is active
    #[error("Sort order not allowed for {uri}")]
    SortOrderNotAllowed { uri: String },

    /// Genre filtering is only available to queries
    #[error("{operation} not allowed for {uri}")]
    GenreFilterNotAllowed { operation: String, uri: String },

    #[error("Not a canonical genre: {genre}")]
    NotCanonicalGenre { genre: String },

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: String, value: String },

    #[error("Unknown column {column} for table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("Invalid sort order: {sort_order}")]
    InvalidSortOrder { sort_order: String },

    /// Update with nothing left to write after stripping protected columns
    #[error("No values to update for {uri}")]
    EmptyValues { uri: String },

    #[error("Back reference to operation {index} is not available at operation {at}")]
    InvalidBackReference { index: usize, at: usize },
}

/// Errors surfaced to the writer of a logo stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogoError {
    /// No row matched the channel id within the caller's ownership scope
    #[error("Failed to write logo for channel {channel_id}")]
    ChannelNotWritable { channel_id: i64 },

    /// Persisting the transformed image failed in storage
    #[error("Failed to store logo for channel {channel_id}: {message}")]
    Storage { channel_id: i64, message: String },

    /// The background ingestion job is gone and no longer accepts bytes
    #[error("Logo pipe closed")]
    PipeClosed,
}

/// Errors raised while building the genre lookup table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenreMappingError {
    #[error("Missing genre mapping table: {table}")]
    MissingTable { table: String },

    #[error("Genre mapping table {table} is not valid UTF-8")]
    InvalidEncoding { table: String },

    #[error("Invalid genre mapping in {table} at line {line}: {content}")]
    InvalidMapping {
        table: String,
        line: usize,
        content: String,
    },
}

impl AppError {
    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a write failure for the given identifier
    pub fn write_failed<S: Into<String>>(uri: S) -> Self {
        Self::WriteFailed { uri: uri.into() }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a failure of batch operation `index`
    pub fn batch_operation(index: usize, source: AppError) -> Self {
        Self::BatchOperationFailed {
            index,
            source: Box::new(source),
        }
    }

    /// Whether this error (or the batch failure it wraps) is a malformed request
    pub fn is_request_error(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::BatchOperationFailed { source, .. } => source.is_request_error(),
            _ => false,
        }
    }
}

impl RequestError {
    pub fn unknown_resource<S: ToString>(uri: S) -> Self {
        Self::UnknownResource {
            uri: uri.to_string(),
        }
    }

    pub fn unsupported<O: ToString, S: ToString>(operation: O, uri: S) -> Self {
        Self::UnsupportedOperation {
            operation: operation.to_string(),
            uri: uri.to_string(),
        }
    }

    pub fn selection_not_allowed<S: ToString>(uri: S) -> Self {
        Self::SelectionNotAllowed {
            uri: uri.to_string(),
        }
    }

    pub fn invalid_parameter<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn unknown_column<T: Into<String>, C: Into<String>>(table: T, column: C) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}
