//! Resource routing
//!
//! Classifies a [`ResourceUri`] into one of a fixed set of [`Route`]s. The set
//! of accepted shapes depends on the schema generation and is fixed when the
//! [`Router`] is built.

pub mod predicate;

pub use predicate::{PredicateComposer, Selection, SqlParams};

use crate::contract::{
    ResourceUri, Table, AUTHORITY, PARAM_BROWSABLE_ONLY, PARAM_CANONICAL_GENRE, PARAM_END_TIME,
    PARAM_START_TIME, PATH_CHANNEL, PATH_INPUT, PATH_LOGO, PATH_PASSTHROUGH, PATH_PROGRAM,
    PATH_WATCHED_PROGRAM,
};
use crate::database::schema::SchemaVersion;
use crate::errors::{RequestError, RequestResult};
use strum::{AsRefStr, Display};
use tracing::trace;

pub const CONTENT_TYPE_CHANNEL_DIR: &str = "vnd.tvstore.dir/channel";
pub const CONTENT_TYPE_CHANNEL_ITEM: &str = "vnd.tvstore.item/channel";
pub const CONTENT_TYPE_PROGRAM_DIR: &str = "vnd.tvstore.dir/program";
pub const CONTENT_TYPE_PROGRAM_ITEM: &str = "vnd.tvstore.item/program";
pub const CONTENT_TYPE_WATCHED_PROGRAM_DIR: &str = "vnd.tvstore.dir/watched_program";
pub const CONTENT_TYPE_WATCHED_PROGRAM_ITEM: &str = "vnd.tvstore.item/watched_program";
pub const CONTENT_TYPE_LOGO: &str = "image/png";

/// Generic operations a request can perform on a routed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Query,
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub fn is_query(self) -> bool {
        self == OperationKind::Query
    }

    /// Operation name with a leading capital, for error messages
    pub fn capitalized(self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Insert => "Insert",
            OperationKind::Update => "Update",
            OperationKind::Delete => "Delete",
        }
    }
}

/// Recognized resource shapes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Channels,
    Channel(i64),
    ChannelLogo(i64),
    ChannelPrograms(i64),
    InputChannels(String),
    InputChannelsPassthrough(String),
    Programs,
    Program(i64),
    WatchedPrograms,
    WatchedProgram(i64),
}

impl Route {
    /// Table the shape reads from, before any genre join.
    pub fn table(&self) -> Table {
        match self {
            Route::Channels
            | Route::Channel(_)
            | Route::ChannelLogo(_)
            | Route::InputChannels(_)
            | Route::InputChannelsPassthrough(_) => Table::Channels,
            Route::ChannelPrograms(_) | Route::Programs | Route::Program(_) => Table::Programs,
            Route::WatchedPrograms | Route::WatchedProgram(_) => Table::WatchedPrograms,
        }
    }

    /// Collection roots are the only insert targets.
    pub fn is_collection_root(&self) -> bool {
        matches!(
            self,
            Route::Channels | Route::Programs | Route::WatchedPrograms
        )
    }

    /// Shapes served only by a dedicated path, never by generic operations.
    pub fn is_dedicated(&self) -> bool {
        matches!(
            self,
            Route::ChannelLogo(_) | Route::InputChannelsPassthrough(_)
        )
    }

    /// Whether the caller's broad-access grant can lift owner scoping. The
    /// watch log is always scoped to its writer.
    pub fn honors_full_access(&self) -> bool {
        self.table() != Table::WatchedPrograms
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Route::Channels | Route::InputChannels(_) => CONTENT_TYPE_CHANNEL_DIR,
            Route::Channel(_) | Route::InputChannelsPassthrough(_) => CONTENT_TYPE_CHANNEL_ITEM,
            Route::ChannelLogo(_) => CONTENT_TYPE_LOGO,
            Route::ChannelPrograms(_) | Route::Programs => CONTENT_TYPE_PROGRAM_DIR,
            Route::Program(_) => CONTENT_TYPE_PROGRAM_ITEM,
            Route::WatchedPrograms => CONTENT_TYPE_WATCHED_PROGRAM_DIR,
            Route::WatchedProgram(_) => CONTENT_TYPE_WATCHED_PROGRAM_ITEM,
        }
    }
}

/// Half-open interval in UTC milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Query parameters that affect the shape's filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParams {
    /// Only read for the channel-programs shape
    pub time_window: Option<TimeWindow>,
    /// Only read for the channel collection and input shapes
    pub canonical_genre: Option<String>,
    /// Only read for the input shape
    pub browsable_only: bool,
}

impl Default for RouteParams {
    fn default() -> Self {
        Self {
            time_window: None,
            canonical_genre: None,
            browsable_only: true,
        }
    }
}

/// A routing decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub uri: ResourceUri,
    pub route: Route,
    pub params: RouteParams,
}

impl Routed {
    /// Reject operations the shape does not support through the generic path.
    pub fn check_operation(&self, kind: OperationKind) -> RequestResult<()> {
        let supported = match kind {
            OperationKind::Insert => self.route.is_collection_root(),
            _ => !self.route.is_dedicated(),
        };
        if supported {
            Ok(())
        } else {
            Err(RequestError::unsupported(kind, &self.uri))
        }
    }
}

/// Version-specific resource router
#[derive(Debug, Clone, Copy)]
pub struct Router {
    version: SchemaVersion,
}

impl Router {
    pub fn new(version: SchemaVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn route(&self, uri: &ResourceUri) -> RequestResult<Routed> {
        if uri.authority() != AUTHORITY {
            return Err(RequestError::unknown_resource(uri));
        }

        let segments: Vec<&str> = uri.segments().iter().map(String::as_str).collect();
        let route = match segments.as_slice() {
            [PATH_CHANNEL] => Route::Channels,
            [PATH_CHANNEL, id] => Route::Channel(parse_id(id, uri)?),
            [PATH_CHANNEL, id, PATH_LOGO] => Route::ChannelLogo(parse_id(id, uri)?),
            [PATH_CHANNEL, id, PATH_PROGRAM] => Route::ChannelPrograms(parse_id(id, uri)?),
            [PATH_INPUT, input, PATH_CHANNEL] => Route::InputChannels((*input).to_string()),
            [PATH_INPUT, input, PATH_CHANNEL, PATH_PASSTHROUGH]
                if self.version.has_passthrough_route() =>
            {
                Route::InputChannelsPassthrough((*input).to_string())
            }
            [PATH_PROGRAM] => Route::Programs,
            [PATH_PROGRAM, id] => Route::Program(parse_id(id, uri)?),
            [PATH_WATCHED_PROGRAM] => Route::WatchedPrograms,
            [PATH_WATCHED_PROGRAM, id] => Route::WatchedProgram(parse_id(id, uri)?),
            _ => return Err(RequestError::unknown_resource(uri)),
        };

        let params = parse_params(&route, uri)?;
        trace!("Routed {} to {:?}", uri, route);

        Ok(Routed {
            uri: uri.clone(),
            route,
            params,
        })
    }

    pub fn content_type(&self, uri: &ResourceUri) -> RequestResult<&'static str> {
        Ok(self.route(uri)?.route.content_type())
    }
}

/// Numeric path segment: ASCII digits only.
fn parse_id(segment: &str, uri: &ResourceUri) -> RequestResult<i64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RequestError::unknown_resource(uri));
    }
    segment
        .parse()
        .map_err(|_| RequestError::unknown_resource(uri))
}

fn parse_params(route: &Route, uri: &ResourceUri) -> RequestResult<RouteParams> {
    let mut params = RouteParams::default();

    if let Route::ChannelPrograms(_) = route {
        let start = uri.query_parameter(PARAM_START_TIME);
        let end = uri.query_parameter(PARAM_END_TIME);
        params.time_window = match (start, end) {
            (Some(start), Some(end)) => Some(TimeWindow {
                start_ms: parse_millis(PARAM_START_TIME, start)?,
                end_ms: parse_millis(PARAM_END_TIME, end)?,
            }),
            (None, None) => None,
            (Some(value), None) => {
                return Err(RequestError::invalid_parameter(
                    PARAM_END_TIME,
                    format!("missing while {PARAM_START_TIME}={value}"),
                ))
            }
            (None, Some(value)) => {
                return Err(RequestError::invalid_parameter(
                    PARAM_START_TIME,
                    format!("missing while {PARAM_END_TIME}={value}"),
                ))
            }
        };
    }

    if matches!(route, Route::Channels | Route::InputChannels(_)) {
        params.canonical_genre = uri.query_parameter(PARAM_CANONICAL_GENRE).map(str::to_string);
    }

    if let Route::InputChannels(_) = route {
        params.browsable_only = uri
            .query_parameter(PARAM_BROWSABLE_ONLY)
            .map(parse_flag)
            .unwrap_or(true);
    }

    Ok(params)
}

fn parse_millis(name: &str, value: &str) -> RequestResult<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| RequestError::invalid_parameter(name, value))
}

/// `false` and `0` (any case) are false, anything else is true.
fn parse_flag(value: &str) -> bool {
    !(value.eq_ignore_ascii_case("false") || value == "0")
}
