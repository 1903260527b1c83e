//! Public resource contract: identifiers, tables and column names
//!
//! Every row in the store is addressed through a [`ResourceUri`] of the form
//! `content://tvstore/<path>?<query>`. The helpers here build the identifiers
//! clients use; [`crate::routing`] is the only place that interprets them.

pub mod columns;

pub use columns::Table;

use crate::errors::RequestError;
use std::fmt;
use std::str::FromStr;

pub const SCHEME: &str = "content";
pub const AUTHORITY: &str = "tvstore";

pub const PARAM_START_TIME: &str = "startTime";
pub const PARAM_END_TIME: &str = "endTime";
pub const PARAM_CANONICAL_GENRE: &str = "canonicalGenre";
pub const PARAM_BROWSABLE_ONLY: &str = "browsableOnly";

pub const PATH_CHANNEL: &str = "channel";
pub const PATH_PROGRAM: &str = "program";
pub const PATH_WATCHED_PROGRAM: &str = "watched_program";
pub const PATH_INPUT: &str = "input";
pub const PATH_LOGO: &str = "logo";
pub const PATH_PASSTHROUGH: &str = "passthrough";

/// A structured resource identifier: authority, decoded path segments and
/// query parameters in the order they were given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceUri {
    authority: String,
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl ResourceUri {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authority: AUTHORITY.to_string(),
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, RequestError> {
        let url = url::Url::parse(input).map_err(|_| RequestError::unknown_resource(input))?;
        if url.scheme() != SCHEME {
            return Err(RequestError::unknown_resource(input));
        }
        let authority = url
            .host_str()
            .ok_or_else(|| RequestError::unknown_resource(input))?
            .to_string();

        let mut segments = Vec::new();
        if let Some(parts) = url.path_segments() {
            for part in parts.filter(|p| !p.is_empty()) {
                let decoded =
                    urlencoding::decode(part).map_err(|_| RequestError::unknown_resource(input))?;
                segments.push(decoded.into_owned());
            }
        }

        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Self {
            authority,
            segments,
            query,
        })
    }

    pub fn channels() -> Self {
        Self::new([PATH_CHANNEL])
    }

    pub fn channel(id: i64) -> Self {
        Self::new([PATH_CHANNEL.to_string(), id.to_string()])
    }

    pub fn channel_logo(id: i64) -> Self {
        Self::new([PATH_CHANNEL.to_string(), id.to_string(), PATH_LOGO.to_string()])
    }

    pub fn channel_programs(id: i64) -> Self {
        Self::new([PATH_CHANNEL.to_string(), id.to_string(), PATH_PROGRAM.to_string()])
    }

    pub fn input_channels(input_id: &str) -> Self {
        Self::new([PATH_INPUT, input_id, PATH_CHANNEL])
    }

    pub fn input_channels_passthrough(input_id: &str) -> Self {
        Self::new([PATH_INPUT, input_id, PATH_CHANNEL, PATH_PASSTHROUGH])
    }

    pub fn programs() -> Self {
        Self::new([PATH_PROGRAM])
    }

    pub fn program(id: i64) -> Self {
        Self::new([PATH_PROGRAM.to_string(), id.to_string()])
    }

    pub fn watched_programs() -> Self {
        Self::new([PATH_WATCHED_PROGRAM])
    }

    pub fn watched_program(id: i64) -> Self {
        Self::new([PATH_WATCHED_PROGRAM.to_string(), id.to_string()])
    }

    pub fn with_query_parameter(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn with_time_window(self, start_ms: i64, end_ms: i64) -> Self {
        self.with_query_parameter(PARAM_START_TIME, start_ms)
            .with_query_parameter(PARAM_END_TIME, end_ms)
    }

    pub fn with_canonical_genre(self, genre: impl ToString) -> Self {
        self.with_query_parameter(PARAM_CANONICAL_GENRE, genre)
    }

    pub fn with_browsable_only(self, browsable_only: bool) -> Self {
        self.with_query_parameter(PARAM_BROWSABLE_ONLY, browsable_only)
    }

    /// First value of a query parameter.
    pub fn query_parameter(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn has_query(&self) -> bool {
        !self.query.is_empty()
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}://{}", self.authority)?;
        for segment in &self.segments {
            write!(f, "/{}", urlencoding::encode(segment))?;
        }
        for (index, (name, value)) in self.query.iter().enumerate() {
            let separator = if index == 0 { '?' } else { '&' };
            write!(
                f,
                "{separator}{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            )?;
        }
        Ok(())
    }
}

impl FromStr for ResourceUri {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_render_expected_paths() {
        assert_eq!(ResourceUri::channels().to_string(), "content://tvstore/channel");
        assert_eq!(
            ResourceUri::channel_logo(7).to_string(),
            "content://tvstore/channel/7/logo"
        );
        assert_eq!(
            ResourceUri::channel_programs(3)
                .with_time_window(100, 200)
                .to_string(),
            "content://tvstore/channel/3/program?startTime=100&endTime=200"
        );
    }

    #[test]
    fn test_parse_decodes_segments_and_query() {
        let raw = "content://tvstore/input/com.example%2Ftuner/channel?canonicalGenre=NEWS";
        let uri: ResourceUri = raw.parse().unwrap();
        assert_eq!(uri.authority(), AUTHORITY);
        assert_eq!(uri.segments(), ["input", "com.example/tuner", "channel"]);
        assert_eq!(uri.query_parameter(PARAM_CANONICAL_GENRE), Some("NEWS"));
        assert_eq!(
            uri,
            ResourceUri::input_channels("com.example/tuner").with_canonical_genre("NEWS")
        );
    }

    #[test]
    fn test_display_round_trips() {
        let uri = ResourceUri::input_channels("a b").with_browsable_only(false);
        let parsed = ResourceUri::parse(&uri.to_string()).unwrap();
        assert_eq!(parsed, uri);
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(ResourceUri::parse("http://tvstore/channel").is_err());
        assert!(ResourceUri::parse("not a uri").is_err());
    }
}
