//! Predicate composition
//!
//! Turns a routed request into the tables to touch and one compound `WHERE`
//! clause with positional arguments. Clauses are combined in a fixed order:
//! owner scope, the shape's structural filter, the genre join filter, and
//! finally whatever filter the caller supplied.

use super::{OperationKind, Route, Routed};
use crate::caller::Caller;
use crate::contract::columns::{
    COLUMN_BROWSABLE, COLUMN_CANONICAL_GENRE, COLUMN_CHANNEL_ID, COLUMN_END_TIME_UTC_MILLIS,
    COLUMN_ID, COLUMN_INPUT_ID, COLUMN_PACKAGE_NAME, COLUMN_START_TIME_UTC_MILLIS,
};
use crate::contract::Table;
use crate::errors::{RequestError, RequestResult};
use crate::genres::GenreNormalizer;
use crate::values::SqlValue;
use std::sync::Arc;
use tracing::trace;

/// Caller-supplied filter: a SQL expression with `?` placeholders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub clause: Option<String>,
    pub args: Vec<SqlValue>,
}

impl Selection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(clause: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            clause: Some(clause.into()),
            args,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clause.as_deref().map_or(true, |c| c.trim().is_empty())
    }
}

/// Target tables plus the composed filter
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParams {
    pub table: Table,
    /// Channels joined with programs for genre filtering
    pub joined_programs: bool,
    pub clauses: Vec<String>,
    pub args: Vec<SqlValue>,
}

impl SqlParams {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            joined_programs: false,
            clauses: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn append_where(
        &mut self,
        clause: impl Into<String>,
        args: impl IntoIterator<Item = SqlValue>,
    ) {
        self.clauses.push(clause.into());
        self.args.extend(args);
    }

    /// `FROM` target
    pub fn tables(&self) -> String {
        if self.joined_programs {
            format!(
                "{} INNER JOIN {} ON ({} = {})",
                Table::Channels.name(),
                Table::Programs.name(),
                Table::Channels.column(COLUMN_ID),
                Table::Programs.column(COLUMN_CHANNEL_ID)
            )
        } else {
            self.table.name().to_string()
        }
    }

    /// Combined filter, each clause parenthesized, or `None` when unfiltered.
    pub fn selection(&self) -> Option<String> {
        if self.clauses.is_empty() {
            return None;
        }
        Some(
            self.clauses
                .iter()
                .map(|c| format!("({c})"))
                .collect::<Vec<_>>()
                .join(" AND "),
        )
    }

    /// ` WHERE ...` suffix, or an empty string.
    pub fn where_sql(&self) -> String {
        self.selection()
            .map(|s| format!(" WHERE {s}"))
            .unwrap_or_default()
    }
}

/// Builds [`SqlParams`] for query, update and delete requests
#[derive(Debug, Clone)]
pub struct PredicateComposer {
    genres: Arc<GenreNormalizer>,
}

impl PredicateComposer {
    pub fn new(genres: Arc<GenreNormalizer>) -> Self {
        Self { genres }
    }

    pub fn genres(&self) -> &Arc<GenreNormalizer> {
        &self.genres
    }

    /// Whether rows must be limited to the caller's own.
    pub fn is_owner_scoped(route: &Route, caller: &Caller) -> bool {
        !route.honors_full_access() || !caller.full_epg_access
    }

    pub fn compose(
        &self,
        kind: OperationKind,
        routed: &Routed,
        caller: &Caller,
        selection: &Selection,
        now_ms: i64,
    ) -> RequestResult<SqlParams> {
        routed.check_operation(kind)?;

        let table = routed.route.table();
        let mut params = SqlParams::new(table);

        if Self::is_owner_scoped(&routed.route, caller) {
            if !selection.is_empty() {
                return Err(RequestError::selection_not_allowed(&routed.uri));
            }
            params.append_where(
                format!("{} = ?", table.column(COLUMN_PACKAGE_NAME)),
                [SqlValue::from(caller.package_name.as_str())],
            );
        }

        match &routed.route {
            Route::Channels => {
                self.apply_genre(kind, routed, &mut params, now_ms)?;
            }
            Route::Channel(id) | Route::Program(id) | Route::WatchedProgram(id) => {
                params.append_where(
                    format!("{} = ?", table.column(COLUMN_ID)),
                    [SqlValue::from(*id)],
                );
            }
            Route::ChannelPrograms(channel_id) => match routed.params.time_window {
                Some(window) => params.append_where(
                    format!(
                        "{} = ? AND {} < ? AND {} > ?",
                        table.column(COLUMN_CHANNEL_ID),
                        table.column(COLUMN_START_TIME_UTC_MILLIS),
                        table.column(COLUMN_END_TIME_UTC_MILLIS)
                    ),
                    [
                        SqlValue::from(*channel_id),
                        SqlValue::from(window.end_ms),
                        SqlValue::from(window.start_ms),
                    ],
                ),
                None => params.append_where(
                    format!("{} = ?", table.column(COLUMN_CHANNEL_ID)),
                    [SqlValue::from(*channel_id)],
                ),
            },
            Route::InputChannels(input_id) => {
                self.apply_genre(kind, routed, &mut params, now_ms)?;
                params.append_where(
                    format!("{} = ?", Table::Channels.column(COLUMN_INPUT_ID)),
                    [SqlValue::from(input_id.as_str())],
                );
                if routed.params.browsable_only {
                    params.append_where(
                        format!("{} = 1", Table::Channels.column(COLUMN_BROWSABLE)),
                        [],
                    );
                }
            }
            Route::Programs | Route::WatchedPrograms => {}
            // Rejected by check_operation above
            Route::ChannelLogo(_) | Route::InputChannelsPassthrough(_) => {
                return Err(RequestError::unsupported(kind, &routed.uri));
            }
        }

        if let Some(clause) = selection.clause.as_deref().filter(|c| !c.trim().is_empty()) {
            params.append_where(clause, selection.args.iter().cloned());
        }

        trace!(
            "Composed {} for {}: {:?} {:?}",
            kind,
            routed.uri,
            params.selection(),
            params.args
        );
        Ok(params)
    }

    /// Switch to the channel/program join when a canonical genre is requested.
    /// Only programs airing at `now_ms` count.
    fn apply_genre(
        &self,
        kind: OperationKind,
        routed: &Routed,
        params: &mut SqlParams,
        now_ms: i64,
    ) -> RequestResult<()> {
        let Some(genre) = routed.params.canonical_genre.as_deref() else {
            return Ok(());
        };
        if !kind.is_query() {
            return Err(RequestError::GenreFilterNotAllowed {
                operation: kind.capitalized().to_string(),
                uri: routed.uri.to_string(),
            });
        }
        if !self.genres.is_canonical(genre) {
            return Err(RequestError::NotCanonicalGenre {
                genre: genre.to_string(),
            });
        }

        params.joined_programs = true;
        params.append_where(
            format!(
                "{} LIKE ? AND {} < ? AND {} > ?",
                Table::Programs.column(COLUMN_CANONICAL_GENRE),
                Table::Programs.column(COLUMN_START_TIME_UTC_MILLIS),
                Table::Programs.column(COLUMN_END_TIME_UTC_MILLIS)
            ),
            [
                SqlValue::from(format!("%{genre}%")),
                SqlValue::from(now_ms),
                SqlValue::from(now_ms),
            ],
        );
        Ok(())
    }
}
