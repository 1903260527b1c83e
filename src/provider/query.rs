//! SELECT statement construction for generic queries

use crate::contract::ResourceUri;
use crate::database::schema::SchemaVersion;
use crate::errors::{RequestError, RequestResult};
use crate::routing::{Selection, SqlParams};

/// Caller options for a generic query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Columns to return; all non-logo columns when `None`
    pub projection: Option<Vec<String>>,
    pub selection: Selection,
    /// `column [ASC|DESC]` terms separated by commas
    pub sort_order: Option<String>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projection<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn sort_order(mut self, sort_order: impl Into<String>) -> Self {
        self.sort_order = Some(sort_order.into());
        self
    }

    fn has_sort_order(&self) -> bool {
        self.sort_order
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

/// Build the SELECT for composed params. Owner-scoped requests may not
/// choose their own ordering.
pub(crate) fn build_select(
    params: &SqlParams,
    version: SchemaVersion,
    request: &QueryRequest,
    owner_scoped: bool,
    uri: &ResourceUri,
) -> RequestResult<String> {
    if owner_scoped && request.has_sort_order() {
        return Err(RequestError::SortOrderNotAllowed {
            uri: uri.to_string(),
        });
    }

    let table = params.table;
    let qualify = |column: &str| {
        if params.joined_programs {
            table.column(column)
        } else {
            column.to_string()
        }
    };

    let columns: Vec<&str> = match &request.projection {
        Some(projection) if !projection.is_empty() => projection
            .iter()
            .map(|column| {
                if table.has_column(version, column) {
                    Ok(column.as_str())
                } else {
                    Err(RequestError::unknown_column(table.name(), column.as_str()))
                }
            })
            .collect::<RequestResult<_>>()?,
        _ => table.columns(version).to_vec(),
    };

    let select_list = columns
        .iter()
        .map(|column| {
            if params.joined_programs {
                format!("{} AS {}", table.column(column), column)
            } else {
                (*column).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    let sort_order = if request.has_sort_order() {
        request.sort_order.as_deref().unwrap_or_default()
    } else {
        table.default_sort_order()
    };
    let order_by = parse_sort_order(sort_order)?
        .into_iter()
        .map(|(column, direction)| {
            if table.has_column(version, column) {
                Ok(format!("{} {}", qualify(column), direction))
            } else {
                Err(RequestError::unknown_column(table.name(), column))
            }
        })
        .collect::<RequestResult<Vec<_>>>()?
        .join(", ");

    let distinct = if params.joined_programs { "DISTINCT " } else { "" };
    Ok(format!(
        "SELECT {distinct}{select_list} FROM {}{} ORDER BY {order_by}",
        params.tables(),
        params.where_sql()
    ))
}

fn parse_sort_order(sort_order: &str) -> RequestResult<Vec<(&str, &'static str)>> {
    let invalid = || RequestError::InvalidSortOrder {
        sort_order: sort_order.to_string(),
    };

    sort_order
        .split(',')
        .map(|term| {
            let mut words = term.split_whitespace();
            let column = words.next().ok_or_else(invalid)?;
            let direction = match words.next() {
                None => "ASC",
                Some(d) if d.eq_ignore_ascii_case("asc") => "ASC",
                Some(d) if d.eq_ignore_ascii_case("desc") => "DESC",
                Some(_) => return Err(invalid()),
            };
            if words.next().is_some() {
                return Err(invalid());
            }
            Ok((column, direction))
        })
        .collect()
}
