//! Insert, update and delete against an explicit connection
//!
//! The connection is either a standalone writer connection or the
//! transaction of an atomic sequence. `changes` is `None` outside a sequence,
//! in which case a successful write notifies immediately.

use super::TvStore;
use crate::caller::Caller;
use crate::contract::columns::{COLUMN_LOGO, COLUMN_PACKAGE_NAME};
use crate::contract::{ResourceUri, Table};
use crate::errors::{AppError, AppResult, RequestError, RequestResult};
use crate::notifications::{record_change, ChangeSet};
use crate::routing::{OperationKind, Selection};
use crate::values::{to_arguments, ContentValues, SqlValue};
use sqlx::SqliteConnection;
use tracing::debug;

impl TvStore {
    pub(crate) async fn insert_on(
        &self,
        conn: &mut SqliteConnection,
        caller: &Caller,
        uri: &ResourceUri,
        mut values: ContentValues,
        changes: Option<&mut ChangeSet>,
    ) -> AppResult<(ResourceUri, i64)> {
        let routed = self.router.route(uri)?;
        routed.check_operation(OperationKind::Insert)?;
        if routed.params.canonical_genre.is_some() {
            return Err(RequestError::GenreFilterNotAllowed {
                operation: OperationKind::Insert.capitalized().to_string(),
                uri: uri.to_string(),
            }
            .into());
        }
        let table = routed.route.table();

        self.validate_columns(table, &values)?;
        values.put(COLUMN_PACKAGE_NAME, caller.package_name.as_str());
        if table == Table::Programs {
            self.genres.normalize_program_values(&mut values);
        }

        let columns: Vec<&str> = values.columns().collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            columns.join(", "),
            placeholders
        );
        let args: Vec<SqlValue> = values.iter().map(|(_, v)| v.clone()).collect();

        debug!("Insert {}: {}", uri, sql);
        let result = sqlx::query_with(&sql, to_arguments(&args))
            .execute(&mut *conn)
            .await?;

        let row_id = result.last_insert_rowid();
        if result.rows_affected() == 0 || row_id <= 0 {
            return Err(AppError::write_failed(uri.to_string()));
        }

        let item = table.item_uri(row_id);
        record_change(changes, self.notifier.as_ref(), item.clone());
        Ok((item, row_id))
    }

    pub(crate) async fn update_on(
        &self,
        conn: &mut SqliteConnection,
        caller: &Caller,
        uri: &ResourceUri,
        mut values: ContentValues,
        selection: &Selection,
        changes: Option<&mut ChangeSet>,
    ) -> AppResult<u64> {
        let routed = self.router.route(uri)?;
        let params = self.composer.compose(
            OperationKind::Update,
            &routed,
            caller,
            selection,
            self.now_ms(),
        )?;
        let table = params.table;

        // The owner column is never caller-writable
        values.remove(COLUMN_PACKAGE_NAME);
        self.validate_columns(table, &values)?;
        if table == Table::Programs {
            self.genres.normalize_program_values(&mut values);
        }
        if values.is_empty() {
            return Err(RequestError::EmptyValues {
                uri: uri.to_string(),
            }
            .into());
        }

        let assignments = values
            .columns()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {}{}",
            params.tables(),
            assignments,
            params.where_sql()
        );
        let mut args: Vec<SqlValue> = values.iter().map(|(_, v)| v.clone()).collect();
        args.extend(params.args.iter().cloned());

        debug!("Update {}: {}", uri, sql);
        let count = sqlx::query_with(&sql, to_arguments(&args))
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if count > 0 {
            record_change(changes, self.notifier.as_ref(), uri.clone());
        }
        Ok(count)
    }

    pub(crate) async fn delete_on(
        &self,
        conn: &mut SqliteConnection,
        caller: &Caller,
        uri: &ResourceUri,
        selection: &Selection,
        changes: Option<&mut ChangeSet>,
    ) -> AppResult<u64> {
        let routed = self.router.route(uri)?;
        let params = self.composer.compose(
            OperationKind::Delete,
            &routed,
            caller,
            selection,
            self.now_ms(),
        )?;

        let sql = format!("DELETE FROM {}{}", params.tables(), params.where_sql());
        debug!("Delete {}: {}", uri, sql);
        let count = sqlx::query_with(&sql, to_arguments(&params.args))
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if count > 0 {
            record_change(changes, self.notifier.as_ref(), uri.clone());
        }
        Ok(count)
    }

    /// Every written column must be a known column of `table`. The logo
    /// column is only written by the logo pipeline.
    fn validate_columns(&self, table: Table, values: &ContentValues) -> RequestResult<()> {
        let version = self.router.version();
        for column in values.columns() {
            if column == COLUMN_LOGO || !table.has_column(version, column) {
                return Err(RequestError::unknown_column(table.name(), column));
            }
        }
        Ok(())
    }
}
