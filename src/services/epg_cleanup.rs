//! EPG data cleanup
//!
//! Removes programs that ended long ago and trims the watch log by age and
//! by row count. Scheduling is left to whoever embeds the store; this only
//! runs one pass.

use crate::config::CleanupConfig;
use crate::contract::columns::{
    COLUMN_END_TIME_UTC_MILLIS, COLUMN_ID, COLUMN_WATCH_START_TIME_UTC_MILLIS,
};
use crate::contract::Table;
use crate::database::Database;
use crate::errors::AppResult;
use crate::notifications::{ChangeNotifier, ChangeSet};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Rows removed by one cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub programs_deleted: u64,
    pub watched_programs_deleted: u64,
}

pub struct EpgDataCleanup {
    db: Database,
    notifier: Arc<dyn ChangeNotifier>,
    config: CleanupConfig,
}

impl EpgDataCleanup {
    pub fn new(db: Database, notifier: Arc<dyn ChangeNotifier>, config: CleanupConfig) -> Self {
        Self {
            db,
            notifier,
            config,
        }
    }

    pub async fn run(&self, now_ms: i64) -> AppResult<CleanupReport> {
        let program_cutoff = now_ms.saturating_sub(duration_ms(self.config.program_max_age));
        let watch_cutoff = now_ms.saturating_sub(duration_ms(self.config.watch_history_max_age));

        let mut transaction = self.db.writer().begin().await?;

        let programs_deleted = sqlx::query(&format!(
            "DELETE FROM {} WHERE {COLUMN_END_TIME_UTC_MILLIS} < ?",
            Table::Programs.name()
        ))
        .bind(program_cutoff)
        .execute(&mut *transaction)
        .await?
        .rows_affected();

        let expired_watches = sqlx::query(&format!(
            "DELETE FROM {} WHERE {COLUMN_WATCH_START_TIME_UTC_MILLIS} < ?",
            Table::WatchedPrograms.name()
        ))
        .bind(watch_cutoff)
        .execute(&mut *transaction)
        .await?
        .rows_affected();

        let overflow_watches = sqlx::query(&format!(
            "DELETE FROM {table} WHERE {COLUMN_ID} NOT IN (\
                SELECT {COLUMN_ID} FROM {table} \
                ORDER BY {COLUMN_WATCH_START_TIME_UTC_MILLIS} DESC LIMIT ?)",
            table = Table::WatchedPrograms.name()
        ))
        .bind(i64::from(self.config.max_watch_history_rows))
        .execute(&mut *transaction)
        .await?
        .rows_affected();

        transaction.commit().await?;

        let report = CleanupReport {
            programs_deleted,
            watched_programs_deleted: expired_watches + overflow_watches,
        };

        let mut changes = ChangeSet::new();
        if report.programs_deleted > 0 {
            changes.insert(Table::Programs.collection_uri());
        }
        if report.watched_programs_deleted > 0 {
            changes.insert(Table::WatchedPrograms.collection_uri());
        }
        changes.flush(self.notifier.as_ref());

        info!(
            "EPG cleanup removed {} programs and {} watch log entries",
            report.programs_deleted, report.watched_programs_deleted
        );
        Ok(report)
    }
}

fn duration_ms(duration: std::time::Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
