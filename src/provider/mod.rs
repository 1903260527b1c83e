//! The store facade
//!
//! [`TvStore`] is what applications talk to. Every request is routed,
//! composed into SQL and run against the reader pool (queries) or the single
//! writer connection (everything else). Successful writes report the changed
//! identifiers to the configured [`ChangeNotifier`].

pub mod batch;
pub mod query;
mod writes;

pub use batch::{AtomicSequence, BatchOperation, OperationResult};
pub use query::QueryRequest;

use crate::caller::Caller;
use crate::config::Config;
use crate::contract::columns::{COLUMN_ID, COLUMN_LOGO, COLUMN_PACKAGE_NAME};
use crate::contract::{ResourceUri, Table};
use crate::database::schema::SchemaVersion;
use crate::database::Database;
use crate::errors::{AppError, AppResult, RequestError};
use crate::genres::GenreNormalizer;
use crate::logo_assets::{LogoPipeline, LogoWriter};
use crate::models::now_millis;
use crate::notifications::ChangeNotifier;
use crate::routing::{OperationKind, PredicateComposer, Route, Router, Routed, Selection};
use crate::services::epg_cleanup::{CleanupReport, EpgDataCleanup};
use crate::values::{to_arguments, ContentValues, Record, SqlValue};
use bytes::Bytes;
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use std::sync::Arc;
use tracing::{debug, info};

/// Source of "now" in UTC milliseconds, used for currently-airing filters
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Clone)]
pub struct TvStore {
    db: Database,
    router: Router,
    composer: PredicateComposer,
    genres: Arc<GenreNormalizer>,
    notifier: Arc<dyn ChangeNotifier>,
    logos: LogoPipeline,
    config: Config,
    clock: Clock,
}

impl TvStore {
    /// Connect, migrate and build the shared genre table.
    pub async fn open(config: Config, notifier: Arc<dyn ChangeNotifier>) -> AppResult<Self> {
        let genres = GenreNormalizer::shared()?;
        let db = Database::connect(&config).await?;
        let outcome = db.migrate().await?;
        info!("Store ready at schema {} ({:?})", db.version(), outcome);

        let logos = LogoPipeline::new(db.clone(), Arc::clone(&notifier), config.logo.clone());
        Ok(Self {
            router: Router::new(db.version()),
            composer: PredicateComposer::new(Arc::clone(&genres)),
            genres,
            notifier,
            logos,
            db,
            config,
            clock: Arc::new(now_millis),
        })
    }

    /// Replace the wall clock, e.g. to pin "currently airing" in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn schema_version(&self) -> SchemaVersion {
        self.router.version()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn now_ms(&self) -> i64 {
        (self.clock)()
    }

    pub fn content_type(&self, uri: &ResourceUri) -> AppResult<&'static str> {
        Ok(self.router.content_type(uri)?)
    }

    /// Generic query returning loosely typed rows.
    pub async fn query(
        &self,
        caller: &Caller,
        uri: &ResourceUri,
        request: &QueryRequest,
    ) -> AppResult<Vec<Record>> {
        let (sql, args) = self.prepare_query(caller, uri, request)?;
        let rows = sqlx::query_with(&sql, to_arguments(&args))
            .fetch_all(self.db.reader())
            .await?;
        rows.iter()
            .map(|row| ContentValues::from_row(row).map_err(AppError::from))
            .collect()
    }

    /// Generic query decoding into a model type. The projection must cover
    /// every field of `T`; the default projection does.
    pub async fn query_as<T>(
        &self,
        caller: &Caller,
        uri: &ResourceUri,
        request: &QueryRequest,
    ) -> AppResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let (sql, args) = self.prepare_query(caller, uri, request)?;
        Ok(sqlx::query_as_with::<_, T, _>(&sql, to_arguments(&args))
            .fetch_all(self.db.reader())
            .await?)
    }

    fn prepare_query(
        &self,
        caller: &Caller,
        uri: &ResourceUri,
        request: &QueryRequest,
    ) -> AppResult<(String, Vec<SqlValue>)> {
        let routed = self.router.route(uri)?;
        let params = self.composer.compose(
            OperationKind::Query,
            &routed,
            caller,
            &request.selection,
            self.now_ms(),
        )?;
        let scoped = PredicateComposer::is_owner_scoped(&routed.route, caller);
        let sql = query::build_select(&params, self.router.version(), request, scoped, uri)?;
        debug!("Query {}: {}", uri, sql);
        Ok((sql, params.args))
    }

    /// Insert one row into a collection root; returns the new item's identifier.
    pub async fn insert(
        &self,
        caller: &Caller,
        uri: &ResourceUri,
        values: ContentValues,
    ) -> AppResult<ResourceUri> {
        let mut conn = self.db.writer().acquire().await?;
        let (item, _) = self.insert_on(&mut conn, caller, uri, values, None).await?;
        Ok(item)
    }

    pub async fn update(
        &self,
        caller: &Caller,
        uri: &ResourceUri,
        values: ContentValues,
        selection: &Selection,
    ) -> AppResult<u64> {
        let mut conn = self.db.writer().acquire().await?;
        self.update_on(&mut conn, caller, uri, values, selection, None)
            .await
    }

    pub async fn delete(
        &self,
        caller: &Caller,
        uri: &ResourceUri,
        selection: &Selection,
    ) -> AppResult<u64> {
        let mut conn = self.db.writer().acquire().await?;
        self.delete_on(&mut conn, caller, uri, selection, None).await
    }

    /// Start an atomic sequence. It holds the writer connection until it is
    /// committed or dropped, so the same task must not issue standalone
    /// writes while a sequence is open.
    pub async fn begin_sequence(&self, caller: &Caller) -> AppResult<AtomicSequence<'_>> {
        AtomicSequence::begin(self, caller.clone()).await
    }

    /// Run `operations` as one transaction; all or nothing.
    pub async fn apply_batch(
        &self,
        caller: &Caller,
        operations: Vec<BatchOperation>,
    ) -> AppResult<Vec<OperationResult>> {
        let mut sequence = self.begin_sequence(caller).await?;
        for operation in operations {
            sequence.execute(operation).await?;
        }
        sequence.commit().await
    }

    /// Stored logo bytes for `channel/{id}/logo`.
    pub async fn read_logo(&self, caller: &Caller, uri: &ResourceUri) -> AppResult<Bytes> {
        let (channel_id, owner) = self.logo_target(caller, uri)?;

        let mut sql = format!(
            "SELECT {COLUMN_LOGO} FROM {} WHERE {COLUMN_ID} = ?",
            Table::Channels.name()
        );
        let mut args = vec![SqlValue::from(channel_id)];
        if let Some(owner) = owner {
            sql.push_str(&format!(" AND {COLUMN_PACKAGE_NAME} = ?"));
            args.push(SqlValue::from(owner));
        }

        let logo: Option<Option<Vec<u8>>> = sqlx::query_scalar_with(&sql, to_arguments(&args))
            .fetch_optional(self.db.reader())
            .await?;
        match logo {
            Some(Some(bytes)) => Ok(Bytes::from(bytes)),
            _ => Err(AppError::not_found("channel logo", channel_id.to_string())),
        }
    }

    /// Open a writer for `channel/{id}/logo`. Returns immediately; the image
    /// is decoded, scaled and stored in the background.
    pub fn write_logo(&self, caller: &Caller, uri: &ResourceUri) -> AppResult<LogoWriter> {
        let (channel_id, owner) = self.logo_target(caller, uri)?;
        Ok(self.logos.open_writer(channel_id, owner))
    }

    fn logo_target(&self, caller: &Caller, uri: &ResourceUri) -> AppResult<(i64, Option<String>)> {
        let Routed { route, .. } = self.router.route(uri)?;
        let Route::ChannelLogo(channel_id) = &route else {
            return Err(RequestError::unsupported("logo access", uri).into());
        };
        let owner = PredicateComposer::is_owner_scoped(&route, caller)
            .then(|| caller.package_name.clone());
        Ok((*channel_id, owner))
    }

    /// Run the EPG maintenance routine once.
    pub async fn cleanup(&self) -> AppResult<CleanupReport> {
        EpgDataCleanup::new(
            self.db.clone(),
            Arc::clone(&self.notifier),
            self.config.cleanup.clone(),
        )
        .run(self.now_ms())
        .await
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
