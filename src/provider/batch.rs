//! Atomic sequences of write operations
//!
//! A sequence owns one transaction on the writer connection and its own
//! [`ChangeSet`]. Nothing is visible and nobody is notified until
//! [`AtomicSequence::commit`]; the first failing operation rolls everything
//! back and poisons the sequence.

use super::TvStore;
use crate::caller::Caller;
use crate::contract::ResourceUri;
use crate::errors::{AppError, AppResult, RequestError};
use crate::notifications::ChangeSet;
use crate::routing::{OperationKind, Selection};
use crate::values::ContentValues;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, warn};

/// One write in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperation {
    kind: OperationKind,
    uri: ResourceUri,
    values: ContentValues,
    selection: Selection,
    /// (column, index of an earlier operation whose result fills the column)
    back_references: Vec<(String, usize)>,
}

impl BatchOperation {
    pub fn insert(uri: ResourceUri, values: ContentValues) -> Self {
        Self::new(OperationKind::Insert, uri, values)
    }

    pub fn update(uri: ResourceUri, values: ContentValues) -> Self {
        Self::new(OperationKind::Update, uri, values)
    }

    pub fn delete(uri: ResourceUri) -> Self {
        Self::new(OperationKind::Delete, uri, ContentValues::new())
    }

    fn new(kind: OperationKind, uri: ResourceUri, values: ContentValues) -> Self {
        Self {
            kind,
            uri,
            values,
            selection: Selection::none(),
            back_references: Vec::new(),
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Fill `column` with the row id inserted by operation `index` (or the
    /// row count it affected).
    pub fn value_back_reference(mut self, column: impl Into<String>, index: usize) -> Self {
        self.back_references.push((column.into(), index));
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn uri(&self) -> &ResourceUri {
        &self.uri
    }
}

/// Result of one executed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    Inserted { uri: ResourceUri, row_id: i64 },
    Affected(u64),
}

impl OperationResult {
    /// Value substituted by a back reference to this result
    pub fn back_reference_value(&self) -> i64 {
        match self {
            OperationResult::Inserted { row_id, .. } => *row_id,
            OperationResult::Affected(count) => i64::try_from(*count).unwrap_or(i64::MAX),
        }
    }

    pub fn inserted_uri(&self) -> Option<&ResourceUri> {
        match self {
            OperationResult::Inserted { uri, .. } => Some(uri),
            OperationResult::Affected(_) => None,
        }
    }

    pub fn affected(&self) -> Option<u64> {
        match self {
            OperationResult::Affected(count) => Some(*count),
            OperationResult::Inserted { .. } => None,
        }
    }
}

/// An open atomic sequence. Dropping it without committing rolls back.
pub struct AtomicSequence<'s> {
    store: &'s TvStore,
    caller: Caller,
    transaction: Option<Transaction<'static, Sqlite>>,
    changes: ChangeSet,
    results: Vec<OperationResult>,
}

impl<'s> AtomicSequence<'s> {
    pub(crate) async fn begin(store: &'s TvStore, caller: Caller) -> AppResult<Self> {
        let transaction = store.database().writer().begin().await?;
        debug!("Began atomic sequence for {}", caller.package_name);
        Ok(Self {
            store,
            caller,
            transaction: Some(transaction),
            changes: ChangeSet::new(),
            results: Vec::new(),
        })
    }

    /// Execute the next operation inside the sequence's transaction.
    ///
    /// On failure the transaction is rolled back, pending notifications are
    /// discarded and every later call fails with `SequenceAborted`.
    pub async fn execute(&mut self, operation: BatchOperation) -> AppResult<OperationResult> {
        let index = self.results.len();
        let Some(transaction) = self.transaction.as_mut() else {
            return Err(AppError::SequenceAborted);
        };

        let outcome = match Self::resolve_back_references(&self.results, index, &operation) {
            Ok(values) => {
                let conn = &mut **transaction;
                let changes = Some(&mut self.changes);
                let store = self.store;
                let caller = &self.caller;
                let BatchOperation { kind, uri, selection, .. } = &operation;
                match kind {
                    OperationKind::Insert => store
                        .insert_on(conn, caller, uri, values, changes)
                        .await
                        .map(|(uri, row_id)| OperationResult::Inserted { uri, row_id }),
                    OperationKind::Update => store
                        .update_on(conn, caller, uri, values, selection, changes)
                        .await
                        .map(OperationResult::Affected),
                    OperationKind::Delete => store
                        .delete_on(conn, caller, uri, selection, changes)
                        .await
                        .map(OperationResult::Affected),
                    OperationKind::Query => Err(RequestError::unsupported(kind, uri).into()),
                }
            }
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(result) => {
                self.results.push(result.clone());
                Ok(result)
            }
            Err(e) => {
                warn!("Atomic sequence operation {} failed, rolling back: {}", index, e);
                self.abort().await;
                Err(AppError::batch_operation(index, e))
            }
        }
    }

    fn resolve_back_references(
        results: &[OperationResult],
        index: usize,
        operation: &BatchOperation,
    ) -> Result<ContentValues, RequestError> {
        let mut values = operation.values.clone();
        for (column, reference) in &operation.back_references {
            let result = results
                .get(*reference)
                .ok_or(RequestError::InvalidBackReference {
                    index: *reference,
                    at: index,
                })?;
            values.put(column.as_str(), result.back_reference_value());
        }
        Ok(values)
    }

    /// Commit, then deliver each distinct changed identifier once.
    pub async fn commit(mut self) -> AppResult<Vec<OperationResult>> {
        let transaction = self.transaction.take().ok_or(AppError::SequenceAborted)?;
        transaction.commit().await?;
        debug!(
            "Committed atomic sequence: {} operations, {} notifications",
            self.results.len(),
            self.changes.len()
        );
        self.changes.flush(self.store.notifier.as_ref());
        Ok(std::mem::take(&mut self.results))
    }

    /// Roll back explicitly. Pending notifications are discarded.
    pub async fn rollback(mut self) -> AppResult<()> {
        self.changes.clear();
        match self.transaction.take() {
            Some(transaction) => Ok(transaction.rollback().await?),
            None => Ok(()),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.transaction.is_none()
    }

    /// Results of the operations executed so far
    pub fn results(&self) -> &[OperationResult] {
        &self.results
    }

    async fn abort(&mut self) {
        self.changes.clear();
        if let Some(transaction) = self.transaction.take() {
            if let Err(e) = transaction.rollback().await {
                warn!("Rollback of atomic sequence failed: {}", e);
            }
        }
    }
}
