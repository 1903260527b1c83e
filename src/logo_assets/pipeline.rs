//! Background logo ingestion
//!
//! `Idle -> ReceivingBytes -> Decoding -> Persisting -> Done | Failed`
//!
//! [`LogoPipeline::open_writer`] hands back a [`LogoWriter`] at once. Its
//! chunks travel over a bounded channel to a task that collects them,
//! waits for a worker permit, decodes and scales off the async runtime,
//! and stores the PNG. Decode failures are only logged. A persist that
//! matches no row is reported back to the writer.

use super::transform;
use crate::config::LogoConfig;
use crate::contract::columns::{COLUMN_ID, COLUMN_LOGO, COLUMN_PACKAGE_NAME};
use crate::contract::{ResourceUri, Table};
use crate::database::Database;
use crate::errors::{LogoError, LogoResult};
use crate::notifications::ChangeNotifier;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct LogoPipeline {
    db: Database,
    notifier: Arc<dyn ChangeNotifier>,
    workers: Arc<Semaphore>,
    config: LogoConfig,
}

impl LogoPipeline {
    pub fn new(db: Database, notifier: Arc<dyn ChangeNotifier>, config: LogoConfig) -> Self {
        Self {
            db,
            notifier,
            workers: Arc::new(Semaphore::new(config.ingest_workers.max(1))),
            config,
        }
    }

    /// Start an ingestion job for `channel_id`. `owner` restricts the final
    /// update to rows owned by that application.
    pub fn open_writer(&self, channel_id: i64, owner: Option<String>) -> LogoWriter {
        let (chunks_tx, chunks_rx) = mpsc::channel(self.config.pipe_capacity.max(1));
        let (error_tx, error_rx) = oneshot::channel();

        let job = IngestJob {
            pipeline: self.clone(),
            channel_id,
            owner,
        };
        tokio::spawn(job.run(chunks_rx, error_tx));

        LogoWriter {
            chunks: chunks_tx,
            errors: error_rx,
        }
    }
}

/// Write end of a logo pipe
#[derive(Debug)]
pub struct LogoWriter {
    chunks: mpsc::Sender<Bytes>,
    errors: oneshot::Receiver<LogoError>,
}

impl LogoWriter {
    /// Send the next chunk. Waits only for channel capacity, never for the
    /// decode or database work.
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> LogoResult<()> {
        self.chunks
            .send(chunk.into())
            .await
            .map_err(|_| LogoError::PipeClosed)
    }

    pub async fn write_all(&mut self, data: &[u8], chunk_size: usize) -> LogoResult<()> {
        for chunk in data.chunks(chunk_size.max(1)) {
            self.write(Bytes::copy_from_slice(chunk)).await?;
        }
        Ok(())
    }

    /// Close the stream. The returned handle resolves once the job is over.
    pub fn finish(self) -> LogoCompletion {
        drop(self.chunks);
        LogoCompletion {
            errors: self.errors,
        }
    }
}

/// Completion of a finished logo write
#[derive(Debug)]
pub struct LogoCompletion {
    errors: oneshot::Receiver<LogoError>,
}

impl LogoCompletion {
    /// `Ok` when the logo was stored or silently dropped; `Err` only when the
    /// job explicitly reported a failure.
    pub async fn wait(self) -> LogoResult<()> {
        match self.errors.await {
            Ok(error) => Err(error),
            Err(_) => Ok(()),
        }
    }
}

struct IngestJob {
    pipeline: LogoPipeline,
    channel_id: i64,
    owner: Option<String>,
}

impl IngestJob {
    async fn run(self, mut chunks: mpsc::Receiver<Bytes>, errors: oneshot::Sender<LogoError>) {
        let max_bytes = self.pipeline.config.max_upload_bytes;
        let mut buffer = Vec::new();
        let mut oversized = false;

        while let Some(chunk) = chunks.recv().await {
            if oversized {
                continue;
            }
            if buffer.len() + chunk.len() > max_bytes {
                oversized = true;
                buffer = Vec::new();
                continue;
            }
            buffer.extend_from_slice(&chunk);
        }

        if oversized {
            warn!(
                "Dropping logo for channel {}: larger than {} bytes",
                self.channel_id, max_bytes
            );
            return;
        }

        let Ok(_permit) = Arc::clone(&self.pipeline.workers).acquire_owned().await else {
            return;
        };

        let max_dimension = self.pipeline.config.max_dimension;
        let transformed =
            tokio::task::spawn_blocking(move || transform::to_png(&buffer, max_dimension)).await;
        let png = match transformed {
            Ok(Ok(png)) => png,
            Ok(Err(e)) => {
                warn!("Failed to decode logo for channel {}: {}", self.channel_id, e);
                return;
            }
            Err(e) => {
                error!("Logo transform task for channel {} failed: {}", self.channel_id, e);
                return;
            }
        };

        match self.persist(png).await {
            Ok(0) => {
                debug!("No writable channel {} for logo", self.channel_id);
                let _ = errors.send(LogoError::ChannelNotWritable {
                    channel_id: self.channel_id,
                });
            }
            Ok(_) => {
                self.pipeline
                    .notifier
                    .notify_change(&ResourceUri::channel_logo(self.channel_id));
            }
            Err(e) => {
                error!("Failed to store logo for channel {}: {}", self.channel_id, e);
                let _ = errors.send(LogoError::Storage {
                    channel_id: self.channel_id,
                    message: e.to_string(),
                });
            }
        }
    }

    async fn persist(&self, png: Vec<u8>) -> Result<u64, sqlx::Error> {
        let mut sql = format!(
            "UPDATE {} SET {COLUMN_LOGO} = ? WHERE {COLUMN_ID} = ?",
            Table::Channels.name()
        );
        if self.owner.is_some() {
            sql.push_str(&format!(" AND {COLUMN_PACKAGE_NAME} = ?"));
        }

        let mut query = sqlx::query(&sql).bind(png).bind(self.channel_id);
        if let Some(owner) = &self.owner {
            query = query.bind(owner.as_str());
        }
        Ok(query
            .execute(self.pipeline.db.writer())
            .await?
            .rows_affected())
    }
}
