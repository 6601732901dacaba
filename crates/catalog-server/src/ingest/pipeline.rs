//! Pipeline orchestration and the upload state machine
//!
//! One invocation processes one upload: status guard, delimiter detection,
//! header resolution, row streaming, batched upsert, terminal bookkeeping.
//! The status guard makes the handler safe under at-least-once task
//! delivery; retried invocations of a terminal upload are no-ops.

use anyhow::{Context, Result};
use async_trait::async_trait;
use csv_async::AsyncReaderBuilder;
use futures::StreamExt;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use uuid::Uuid;

use super::batch::{BatchUpserter, ProductSink, DEFAULT_BATCH_SIZE};
use super::clean::clean_row;
use super::delimiter::detect_delimiter;
use super::header::resolve_columns;
use crate::models::{RowError, UploadAttempt, UploadOutcome};
use crate::storage::{BlobReader, BlobStore};

/// Bytes inspected when probing the first line for delimiter detection.
const FIRST_LINE_PROBE_BYTES: u64 = 4096;

/// Row counters accumulated over one ingestion run.
///
/// Written once, at terminal status; never incremented concurrently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub rows_total: i32,
    pub rows_upserted: i32,
    pub rows_failed: i32,
}

/// Durable view of the upload record, as the pipeline needs it.
///
/// Partial updates are atomic per call; `finish_failed` merges the error
/// into existing metadata rather than replacing it.
#[async_trait]
pub trait UploadJournal: Send + Sync {
    async fn fetch(&self, id: Uuid) -> Result<Option<UploadAttempt>>;

    async fn mark_processing(&self, id: Uuid) -> Result<()>;

    async fn finish_completed(
        &self,
        id: Uuid,
        tally: &RunTally,
        outcome: &UploadOutcome,
    ) -> Result<()>;

    async fn finish_failed(&self, id: Uuid, error: &str) -> Result<()>;
}

/// Outcome of the streaming phase, before terminal bookkeeping.
enum RunReport {
    Completed {
        tally: RunTally,
        outcome: UploadOutcome,
    },
    /// Classified pre-row failure; no upsert was attempted past this point.
    Fatal(String),
}

/// The ingestion pipeline, invoked once per queued upload.
pub struct IngestPipeline {
    blobs: Arc<dyn BlobStore>,
    products: Arc<dyn ProductSink>,
    uploads: Arc<dyn UploadJournal>,
    batch_size: usize,
}

impl IngestPipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        products: Arc<dyn ProductSink>,
        uploads: Arc<dyn UploadJournal>,
    ) -> Self {
        Self {
            blobs,
            products,
            uploads,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the batch size (tests exercise small batches).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run one ingestion. Unexpected failures are caught here and recorded
    /// as terminal `failed` with metadata merged, not replaced.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, upload_id: Uuid) -> Result<()> {
        let Some(upload) = self.uploads.fetch(upload_id).await? else {
            tracing::warn!(%upload_id, "upload record not found, nothing to do");
            return Ok(());
        };

        // Guard against duplicate/retried task delivery: only queued or
        // processing uploads may run.
        if upload.status.is_terminal() {
            tracing::debug!(
                %upload_id,
                status = %upload.status,
                "upload already terminal, skipping"
            );
            return Ok(());
        }

        self.uploads.mark_processing(upload_id).await?;

        match self.process(&upload).await {
            Ok(RunReport::Completed { tally, outcome }) => {
                self.uploads
                    .finish_completed(upload_id, &tally, &outcome)
                    .await?;
                tracing::info!(
                    %upload_id,
                    rows_total = tally.rows_total,
                    rows_upserted = tally.rows_upserted,
                    rows_failed = tally.rows_failed,
                    "ingestion completed"
                );
            },
            Ok(RunReport::Fatal(reason)) => {
                tracing::warn!(%upload_id, %reason, "ingestion failed");
                self.uploads.finish_failed(upload_id, &reason).await?;
            },
            Err(err) => {
                tracing::error!(%upload_id, error = ?err, "ingestion aborted unexpectedly");
                self.uploads
                    .finish_failed(upload_id, &format!("{err:#}"))
                    .await?;
            },
        }

        Ok(())
    }

    /// Stream the blob through detection, header resolution, cleaning and
    /// batching. File handles are scoped to this function and dropped on
    /// every exit path.
    async fn process(&self, upload: &UploadAttempt) -> Result<RunReport> {
        let path = upload.stored_path.as_str();

        if !self.blobs.exists(path).await? {
            return Ok(RunReport::Fatal(format!(
                "File not found in blob store: {path}"
            )));
        }

        // Probe the first line with a dedicated reader; parsing re-opens
        // from the start.
        let probe = match self.blobs.open(path).await {
            Ok(reader) => reader,
            Err(err) => {
                return Ok(RunReport::Fatal(format!(
                    "Unable to open file stream: {err:#}"
                )))
            },
        };
        let first_line = read_first_line(probe)
            .await
            .context("failed to read first line")?;
        let delimiter = detect_delimiter(&first_line);

        let reader = match self.blobs.open(path).await {
            Ok(reader) => reader,
            Err(err) => {
                return Ok(RunReport::Fatal(format!(
                    "Unable to open file stream: {err:#}"
                )))
            },
        };
        let mut csv = AsyncReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .create_reader(reader);
        let mut records = csv.byte_records();

        let header = match records.next().await {
            Some(Ok(record)) => record,
            Some(Err(_)) | None => {
                return Ok(RunReport::Fatal("Empty file or invalid CSV".to_string()))
            },
        };
        let headers: Vec<String> = header
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        let columns = resolve_columns(&headers);

        if columns.unique_key.is_none() {
            return Ok(RunReport::Fatal("CSV missing UNIQUE_KEY column".to_string()));
        }

        let mut tally = RunTally::default();
        let mut errors: Vec<RowError> = Vec::new();
        let mut batcher = BatchUpserter::new(self.products.as_ref(), self.batch_size);

        while let Some(record) = records.next().await {
            let record = record.context("failed to read CSV record")?;
            tally.rows_total += 1;

            match clean_row(&record, &columns) {
                Some(draft) => batcher.push(draft).await?,
                None => {
                    tally.rows_failed += 1;
                    errors.push(RowError {
                        row: tally.rows_total,
                        error: "Missing UNIQUE_KEY".to_string(),
                    });
                },
            }
        }

        tally.rows_upserted = batcher.finish().await? as i32;

        Ok(RunReport::Completed {
            tally,
            outcome: UploadOutcome::Completion {
                errors,
                header_map: columns,
                delimiter: (delimiter as char).to_string(),
            },
        })
    }
}

/// Read the first raw line (up to the probe limit) without touching the
/// stream used for parsing.
async fn read_first_line(reader: BlobReader) -> std::io::Result<String> {
    let mut buffered = BufReader::new(reader.take(FIRST_LINE_PROBE_BYTES));
    let mut line = Vec::new();
    buffered.read_until(b'\n', &mut line).await?;
    Ok(String::from_utf8_lossy(&line).into_owned())
}
