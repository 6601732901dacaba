//! Batched idempotent upsert
//!
//! Valid cleaned rows accumulate into fixed-size batches; each full batch
//! (and the partial final batch) is handed to the product sink in one
//! atomic upsert call.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ProductDraft;

/// Rows buffered before a flush is issued.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Upsert-capable sink for cleaned product rows.
///
/// One call is atomic and keyed on `unique_key`: existing records have
/// exactly the mutable descriptive columns overwritten, never the key or
/// the original creation timestamp. When the same key appears more than
/// once in `rows`, the later occurrence wins.
#[async_trait]
pub trait ProductSink: Send + Sync {
    /// Upsert a batch and return the number of rows submitted.
    async fn upsert_batch(&self, rows: &[ProductDraft]) -> Result<usize>;
}

/// Accumulates rows and flushes them in batches, preserving file order.
pub struct BatchUpserter<'a> {
    sink: &'a dyn ProductSink,
    capacity: usize,
    buffer: Vec<ProductDraft>,
    submitted: u64,
}

impl<'a> BatchUpserter<'a> {
    pub fn new(sink: &'a dyn ProductSink, capacity: usize) -> Self {
        Self {
            sink,
            capacity: capacity.max(1),
            buffer: Vec::with_capacity(capacity.max(1)),
            submitted: 0,
        }
    }

    /// Buffer one valid row, flushing when the batch is full.
    pub async fn push(&mut self, row: ProductDraft) -> Result<()> {
        self.buffer.push(row);
        if self.buffer.len() >= self.capacity {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flush the current buffer; a no-op when empty.
    async fn flush(&mut self) -> Result<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        let count = self.sink.upsert_batch(&self.buffer).await?;
        self.submitted += count as u64;
        self.buffer.clear();
        Ok(count)
    }

    /// Flush any partial final batch and return the total rows submitted.
    pub async fn finish(mut self) -> Result<u64> {
        self.flush().await?;
        Ok(self.submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the size of every flush it receives.
    #[derive(Default)]
    struct RecordingSink {
        flushes: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ProductSink for RecordingSink {
        async fn upsert_batch(&self, rows: &[ProductDraft]) -> Result<usize> {
            self.flushes.lock().unwrap().push(rows.len());
            Ok(rows.len())
        }
    }

    fn drafts(n: usize) -> Vec<ProductDraft> {
        (0..n).map(|i| ProductDraft::keyed(format!("K{i}"))).collect()
    }

    #[tokio::test]
    async fn test_250_rows_flush_as_100_100_50() {
        let sink = RecordingSink::default();
        let mut batcher = BatchUpserter::new(&sink, DEFAULT_BATCH_SIZE);

        for draft in drafts(250) {
            batcher.push(draft).await.unwrap();
        }
        let submitted = batcher.finish().await.unwrap();

        assert_eq!(submitted, 250);
        assert_eq!(*sink.flushes.lock().unwrap(), vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_zero_rows_issue_zero_flushes() {
        let sink = RecordingSink::default();
        let batcher = BatchUpserter::new(&sink, DEFAULT_BATCH_SIZE);

        let submitted = batcher.finish().await.unwrap();

        assert_eq!(submitted, 0);
        assert!(sink.flushes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_trailing_flush() {
        let sink = RecordingSink::default();
        let mut batcher = BatchUpserter::new(&sink, 10);

        for draft in drafts(20) {
            batcher.push(draft).await.unwrap();
        }
        let submitted = batcher.finish().await.unwrap();

        assert_eq!(submitted, 20);
        assert_eq!(*sink.flushes.lock().unwrap(), vec![10, 10]);
    }
}
