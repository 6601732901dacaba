//! Background CSV ingestion pipeline
//!
//! One ingestion run processes one queued upload: delimiter detection,
//! header-alias resolution, per-row cleaning and validation, batched
//! idempotent upsert, and final status/counter bookkeeping. The run is
//! sequential; concurrency exists only across distinct uploads (see
//! [`worker`]).

pub mod batch;
pub mod clean;
pub mod delimiter;
pub mod header;
pub mod pipeline;
pub mod worker;

pub use batch::{BatchUpserter, ProductSink, DEFAULT_BATCH_SIZE};
pub use delimiter::detect_delimiter;
pub use header::{resolve_columns, ColumnMap};
pub use pipeline::{IngestPipeline, UploadJournal};
pub use worker::{IngestWorker, WorkerHandle};
