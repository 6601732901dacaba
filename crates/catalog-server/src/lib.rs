//! Catalog Import Server Library
//!
//! HTTP server and background ingestion pipeline for product catalog CSV
//! uploads.
//!
//! # Overview
//!
//! A user submits a CSV file to the upload endpoint; the file is stored in
//! the blob store, checksummed, and recorded as a queued upload attempt.
//! The ingest worker claims queued uploads and runs the pipeline:
//!
//! 1. Delimiter detection on the first line (comma, semicolon, tab)
//! 2. Header resolution against the known column aliases
//! 3. Per-row cleaning and validation (encoding coercion, control-character
//!    stripping, price normalization)
//! 4. Batched idempotent upsert into the products table keyed on
//!    `unique_key`
//! 5. Terminal status and row counters written back to the upload record
//!
//! The upload-history endpoint is polled by the UI; all ingestion outcome
//! detail surfaces there asynchronously.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP surface (multipart upload, history polling)
//! - **SQLx**: PostgreSQL persistence for uploads and products
//! - **csv-async**: streaming record reads off the blob store

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use error::{AppError, AppResult};
