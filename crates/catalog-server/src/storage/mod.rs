//! Blob store seam
//!
//! The pipeline treats file storage as an opaque content-addressable store:
//! it can check existence, open a fresh readable stream, and write bytes.
//! Re-reading from the start is done by re-opening.

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncRead;

pub mod local;

pub use local::LocalBlobStore;

/// A readable byte stream over a stored blob
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Opaque blob store keyed by relative path
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether a blob exists at the given path
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Open a fresh reader positioned at the start of the blob
    async fn open(&self, path: &str) -> Result<BlobReader>;

    /// Persist bytes at the given path, creating parent directories
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;
}
