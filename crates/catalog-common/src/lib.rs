//! Catalog Common Library
//!
//! Shared error handling, checksum, and logging utilities for the catalog
//! import workspace.
//!
//! # Example
//!
//! ```no_run
//! use catalog_common::{Result, checksum};
//!
//! fn fingerprint(path: &str) -> Result<String> {
//!     let digest = checksum::compute_file_checksum(path)?;
//!     Ok(digest)
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CatalogError, Result};
