//! Domain models for uploads and products

pub mod product;
pub mod upload;

pub use product::ProductDraft;
pub use upload::{NewUpload, RowError, UploadAttempt, UploadOutcome, UploadStatus};
