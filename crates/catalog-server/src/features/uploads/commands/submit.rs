//! Submit a CSV upload: store the blob, record the attempt, queue it.
//!
//! The duplicate decision happens here, before anything is queued: a
//! submission whose checksum matches an existing upload is recorded as
//! `skipped` and never reaches the worker.

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

use crate::features::FeatureState;
use crate::models::{NewUpload, UploadOutcome, UploadStatus};
use catalog_common::checksum::sha256_hex;

/// MIME types accepted for upload. Browsers disagree on what a CSV is,
/// so the list covers the common reports.
const ALLOWED_MIME_TYPES: &[&str] = &[
    "text/csv",
    "text/plain",
    "application/csv",
    "application/vnd.ms-excel",
];

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-. ]+").unwrap());

#[derive(Debug, Clone)]
pub struct SubmitUploadCommand {
    pub original_name: String,
    pub mime: Option<String>,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitUploadResponse {
    pub id: Uuid,
    pub status: UploadStatus,
    pub checksum: String,
    /// Set when the submission was skipped as a duplicate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitUploadError {
    #[error("Filename is required and cannot be empty")]
    FilenameRequired,
    #[error("File content is required and cannot be empty")]
    ContentRequired,
    #[error("Unsupported file type: {0}")]
    UnsupportedMime(String),
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),
}

impl SubmitUploadCommand {
    pub fn validate(&self) -> Result<(), SubmitUploadError> {
        if self.original_name.trim().is_empty() {
            return Err(SubmitUploadError::FilenameRequired);
        }
        if self.content.is_empty() {
            return Err(SubmitUploadError::ContentRequired);
        }
        if let Some(mime) = &self.mime {
            if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
                return Err(SubmitUploadError::UnsupportedMime(mime.clone()));
            }
        }
        Ok(())
    }
}

/// Replace anything outside the filename-safe set with underscores.
fn sanitize_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(name.trim(), "_").to_string()
}

#[tracing::instrument(skip(state, command), fields(original_name = %command.original_name))]
pub async fn handle(
    state: FeatureState,
    command: SubmitUploadCommand,
) -> Result<SubmitUploadResponse, SubmitUploadError> {
    command.validate()?;

    let checksum = sha256_hex(&command.content);
    let size_bytes = command.content.len() as i64;

    let clean_name = sanitize_filename(&command.original_name);
    let stored_path = format!("uploads/{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), clean_name);

    state.blobs.put(&stored_path, &command.content).await?;

    // Checked after the blob write so a mid-flight failure never leaves a
    // queued record pointing at a missing file.
    let duplicate_of = state.uploads.find_by_checksum(&checksum).await?;

    let (status, meta) = match duplicate_of {
        Some(prior) => {
            let outcome =
                UploadOutcome::skip(format!("duplicate of upload {prior} (checksum match)"));
            (UploadStatus::Skipped, Some(serde_json::to_value(&outcome).map_err(anyhow::Error::from)?))
        },
        None => (UploadStatus::Queued, None),
    };

    let record = state
        .uploads
        .insert(NewUpload {
            original_name: command.original_name,
            stored_path,
            mime: command.mime,
            size_bytes,
            checksum_sha256: checksum.clone(),
            status,
            meta,
        })
        .await?;

    tracing::info!(
        id = %record.id,
        status = %record.status,
        size_bytes,
        "Upload submitted"
    );

    Ok(SubmitUploadResponse {
        id: record.id,
        status: record.status,
        checksum,
        duplicate_of,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_success() {
        let cmd = SubmitUploadCommand {
            original_name: "catalog.csv".to_string(),
            mime: Some("text/csv".to_string()),
            content: vec![1, 2, 3],
        };
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_filename() {
        let cmd = SubmitUploadCommand {
            original_name: "   ".to_string(),
            mime: None,
            content: vec![1, 2, 3],
        };
        assert!(matches!(
            cmd.validate(),
            Err(SubmitUploadError::FilenameRequired)
        ));
    }

    #[test]
    fn test_validation_empty_content() {
        let cmd = SubmitUploadCommand {
            original_name: "catalog.csv".to_string(),
            mime: None,
            content: vec![],
        };
        assert!(matches!(
            cmd.validate(),
            Err(SubmitUploadError::ContentRequired)
        ));
    }

    #[test]
    fn test_validation_rejects_unknown_mime() {
        let cmd = SubmitUploadCommand {
            original_name: "catalog.csv".to_string(),
            mime: Some("application/pdf".to_string()),
            content: vec![1, 2, 3],
        };
        assert!(matches!(
            cmd.validate(),
            Err(SubmitUploadError::UnsupportedMime(_))
        ));
    }

    #[test]
    fn test_validation_allows_missing_mime() {
        let cmd = SubmitUploadCommand {
            original_name: "catalog.csv".to_string(),
            mime: None,
            content: vec![1, 2, 3],
        };
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("price list (v2).csv"), "price list _v2_.csv");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("  plain.csv  "), "plain.csv");
    }
}
