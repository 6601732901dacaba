//! Upload attempt record and status lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingest::header::ColumnMap;

/// Upload status lifecycle: queued -> processing -> completed | failed | skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Queued => "queued",
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
            UploadStatus::Skipped => "skipped",
        }
    }

    /// Terminal states admit no further automatic transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::Failed | UploadStatus::Skipped
        )
    }
}

impl From<&str> for UploadStatus {
    fn from(s: &str) -> Self {
        match s {
            "queued" => UploadStatus::Queued,
            "processing" => UploadStatus::Processing,
            "completed" => UploadStatus::Completed,
            "skipped" => UploadStatus::Skipped,
            // Unknown statuses are treated as terminal so the pipeline
            // never re-runs a record it cannot reason about.
            _ => UploadStatus::Failed,
        }
    }
}

impl From<String> for UploadStatus {
    fn from(s: String) -> Self {
        UploadStatus::from(s.as_str())
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One upload attempt, as persisted in the `uploads` table.
///
/// Row counters are written exactly once, at terminal status, from the
/// pipeline's own tally.
#[derive(Debug, Clone, Serialize)]
pub struct UploadAttempt {
    pub id: Uuid,
    pub original_name: String,
    pub stored_path: String,
    pub mime: Option<String>,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub status: UploadStatus,
    pub rows_total: i32,
    pub rows_upserted: i32,
    pub rows_failed: i32,
    pub meta: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a new upload record at submission time
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub original_name: String,
    pub stored_path: String,
    pub mime: Option<String>,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub status: UploadStatus,
    pub meta: Option<serde_json::Value>,
}

/// A single rejected row, recorded in the completion report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based data row ordinal (header excluded)
    pub row: i32,
    pub error: String,
}

/// Closed set of metadata shapes persisted on the upload record.
///
/// Serialized untagged so the stored JSON matches the recognized shapes:
/// `{error}`, `{errors, header_map, delimiter}`, `{reason}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadOutcome {
    /// Run completed; individual rows may still have failed.
    Completion {
        errors: Vec<RowError>,
        header_map: ColumnMap,
        delimiter: String,
    },
    /// Fatal pre-row or runtime error; no further rows were processed.
    Fatal { error: String },
    /// Duplicate submission detected before the pipeline ran.
    Skip { reason: String },
}

impl UploadOutcome {
    pub fn fatal(error: impl Into<String>) -> Self {
        UploadOutcome::Fatal {
            error: error.into(),
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        UploadOutcome::Skip {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            UploadStatus::Queued,
            UploadStatus::Processing,
            UploadStatus::Completed,
            UploadStatus::Failed,
            UploadStatus::Skipped,
        ] {
            assert_eq!(UploadStatus::from(status.as_str()), status);
        }
    }

    #[test]
    fn test_unknown_status_is_terminal() {
        let status = UploadStatus::from("garbage");
        assert!(status.is_terminal());
    }

    #[test]
    fn test_outcome_shapes() {
        let fatal = serde_json::to_value(UploadOutcome::fatal("boom")).unwrap();
        assert_eq!(fatal, serde_json::json!({"error": "boom"}));

        let skip = serde_json::to_value(UploadOutcome::skip("duplicate")).unwrap();
        assert_eq!(skip, serde_json::json!({"reason": "duplicate"}));

        let completion = serde_json::to_value(UploadOutcome::Completion {
            errors: vec![RowError {
                row: 2,
                error: "Missing UNIQUE_KEY".to_string(),
            }],
            header_map: ColumnMap::default(),
            delimiter: ",".to_string(),
        })
        .unwrap();
        assert_eq!(completion["delimiter"], ",");
        assert_eq!(completion["errors"][0]["row"], 2);
        assert!(completion["header_map"]["unique_key"].is_null());
    }
}
