use crate::api::response::{ApiResponse, ErrorResponse};
use crate::error::AppError;
use crate::features::FeatureState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::commands::{SubmitUploadCommand, SubmitUploadError};
use super::queries::ListUploadsQuery;

pub fn uploads_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_uploads).post(submit_upload))
        .route("/:id", get(get_upload))
}

#[tracing::instrument(skip(state, multipart))]
async fn submit_upload(
    State(state): State<FeatureState>,
    mut multipart: Multipart,
) -> Result<Response, UploadApiError> {
    let mut original_name: Option<String> = None;
    let mut mime: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        UploadApiError::Submit(SubmitUploadError::Storage(anyhow::anyhow!(
            "Failed to read multipart field: {}",
            e
        )))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name == "file" {
            original_name = field.file_name().map(|s| s.to_string());
            mime = field.content_type().map(|s| s.to_string());
            let data = field.bytes().await.map_err(|e| {
                UploadApiError::Submit(SubmitUploadError::Storage(anyhow::anyhow!(
                    "Failed to read file bytes: {}",
                    e
                )))
            })?;
            content = Some(data.to_vec());
        }
    }

    let content = content.ok_or(UploadApiError::Submit(SubmitUploadError::ContentRequired))?;

    let command = SubmitUploadCommand {
        original_name: original_name.unwrap_or_default(),
        mime,
        content,
    };

    let response = super::commands::submit::handle(state, command).await?;

    tracing::info!(
        id = %response.id,
        status = %response.status,
        checksum = %response.checksum,
        "Upload submitted via API"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))).into_response())
}

async fn list_uploads(
    State(state): State<FeatureState>,
    Query(query): Query<ListUploadsQuery>,
) -> Result<Response, AppError> {
    let response = super::queries::list_uploads::handle(state, query).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

async fn get_upload(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let upload = super::queries::get_upload::handle(state, id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(upload))).into_response())
}

#[derive(Debug)]
enum UploadApiError {
    Submit(SubmitUploadError),
}

impl From<SubmitUploadError> for UploadApiError {
    fn from(err: SubmitUploadError) -> Self {
        Self::Submit(err)
    }
}

impl IntoResponse for UploadApiError {
    fn into_response(self) -> Response {
        match self {
            UploadApiError::Submit(SubmitUploadError::FilenameRequired)
            | UploadApiError::Submit(SubmitUploadError::ContentRequired)
            | UploadApiError::Submit(SubmitUploadError::UnsupportedMime(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            UploadApiError::Submit(SubmitUploadError::Storage(_)) => {
                tracing::error!("Storage error during upload: {}", self);
                let error = ErrorResponse::new("STORAGE_ERROR", "A storage error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
            UploadApiError::Submit(SubmitUploadError::Database(_)) => {
                tracing::error!("Database error during upload request: {}", self);
                let error = ErrorResponse::new("DATABASE_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for UploadApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submit(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UploadApiError::Submit(SubmitUploadError::FilenameRequired);
        assert!(err.to_string().contains("Filename is required"));
    }

    #[test]
    fn test_routes_structure() {
        let router = uploads_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
