//! Single upload lookup for status polling.

use uuid::Uuid;

use crate::db::DbError;
use crate::features::FeatureState;
use crate::models::UploadAttempt;

pub async fn handle(state: FeatureState, id: Uuid) -> Result<UploadAttempt, DbError> {
    state
        .uploads
        .get(id)
        .await?
        .ok_or_else(|| DbError::not_found("upload", &id.to_string()))
}
