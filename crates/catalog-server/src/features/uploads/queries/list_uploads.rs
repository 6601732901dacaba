//! Upload history listing, newest first.

use serde::{Deserialize, Serialize};

use crate::db::DbError;
use crate::features::FeatureState;
use crate::models::UploadAttempt;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUploadsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListUploadsResponse {
    pub uploads: Vec<UploadAttempt>,
}

pub async fn handle(
    state: FeatureState,
    query: ListUploadsQuery,
) -> Result<ListUploadsResponse, DbError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let uploads = state.uploads.latest(limit).await?;
    Ok(ListUploadsResponse { uploads })
}
