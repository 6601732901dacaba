//! Feature modules implementing the catalog API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes. Write operations live under `commands/`, read operations under
//! `queries/`, and `routes.rs` wires them into an Axum router.

pub mod uploads;

use crate::db::UploadStore;
use crate::storage::BlobStore;
use axum::Router;
use std::sync::Arc;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool, also probed by the health endpoint
    pub db: sqlx::PgPool,
    /// Upload attempt records
    pub uploads: UploadStore,
    /// Blob storage backend for uploaded file content
    pub blobs: Arc<dyn BlobStore>,
}

/// Creates the main API router with all feature routes mounted
///
/// - `/uploads` - CSV upload submission and history
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest("/uploads", uploads::uploads_routes().with_state(state))
}
