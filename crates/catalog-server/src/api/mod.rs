pub mod response;

use crate::db;
use crate::features;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

pub async fn serve(
    addr: SocketAddr,
    state: features::FeatureState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

fn create_router(state: features::FeatureState) -> Router {
    let api_v1 = features::router(state.clone());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health).with_state(state))
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Catalog Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health(State(state): State<features::FeatureState>) -> impl IntoResponse {
    match db::health_check(&state.db).await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(err) => {
            tracing::error!("Health check failed: {}", err);
            (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
        },
    }
}
