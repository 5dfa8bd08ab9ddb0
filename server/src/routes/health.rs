//! Health check endpoint.

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::handlers::{PULL_VERSION, PUSH_VERSION};

/// Health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub push_version: i64,
    pub pull_version: i64,
}

/// Create health routes.
pub fn routes<St>() -> Router<St>
where
    St: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

/// Health check handler.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        push_version: PUSH_VERSION,
        pull_version: PULL_VERSION,
    })
}

/// Root handler.
async fn root() -> &'static str {
    "Syncline Sync Server"
}
