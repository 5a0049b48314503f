use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store cannot be reached.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
}

/// GET /health
///
/// Public liveness probe. Answers 503 while the metadata store is down so
/// load balancers drain the instance.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_healthy = state
        .store
        .ping()
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Metadata store is unreachable"))
        .is_ok();

    let (code, status) = if db_healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    };
    (code, Json(body))
}

/// Mounted at the root, outside `/api/v1` and the authorization gate.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
