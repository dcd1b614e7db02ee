//! Health check HTTP handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::web::{
    AppState,
    responses::{ApiResponse, HealthResponse, ok},
};

/// Basic application health including database connectivity
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = match state.database.ping().await {
        Ok(()) => HealthResponse::new("healthy", "connected"),
        Err(e) => {
            warn!("Health check database ping failed: {}", e);
            HealthResponse::new("unhealthy", "disconnected")
        }
    };
    ok(response)
}

/// Readiness: 503 until the database answers
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    match state.database.ping().await {
        Ok(()) => ok(HealthResponse::new("ready", "connected")).into_response(),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::<()>::error(
                    "Database connection failed".to_string(),
                )),
            )
                .into_response()
        }
    }
}

/// Liveness: the process is up and serving requests
pub async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
