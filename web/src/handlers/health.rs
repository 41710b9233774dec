//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{Json, extract::State};

use crate::dto::{HealthResponse, OkResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Liveness: always 200 with the crate version and server time.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
        time: state.market().now(),
    })
}

/// Readiness: 200 when storage answers, 503 otherwise.
///
/// ```text
/// GET /health/ready
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<OkResponse>, AppError> {
    state.market().ping().await.map_err(|err| {
        tracing::warn!(error = %err, "readiness check failed");
        AppError::unavailable("storage unavailable")
    })?;
    Ok(Json(OkResponse::OK))
}
