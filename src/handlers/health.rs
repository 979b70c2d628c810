use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{db, errors::ServiceError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness))
        .route("/ready", get(readiness))
}

#[derive(Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// Process liveness.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is alive", body = HealthStatus)),
    tag = "Health"
)]
pub async fn liveness() -> impl IntoResponse {
    Json(HealthStatus { status: "ok" })
}

/// Readiness including a database ping.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthStatus),
        (status = 500, description = "Database unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Health"
)]
pub async fn readiness(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    db::check_connection(&state.db).await?;
    Ok(Json(HealthStatus { status: "ready" }))
}
