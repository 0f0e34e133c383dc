use crate::error::AppError;
use crate::AppState;
use axum::{extract::State, Json};
use serde_json::json;

/// Liveness plus dependency checks for the registration store and the
/// launch state cache.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "A dependency is unavailable")
    )
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.registrations.health_check().await?;
    state.launch_states.health_check().await?;

    Ok(Json(json!({
        "status": "ok",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}
