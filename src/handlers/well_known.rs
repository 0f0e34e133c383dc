use crate::AppState;
use axum::{extract::State, http::header, response::IntoResponse, Json};

/// Serves this service's public signing keys so counterparties can verify
/// deep linking responses and AGS tokens.
#[utoipa::path(
    get,
    path = "/.well-known/jwks.json",
    tag = "well-known",
    responses(
        (status = 200, description = "Public key set in JWK format")
    )
)]
pub async fn jwks(State(state): State<AppState>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(state.keys.jwks()),
    )
}
