//! Bearer token authentication for the AGS routes.

use crate::error::AppError;
use crate::services::keys::{AgsTokenClaims, KeyService};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

/// Verifies the bearer token and stashes its claims for the handlers.
pub async fn ags_auth_middleware(
    State(keys): State<KeyService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers().get(header::AUTHORIZATION))?;
    let claims = keys.validate_ags_token(token)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn bearer_token(header: Option<&header::HeaderValue>) -> Result<&str, AppError> {
    header
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// Extractor for the validated claims inserted by [`ags_auth_middleware`].
pub struct AgsToken(pub AgsTokenClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AgsToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AgsTokenClaims>()
            .cloned()
            .map(AgsToken)
            .ok_or(AppError::Unauthorized)
    }
}
