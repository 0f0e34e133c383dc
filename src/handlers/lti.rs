//! Login initiation, launch callback and deep linking response endpoints.

use crate::dtos::lti::{
    DeepLinkResponseBody, DeepLinkResponseRequest, LaunchRequest, LoginInitQuery,
};
use crate::error::AppError;
use crate::models::Registration;
use crate::services::deep_link;
use crate::services::identity;
use crate::services::launch::{self, LaunchClaims, MessageType};
use crate::services::launch_cache::LaunchState;
use crate::services::oidc;
use crate::utils::validation::ValidatedJson;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use chrono::Utc;

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// OIDC third-party-initiated login. Verifies the initiating counterparty
/// against the registration table, mints state and nonce, stores them and
/// redirects back to the counterparty's authorization endpoint.
#[utoipa::path(
    get,
    path = "/lti/login",
    tag = "lti",
    params(LoginInitQuery),
    responses(
        (status = 302, description = "Redirect to the counterparty's authorization endpoint"),
        (status = 404, description = "No active registration for issuer and client_id", body = crate::dtos::ErrorResponse),
        (status = 429, description = "Rate limited", body = crate::dtos::ErrorResponse)
    )
)]
pub async fn oidc_login(
    State(state): State<AppState>,
    Query(query): Query<LoginInitQuery>,
) -> Result<Response, AppError> {
    let registration = state
        .registrations
        .find_active(&query.iss, &query.client_id)
        .await?
        .ok_or(AppError::RegistrationNotFound)?;

    let redirect =
        oidc::build_login_redirect(&registration, &query, &state.config.lti.launch_url)?;

    state
        .launch_states
        .put(
            &redirect.state,
            &LaunchState {
                nonce: redirect.nonce.clone(),
                registration_id: registration.registration_id,
                created_at: Utc::now(),
            },
            state.config.lti.state_ttl_seconds,
        )
        .await?;

    tracing::info!(
        registration_id = %registration.registration_id,
        "login initiation accepted"
    );

    Ok(found(redirect.redirect_url))
}

/// Launch callback. Validates the state and id_token, resolves the tenant
/// and user, then routes by message type into the frontend.
#[utoipa::path(
    post,
    path = "/lti/launch",
    tag = "lti",
    responses(
        (status = 302, description = "Redirect into the frontend"),
        (status = 400, description = "Unknown, expired or replayed state", body = crate::dtos::ErrorResponse),
        (status = 401, description = "id_token failed validation", body = crate::dtos::ErrorResponse),
        (status = 422, description = "No matching user account", body = crate::dtos::ErrorResponse)
    )
)]
pub async fn launch(
    State(state): State<AppState>,
    Form(form): Form<LaunchRequest>,
) -> Result<Response, AppError> {
    let (claims, registration) = launch::validate_launch(
        state.launch_states.as_ref(),
        state.registrations.as_ref(),
        state.jwks_fetcher.as_ref(),
        &form.state,
        &form.id_token,
    )
    .await?;

    let (tenant, user) =
        identity::resolve_launch_user(state.directory.as_ref(), &registration, &claims).await?;

    tracing::info!(
        registration_id = %registration.registration_id,
        tenant_id = %tenant.tenant_id,
        user_id = %user.user_id,
        message_type = ?claims.message_type,
        "launch validated"
    );

    let destination = route_launch(&state, &registration, &claims).await?;
    Ok(found(destination))
}

async fn route_launch(
    state: &AppState,
    registration: &Registration,
    claims: &LaunchClaims,
) -> Result<String, AppError> {
    let frontend = &state.config.lti.frontend_url;

    match MessageType::from_claim(claims.message_type.as_deref()) {
        MessageType::ResourceLinkRequest => {
            let external_id = claims
                .resource_link
                .as_ref()
                .and_then(|rl| rl.id.as_deref());

            let link = match external_id {
                Some(id) => {
                    state
                        .registrations
                        .find_resource_link(registration.registration_id, id)
                        .await?
                }
                None => None,
            };

            Ok(match link.and_then(|l| l.course_id) {
                Some(course_id) => format!("{}/teach/courses/{}", frontend, course_id),
                None => format!("{}/dashboard", frontend),
            })
        }
        MessageType::DeepLinkingRequest => Ok(format!(
            "{}/lti/deep-link?registration_id={}&return_url={}",
            frontend,
            registration.registration_id,
            claims
                .deep_linking_settings
                .as_ref()
                .and_then(|s| s.deep_link_return_url.as_deref())
                .map(urlencoding::encode)
                .unwrap_or_default()
        )),
        MessageType::Unrecognized => {
            tracing::warn!(
                registration_id = %registration.registration_id,
                message_type = ?claims.message_type,
                "unrecognized launch message type, routing to dashboard"
            );
            Ok(format!("{}/dashboard", frontend))
        }
    }
}

/// Mints the signed deep linking response JWT for the embedding UI to post
/// back to the counterparty.
#[utoipa::path(
    post,
    path = "/lti/deep-link/response",
    tag = "lti",
    request_body = DeepLinkResponseRequest,
    responses(
        (status = 200, description = "Signed response JWT", body = DeepLinkResponseBody),
        (status = 404, description = "Unknown registration", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Invalid request body", body = crate::dtos::ErrorResponse)
    )
)]
pub async fn deep_link_response(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<DeepLinkResponseRequest>,
) -> Result<Json<DeepLinkResponseBody>, AppError> {
    let registration = state
        .registrations
        .find_by_id(request.registration_id)
        .await?
        .ok_or(AppError::RegistrationNotFound)?;

    let jwt = deep_link::build_deep_link_response(
        &state.keys,
        &registration,
        &request,
        state.config.lti.deep_link_expiry_seconds,
    )?;

    tracing::info!(
        registration_id = %registration.registration_id,
        item_count = request.items.len(),
        "deep linking response signed"
    );

    Ok(Json(DeepLinkResponseBody {
        jwt,
        return_url: request.return_url,
    }))
}
