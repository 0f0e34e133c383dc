//! Assignment and Grade Services endpoints. All routes require a bearer
//! token minted by this service; scopes gate each operation.

use crate::dtos::ags::{
    CreateLineItemRequest, LineItemResponse, ResultResponse, ScoreRequest, ScoreResponse,
};
use crate::error::AppError;
use crate::middleware::ags_auth::AgsToken;
use crate::services::ags;
use crate::utils::validation::ValidatedJson;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/lti/ags/lineitems",
    tag = "ags",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Line items for the token's tenant", body = [LineItemResponse]),
        (status = 401, description = "Missing or invalid token", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Token lacks the lineitem scope", body = crate::dtos::ErrorResponse)
    )
)]
pub async fn list_line_items(
    State(state): State<AppState>,
    AgsToken(claims): AgsToken,
) -> Result<Json<Vec<LineItemResponse>>, AppError> {
    let items = ags::list_line_items(state.gradebook.as_ref(), &claims).await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/lti/ags/lineitems/{activity_id}",
    tag = "ags",
    security(("bearer_auth" = [])),
    params(("activity_id" = Uuid, Path, description = "Line item identifier")),
    responses(
        (status = 200, description = "Line item", body = LineItemResponse),
        (status = 404, description = "Line item not found", body = crate::dtos::ErrorResponse)
    )
)]
pub async fn get_line_item(
    State(state): State<AppState>,
    AgsToken(claims): AgsToken,
    Path(activity_id): Path<Uuid>,
) -> Result<Json<LineItemResponse>, AppError> {
    let item = ags::get_line_item(state.gradebook.as_ref(), &claims, activity_id).await?;
    Ok(Json(item))
}

#[utoipa::path(
    post,
    path = "/lti/ags/lineitems",
    tag = "ags",
    security(("bearer_auth" = [])),
    request_body = CreateLineItemRequest,
    responses(
        (status = 201, description = "Line item created", body = LineItemResponse),
        (status = 403, description = "Token lacks the lineitem scope", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Invalid request body", body = crate::dtos::ErrorResponse)
    )
)]
pub async fn create_line_item(
    State(state): State<AppState>,
    AgsToken(claims): AgsToken,
    ValidatedJson(request): ValidatedJson<CreateLineItemRequest>,
) -> Result<(StatusCode, Json<LineItemResponse>), AppError> {
    let item = ags::create_line_item(state.gradebook.as_ref(), &claims, &request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/lti/ags/lineitems/{activity_id}/results",
    tag = "ags",
    security(("bearer_auth" = [])),
    params(("activity_id" = Uuid, Path, description = "Line item identifier")),
    responses(
        (status = 200, description = "Results for the line item", body = [ResultResponse]),
        (status = 403, description = "Token lacks the result scope", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Line item not found", body = crate::dtos::ErrorResponse)
    )
)]
pub async fn list_results(
    State(state): State<AppState>,
    AgsToken(claims): AgsToken,
    Path(activity_id): Path<Uuid>,
) -> Result<Json<Vec<ResultResponse>>, AppError> {
    let results = ags::list_results(state.gradebook.as_ref(), &claims, activity_id).await?;
    Ok(Json(results))
}

#[utoipa::path(
    post,
    path = "/lti/ags/lineitems/{activity_id}/scores",
    tag = "ags",
    security(("bearer_auth" = [])),
    params(("activity_id" = Uuid, Path, description = "Line item identifier")),
    request_body = ScoreRequest,
    responses(
        (status = 201, description = "Score recorded", body = ScoreResponse),
        (status = 400, description = "userId is not a valid user identifier", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Token lacks the score scope", body = crate::dtos::ErrorResponse),
        (status = 404, description = "Line item not found", body = crate::dtos::ErrorResponse)
    )
)]
pub async fn post_score(
    State(state): State<AppState>,
    AgsToken(claims): AgsToken,
    Path(activity_id): Path<Uuid>,
    Json(request): Json<ScoreRequest>,
) -> Result<(StatusCode, Json<ScoreResponse>), AppError> {
    let response = ags::post_score(state.gradebook.as_ref(), &claims, activity_id, &request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
