//! AGS wire shapes. Field names follow the IMS camelCase convention.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemResponse {
    pub id: String,
    pub label: String,
    pub score_maximum: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLineItemRequest {
    #[validate(length(min = 1, message = "label must not be empty"))]
    pub label: String,
    #[validate(range(min = 0.0, message = "scoreMaximum must not be negative"))]
    pub score_maximum: f64,
    pub course_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    pub id: String,
    pub score_of: String,
    pub user_id: String,
    pub result_score: Option<f64>,
    pub result_maximum: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    /// Counterparties send user ids as strings even when they are UUIDs.
    pub user_id: String,
    pub score_given: f64,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub result_url: String,
}
