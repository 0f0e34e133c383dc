//! Assignment and Grade Services operations over the gradebook.
//!
//! Activities are projected as line items and submissions as results, both
//! scoped to the tenant carried by the caller's access token.

use crate::dtos::ags::{
    CreateLineItemRequest, LineItemResponse, ResultResponse, ScoreRequest, ScoreResponse,
};
use crate::error::AppError;
use crate::models::GradableActivity;
use crate::services::keys::AgsTokenClaims;
use crate::services::stores::Gradebook;
use anyhow::anyhow;
use uuid::Uuid;

pub const SCOPE_LINEITEM: &str = "https://purl.imsglobal.org/spec/lti-ags/scope/lineitem";
pub const SCOPE_RESULT_READONLY: &str =
    "https://purl.imsglobal.org/spec/lti-ags/scope/result.readonly";
pub const SCOPE_SCORE: &str = "https://purl.imsglobal.org/spec/lti-ags/scope/score";

pub fn require_scope(claims: &AgsTokenClaims, scope: &str) -> Result<(), AppError> {
    if claims.has_scope(scope) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("missing scope {}", scope)))
    }
}

fn line_item_url(activity_id: Uuid) -> String {
    format!("/lti/ags/lineitems/{}", activity_id)
}

fn result_url(activity_id: Uuid, submission_id: Uuid) -> String {
    format!("/lti/ags/lineitems/{}/results/{}", activity_id, submission_id)
}

fn to_line_item(activity: &GradableActivity) -> LineItemResponse {
    LineItemResponse {
        id: line_item_url(activity.activity_id),
        label: activity.label.clone(),
        score_maximum: activity.score_maximum,
    }
}

pub async fn list_line_items(
    gradebook: &dyn Gradebook,
    claims: &AgsTokenClaims,
) -> Result<Vec<LineItemResponse>, AppError> {
    require_scope(claims, SCOPE_LINEITEM)?;
    let activities = gradebook.list_activities(claims.tenant_id).await?;
    Ok(activities.iter().map(to_line_item).collect())
}

pub async fn get_line_item(
    gradebook: &dyn Gradebook,
    claims: &AgsTokenClaims,
    activity_id: Uuid,
) -> Result<LineItemResponse, AppError> {
    require_scope(claims, SCOPE_LINEITEM)?;
    let activity = find_tenant_activity(gradebook, claims, activity_id).await?;
    Ok(to_line_item(&activity))
}

pub async fn create_line_item(
    gradebook: &dyn Gradebook,
    claims: &AgsTokenClaims,
    request: &CreateLineItemRequest,
) -> Result<LineItemResponse, AppError> {
    require_scope(claims, SCOPE_LINEITEM)?;
    let activity = GradableActivity::new(
        claims.tenant_id,
        request.course_id,
        request.label.clone(),
        request.score_maximum,
    );
    gradebook.insert_activity(&activity).await?;
    Ok(to_line_item(&activity))
}

pub async fn list_results(
    gradebook: &dyn Gradebook,
    claims: &AgsTokenClaims,
    activity_id: Uuid,
) -> Result<Vec<ResultResponse>, AppError> {
    require_scope(claims, SCOPE_RESULT_READONLY)?;
    let activity = find_tenant_activity(gradebook, claims, activity_id).await?;
    let submissions = gradebook.list_submissions(activity.activity_id).await?;
    Ok(submissions
        .iter()
        .map(|s| ResultResponse {
            id: result_url(activity.activity_id, s.submission_id),
            score_of: line_item_url(activity.activity_id),
            user_id: s.user_id.to_string(),
            result_score: s.score,
            result_maximum: s.score_maximum,
            comment: s.comment.clone(),
        })
        .collect())
}

pub async fn post_score(
    gradebook: &dyn Gradebook,
    claims: &AgsTokenClaims,
    activity_id: Uuid,
    request: &ScoreRequest,
) -> Result<ScoreResponse, AppError> {
    require_scope(claims, SCOPE_SCORE)?;
    let activity = find_tenant_activity(gradebook, claims, activity_id).await?;

    let user_id = Uuid::parse_str(&request.user_id)
        .map_err(|_| AppError::BadRequest(anyhow!("userId is not a valid user identifier")))?;

    let submission = gradebook
        .upsert_result(&activity, user_id, request.score_given, request.comment.clone())
        .await?;

    Ok(ScoreResponse {
        result_url: result_url(activity.activity_id, submission.submission_id),
    })
}

/// Tenant-scoped activity lookup; an activity in another tenant is
/// indistinguishable from one that does not exist.
async fn find_tenant_activity(
    gradebook: &dyn Gradebook,
    claims: &AgsTokenClaims,
    activity_id: Uuid,
) -> Result<GradableActivity, AppError> {
    gradebook
        .find_activity(claims.tenant_id, activity_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Line item not found".to_string()))
}
