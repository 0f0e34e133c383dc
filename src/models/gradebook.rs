//! Gradebook projections served through AGS.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A gradable activity, projected to counterparties as an AGS line item.
#[derive(Debug, Clone, FromRow)]
pub struct GradableActivity {
    pub activity_id: Uuid,
    pub tenant_id: Uuid,
    pub course_id: Uuid,
    pub label: String,
    pub score_maximum: f64,
    pub created_utc: DateTime<Utc>,
}

impl GradableActivity {
    pub fn new(tenant_id: Uuid, course_id: Uuid, label: String, score_maximum: f64) -> Self {
        Self {
            activity_id: Uuid::new_v4(),
            tenant_id,
            course_id,
            label,
            score_maximum,
            created_utc: Utc::now(),
        }
    }
}

/// A submission/result record, projected to counterparties as an AGS result.
#[derive(Debug, Clone, FromRow)]
pub struct Submission {
    pub submission_id: Uuid,
    pub tenant_id: Uuid,
    pub activity_id: Uuid,
    pub user_id: Uuid,
    pub score: Option<f64>,
    pub score_maximum: f64,
    pub comment: Option<String>,
    pub updated_utc: DateTime<Utc>,
}

impl Submission {
    pub fn new(activity: &GradableActivity, user_id: Uuid, score: f64) -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            tenant_id: activity.tenant_id,
            activity_id: activity.activity_id,
            user_id,
            score: Some(score),
            score_maximum: activity.score_maximum,
            comment: None,
            updated_utc: Utc::now(),
        }
    }
}
