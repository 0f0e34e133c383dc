use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// User directory projection (owned by the wider LMS, tenant-scoped).
///
/// Launches resolve against existing accounts only; this service never
/// provisions users.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl User {
    pub fn new(tenant_id: Uuid, email: String, display_name: Option<String>) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            tenant_id,
            email,
            display_name,
            created_utc: Utc::now(),
        }
    }
}
