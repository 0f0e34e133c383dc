use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant directory projection (owned by the wider LMS).
#[derive(Debug, Clone, FromRow)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub tenant_label: String,
    pub created_utc: DateTime<Utc>,
}

impl Tenant {
    pub fn new(tenant_label: String) -> Self {
        Self {
            tenant_id: Uuid::new_v4(),
            tenant_label,
            created_utc: Utc::now(),
        }
    }
}
