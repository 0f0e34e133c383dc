//! Trusted counterparty registrations and their resource links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Registration state codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Active,
    Inactive,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Active => "active",
            RegistrationStatus::Inactive => "inactive",
        }
    }
}

/// A trusted external platform (or tool) this service exchanges launches with.
///
/// The tenant binding is fixed when the registration is created by the admin
/// flow and is never influenced by anything a launch supplies. Unique on
/// (issuer, client_id).
#[derive(Debug, Clone, FromRow)]
pub struct Registration {
    pub registration_id: Uuid,
    pub tenant_id: Uuid,
    pub issuer: String,
    pub client_id: String,
    pub deployment_id: String,
    /// The counterparty's OIDC authorization endpoint.
    pub auth_login_url: String,
    /// Where the counterparty publishes its public keys.
    pub jwks_url: String,
    pub status_code: String,
    /// Overrides the service-wide signing key id for responses to this
    /// counterparty, when set.
    pub signing_key_id: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Registration {
    pub fn new(
        tenant_id: Uuid,
        issuer: String,
        client_id: String,
        deployment_id: String,
        auth_login_url: String,
        jwks_url: String,
    ) -> Self {
        Self {
            registration_id: Uuid::new_v4(),
            tenant_id,
            issuer,
            client_id,
            deployment_id,
            auth_login_url,
            jwks_url,
            status_code: RegistrationStatus::Active.as_str().to_string(),
            signing_key_id: None,
            created_utc: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status_code == RegistrationStatus::Active.as_str()
    }
}

/// A placement of external content under a registration, optionally bound to
/// a course. `custom_params` carries the counterparty's own identifiers,
/// including the external `resource_link_id` a launch references.
#[derive(Debug, Clone, FromRow)]
pub struct ResourceLink {
    pub resource_link_id: Uuid,
    pub registration_id: Uuid,
    pub course_id: Option<Uuid>,
    pub custom_params: serde_json::Value,
    pub created_utc: DateTime<Utc>,
}

impl ResourceLink {
    pub fn new(
        registration_id: Uuid,
        course_id: Option<Uuid>,
        custom_params: serde_json::Value,
    ) -> Self {
        Self {
            resource_link_id: Uuid::new_v4(),
            registration_id,
            course_id,
            custom_params,
            created_utc: Utc::now(),
        }
    }

    /// The counterparty's resource link id, as sent in launch claims.
    pub fn external_id(&self) -> Option<&str> {
        self.custom_params
            .get("resource_link_id")
            .and_then(|v| v.as_str())
    }
}
