pub mod ags;
pub mod lti;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard error body returned by every handler.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
