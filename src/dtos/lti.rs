//! Request/response bodies for the login, launch and deep linking endpoints.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Query parameters the counterparty sends to start third-party login.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LoginInitQuery {
    pub iss: String,
    pub client_id: String,
    pub login_hint: Option<String>,
    pub lti_message_hint: Option<String>,
    pub target_link_uri: Option<String>,
}

/// Form body of the launch callback (OIDC form_post response).
#[derive(Debug, Deserialize, ToSchema)]
pub struct LaunchRequest {
    pub state: String,
    pub id_token: String,
}

/// A content item the embedding UI picked during deep linking.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ContentItemInput {
    pub title: String,
    pub url: String,
    pub custom_params: Option<HashMap<String, String>>,
}

/// Request to mint a signed deep linking response for the counterparty.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeepLinkResponseRequest {
    pub registration_id: Uuid,
    #[validate(url(message = "return_url must be a valid URL"))]
    pub return_url: String,
    /// Opaque value from the counterparty's deep linking settings, echoed
    /// back unchanged.
    pub data: Option<String>,
    pub items: Vec<ContentItemInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeepLinkResponseBody {
    pub jwt: String,
    pub return_url: String,
}
