//! Builds signed deep linking response JWTs.
//!
//! The roles flip for this message: we sign as the client (iss = our
//! client_id) and the counterparty's issuer becomes the audience.

use crate::dtos::lti::DeepLinkResponseRequest;
use crate::error::AppError;
use crate::models::Registration;
use crate::services::keys::KeyService;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

pub const MESSAGE_TYPE_DEEP_LINKING_RESPONSE: &str = "LtiDeepLinkingResponse";
pub const LTI_VERSION: &str = "1.3.0";

#[derive(Debug, Serialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub item_type: &'static str,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub struct DeepLinkResponseClaims {
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub nonce: String,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/message_type")]
    pub message_type: &'static str,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/version")]
    pub version: &'static str,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/deployment_id")]
    pub deployment_id: String,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti-dl/claim/content_items")]
    pub content_items: Vec<ContentItem>,
    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti-dl/claim/data",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<String>,
}

/// Signs the picked content items into a response JWT. Items with a blank
/// title or url are dropped rather than rejected; an empty selection is a
/// valid response meaning "nothing picked".
pub fn build_deep_link_response(
    keys: &KeyService,
    registration: &Registration,
    request: &DeepLinkResponseRequest,
    expiry_seconds: i64,
) -> Result<String, AppError> {
    let content_items: Vec<ContentItem> = request
        .items
        .iter()
        .filter(|item| !item.title.trim().is_empty() && !item.url.trim().is_empty())
        .map(|item| ContentItem {
            item_type: "ltiResourceLink",
            title: item.title.trim().to_string(),
            url: item.url.trim().to_string(),
            custom: item.custom_params.clone(),
        })
        .collect();

    let now = Utc::now();
    let claims = DeepLinkResponseClaims {
        iss: registration.client_id.clone(),
        aud: registration.issuer.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(expiry_seconds)).timestamp(),
        nonce: Uuid::new_v4().to_string(),
        message_type: MESSAGE_TYPE_DEEP_LINKING_RESPONSE,
        version: LTI_VERSION,
        deployment_id: registration.deployment_id.clone(),
        content_items,
        data: request.data.clone(),
    };

    let kid = registration
        .signing_key_id
        .as_deref()
        .unwrap_or_else(|| keys.key_id());
    keys.sign_claims(&claims, kid)
}
