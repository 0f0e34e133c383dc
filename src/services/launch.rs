//! Launch callback validation.
//!
//! A launch must present a state token we minted and an id_token signed by
//! the registered counterparty. State consumption is single-use; every
//! token-level failure collapses into the same `InvalidToken` outcome so
//! the response reveals nothing about which check failed.

use crate::error::AppError;
use crate::models::Registration;
use crate::services::jwks_fetch::JwksFetcher;
use crate::services::launch_cache::LaunchStateCache;
use crate::services::ssrf;
use crate::services::stores::RegistrationStore;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

pub const MESSAGE_TYPE_RESOURCE_LINK: &str = "LtiResourceLinkRequest";
pub const MESSAGE_TYPE_DEEP_LINKING: &str = "LtiDeepLinkingRequest";

/// Claims we read from a validated id_token.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchClaims {
    pub iss: String,
    pub aud: serde_json::Value,
    pub sub: Option<String>,
    pub exp: i64,
    pub iat: Option<i64>,
    pub nonce: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/message_type")]
    pub message_type: Option<String>,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/deployment_id")]
    pub deployment_id: Option<String>,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/resource_link")]
    pub resource_link: Option<ResourceLinkClaim>,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti/claim/ext")]
    pub ext: Option<ExtClaim>,
    #[serde(rename = "https://purl.imsglobal.org/spec/lti-dl/claim/deep_linking_settings")]
    pub deep_linking_settings: Option<DeepLinkingSettingsClaim>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceLinkClaim {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtClaim {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeepLinkingSettingsClaim {
    pub deep_link_return_url: Option<String>,
    pub data: Option<String>,
}

impl LaunchClaims {
    /// Best email claim available: the standard claim, then the ext block.
    pub fn best_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or_else(|| self.ext.as_ref().and_then(|e| e.email.as_deref()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    ResourceLinkRequest,
    DeepLinkingRequest,
    Unrecognized,
}

impl MessageType {
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim {
            Some(MESSAGE_TYPE_RESOURCE_LINK) => MessageType::ResourceLinkRequest,
            Some(MESSAGE_TYPE_DEEP_LINKING) => MessageType::DeepLinkingRequest,
            _ => MessageType::Unrecognized,
        }
    }
}

/// Validates a launch callback end to end: consumes the state, re-reads the
/// registration, fetches the counterparty's keys and verifies the id_token
/// signature, issuer, audience, expiry and nonce.
pub async fn validate_launch(
    cache: &dyn LaunchStateCache,
    registrations: &dyn RegistrationStore,
    fetcher: &dyn JwksFetcher,
    state_token: &str,
    id_token: &str,
) -> Result<(LaunchClaims, Registration), AppError> {
    let launch_state = cache
        .take(state_token)
        .await?
        .ok_or(AppError::InvalidState)?;

    let registration = registrations
        .find_by_id(launch_state.registration_id)
        .await?
        .filter(Registration::is_active)
        .ok_or(AppError::RegistrationNotFound)?;

    // The registration may have been edited since login initiation, so the
    // outbound guard runs on every launch, before any network traffic.
    if let Err(e) = ssrf::validate_url(&registration.jwks_url) {
        tracing::warn!(
            registration_id = %registration.registration_id,
            "rejected jwks_url: {}", e
        );
        return Err(AppError::InvalidToken);
    }

    let jwks = fetcher.fetch(&registration.jwks_url).await.map_err(|e| {
        tracing::warn!(
            registration_id = %registration.registration_id,
            "failed to fetch counterparty keys: {}", e
        );
        AppError::InvalidToken
    })?;

    let header = jsonwebtoken::decode_header(id_token).map_err(|e| {
        tracing::warn!("unparseable id_token header: {}", e);
        AppError::InvalidToken
    })?;

    let jwk = match &header.kid {
        Some(kid) => jwks.find(kid),
        // Tolerate a missing kid only when the set is unambiguous.
        None if jwks.keys.len() == 1 => jwks.keys.first(),
        None => None,
    }
    .ok_or_else(|| {
        tracing::warn!(kid = ?header.kid, "no matching key in counterparty key set");
        AppError::InvalidToken
    })?;

    let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| {
        tracing::warn!("unusable counterparty key: {}", e);
        AppError::InvalidToken
    })?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[&registration.issuer]);
    validation.set_audience(&[&registration.client_id]);

    let data = jsonwebtoken::decode::<LaunchClaims>(id_token, &decoding_key, &validation)
        .map_err(|e| {
            tracing::warn!(
                registration_id = %registration.registration_id,
                "id_token rejected: {}", e
            );
            AppError::InvalidToken
        })?;
    let claims = data.claims;

    if claims.nonce.as_deref() != Some(launch_state.nonce.as_str()) {
        tracing::warn!(
            registration_id = %registration.registration_id,
            "id_token nonce does not match login initiation"
        );
        return Err(AppError::InvalidToken);
    }

    Ok((claims, registration))
}
