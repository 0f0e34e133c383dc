//! Third-party-initiated login: token generation and the authorization
//! redirect back to the counterparty.

use crate::dtos::lti::LoginInitQuery;
use crate::error::AppError;
use crate::models::Registration;
use anyhow::anyhow;
use rand::RngCore;
use serde::Serialize;

/// 32 random bytes, hex encoded (64 characters).
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 16 random bytes, hex encoded (32 characters).
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug)]
pub struct LoginRedirect {
    pub state: String,
    pub nonce: String,
    pub redirect_url: String,
}

#[derive(Serialize)]
struct AuthorizationParams<'a> {
    scope: &'static str,
    response_type: &'static str,
    response_mode: &'static str,
    client_id: &'a str,
    redirect_uri: &'a str,
    state: &'a str,
    nonce: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    login_hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lti_message_hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_link_uri: Option<&'a str>,
}

/// Builds the authorization redirect for a login initiation. The state and
/// nonce are fresh per call; the caller stores them before redirecting.
pub fn build_login_redirect(
    registration: &Registration,
    query: &LoginInitQuery,
    launch_url: &str,
) -> Result<LoginRedirect, AppError> {
    let state = generate_state_token();
    let nonce = generate_nonce();

    let params = AuthorizationParams {
        scope: "openid",
        response_type: "id_token",
        response_mode: "form_post",
        client_id: &registration.client_id,
        redirect_uri: launch_url,
        state: &state,
        nonce: &nonce,
        login_hint: query.login_hint.as_deref(),
        lti_message_hint: query.lti_message_hint.as_deref(),
        target_link_uri: query.target_link_uri.as_deref(),
    };

    let query_string = serde_urlencoded::to_string(&params)
        .map_err(|e| AppError::InternalError(anyhow!("failed to encode redirect params: {}", e)))?;
    let separator = if registration.auth_login_url.contains('?') {
        '&'
    } else {
        '?'
    };
    let redirect_url = format!("{}{}{}", registration.auth_login_url, separator, query_string);

    Ok(LoginRedirect {
        state,
        nonce,
        redirect_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn registration() -> Registration {
        Registration::new(
            Uuid::new_v4(),
            "https://platform.example.com".to_string(),
            "client-abc".to_string(),
            "deployment-1".to_string(),
            "https://platform.example.com/auth".to_string(),
            "https://platform.example.com/jwks.json".to_string(),
        )
    }

    #[test]
    fn tokens_are_hex_of_the_right_length() {
        let state = generate_state_token();
        let nonce = generate_nonce();
        assert_eq!(state.len(), 64);
        assert_eq!(nonce.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(generate_state_token(), state);
    }

    #[test]
    fn redirect_carries_required_oidc_params() {
        let query = LoginInitQuery {
            iss: "https://platform.example.com".to_string(),
            client_id: "client-abc".to_string(),
            login_hint: Some("user-42".to_string()),
            lti_message_hint: None,
            target_link_uri: None,
        };
        let redirect =
            build_login_redirect(&registration(), &query, "https://lms.example.com/lti/launch")
                .unwrap();

        assert!(redirect.redirect_url.starts_with("https://platform.example.com/auth?"));
        assert!(redirect.redirect_url.contains("scope=openid"));
        assert!(redirect.redirect_url.contains("response_type=id_token"));
        assert!(redirect.redirect_url.contains("response_mode=form_post"));
        assert!(redirect.redirect_url.contains("client_id=client-abc"));
        assert!(redirect.redirect_url.contains(&format!("state={}", redirect.state)));
        assert!(redirect.redirect_url.contains(&format!("nonce={}", redirect.nonce)));
        assert!(redirect.redirect_url.contains("login_hint=user-42"));
        assert!(!redirect.redirect_url.contains("lti_message_hint"));
    }

    #[test]
    fn existing_query_string_is_extended() {
        let mut reg = registration();
        reg.auth_login_url = "https://platform.example.com/auth?tenant=abc".to_string();
        let query = LoginInitQuery {
            iss: reg.issuer.clone(),
            client_id: reg.client_id.clone(),
            login_hint: None,
            lti_message_hint: None,
            target_link_uri: None,
        };
        let redirect =
            build_login_redirect(&reg, &query, "https://lms.example.com/lti/launch").unwrap();
        assert!(redirect
            .redirect_url
            .starts_with("https://platform.example.com/auth?tenant=abc&"));
    }
}
