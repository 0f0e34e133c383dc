mod common;

use axum::http::StatusCode;
use common::TestApp;
use lti_service::models::{Registration, RegistrationStatus};
use lti_service::services::launch_cache::LaunchStateCache;
use std::collections::HashMap;
use tower::util::ServiceExt;
use uuid::Uuid;

fn seeded_registration() -> Registration {
    Registration::new(
        Uuid::new_v4(),
        "https://platform.example.com".to_string(),
        "client-abc".to_string(),
        "deployment-1".to_string(),
        "https://platform.example.com/auth".to_string(),
        "https://platform.example.com/jwks.json".to_string(),
    )
}

fn location_params(location: &str) -> (String, HashMap<String, String>) {
    let (base, query) = location.split_once('?').expect("redirect should have a query");
    let params: HashMap<String, String> = serde_urlencoded::from_str(query).unwrap();
    (base.to_string(), params)
}

#[tokio::test]
async fn test_login_redirects_to_platform() {
    let app = TestApp::new();
    let registration = seeded_registration();
    app.registry.add_registration(registration);

    let response = app
        .router()
        .await
        .oneshot(common::get(
            "/lti/login?iss=https%3A%2F%2Fplatform.example.com&client_id=client-abc&login_hint=user-42",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()["location"].to_str().unwrap().to_string();
    let (base, params) = location_params(&location);

    assert_eq!(base, "https://platform.example.com/auth");
    assert_eq!(params["scope"], "openid");
    assert_eq!(params["response_type"], "id_token");
    assert_eq!(params["response_mode"], "form_post");
    assert_eq!(params["client_id"], "client-abc");
    assert_eq!(params["redirect_uri"], "http://localhost:8080/lti/launch");
    assert_eq!(params["login_hint"], "user-42");

    let state = &params["state"];
    let nonce = &params["nonce"];
    assert_eq!(state.len(), 64);
    assert!(state.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(nonce.len(), 32);
    assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));

    // The state record is stored for the launch callback.
    let stored = app.cache.take(state).await.unwrap().expect("state stored");
    assert_eq!(&stored.nonce, nonce);
}

#[tokio::test]
async fn test_login_without_hint_omits_param() {
    let app = TestApp::new();
    app.registry.add_registration(seeded_registration());

    let response = app
        .router()
        .await
        .oneshot(common::get(
            "/lti/login?iss=https%3A%2F%2Fplatform.example.com&client_id=client-abc",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(!location.contains("login_hint"));
    assert!(!location.contains("lti_message_hint"));
}

#[tokio::test]
async fn test_login_unknown_registration_is_404() {
    let app = TestApp::new();

    let response = app
        .router()
        .await
        .oneshot(common::get(
            "/lti/login?iss=https%3A%2F%2Funknown.example.com&client_id=client-abc",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.cache.is_empty());
}

#[tokio::test]
async fn test_login_inactive_registration_is_404() {
    let app = TestApp::new();
    let mut registration = seeded_registration();
    registration.status_code = RegistrationStatus::Inactive.as_str().to_string();
    app.registry.add_registration(registration);

    let response = app
        .router()
        .await
        .oneshot(common::get(
            "/lti/login?iss=https%3A%2F%2Fplatform.example.com&client_id=client-abc",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_consecutive_logins_use_fresh_state() {
    let app = TestApp::new();
    app.registry.add_registration(seeded_registration());
    let router = app.router().await;

    let uri = "/lti/login?iss=https%3A%2F%2Fplatform.example.com&client_id=client-abc";
    let first = router.clone().oneshot(common::get(uri)).await.unwrap();
    let second = router.oneshot(common::get(uri)).await.unwrap();

    let (_, first_params) =
        location_params(first.headers()["location"].to_str().unwrap());
    let (_, second_params) =
        location_params(second.headers()["location"].to_str().unwrap());

    assert_ne!(first_params["state"], second_params["state"]);
    assert_ne!(first_params["nonce"], second_params["nonce"]);
    assert_eq!(app.cache.len(), 2);
}
