mod common;

use axum::http::StatusCode;
use axum::Router;
use chrono::{Duration, Utc};
use common::TestApp;
use lti_service::models::{Registration, ResourceLink, Tenant, User};
use serde_json::json;
use std::collections::HashMap;
use tower::util::ServiceExt;
use uuid::Uuid;

const ISSUER: &str = "https://platform.example.com";
const CLIENT_ID: &str = "client-abc";
const EMAIL: &str = "teacher@school.example";

struct LaunchFixture {
    app: TestApp,
    registration_id: Uuid,
}

impl LaunchFixture {
    fn new() -> Self {
        Self::with_jwks_url(format!("{}/jwks.json", ISSUER))
    }

    fn with_jwks_url(jwks_url: String) -> Self {
        let app = TestApp::new();

        let tenant = Tenant::new("Northside District".to_string());
        let tenant_id = tenant.tenant_id;
        app.directory.add_tenant(tenant);
        app.directory.add_user(User::new(
            tenant_id,
            EMAIL.to_string(),
            Some("Pat Teacher".to_string()),
        ));

        let registration = Registration::new(
            tenant_id,
            ISSUER.to_string(),
            CLIENT_ID.to_string(),
            "deployment-1".to_string(),
            format!("{}/auth", ISSUER),
            jwks_url,
        );
        let registration_id = registration.registration_id;
        app.registry.add_registration(registration);

        Self {
            app,
            registration_id,
        }
    }

    /// Runs login initiation and returns the (state, nonce) pair the
    /// service minted.
    async fn initiate_login(&self, router: &Router) -> (String, String) {
        let uri = format!(
            "/lti/login?iss={}&client_id={}",
            urlencoding::encode(ISSUER),
            CLIENT_ID
        );
        let response = router.clone().oneshot(common::get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);

        let location = response.headers()["location"].to_str().unwrap();
        let (_, query) = location.split_once('?').unwrap();
        let params: HashMap<String, String> = serde_urlencoded::from_str(query).unwrap();
        (params["state"].clone(), params["nonce"].clone())
    }

    fn base_claims(&self, nonce: &str) -> serde_json::Value {
        let now = Utc::now();
        json!({
            "iss": ISSUER,
            "aud": CLIENT_ID,
            "sub": "platform-user-1",
            "exp": (now + Duration::minutes(5)).timestamp(),
            "iat": now.timestamp(),
            "nonce": nonce,
            "email": EMAIL,
            "https://purl.imsglobal.org/spec/lti/claim/message_type": "LtiResourceLinkRequest",
            "https://purl.imsglobal.org/spec/lti/claim/deployment_id": "deployment-1",
        })
    }

    async fn post_launch(
        &self,
        router: &Router,
        state: &str,
        id_token: &str,
    ) -> axum::response::Response {
        let body = serde_urlencoded::to_string([("state", state), ("id_token", id_token)]).unwrap();
        router
            .clone()
            .oneshot(common::post_form("/lti/launch", body))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_resource_link_launch_routes_to_course() {
    let fixture = LaunchFixture::new();

    let course_id = Uuid::new_v4();
    fixture.app.registry.add_resource_link(ResourceLink::new(
        fixture.registration_id,
        Some(course_id),
        json!({ "resource_link_id": "rl-77" }),
    ));

    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let mut claims = fixture.base_claims(&nonce);
    claims["https://purl.imsglobal.org/spec/lti/claim/resource_link"] = json!({ "id": "rl-77" });
    let id_token = common::sign_platform_token(&claims);

    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()["location"],
        format!("http://localhost:3000/teach/courses/{}", course_id)
    );
    assert_eq!(fixture.app.fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_unknown_resource_link_routes_to_dashboard() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let mut claims = fixture.base_claims(&nonce);
    claims["https://purl.imsglobal.org/spec/lti/claim/resource_link"] =
        json!({ "id": "never-placed" });
    let id_token = common::sign_platform_token(&claims);

    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()["location"],
        "http://localhost:3000/dashboard"
    );
}

#[tokio::test]
async fn test_deep_linking_launch_routes_to_picker() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let mut claims = fixture.base_claims(&nonce);
    claims["https://purl.imsglobal.org/spec/lti/claim/message_type"] =
        json!("LtiDeepLinkingRequest");
    claims["https://purl.imsglobal.org/spec/lti-dl/claim/deep_linking_settings"] = json!({
        "deep_link_return_url": "https://platform.example.com/deep_links",
        "data": "opaque-session"
    });
    let id_token = common::sign_platform_token(&claims);

    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("http://localhost:3000/lti/deep-link?"));
    assert!(location.contains(&format!("registration_id={}", fixture.registration_id)));
    assert!(location.contains("return_url=https%3A%2F%2Fplatform.example.com%2Fdeep_links"));
}

#[tokio::test]
async fn test_unrecognized_message_type_routes_to_dashboard() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let mut claims = fixture.base_claims(&nonce);
    claims["https://purl.imsglobal.org/spec/lti/claim/message_type"] =
        json!("LtiSubmissionReviewRequest");
    let id_token = common::sign_platform_token(&claims);

    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()["location"],
        "http://localhost:3000/dashboard"
    );
}

#[tokio::test]
async fn test_replayed_state_is_rejected() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let id_token = common::sign_platform_token(&fixture.base_claims(&nonce));

    let first = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(first.status(), StatusCode::FOUND);

    let replay = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_state_is_rejected() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;

    let id_token = common::sign_platform_token(&fixture.base_claims("whatever"));
    let response = fixture
        .post_launch(&router, &"0".repeat(64), &id_token)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    // Nothing was fetched for a state we never issued.
    assert_eq!(fixture.app.fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_wrong_nonce_is_rejected() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, _nonce) = fixture.initiate_login(&router).await;

    let id_token = common::sign_platform_token(&fixture.base_claims("someone-elses-nonce"));
    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_issuer_is_rejected() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let mut claims = fixture.base_claims(&nonce);
    claims["iss"] = json!("https://evil.example.com");
    let id_token = common::sign_platform_token(&claims);

    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let mut claims = fixture.base_claims(&nonce);
    claims["aud"] = json!("other-client");
    let id_token = common::sign_platform_token(&claims);

    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_audience_array_containing_client_is_accepted() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let mut claims = fixture.base_claims(&nonce);
    claims["aud"] = json!([CLIENT_ID, "secondary-audience"]);
    let id_token = common::sign_platform_token(&claims);

    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let mut claims = fixture.base_claims(&nonce);
    claims["exp"] = json!((Utc::now() - Duration::hours(1)).timestamp());
    let id_token = common::sign_platform_token(&claims);

    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_signature_is_rejected() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let id_token = common::sign_platform_token(&fixture.base_claims(&nonce));
    let mut tampered = id_token.clone();
    tampered.truncate(id_token.len() - 4);
    tampered.push_str("AAAA");

    let response = fixture.post_launch(&router, &state, &tampered).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_internal_jwks_url_blocks_without_fetching() {
    let fixture =
        LaunchFixture::with_jwks_url("http://169.254.169.254/latest/meta-data/".to_string());
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let id_token = common::sign_platform_token(&fixture.base_claims(&nonce));
    let response = fixture.post_launch(&router, &state, &id_token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(fixture.app.fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_email_is_unprocessable() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let mut claims = fixture.base_claims(&nonce);
    claims["email"] = json!("stranger@school.example");
    let id_token = common::sign_platform_token(&claims);

    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_ext_email_fallback_resolves_user() {
    let fixture = LaunchFixture::new();
    let router = fixture.app.router().await;
    let (state, nonce) = fixture.initiate_login(&router).await;

    let mut claims = fixture.base_claims(&nonce);
    claims.as_object_mut().unwrap().remove("email");
    claims["https://purl.imsglobal.org/spec/lti/claim/ext"] = json!({ "email": EMAIL });
    let id_token = common::sign_platform_token(&claims);

    let response = fixture.post_launch(&router, &state, &id_token).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}
