pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod services;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{openapi::security::SecurityScheme, Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::LtiConfig;
use crate::error::AppError;
use crate::middleware::ags_auth::ags_auth_middleware;
use crate::middleware::rate_limit::{
    ip_rate_limit_middleware, login_rate_limit_middleware, IpRateLimiter, LoginRateLimiter,
};
use crate::middleware::security_headers::security_headers_middleware;
use crate::middleware::tracing::request_id_middleware;
use crate::services::jwks_fetch::JwksFetcher;
use crate::services::keys::KeyService;
use crate::services::launch_cache::LaunchStateCache;
use crate::services::stores::{Directory, Gradebook, RegistrationStore};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::well_known::jwks,
        handlers::lti::oidc_login,
        handlers::lti::launch,
        handlers::lti::deep_link_response,
        handlers::ags::list_line_items,
        handlers::ags::get_line_item,
        handlers::ags::create_line_item,
        handlers::ags::list_results,
        handlers::ags::post_score,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::lti::LaunchRequest,
            dtos::lti::ContentItemInput,
            dtos::lti::DeepLinkResponseRequest,
            dtos::lti::DeepLinkResponseBody,
            dtos::ags::LineItemResponse,
            dtos::ags::CreateLineItemRequest,
            dtos::ags::ResultResponse,
            dtos::ags::ScoreRequest,
            dtos::ags::ScoreResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "lti", description = "Login initiation, launch and deep linking"),
        (name = "ags", description = "Assignment and Grade Services"),
        (name = "well-known", description = "Public service metadata"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: LtiConfig,
    pub registrations: Arc<dyn RegistrationStore>,
    pub directory: Arc<dyn Directory>,
    pub gradebook: Arc<dyn Gradebook>,
    pub launch_states: Arc<dyn LaunchStateCache>,
    pub keys: KeyService,
    pub jwks_fetcher: Arc<dyn JwksFetcher>,
    pub login_rate_limiter: LoginRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // AGS routes sit behind bearer token authentication.
    let ags_routes = Router::new()
        .route(
            "/lti/ags/lineitems",
            get(handlers::ags::list_line_items).post(handlers::ags::create_line_item),
        )
        .route("/lti/ags/lineitems/:activity_id", get(handlers::ags::get_line_item))
        .route(
            "/lti/ags/lineitems/:activity_id/results",
            get(handlers::ags::list_results),
        )
        .route(
            "/lti/ags/lineitems/:activity_id/scores",
            post(handlers::ags::post_score),
        )
        .layer(from_fn_with_state(state.keys.clone(), ags_auth_middleware));

    // Login initiation carries its own throttle on top of the global one.
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/lti/login", get(handlers::lti::oidc_login))
        .layer(from_fn_with_state(login_limiter, login_rate_limit_middleware));

    let ip_limiter = state.ip_rate_limiter.clone();

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/.well-known/jwks.json", get(handlers::well_known::jwks));

    let swagger_enabled = match state.config.environment {
        config::Environment::Dev => true,
        config::Environment::Prod => match state.config.swagger.enabled {
            config::SwaggerMode::Public | config::SwaggerMode::Authenticated => true,
            config::SwaggerMode::Disabled => false,
        },
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        );
    }

    let app = app
        .route("/lti/launch", post(handlers::lti::launch))
        .route(
            "/lti/deep-link/response",
            post(handlers::lti::deep_link_response),
        )
        .merge(login_route)
        .merge(ags_routes)
        .with_state(state.clone())
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<HeaderValue>>(),
                )
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    Ok(app)
}
