use lti_service::{
    build_router,
    config::LtiConfig,
    db::{create_pool, run_migrations, Database},
    middleware::rate_limit::{create_ip_rate_limiter, create_login_rate_limiter},
    observability::init_tracing,
    services::{
        jwks_fetch::HttpJwksFetcher, keys::KeyService, launch_cache::RedisLaunchCache,
    },
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), lti_service::error::AppError> {
    dotenvy::dotenv().ok();

    // Load configuration - fail fast if invalid
    let config = LtiConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting LTI service"
    );

    tracing::info!("Initializing database connection");
    let pool = create_pool(&config.database).await?;
    run_migrations(&pool)
        .await
        .map_err(|e| lti_service::error::AppError::InternalError(anyhow::anyhow!(e)))?;
    tracing::info!("Database initialized successfully");

    let database = Arc::new(Database::new(pool));

    let launch_states = Arc::new(RedisLaunchCache::new(&config.redis.url).await?);
    tracing::info!("Launch state cache initialized");

    let keys = KeyService::new(&config.keys)?;
    tracing::info!(key_id = %keys.key_id(), "Signing keys loaded");

    let jwks_fetcher = Arc::new(HttpJwksFetcher::new(config.lti.jwks_timeout_seconds)?);

    let login_rate_limiter = create_login_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login and Global IP");

    let state = AppState {
        config: config.clone(),
        registrations: database.clone(),
        directory: database.clone(),
        gradebook: database,
        launch_states,
        keys,
        jwks_fetcher,
        login_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
