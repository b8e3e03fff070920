//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with the public, static and protected routes
//! - Middleware stack (auth, logging, compression, CORS)
//! - Storage link setup and graceful shutdown

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id, shared_token_auth};
use crate::routes::{articles, banner, files, health, not_found};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::handler::HandlerWithoutStateExt;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Build the Axum router with all routes and middleware
///
/// Routes are divided into:
/// - Public routes: /, /health, /api/public-file/* (no auth required)
/// - Static routes: /images/*, /storage/*
/// - Protected routes: POST /api/articles/{id}/process-images (shared token required)
///
/// The `/images` and `/storage` trees are read through the public storage
/// link, which [`start_server`] creates.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let config = state.config.clone();

    let public_routes = Router::new()
        .route("/", get(banner))
        .route("/health", get(health::health_check))
        .route(
            "/api/public-file/{article_id}/{filename}",
            get(files::public_file),
        );

    let protected_routes = Router::new()
        .route(
            "/api/articles/{article_id}/process-images",
            post(articles::process_images),
        )
        .layer(DefaultBodyLimit::max(config.max_body_size()))
        .layer(from_fn_with_state(state.clone(), shared_token_auth));

    let images = ServeDir::new(config.public_images_dir())
        .not_found_service(files::image_missing.into_service());
    let storage = ServeDir::new(config.public_storage_link())
        .not_found_service(files::storage_missing.into_service());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/images", images)
        .nest_service("/storage", storage)
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.allowed_origins))
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::OPTIONS]);
    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "invalid cors origin");
                None
            }
        })
        .collect::<Vec<_>>();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Install the JSON log subscriber.
///
/// `level` is an `EnvFilter` directive such as `info` or
/// `debug,tower_http=warn`; an invalid directive falls back to `info`.
/// Calling this twice is a no-op.
pub fn init_tracing(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(level))
        .with_target(false)
        .with_thread_ids(true)
        .json()
        .try_init();
}

fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Start the imgdepot HTTP server
///
/// Blocks until the server is shut down via SIGTERM or Ctrl+C. Logging is
/// installed here from `config.log_level`.
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
///
/// Startup creates the storage root and the `<public>/storage` link to it.
/// A link that cannot be created is logged and the server starts anyway.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(&config.log_level);
    for setting in &config.defaulted {
        tracing::warn!(setting = %setting, "{setting} not set, using default");
    }
    health::mark_started();

    let link = store::ensure_public_link(&config.storage_dir, &config.public_storage_link());
    tracing::info!(status = ?link, "storage_link_checked");

    let addr = config.socket_addr();
    tracing::info!(
        host = %config.host,
        addr = %addr,
        clients = config.shared_tokens.len(),
        origins = config.allowed_origins.len(),
        "Starting imgdepot server"
    );
    tracing::info!(
        "Timeout: {}s, Max body: {}MB, Max images: {}",
        config.timeout_secs,
        config.max_body_size_mb,
        config.ingest.max_images
    );

    let state = Arc::new(ServerState::new(config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
