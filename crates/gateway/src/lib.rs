//! HTTP gateway for Codeweaver.
//!
//! Exposes:
//! - `GET /health`
//! - `POST /api/generate` — generate code for a prompt and store it
//! - `GET /api/history` — the caller's past generations, newest first
//!
//! Built on Axum. The model client, the store, and the principal resolver
//! are trait objects so tests can substitute each one.

pub mod auth;
pub mod error;
pub mod generate;
pub mod history;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::response::Json;
use axum::{
    Router,
    routing::{get, post},
};
use codeweaver_config::{AppConfig, GatewayConfig};
use codeweaver_core::provider::CodeGenerator;
use codeweaver_core::store::GenerationStore;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub use auth::{BearerTokenResolver, ChainResolver, PrincipalResolver, TrustedHeaderResolver};
pub use error::{ApiError, HistoryError};

/// Shared application state for the gateway.
pub struct AppState {
    pub generator: Arc<dyn CodeGenerator>,
    pub store: Arc<dyn GenerationStore>,
    pub resolver: Arc<dyn PrincipalResolver>,
    /// Attribute unauthenticated generate requests to the shared
    /// placeholder user.
    pub allow_anonymous: bool,
    /// Upper bound on one model-client run.
    pub generation_timeout: Option<Duration>,
}

pub type SharedState = Arc<AppState>;

/// Build the router with all routes and layers:
/// - request body size limit
/// - CORS restricted to the configured origins
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate", post(generate::generate_handler))
        .route("/api/history", get(history::history_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Same-origin only unless origins are listed explicitly.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

/// Wire up the store, model client, and resolver from config, then serve
/// until the process is stopped.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let store = codeweaver_store::open(&config.storage).await?;
    let generator = Arc::new(codeweaver_providers::CodeModelClient::from_config(
        &config.model,
    )?);
    let resolver = Arc::new(ChainResolver::from_config(&config.auth));

    if let Some(header) = auth::trusted_header(&config.auth) {
        warn!(
            header = %header,
            "Trusting the principal header: any client that can reach this port directly can act as any user"
        );
    }
    if config.auth.allow_anonymous {
        warn!(
            "Anonymous access is enabled: unauthenticated generations are attributed to a shared placeholder user"
        );
    }

    let state = Arc::new(AppState {
        generator,
        store,
        resolver,
        allow_anonymous: config.auth.allow_anonymous,
        generation_timeout: config.gateway.generation_timeout_secs.map(Duration::from_secs),
    });

    let app = build_router(state, &config.gateway);

    info!(addr = %addr, model = %config.model.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
