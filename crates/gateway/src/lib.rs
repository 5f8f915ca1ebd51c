//! HTTP front door of the image-generation relay.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /generate` | Run one generation request end to end |
//! | `GET /api/key-status` | Whether a default OpenRouter key is configured |
//! | `GET /api/modelscope-key-status` | Same, for ModelScope |
//! | `GET /api/volcengine-key-status` | Same, for Volcengine |
//!
//! CORS is permissive so browser front-ends on any origin can call the relay.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request decoding, credential resolution, and
//! error-to-status mapping live here. Generation itself is delegated to
//! [`providers::Backend`]; the only shared state is the immutable
//! [`GatewayConfig`].

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod config;
pub mod error;
pub mod routes;

pub use config::{ConfigError, GatewayConfig};
pub use error::{status_for, ApiError};

/// Builds the application router around `config`.
pub fn router(config: GatewayConfig) -> Router {
    Router::new()
        .route("/generate", post(routes::generate))
        .route("/api/key-status", get(routes::openrouter_key_status))
        .route("/api/modelscope-key-status", get(routes::modelscope_key_status))
        .route("/api/volcengine-key-status", get(routes::volcengine_key_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(config))
}

/// Binds `config.bind_addr` and serves until `shutdown` resolves.
pub async fn serve<F>(config: GatewayConfig, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;
    info!(addr = %addr, "relay listening");
    axum::serve(listener, router(config))
        .with_graceful_shutdown(shutdown)
        .await
}
