//! HTTP server for the exam pass predictor.
//!
//! Serves a single form page at `/` (GET renders it, POST submits it and
//! renders the prediction) plus a JSON `/health` endpoint.
//!
//! The model and encoders are loaded once in [`ServerState::new`], before the
//! listener is bound, and are never mutated afterwards, so handlers share them
//! through an `Arc` without locking. A failed load is terminal: every request
//! shows the stored error message.
//!
//! Structured logging via [`tracing`], with per-request spans from
//! `tower_http`.

pub mod handlers;
pub mod types;

pub use handlers::{health_handler, index_handler, predict_handler, MAX_BODY_BYTES};
pub use types::{HealthResponse, ServerConfig, DEFAULT_ENCODERS_PATH, DEFAULT_MODEL_PATH};

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use eyre::Result;
use tracing::info;

use crate::artifacts::LoadState;

// ---------------------------------------------------------------------------
// Server state
// ---------------------------------------------------------------------------

pub struct ServerState {
    pub config: ServerConfig,
    /// Outcome of startup loading; fixed for the lifetime of the process.
    pub artifacts: LoadState,
    pub start_time: Instant,
}

impl ServerState {
    /// Load the artifacts named in `config` and assemble the shared state.
    pub fn new(config: ServerConfig) -> Self {
        let artifacts = LoadState::load(&config.model_path, &config.encoders_path);
        Self::with_artifacts(config, artifacts)
    }

    /// Assemble the state around an already computed load outcome.
    pub fn with_artifacts(config: ServerConfig, artifacts: LoadState) -> Self {
        Self {
            config,
            artifacts,
            start_time: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP server
// ---------------------------------------------------------------------------

/// Build the application router over shared state.
pub fn router(state: Arc<ServerState>) -> Router {
    use axum::{extract::DefaultBodyLimit, routing::get};
    use tower_http::trace::TraceLayer;

    Router::new()
        .route(
            "/",
            get(handlers::index_handler).post(handlers::predict_handler),
        )
        .route("/health", get(handlers::health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Run the HTTP server (blocking)
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let bind_addr = config.bind_addr;

    // Loading completes before the listener exists, so no request can observe
    // a partially initialized state.
    let state = Arc::new(ServerState::new(config));
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(bind = %bind_addr, "exampass server listening");
    info!("Endpoints: GET / (form), POST / (predict), GET /health");
    if let Some(message) = state.artifacts.error_message() {
        info!(error = %message, "serving in error mode; predictions disabled");
    }

    // Graceful shutdown on SIGTERM/SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGTERM handler");
            None
        }
    };
    #[cfg(unix)]
    let sigterm_recv = async {
        match sigterm.as_mut() {
            Some(s) => s.recv().await,
            None => std::future::pending().await,
        }
    };
    #[cfg(not(unix))]
    let sigterm_recv = std::future::pending::<Option<()>>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down gracefully"),
        _ = sigterm_recv => info!("received SIGTERM, shutting down gracefully"),
    }
}
