//! ORC API server - document review over HTTP
//!
//! Exposes the three-agent pipeline and the human review workflow as a
//! JSON API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     ORC Server                       │
//! ├──────────────────────────────────────────────────────┤
//! │   POST /api/orchestrate        upload + pipeline     │
//! │   GET  /api/session/:id        review snapshot       │
//! │   POST /api/session/:id/...    approve/reject/flag   │
//! │   GET  /api/audit              decision trail        │
//! │   POST /api/comms/compose      vendor email drafts   │
//! ├──────────────────────────────────────────────────────┤
//! │              AppState (sessions, logs)               │
//! │                        │                             │
//! │              Orchestrator + EmailComposer            │
//! │                        │                             │
//! │              ModelGateway (key rotation)             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - **Single-shot review**: each session accepts exactly one decision
//! - **Audit trail**: every decision recorded, exportable as JSON or CSV
//! - **Draft lifecycle**: composed emails move through pending/approved/sent
//! - **Graceful degradation**: extraction or compliance failures still
//!   return the classification

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, Result, ServerError};
pub use state::AppState;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upload size ceiling for `POST /api/orchestrate`
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the API router on top of shared state
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/orchestrate", post(handlers::orchestrate))
        .route("/api/session/:id", get(handlers::get_session))
        .route("/api/session/:id/approve", post(handlers::approve_session))
        .route("/api/session/:id/reject", post(handlers::reject_session))
        .route("/api/session/:id/flag", post(handlers::flag_session))
        .route(
            "/api/audit",
            get(handlers::list_audit).delete(handlers::clear_audit),
        )
        .route("/api/audit/export", get(handlers::export_audit))
        .route("/api/comms", get(handlers::list_drafts))
        .route("/api/comms/compose", post(handlers::compose_email))
        .route("/api/comms/:id/approve", post(handlers::approve_draft))
        .route("/api/comms/:id/reject", post(handlers::reject_draft))
        .route("/api/comms/:id/sent", post(handlers::mark_draft_sent))
        .route("/api/comms/:id", delete(handlers::delete_draft))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let state = Arc::new(AppState::new(&config));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("ORC server v{} listening on {}", VERSION, addr);
    axum::serve(listener, router).await?;
    Ok(())
}
