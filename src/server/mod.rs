//! Broker service endpoint.
//!
//! # Responsibilities
//! - Accept one WebSocket session per subscriber (`/subscribe`)
//! - Expose plain HTTP probes for operators (`/healthz`, `/status`)
//! - Wire sessions to the broker and the external collaborators
//!
//! # Data Flow
//! ```text
//! ws upgrade → session.rs
//!     Attach (first frame) → broker registry
//!     broker push → Update frame
//!     pull frames → broker rotation / load-status / usage collaborators
//! ```

pub mod session;

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::broker::Broker;
use crate::lifecycle::Shutdown;
use crate::source::{LoadStatusSource, UsageSink};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<Broker>,
    pub load_status: Option<Arc<dyn LoadStatusSource>>,
    pub usage: Arc<dyn UsageSink>,
    /// Sessions watch this so a stopping service drops its duplex sessions
    /// instead of pinning the drain forever.
    pub shutdown: Arc<Shutdown>,
}

/// Build the axum router for the broker endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/subscribe", get(subscribe_handler))
        .route("/healthz", get(healthz_handler))
        .route("/status", get(status_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the endpoint until the shutdown signal fires.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Broker endpoint starting");

    let shutdown = state.shutdown.clone();
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    tracing::info!("Broker endpoint stopped");
    Ok(())
}

async fn subscribe_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::handle_session(socket, state))
}

async fn healthz_handler() -> &'static str {
    "ok"
}

async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (views, cursor) = state.broker.rotation_stats();
    Json(serde_json::json!({
        "subscribers": state.broker.subscriber_count(),
        "views": views,
        "cursor": cursor,
    }))
}
