//! Web server module for handling inbound webhooks.
//!
//! Routes:
//! - `GET /` subscription handshake
//! - `POST /` message ingestion, acknowledged before relaying
//! - `GET /health` liveness check

pub mod handlers;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, receive_webhook, verify_webhook, AppState, HealthResponse, VerifyParams,
    SUBSCRIBE_MODE,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(verify_webhook).post(receive_webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
