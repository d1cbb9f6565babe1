//! Webhook endpoint handlers.
//!
//! These handlers are designed to be extremely fast - they only:
//! 1. Answer the subscription handshake, or
//! 2. Hand the payload to the background relay and return immediately
//!
//! Token acquisition and forwarding never delay the acknowledgment.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::relay::Relay;
use crate::Config;

/// The only `hub.mode` the platform uses for the handshake.
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub relay: Relay,
}

impl AppState {
    pub fn new(config: Config, relay: Relay) -> Self {
        Self {
            config: Arc::new(config),
            relay,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Subscription Handshake
// =============================================================================

/// Handshake query parameters.
///
/// All fields are optional so a malformed handshake gets a 403 rather than
/// an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(default, rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(default, rename = "hub.challenge")]
    pub challenge: Option<String>,
    #[serde(default, rename = "hub.verify_token")]
    pub verify_token: Option<String>,
}

impl VerifyParams {
    /// Whether this is a subscribe request carrying the expected token.
    pub fn is_valid(&self, expected_token: Option<&str>) -> bool {
        match (self.mode.as_deref(), self.verify_token.as_deref(), expected_token) {
            (Some(SUBSCRIBE_MODE), Some(provided), Some(expected)) => provided == expected,
            _ => false,
        }
    }
}

/// `GET /` handshake endpoint.
///
/// Echoes `hub.challenge` verbatim when the mode and token match,
/// otherwise answers 403 with an empty body.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    let expected = state.config.verify_token.as_ref().map(|t| t.expose());

    if expected.is_none() {
        warn!("webhook_verify_token_not_configured");
    }

    if params.is_valid(expected) {
        info!("webhook_verified");
        return (StatusCode::OK, params.challenge.unwrap_or_default());
    }

    warn!(
        mode = ?params.mode,
        has_verify_token = params.verify_token.is_some(),
        "webhook_verification_failed"
    );

    (StatusCode::FORBIDDEN, String::new())
}

// =============================================================================
// Message Ingestion
// =============================================================================

/// Whether the request declares a JSON body (`application/json` or `+json`).
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

/// Turn a raw request body into the payload to relay.
///
/// Empty bodies and non-JSON content types become `{}`. Only a body that
/// claims to be JSON and fails to parse is an error.
pub fn parse_payload(headers: &HeaderMap, body: &[u8]) -> Result<Value, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) || !is_json_content_type(headers) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body)
}

/// `POST /` ingestion endpoint.
///
/// Acknowledged with an empty 200 and relayed in the background. A body
/// sent as JSON that does not parse gets a 400 and is not relayed.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let payload = match parse_payload(&headers, &body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, body_length = body.len(), "webhook_body_invalid_json");
            return StatusCode::BAD_REQUEST;
        }
    };

    info!(body_length = body.len(), "webhook_received");

    // Not awaited: the platform needs its 200 before Salesforce is contacted.
    state.relay.dispatch(payload);

    StatusCode::OK
}
