//! Detached delivery of inbound messages to Salesforce.
//!
//! The webhook handler acknowledges the platform first and hands the payload
//! to [`Relay::dispatch`], which runs token acquisition and forwarding on a
//! tracked background task. Failures are logged and the message is dropped.
//!
//! ```text
//! POST / → 200 ─┐
//!               └→ dispatch → permit → acquire_token → forward → log
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::auth::TokenProvider;
use crate::forward::Forwarder;

/// Result of relaying one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Salesforce accepted the payload.
    Forwarded,
    /// No token could be obtained; the message was dropped.
    TokenUnavailable,
    /// The Apex call failed; the message was dropped.
    ForwardFailed,
    /// The relay had already been shut down; nothing was sent.
    Stopped,
}

impl RelayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayOutcome::Forwarded => "forwarded",
            RelayOutcome::TokenUnavailable => "token_unavailable",
            RelayOutcome::ForwardFailed => "forward_failed",
            RelayOutcome::Stopped => "stopped",
        }
    }
}

/// Shared relay handle. Cheap to clone.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    tokens: TokenProvider,
    forwarder: Forwarder,
    permits: Semaphore,
    tasks: TaskTracker,
}

impl Relay {
    /// At most `concurrency` deliveries talk to Salesforce at once.
    pub fn new(tokens: TokenProvider, forwarder: Forwarder, concurrency: usize) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                tokens,
                forwarder,
                permits: Semaphore::new(concurrency.max(1)),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Relay the payload in the background without waiting for it.
    pub fn dispatch(&self, payload: Value) -> JoinHandle<RelayOutcome> {
        let relay = self.clone();
        self.inner
            .tasks
            .spawn(async move { relay.relay_message(payload).await })
    }

    /// Acquire a token and forward the payload, absorbing every failure.
    pub async fn relay_message(&self, payload: Value) -> RelayOutcome {
        let started = Instant::now();

        // Permits are closed once shutdown has drained the tracker.
        let _permit = match self.inner.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("relay_message_dropped_after_shutdown");
                return RelayOutcome::Stopped;
            }
        };

        let outcome = match self.inner.tokens.acquire_token().await {
            None => {
                warn!("relay_message_dropped_no_token");
                RelayOutcome::TokenUnavailable
            }
            Some(token) => match self.inner.forwarder.forward(&token, &payload).await {
                Ok(_) => RelayOutcome::Forwarded,
                Err(_) => RelayOutcome::ForwardFailed,
            },
        };

        info!(
            outcome = outcome.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "relay_complete"
        );

        outcome
    }

    /// Number of deliveries currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Wait for the running deliveries, then refuse any later ones.
    pub async fn shutdown(&self) {
        self.inner.tasks.close();
        info!(in_flight = self.inner.tasks.len(), "relay_draining");
        self.inner.tasks.wait().await;
        self.inner.permits.close();
        info!("relay_drained");
    }
}
