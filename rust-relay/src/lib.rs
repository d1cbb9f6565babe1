//! WA Relay - WhatsApp Cloud API webhook relay for Salesforce.
//!
//! The library backs the `wa-relay` binary:
//! - `web`: handshake and ingestion endpoints
//! - `auth`: access tokens via the JWT-bearer or password grant
//! - `forward`: delivery to the Apex REST endpoint
//! - `relay`: detached, bounded delivery tasks tying the two together
//!
//! ## Architecture
//!
//! ```text
//! WhatsApp → POST / → 200 ─┐
//!                          └→ Relay → token endpoint → Apex REST
//! ```

pub mod auth;
pub mod config;
pub mod forward;
pub mod relay;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use auth::{AccessToken, TokenError, TokenProvider, TokenStrategy};
pub use config::{AuthConfig, AuthFlow, Config, ConfigError};
pub use forward::{ForwardError, Forwarder, MESSAGE_PATH};
pub use relay::{Relay, RelayOutcome};
pub use web::{router, AppState};
