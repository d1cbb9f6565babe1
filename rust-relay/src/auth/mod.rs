//! Salesforce access token acquisition.
//!
//! A [`TokenProvider`] exchanges credentials at the OAuth token endpoint using
//! one of two [`TokenStrategy`] variants, picked once at startup:
//!
//! - [`AssertionStrategy`]: RS256 signed assertion, JWT-bearer grant
//! - [`PasswordStrategy`]: resource-owner password grant
//!
//! Tokens are never cached. Every relayed message asks for a fresh one.

pub mod assertion;
pub mod password;
pub mod types;

use reqwest::Client;
use tracing::{error, info};
use url::Url;

use crate::config::{AuthConfig, Config};
use crate::util::preview;

pub use assertion::{AssertionClaims, AssertionStrategy, ASSERTION_LIFETIME_SECS, JWT_BEARER_GRANT};
pub use password::{PasswordStrategy, PASSWORD_GRANT};
pub use types::{AccessToken, TokenError, TokenResponse};

/// The credential exchange used to obtain access tokens.
pub enum TokenStrategy {
    Assertion(AssertionStrategy),
    Password(PasswordStrategy),
}

impl TokenStrategy {
    /// Build the strategy matching the configured auth flow.
    pub fn from_config(auth: &AuthConfig) -> Result<Self, TokenError> {
        match auth {
            AuthConfig::JwtBearer {
                client_id,
                username,
                audience,
                private_key_pem,
            } => Ok(TokenStrategy::Assertion(AssertionStrategy::new(
                client_id.clone(),
                username.clone(),
                audience.clone(),
                private_key_pem.expose().as_bytes(),
            )?)),
            AuthConfig::Password {
                client_id,
                client_secret,
                username,
                password,
            } => Ok(TokenStrategy::Password(PasswordStrategy::new(
                client_id.clone(),
                client_secret.clone(),
                username.clone(),
                password.clone(),
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenStrategy::Assertion(_) => "jwt",
            TokenStrategy::Password(_) => "password",
        }
    }

    /// Form fields for one token request.
    fn grant_form(&self) -> Result<Vec<(&'static str, String)>, TokenError> {
        match self {
            TokenStrategy::Assertion(s) => s.grant_form(),
            TokenStrategy::Password(s) => Ok(s.grant_form()),
        }
    }
}

/// Obtains bearer tokens from the identity provider.
pub struct TokenProvider {
    client: Client,
    token_url: Url,
    strategy: TokenStrategy,
}

impl TokenProvider {
    pub fn new(client: Client, token_url: Url, strategy: TokenStrategy) -> Self {
        Self {
            client,
            token_url,
            strategy,
        }
    }

    /// Build a provider from the application configuration.
    pub fn from_config(config: &Config, client: Client) -> Result<Self, TokenError> {
        let strategy = TokenStrategy::from_config(&config.auth)?;
        Ok(Self::new(client, config.token_url.clone(), strategy))
    }

    pub fn strategy(&self) -> &TokenStrategy {
        &self.strategy
    }

    /// Acquire a token, logging and swallowing any failure.
    ///
    /// `None` means "do not proceed"; callers must drop the message.
    pub async fn acquire_token(&self) -> Option<AccessToken> {
        match self.request_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                error!(
                    strategy = self.strategy.name(),
                    token_url = %self.token_url,
                    error = %e,
                    "token_request_failed"
                );
                None
            }
        }
    }

    /// Perform one token exchange.
    pub async fn request_token(&self) -> Result<AccessToken, TokenError> {
        let form = self.strategy.grant_form()?;

        info!(strategy = self.strategy.name(), "token_request_starting");

        let response = self
            .client
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TokenError::Status {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| TokenError::InvalidResponse(e.to_string()))?;

        let token = parsed.into_access_token()?;

        info!(
            strategy = self.strategy.name(),
            has_instance_url = token.instance_url().is_some(),
            "token_request_complete"
        );

        Ok(token)
    }
}
