//! Token endpoint response and error types.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Errors returned while obtaining an access token.
///
/// Formatted output never contains credentials or the issued token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The private key could not be parsed.
    #[error("invalid assertion signing key: {0}")]
    InvalidKey(String),

    /// Signing the assertion failed.
    #[error("assertion signing failed: {0}")]
    Signing(String),

    /// Connection, TLS or timeout failure talking to the token endpoint.
    #[error("token endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The token endpoint answered with a non-2xx status.
    #[error("token endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not a usable token response.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

/// Successful token endpoint response.
///
/// Only `access_token` is required. Salesforce also returns `id`,
/// `token_type`, `issued_at` and `signature`, which are ignored.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub instance_url: Option<String>,
}

impl TokenResponse {
    /// Validate the response and keep only what the forwarder needs.
    pub fn into_access_token(self) -> Result<AccessToken, TokenError> {
        let value = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TokenError::InvalidResponse("missing access_token".to_string()))?;

        Ok(AccessToken {
            value,
            instance_url: self.instance_url.filter(|u| !u.is_empty()),
        })
    }
}

/// A bearer token scoped to a single relayed message.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    instance_url: Option<String>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, instance_url: Option<String>) -> Self {
        Self {
            value: value.into(),
            instance_url,
        }
    }

    /// The raw bearer value, for the Authorization header only.
    pub fn secret(&self) -> &str {
        &self.value
    }

    /// Org base URL reported alongside the token, if any.
    pub fn instance_url(&self) -> Option<&str> {
        self.instance_url.as_deref()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_salesforce_shape() {
        let body = r#"{
            "access_token": "00Dxx!AQ0AQ",
            "instance_url": "https://acme.my.salesforce.com",
            "id": "https://login.salesforce.com/id/00Dxx/005xx",
            "token_type": "Bearer",
            "issued_at": "1700000000000",
            "signature": "abc="
        }"#;

        let token = serde_json::from_str::<TokenResponse>(body)
            .unwrap()
            .into_access_token()
            .unwrap();

        assert_eq!(token.secret(), "00Dxx!AQ0AQ");
        assert_eq!(token.instance_url(), Some("https://acme.my.salesforce.com"));
    }

    #[test]
    fn test_token_response_missing_token() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"token_type":"Bearer"}"#).unwrap();
        let err = parsed.into_access_token().unwrap_err();
        assert!(matches!(err, TokenError::InvalidResponse(_)));
    }

    #[test]
    fn test_token_response_ignores_token_type() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"T","token_type":"N_A"}"#).unwrap();
        let token = parsed.into_access_token().unwrap();
        assert_eq!(token.secret(), "T");
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("super-secret", None);
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn test_status_error_renders() {
        let e = TokenError::Status {
            status: 401,
            body: r#"{"error":"invalid_client"}"#.to_string(),
        };
        assert_eq!(
            e.to_string(),
            r#"token endpoint returned HTTP 401: {"error":"invalid_client"}"#
        );
    }
}
