//! JWT-bearer grant (RFC 7523) with an RS256 signed assertion.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use super::types::TokenError;

/// Grant type sent with the signed assertion.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertions are valid for three minutes.
pub const ASSERTION_LIFETIME_SECS: u64 = 180;

/// Claim set of the assertion presented to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Connected app consumer key
    pub iss: String,
    /// Salesforce username
    pub sub: String,
    /// Authorization server audience
    pub aud: String,
    /// Expiry, Unix epoch seconds
    pub exp: u64,
}

/// Signs fresh assertions for every token request.
pub struct AssertionStrategy {
    client_id: String,
    username: String,
    audience: String,
    key: EncodingKey,
}

impl AssertionStrategy {
    /// Parse the PEM private key and keep it ready for signing.
    pub fn new(
        client_id: String,
        username: String,
        audience: String,
        private_key_pem: &[u8],
    ) -> Result<Self, TokenError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;

        Ok(Self {
            client_id,
            username,
            audience,
            key,
        })
    }

    /// Claims for an assertion issued at `now` (Unix seconds).
    pub fn claims_at(&self, now: u64) -> AssertionClaims {
        AssertionClaims {
            iss: self.client_id.clone(),
            sub: self.username.clone(),
            aud: self.audience.clone(),
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Sign the claims with RS256.
    pub fn sign(&self, claims: &AssertionClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::RS256), claims, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub(crate) fn grant_form(&self) -> Result<Vec<(&'static str, String)>, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let assertion = self.sign(&self.claims_at(now))?;

        Ok(vec![
            ("grant_type", JWT_BEARER_GRANT.to_string()),
            ("assertion", assertion),
        ])
    }
}
