//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup into an explicit [`Config`] that is
//! handed to the components that need it.

use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Default listen port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Default cap on concurrently running relay tasks.
pub const DEFAULT_FORWARD_CONCURRENCY: usize = 64;

/// Default timeout applied to every outbound HTTP call.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

/// Errors raised while building the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("cannot select an auth flow: set SF_AUTH_FLOW, JWT_PRIVATE or SF_PASSWORD")]
    NoAuthFlow,
}

/// A string that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the plaintext value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Which OAuth grant is used to obtain Salesforce access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    /// `urn:ietf:params:oauth:grant-type:jwt-bearer`
    JwtBearer,
    /// `password`
    Password,
}

impl AuthFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFlow::JwtBearer => "jwt",
            AuthFlow::Password => "password",
        }
    }
}

/// Credentials for the selected auth flow.
#[derive(Debug, Clone)]
pub enum AuthConfig {
    JwtBearer {
        /// Connected app consumer key, used as the assertion issuer.
        client_id: String,
        /// Salesforce username, used as the assertion subject.
        username: String,
        /// Assertion audience (login.salesforce.com or test.salesforce.com).
        audience: String,
        /// PEM encoded RSA private key.
        private_key_pem: Secret,
    },
    Password {
        client_id: String,
        client_secret: Secret,
        username: String,
        password: Secret,
    },
}

impl AuthConfig {
    pub fn flow(&self) -> AuthFlow {
        match self {
            AuthConfig::JwtBearer { .. } => AuthFlow::JwtBearer,
            AuthConfig::Password { .. } => AuthFlow::Password,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Shared secret the platform echoes back during the handshake
    pub verify_token: Option<Secret>,

    /// OAuth token endpoint
    pub token_url: Url,

    /// Credentials for the configured grant
    pub auth: AuthConfig,

    /// Downstream base URL; falls back to the token response's instance_url
    pub instance_url: Option<Url>,

    /// Maximum number of relay tasks talking to Salesforce at once
    pub forward_concurrency: usize,

    /// Timeout applied to each outbound HTTP request
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let flow = match var("SF_AUTH_FLOW") {
            Some(raw) => parse_flow(&raw)?,
            None if var("JWT_PRIVATE").is_some() => AuthFlow::JwtBearer,
            None if var("SF_PASSWORD").is_some() => AuthFlow::Password,
            None => return Err(ConfigError::NoAuthFlow),
        };

        let auth = match flow {
            AuthFlow::JwtBearer => AuthConfig::JwtBearer {
                client_id: required("SF_CLIENT_ID")?,
                username: required("SF_USERNAME")?,
                audience: required("SF_TOKEN_AUD")?,
                private_key_pem: Secret::new(normalize_pem(&required("JWT_PRIVATE")?)),
            },
            AuthFlow::Password => AuthConfig::Password {
                client_id: required("SF_CLIENT_ID")?,
                client_secret: Secret::new(required("SF_CLIENT_SECRET")?),
                username: required("SF_USERNAME")?,
                password: Secret::new(required("SF_PASSWORD")?),
            },
        };

        let token_url = parse_url("SF_TOKEN_URL", &required("SF_TOKEN_URL")?)?;

        let instance_url = match var("SF_INSTANCE_URL") {
            Some(raw) => Some(parse_url("SF_INSTANCE_URL", &raw)?),
            None => None,
        };

        Ok(Config {
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT),
            verify_token: var("VERIFY_TOKEN").map(Secret::new),
            token_url,
            auth,
            instance_url,
            forward_concurrency: parse_or(
                "FORWARD_CONCURRENCY",
                var("FORWARD_CONCURRENCY"),
                DEFAULT_FORWARD_CONCURRENCY,
            )
            .max(1),
            http_timeout: Duration::from_millis(parse_or(
                "HTTP_TIMEOUT_MS",
                var("HTTP_TIMEOUT_MS"),
                DEFAULT_HTTP_TIMEOUT_MS,
            )),
        })
    }
}

fn parse_flow(raw: &str) -> Result<AuthFlow, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "jwt" | "jwt-bearer" | "jwt_bearer" => Ok(AuthFlow::JwtBearer),
        "password" => Ok(AuthFlow::Password),
        other => Err(ConfigError::Invalid {
            name: "SF_AUTH_FLOW",
            reason: format!("unknown flow {other:?}, expected \"jwt\" or \"password\""),
        }),
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

/// Parse a numeric variable, falling back to the default on absence or garbage.
fn parse_or<T: std::str::FromStr + Copy>(name: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}

/// Hosting dashboards often store multi-line PEMs with escaped newlines.
fn normalize_pem(raw: &str) -> String {
    raw.trim().replace("\\n", "\n")
}
