//! Delivery of inbound payloads to the Salesforce Apex REST endpoint.

use reqwest::{header::AUTHORIZATION, Client};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::auth::AccessToken;
use crate::util::preview;

/// Apex REST resource that ingests WhatsApp messages.
pub const MESSAGE_PATH: &str = "/services/apexrest/WA/Message";

/// Errors returned by [`Forwarder::forward`].
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Neither SF_INSTANCE_URL nor the token response named an org.
    #[error("no Salesforce instance URL configured or returned with the token")]
    NoInstanceUrl,

    #[error("invalid instance URL {url:?}: {reason}")]
    InvalidInstanceUrl { url: String, reason: String },

    #[error("Apex endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Apex endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Posts payloads to the downstream Apex REST endpoint.
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    instance_url: Option<Url>,
}

impl Forwarder {
    /// `instance_url` overrides whatever org the token response names.
    pub fn new(client: Client, instance_url: Option<Url>) -> Self {
        Self {
            client,
            instance_url,
        }
    }

    /// Resolve the full message endpoint for this token.
    pub fn endpoint(&self, token: &AccessToken) -> Result<Url, ForwardError> {
        let base = match (&self.instance_url, token.instance_url()) {
            (Some(configured), _) => configured.clone(),
            (None, Some(raw)) => {
                Url::parse(raw).map_err(|e| ForwardError::InvalidInstanceUrl {
                    url: raw.to_string(),
                    reason: e.to_string(),
                })?
            }
            (None, None) => return Err(ForwardError::NoInstanceUrl),
        };

        let joined = format!("{}{}", base.as_str().trim_end_matches('/'), MESSAGE_PATH);
        Url::parse(&joined).map_err(|e| ForwardError::InvalidInstanceUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })
    }

    /// Post the payload verbatim and return the Apex response body.
    ///
    /// Failures are logged here and handed back to the caller.
    pub async fn forward(&self, token: &AccessToken, payload: &Value) -> Result<String, ForwardError> {
        let result = self.send(token, payload).await;

        match &result {
            Ok(body) => info!(
                response_length = body.len(),
                response_preview = %preview(body),
                "forward_complete"
            ),
            Err(e) => error!(error = %e, "forward_failed"),
        }

        result
    }

    async fn send(&self, token: &AccessToken, payload: &Value) -> Result<String, ForwardError> {
        let url = self.endpoint(token)?;

        info!(url = %url, "forward_starting");

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ForwardError::Status {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn forwarder(server: &MockServer) -> Forwarder {
        Forwarder::new(Client::new(), Some(Url::parse(&server.base_url()).unwrap()))
    }

    #[tokio::test]
    async fn test_forward_posts_payload_with_bearer() {
        let server = MockServer::start();
        let payload = json!({"object": "whatsapp_business_account", "entry": [{"id": "123"}]});

        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(MESSAGE_PATH)
                .header("authorization", "Bearer T")
                .header("content-type", "application/json")
                .json_body(payload.clone());
            then.status(200)
                .header("content-type", "application/json")
                .body(r#""Message stored""#);
        });

        let body = forwarder(&server)
            .forward(&AccessToken::new("T", None), &payload)
            .await
            .unwrap();

        assert_eq!(body, r#""Message stored""#);
        mock.assert();
    }

    #[tokio::test]
    async fn test_forward_surfaces_downstream_failure() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(MESSAGE_PATH);
            then.status(401)
                .header("content-type", "application/json")
                .body(r#"[{"errorCode":"INVALID_SESSION_ID"}]"#);
        });

        let err = forwarder(&server)
            .forward(&AccessToken::new("expired", None), &json!({}))
            .await
            .unwrap_err();

        match err {
            ForwardError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("INVALID_SESSION_ID"));
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
        mock.assert();
    }

    #[tokio::test]
    async fn test_downstream_error_body_is_truncated() {
        let server = MockServer::start();
        let long_body = "x".repeat(crate::util::BODY_PREVIEW_CHARS * 4);
        server.mock(|when, then| {
            when.method(POST).path(MESSAGE_PATH);
            then.status(500).body(long_body.clone());
        });

        let err = forwarder(&server)
            .forward(&AccessToken::new("T", None), &json!({}))
            .await
            .unwrap_err();

        match err {
            ForwardError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), crate::util::BODY_PREVIEW_CHARS);
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }

    #[test]
    fn test_endpoint_prefers_configured_instance() {
        let forwarder = Forwarder::new(
            Client::new(),
            Some(Url::parse("https://configured.my.salesforce.com/").unwrap()),
        );
        let token = AccessToken::new("T", Some("https://other.my.salesforce.com".to_string()));

        assert_eq!(
            forwarder.endpoint(&token).unwrap().as_str(),
            "https://configured.my.salesforce.com/services/apexrest/WA/Message"
        );
    }

    #[test]
    fn test_endpoint_falls_back_to_token_instance() {
        let forwarder = Forwarder::new(Client::new(), None);
        let token = AccessToken::new("T", Some("https://acme.my.salesforce.com".to_string()));

        assert_eq!(
            forwarder.endpoint(&token).unwrap().as_str(),
            "https://acme.my.salesforce.com/services/apexrest/WA/Message"
        );
    }

    #[test]
    fn test_endpoint_requires_some_instance() {
        let forwarder = Forwarder::new(Client::new(), None);

        let err = forwarder.endpoint(&AccessToken::new("T", None)).unwrap_err();
        assert!(matches!(err, ForwardError::NoInstanceUrl));

        let err = forwarder
            .endpoint(&AccessToken::new("T", Some("not a url".to_string())))
            .unwrap_err();
        assert!(matches!(err, ForwardError::InvalidInstanceUrl { .. }));
    }
}
