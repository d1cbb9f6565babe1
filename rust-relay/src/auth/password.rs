//! Resource-owner password grant.

use crate::config::Secret;

/// Grant type for username/password exchanges.
pub const PASSWORD_GRANT: &str = "password";

/// Exchanges a fixed credential set for an access token.
pub struct PasswordStrategy {
    client_id: String,
    client_secret: Secret,
    username: String,
    password: Secret,
}

impl PasswordStrategy {
    pub fn new(client_id: String, client_secret: Secret, username: String, password: Secret) -> Self {
        Self {
            client_id,
            client_secret,
            username,
            password,
        }
    }

    pub(crate) fn grant_form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("grant_type", PASSWORD_GRANT.to_string()),
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.expose().to_string()),
            ("username", self.username.clone()),
            ("password", self.password.expose().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_form_fields() {
        let strategy = PasswordStrategy::new(
            "consumer-key".to_string(),
            Secret::new("consumer-secret"),
            "relay@example.com".to_string(),
            Secret::new("hunter2"),
        );

        let form = strategy.grant_form();

        assert_eq!(
            form,
            vec![
                ("grant_type", "password".to_string()),
                ("client_id", "consumer-key".to_string()),
                ("client_secret", "consumer-secret".to_string()),
                ("username", "relay@example.com".to_string()),
                ("password", "hunter2".to_string()),
            ]
        );
    }
}
