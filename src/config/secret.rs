//! Password resolution.
//!
//! Inline passwords are returned as-is. Keychain passwords are read through
//! the `keyring` crate on a blocking task, keyed by the account username.

use super::{ConfigError, Result};
use crate::domain::{Credentials, Secret};

/// Read access to the OS keychain under one service name.
#[derive(Debug, Clone)]
pub struct KeychainAccess {
    service_name: String,
}

impl KeychainAccess {
    /// Creates keychain access for the given service name.
    pub fn with_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Retrieves the password stored for `user`.
    ///
    /// Returns `None` if nothing is stored.
    pub async fn retrieve(&self, user: &str) -> Result<Option<String>> {
        let service = self.service_name.clone();
        let user = user.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &user)
                .map_err(|e| ConfigError::Secret(e.to_string()))?;
            match entry.get_password() {
                Ok(password) => Ok(Some(password)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(ConfigError::Secret(e.to_string())),
            }
        })
        .await
        .map_err(|e| ConfigError::Secret(format!("keychain task failed: {}", e)))?
    }

    /// Returns the service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// Returns the password for `credentials`.
pub async fn resolve_password(credentials: &Credentials) -> Result<String> {
    match &credentials.secret {
        Secret::Plain(password) => Ok(password.clone()),
        Secret::Keyring { service } => {
            let keychain = KeychainAccess::with_service(service.as_str());
            keychain
                .retrieve(&credentials.username)
                .await?
                .ok_or_else(|| {
                    ConfigError::Secret(format!(
                        "no keychain entry for {} in service {}",
                        credentials.username, service
                    ))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inline_password_is_returned() {
        let credentials = Credentials {
            username: "me@example.com".to_string(),
            secret: Secret::Plain("hunter2".to_string()),
        };
        assert_eq!(resolve_password(&credentials).await.unwrap(), "hunter2");
    }

    #[test]
    fn keychain_service_name() {
        let keychain = KeychainAccess::with_service("mailsweep-test");
        assert_eq!(keychain.service_name(), "mailsweep-test");
    }

    #[cfg(feature = "keychain-integration-tests")]
    mod integration {
        use super::*;

        #[tokio::test]
        #[ignore]
        async fn missing_keychain_entry_is_a_secret_error() {
            let credentials = Credentials {
                username: "nobody-stored-here@example.invalid".to_string(),
                secret: Secret::Keyring {
                    service: "mailsweep-test".to_string(),
                },
            };
            let err = resolve_password(&credentials).await.unwrap_err();
            assert!(matches!(err, ConfigError::Secret(_)));
        }
    }
}
