//! Configuration loading.
//!
//! Accounts are read from a JSON file keyed by account name, normalized
//! into the domain types and validated before any connection is made.
//! Passwords stored in the OS keychain are resolved lazily at connect time.

mod secret;
mod settings;

use thiserror::Error;

pub use secret::{resolve_password, KeychainAccess};
pub use settings::{load_accounts, parse_accounts, DEFAULT_PORT, KEYRING_SERVICE};

/// Errors raised while loading configuration or resolving secrets.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Secret unavailable: {0}")]
    Secret(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
