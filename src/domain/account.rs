//! Account domain types.
//!
//! An account is one IMAP server login plus the ordered list of mailbox
//! cleanup units to run against it.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{AccountName, CleanupRule};

/// Default connect/login timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A configured account, processed as a whole before the next one starts.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Account name from the configuration file.
    pub name: AccountName,
    /// Server connection parameters.
    pub server: ServerConfig,
    /// Age-exclusion window in days for this account (overrides the run default).
    pub skip_days: Option<u32>,
    /// Cleanup units, processed strictly in order.
    pub cleanups: Vec<MailboxCleanup>,
}

/// How the connection to the IMAP server is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Unencrypted TCP.
    Plain,
    /// Plain TCP upgraded with the STARTTLS command.
    StartTls,
    /// TLS from the first byte (typically port 993).
    Tls,
}

impl TransportMode {
    /// Resolves the mode from the legacy `ssl`/`tls` configuration booleans.
    ///
    /// `ssl` wins over `tls`; with neither set the connection is plain.
    pub fn from_flags(ssl: bool, tls: bool) -> Self {
        if ssl {
            Self::Tls
        } else if tls {
            Self::StartTls
        } else {
            Self::Plain
        }
    }

    /// Returns whether the session is encrypted once established.
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, Self::Plain)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::StartTls => write!(f, "starttls"),
            Self::Tls => write!(f, "tls"),
        }
    }
}

/// Where the account password comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    /// Password written in the configuration file.
    Plain(String),
    /// Password stored in the OS keychain under the given service name,
    /// keyed by the username.
    Keyring {
        /// Keychain service name.
        service: String,
    },
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => write!(f, "Plain(<redacted>)"),
            Self::Keyring { service } => f.debug_struct("Keyring").field("service", service).finish(),
        }
    }
}

/// Login credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login name (usually the email address).
    pub username: String,
    /// Password source.
    pub secret: Secret,
}

/// IMAP server connection parameters. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Transport security.
    pub mode: TransportMode,
    /// Login credentials.
    pub credentials: Credentials,
    /// Upper bound for TCP connect, TLS handshake and login.
    pub timeout: Duration,
}

impl ServerConfig {
    /// Creates a TLS configuration on port 993 with an inline password.
    pub fn tls(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: 993,
            mode: TransportMode::Tls,
            credentials: Credentials {
                username: username.into(),
                secret: Secret::Plain(password.into()),
            },
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Returns the `host:port` address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One or more mailboxes cleaned with the same ordered rule list.
#[derive(Debug, Clone)]
pub struct MailboxCleanup {
    /// Target mailbox names, processed in this order.
    pub mailboxes: Vec<String>,
    /// Rules in declaration order; the first fully matching rule wins.
    pub rules: Vec<CleanupRule>,
    /// Age-exclusion window in days for this unit (overrides the account).
    pub skip_days: Option<u32>,
}
