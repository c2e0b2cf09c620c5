//! Account configuration file.
//!
//! The file is a JSON object keyed by account name. Entries are first read
//! into loose `Raw*` structs that accept what people actually write (a
//! single string where a list is expected, `null`, missing keys), then
//! normalized into [`AccountConfig`]. Account order follows the file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::{ConfigError, Result};
use crate::domain::{
    AccountConfig, AccountName, CleanupRule, Credentials, MailboxCleanup, RuleAction, Secret,
    ServerConfig, TransportMode, DEFAULT_TIMEOUT,
};

/// Port used when the server entry does not name one.
pub const DEFAULT_PORT: u16 = 993;

/// Keychain service holding passwords for `password_keyring` accounts.
pub const KEYRING_SERVICE: &str = "mailsweep";

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(default)]
    server: Option<Value>,
    #[serde(default)]
    cleanup: Vec<RawCleanup>,
    #[serde(default)]
    skip_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    #[serde(default)]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_true")]
    ssl: bool,
    #[serde(default)]
    tls: bool,
    #[serde(default)]
    mode: Option<TransportMode>,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    password_keyring: bool,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawCleanup {
    #[serde(default)]
    mailbox: Value,
    #[serde(default)]
    rules: Vec<RawRule>,
    #[serde(default)]
    skip_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default)]
    subject: Value,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    from: Value,
    #[serde(default)]
    to: Value,
    #[serde(default)]
    action: Option<Value>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

/// Normalizes a string-or-list value into an ordered list.
///
/// `null` becomes empty; non-string scalars are kept in their JSON form.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().map(scalar_string).collect(),
        other => vec![other.to_string()],
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads and normalizes the configuration file at `path`.
pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<AccountConfig>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let accounts = parse_accounts(&contents)?;
    tracing::debug!(path = %path.display(), accounts = accounts.len(), "configuration loaded");
    Ok(accounts)
}

/// Parses configuration text.
pub fn parse_accounts(contents: &str) -> Result<Vec<AccountConfig>> {
    let root: Value = serde_json::from_str(contents)?;
    let Value::Object(entries) = root else {
        return Err(ConfigError::Invalid(
            "top level must be an object keyed by account name".to_string(),
        ));
    };

    let mut accounts = Vec::with_capacity(entries.len());
    for (name, entry) in entries {
        if !entry.is_object() {
            tracing::warn!(account = %name, "account entry is not an object, skipped");
            continue;
        }
        let raw: RawAccount = serde_json::from_value(entry)
            .map_err(|e| ConfigError::Invalid(format!("account {}: {}", name, e)))?;
        match normalize_account(&name, raw)? {
            Some(account) => accounts.push(account),
            None => tracing::warn!(account = %name, "account has no server settings, skipped"),
        }
    }
    Ok(accounts)
}

fn normalize_account(name: &str, raw: RawAccount) -> Result<Option<AccountConfig>> {
    let server = match raw.server {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(map)) if map.is_empty() => return Ok(None),
        Some(value) => serde_json::from_value::<RawServer>(value)
            .map_err(|e| ConfigError::Invalid(format!("account {}: server: {}", name, e)))?,
    };

    let cleanups = raw
        .cleanup
        .into_iter()
        .map(|cleanup| normalize_cleanup(name, cleanup))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(AccountConfig {
        name: AccountName::from(name),
        server: normalize_server(name, server)?,
        skip_days: raw.skip_days,
        cleanups,
    }))
}

fn normalize_server(name: &str, raw: RawServer) -> Result<ServerConfig> {
    let host = raw.host.trim().to_string();
    if host.is_empty() {
        return Err(ConfigError::Invalid(format!("account {}: server host is empty", name)));
    }

    let secret = match (raw.password, raw.password_keyring) {
        (_, true) => Secret::Keyring {
            service: KEYRING_SERVICE.to_string(),
        },
        (Some(password), false) => Secret::Plain(password),
        (None, false) => {
            return Err(ConfigError::Invalid(format!(
                "account {}: set either password or password_keyring",
                name
            )))
        }
    };

    Ok(ServerConfig {
        host,
        port: raw.port,
        mode: raw
            .mode
            .unwrap_or_else(|| TransportMode::from_flags(raw.ssl, raw.tls)),
        credentials: Credentials {
            username: raw.username,
            secret,
        },
        timeout: raw
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT),
    })
}

fn normalize_cleanup(name: &str, raw: RawCleanup) -> Result<MailboxCleanup> {
    let rules = raw
        .rules
        .into_iter()
        .map(|rule| normalize_rule(name, rule))
        .collect::<Result<Vec<_>>>()?;

    Ok(MailboxCleanup {
        mailboxes: string_list(&raw.mailbox),
        rules,
        skip_days: raw.skip_days,
    })
}

fn normalize_rule(name: &str, raw: RawRule) -> Result<CleanupRule> {
    let action = match raw.action {
        None | Some(Value::Null) => RuleAction::Delete,
        Some(value) => scalar_string(&value)
            .parse::<RuleAction>()
            .map_err(|e| ConfigError::Invalid(format!("account {}: {}", name, e)))?,
    };

    Ok(CleanupRule {
        subject: string_list(&raw.subject),
        body: string_list(&raw.body),
        from: string_list(&raw.from),
        to: string_list(&raw.to),
        action,
    })
}
