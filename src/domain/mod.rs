//! Domain layer types for mailsweep.
//!
//! This module contains the plain data types shared by the configuration
//! loader, the IMAP session and the cleanup engine: accounts and servers,
//! cleanup rules, message digests and run summaries.

mod account;
mod message;
mod rule;
mod summary;
mod types;

pub use account::{
    AccountConfig, Credentials, MailboxCleanup, Secret, ServerConfig, TransportMode,
    DEFAULT_TIMEOUT,
};
pub use message::{excerpt, MessageDigest};
pub use rule::{CleanupRule, RuleAction, RuleField};
pub use summary::{Counts, MailboxReport, RunStatus, RunTotals, Summary};
pub use types::{AccountName, Uid};
