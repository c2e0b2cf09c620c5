//! mailsweep - rule-driven IMAP mailbox cleaner
//!
//! This crate connects to configured IMAP accounts, matches messages against
//! ordered regex rules and deletes them or moves them to Trash, optionally
//! asking an operator before each action.

pub mod cli;
pub mod config;
pub mod domain;
pub mod providers;
pub mod services;

pub use config::{load_accounts, ConfigError};
pub use services::{AccountService, AutoApprove, ImapConnector, PromptGate, RunOptions};
