//! Business services layer.
//!
//! Services sit between the driver and the IMAP provider:
//!
//! ```text
//! Driver (main.rs)
//!          |
//!          v
//!    Services Layer
//!          |
//!          v
//! Providers (IMAP session, transport)
//! ```
//!
//! # Services Overview
//!
//! - [`RuleSet`]: compiles cleanup rules and picks the first match for a message
//! - [`DecisionGate`]: asks whether a matched message is acted on
//! - [`CleanupEngine`]: runs one mailbox cleanup unit against a session
//! - [`AccountService`]: processes whole accounts and returns their summaries

mod account_service;
mod cleanup_service;
mod gate;
mod matcher;

pub use account_service::{AccountService, Connector, ImapConnector, RunOptions};
pub use cleanup_service::{CleanupEngine, CleanupUnit, EngineOptions, UnitOutcome};
pub use gate::{AutoApprove, Candidate, Decision, DecisionGate, PromptGate, EXCERPT_CHARS};
pub use matcher::{CompiledRule, RuleSet};
