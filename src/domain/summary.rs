//! Run summary types.
//!
//! Counters are threaded explicitly through the cleanup engine and returned
//! to the driver; there is no process-wide progress state.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::AccountName;

/// Per-scope message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Messages visited.
    pub checked: u64,
    /// Messages flagged `\Deleted` in place.
    pub deleted: u64,
    /// Messages copied to Trash and flagged `\Deleted`.
    pub trashed: u64,
    /// Messages left untouched (no match, too recent, operator skip, no Trash).
    pub skipped: u64,
    /// Messages that could not be fetched or acted on.
    pub errored: u64,
}

impl Counts {
    /// Adds another set of counters into this one.
    pub fn merge(&mut self, other: &Counts) {
        self.checked += other.checked;
        self.deleted += other.deleted;
        self.trashed += other.trashed;
        self.skipped += other.skipped;
        self.errored += other.errored;
    }

    /// Number of messages that received the `\Deleted` flag.
    pub fn mutations(&self) -> u64 {
        self.deleted + self.trashed
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked={} deleted={} trashed={} skipped={} errored={}",
            self.checked, self.deleted, self.trashed, self.skipped, self.errored
        )
    }
}

/// Outcome of one mailbox inside a cleanup unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxReport {
    /// Mailbox name.
    pub mailbox: String,
    /// Counters for this mailbox.
    pub counts: Counts,
    /// Whether an EXPUNGE was issued.
    pub expunged: bool,
}

impl MailboxReport {
    /// Creates an empty report for a mailbox.
    pub fn new(mailbox: impl Into<String>) -> Self {
        Self {
            mailbox: mailbox.into(),
            counts: Counts::default(),
            expunged: false,
        }
    }
}

/// Terminal status of an account run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every unit was visited.
    Completed,
    /// The operator stopped the run.
    Cancelled,
    /// A fatal connection or session error ended the account early.
    Aborted(String),
}

impl RunStatus {
    /// Returns true for [`RunStatus::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true for [`RunStatus::Aborted`].
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Aborted(reason) => write!(f, "aborted ({})", reason),
        }
    }
}

/// Result of processing one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Account processed.
    pub account: AccountName,
    /// Counters over all mailboxes of the account.
    pub counts: Counts,
    /// Per-mailbox breakdown, in processing order.
    pub mailboxes: Vec<MailboxReport>,
    /// Terminal status.
    pub status: RunStatus,
}

impl Summary {
    /// Creates an empty, completed summary.
    pub fn new(account: AccountName) -> Self {
        Self {
            account,
            counts: Counts::default(),
            mailboxes: Vec::new(),
            status: RunStatus::Completed,
        }
    }

    /// Records a finished mailbox.
    pub fn push_mailbox(&mut self, report: MailboxReport) {
        self.counts.merge(&report.counts);
        self.mailboxes.push(report);
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.account, self.counts, self.status)
    }
}

/// Aggregate over every account of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTotals {
    /// Counters over all accounts.
    pub counts: Counts,
    /// Accounts processed (including aborted ones).
    pub accounts: usize,
    /// Accounts that ended in [`RunStatus::Aborted`].
    pub aborted: usize,
    /// Whether the operator cancelled the run.
    pub cancelled: bool,
}

impl RunTotals {
    /// Adds one account summary.
    pub fn record(&mut self, summary: &Summary) {
        self.counts.merge(&summary.counts);
        self.accounts += 1;
        if summary.status.is_aborted() {
            self.aborted += 1;
        }
        if summary.status.is_cancelled() {
            self.cancelled = true;
        }
    }
}

impl fmt::Display for RunTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[total] {} accounts={} aborted={}",
            self.counts, self.accounts, self.aborted
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}
