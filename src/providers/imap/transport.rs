//! IMAP transport trait definition.
//!
//! This module defines the [`ImapTransport`] trait, the narrow set of wire
//! operations the mailbox session needs: LIST/LSUB, SELECT, STATUS, UID
//! SEARCH, UID FETCH, UID STORE, UID COPY and EXPUNGE. The network
//! implementation lives in [`ImapClient`](super::ImapClient); an in-memory
//! one in [`MemoryTransport`](super::MemoryTransport).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::Uid;

/// Result type alias for session and transport operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur while talking to an IMAP server.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Network, TLS or protocol-stream failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// Login rejected or credentials unavailable.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Connect or login did not finish in time.
    #[error("timed out after {0} seconds")]
    Timeout(u64),

    /// The server listed no mailboxes at all.
    #[error("no mailboxes could be listed")]
    NoMailboxes,

    /// The mailbox does not exist or could not be selected.
    #[error("mailbox {mailbox:?} unavailable: {reason}")]
    MailboxUnavailable {
        /// Requested mailbox.
        mailbox: String,
        /// Server or local explanation.
        reason: String,
    },

    /// The server answered NO/BAD to a command.
    #[error("command failed: {0}")]
    Command(String),

    /// The server returned no message for the UID.
    #[error("message UID {0} not returned by server")]
    MessageUnavailable(Uid),

    /// The fetched message could not be parsed.
    #[error("message UID {uid} could not be parsed: {reason}")]
    Parse {
        /// Message UID.
        uid: Uid,
        /// Parser explanation.
        reason: String,
    },

    /// A trash action was requested but no Trash mailbox was detected.
    #[error("trash mailbox not detected")]
    TrashUndetected,

    /// Copying to the Trash mailbox failed; the source was left untouched.
    #[error("copy to {mailbox:?} failed: {reason}")]
    CopyFailed {
        /// Destination mailbox.
        mailbox: String,
        /// Server explanation.
        reason: String,
    },

    /// A UID iterator was used after another mailbox was selected.
    #[error("UID iteration belongs to a previously selected mailbox")]
    StaleIteration,

    /// An operation that needs a selected mailbox ran without one.
    #[error("no mailbox selected")]
    NotSelected,
}

impl SessionError {
    /// Returns whether the error ends the whole account.
    ///
    /// Everything else is scoped to a mailbox, a message or a single action.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Authentication(_) | Self::Timeout(_) | Self::NoMailboxes
        )
    }
}

/// A mailbox as returned by LIST/LSUB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxEntry {
    /// Full mailbox name.
    pub name: String,
    /// Hierarchy delimiter, if the server reports one.
    pub delimiter: Option<String>,
    /// Name attributes such as `\Trash` or `\Noselect`.
    pub attributes: Vec<String>,
}

impl MailboxEntry {
    /// Creates an entry with `/` as delimiter and no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delimiter: Some("/".to_string()),
            attributes: Vec::new(),
        }
    }

    /// Adds a name attribute.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    /// Case-insensitive attribute lookup (`\Trash` matches `\trash`).
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.eq_ignore_ascii_case(attribute))
    }

    /// Returns false for placeholder names some servers list
    /// (`.`, `/`, or the delimiter itself).
    pub fn is_usable(&self) -> bool {
        !self.name.is_empty()
            && self.name != "."
            && self.name != "/"
            && self.delimiter.as_deref() != Some(self.name.as_str())
    }
}

/// UID SEARCH criteria used by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UidQuery {
    /// Every message in the mailbox.
    All,
    /// Messages with `first <= uid <= last`.
    Range {
        /// Lowest UID.
        first: u32,
        /// Highest UID.
        last: u32,
    },
    /// Messages in the UID range received on or after `since`.
    RangeSince {
        /// Lowest UID.
        first: u32,
        /// Highest UID.
        last: u32,
        /// Earliest internal date, inclusive.
        since: NaiveDate,
    },
}

impl UidQuery {
    /// Renders the criteria in IMAP SEARCH syntax.
    pub fn to_imap(&self) -> String {
        match self {
            Self::All => "ALL".to_string(),
            Self::Range { first, last } => format!("UID {}:{}", first, last),
            Self::RangeSince { first, last, since } => {
                format!("UID {}:{} SINCE {}", first, last, imap_date(*since))
            }
        }
    }

    /// Returns whether a UID falls inside the query's range.
    pub fn covers(&self, uid: u32) -> bool {
        match self {
            Self::All => true,
            Self::Range { first, last } | Self::RangeSince { first, last, .. } => {
                (*first..=*last).contains(&uid)
            }
        }
    }
}

/// Formats a date the way IMAP SEARCH expects (`7-Feb-2024`).
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

/// Raw message returned by a UID FETCH.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    /// Message UID.
    pub uid: Uid,
    /// Full RFC 822 bytes.
    pub raw: Vec<u8>,
    /// Server INTERNALDATE, if returned.
    pub internal_date: Option<DateTime<Utc>>,
}

/// Wire operations the mailbox session is built on.
///
/// Implementations map server NO/BAD answers to [`SessionError::Command`]
/// and lost connections to [`SessionError::Connection`], so callers can tell
/// scoped failures from fatal ones with [`SessionError::is_fatal`].
#[async_trait]
pub trait ImapTransport: Send {
    /// Lists every mailbox visible to the account (LIST and LSUB).
    async fn list_mailboxes(&mut self) -> Result<Vec<MailboxEntry>>;

    /// Selects a mailbox read-write.
    async fn select(&mut self, mailbox: &str) -> Result<()>;

    /// Returns the mailbox's UIDNEXT, or `None` if the server won't say.
    async fn uid_next(&mut self, mailbox: &str) -> Result<Option<u32>>;

    /// Runs a UID SEARCH in the selected mailbox, ascending.
    async fn uid_search(&mut self, query: &UidQuery) -> Result<Vec<Uid>>;

    /// Fetches one full message without setting `\Seen`.
    async fn uid_fetch(&mut self, uid: Uid) -> Result<Option<FetchedMessage>>;

    /// Adds the `\Deleted` flag to a message.
    async fn uid_store_deleted(&mut self, uid: Uid) -> Result<()>;

    /// Copies a message into another mailbox.
    async fn uid_copy(&mut self, uid: Uid, mailbox: &str) -> Result<()>;

    /// Permanently removes `\Deleted` messages from the selected mailbox.
    async fn expunge(&mut self) -> Result<()>;

    /// Ends the session.
    async fn logout(&mut self) -> Result<()>;
}
