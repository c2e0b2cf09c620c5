//! IMAP provider.
//!
//! - [`ImapTransport`] - the wire operations a session needs
//! - [`ImapClient`] - network transport over `async-imap` (plain, STARTTLS, TLS)
//! - [`MemoryTransport`] - in-process transport used by the tests
//! - [`MailboxSession`] - mailbox discovery, Trash detection, chunked UID
//!   iteration, delete/trash actions and expunge

mod client;
mod memory;
mod parse;
mod session;
mod stream;
mod transport;

pub use client::ImapClient;
pub use memory::{Call, MemoryTransport, StoredMessage};
pub use parse::{html_to_text, parse_digest};
pub use session::{find_trash, MailboxSession, UidChunks, COMMON_TRASH_NAMES, DEFAULT_CHUNK_SIZE};
pub use stream::ImapStream;
pub use transport::{
    imap_date, FetchedMessage, ImapTransport, MailboxEntry, Result, SessionError, UidQuery,
};
