//! Mail server provider implementations.
//!
//! - [`imap`] - IMAP transport, session and message parsing

pub mod imap;
