//! Core identifier types for domain entities.
//!
//! These newtype wrappers keep account names and message UIDs from being
//! mixed up with arbitrary strings and sequence numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a configured account (the key in the configuration file).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountName(pub String);

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Per-mailbox unique identifier of a message.
///
/// Unlike sequence numbers, UIDs are stable across sessions and never
/// decrease within a mailbox, which is what makes chunked iteration safe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Uid(pub u32);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Uid {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_name_display() {
        let name = AccountName("personal".to_string());
        assert_eq!(name.to_string(), "personal");
    }

    #[test]
    fn account_name_from_str() {
        let a = AccountName::from("work");
        let b = AccountName::from("work".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn uid_ordering() {
        let mut uids = vec![Uid(30), Uid(4), Uid(17)];
        uids.sort();
        assert_eq!(uids, vec![Uid(4), Uid(17), Uid(30)]);
        assert_eq!(Uid::from(9).to_string(), "9");
    }
}
