//! Message digest type.

use chrono::{DateTime, Utc};

use super::Uid;

/// The fields of one fetched message that rules are evaluated against.
///
/// Built fresh for every fetch and dropped once the decision is made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageDigest {
    /// UID in the selected mailbox.
    pub uid: Uid,
    /// Decoded `Subject` header, empty if absent.
    pub subject: String,
    /// Decoded `From` header value, empty if absent.
    pub from: String,
    /// Decoded `To` header value, empty if absent.
    pub to: String,
    /// When the server received the message, if known.
    pub received: Option<DateTime<Utc>>,
    /// All non-attachment `text/plain` parts, joined.
    pub body_text: String,
    /// All non-attachment `text/html` parts rendered to text, joined.
    /// `None` when the message has no HTML part.
    pub body_html: Option<String>,
}

impl MessageDigest {
    /// Body to show an operator: the plain-text part, or the rendered HTML
    /// when there is no plain text.
    pub fn display_body(&self) -> &str {
        if self.body_text.trim().is_empty() {
            self.body_html.as_deref().unwrap_or("")
        } else {
            &self.body_text
        }
    }

    /// Subject shortened for single-line progress output.
    pub fn short_subject(&self) -> String {
        truncate_chars(&self.subject, 60)
    }
}

/// Normalizes line endings, trims, and truncates `text` to at most
/// `max_chars` characters, ending with `...` when shortened.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let normalized = text.trim().replace("\r\n", "\n").replace('\r', "\n");
    if normalized.chars().count() <= max_chars {
        return normalized;
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = normalized.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}
