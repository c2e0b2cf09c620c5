//! Cleanup rule types.
//!
//! Rules arrive here already normalized: every field is an ordered list of
//! regex sources, empty when the field is not constrained.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What to do with a message that matched a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Flag `\Deleted` in place.
    #[default]
    Delete,
    /// Copy to the Trash mailbox, then flag `\Deleted` in place.
    Trash,
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::Trash => write!(f, "trash"),
        }
    }
}

impl FromStr for RuleAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "delete" => Ok(Self::Delete),
            "trash" => Ok(Self::Trash),
            other => Err(format!("unknown action {:?} (expected delete or trash)", other)),
        }
    }
}

/// A message field a rule can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleField {
    /// Decoded `Subject` header.
    Subject,
    /// Plain-text body or HTML body rendered to text.
    Body,
    /// Decoded `From` header value.
    From,
    /// Decoded `To` header value.
    To,
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject => write!(f, "subject"),
            Self::Body => write!(f, "body"),
            Self::From => write!(f, "from"),
            Self::To => write!(f, "to"),
        }
    }
}

/// A cleanup rule as configured.
///
/// Patterns within a field are ANDed; configured fields are ANDed with each
/// other. A field with no patterns places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupRule {
    /// Patterns for the subject.
    pub subject: Vec<String>,
    /// Patterns for the body.
    pub body: Vec<String>,
    /// Patterns for the `From` header.
    pub from: Vec<String>,
    /// Patterns for the `To` header.
    pub to: Vec<String>,
    /// Action applied on match.
    pub action: RuleAction,
}

impl CleanupRule {
    /// Creates an unconstrained rule with the given action.
    pub fn new(action: RuleAction) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    /// Adds a subject pattern.
    pub fn subject(mut self, pattern: impl Into<String>) -> Self {
        self.subject.push(pattern.into());
        self
    }

    /// Adds a body pattern.
    pub fn body(mut self, pattern: impl Into<String>) -> Self {
        self.body.push(pattern.into());
        self
    }

    /// Adds a `From` pattern.
    pub fn from(mut self, pattern: impl Into<String>) -> Self {
        self.from.push(pattern.into());
        self
    }

    /// Adds a `To` pattern.
    pub fn to(mut self, pattern: impl Into<String>) -> Self {
        self.to.push(pattern.into());
        self
    }

    /// Returns the patterns configured for a field.
    pub fn patterns(&self, field: RuleField) -> &[String] {
        match field {
            RuleField::Subject => &self.subject,
            RuleField::Body => &self.body,
            RuleField::From => &self.from,
            RuleField::To => &self.to,
        }
    }

    /// Short human-readable description, e.g. `subject~"spam" -> delete`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        for field in [RuleField::Subject, RuleField::From, RuleField::To, RuleField::Body] {
            for pattern in self.patterns(field) {
                parts.push(format!("{}~{:?}", field, pattern));
            }
        }
        if parts.is_empty() {
            parts.push("*".to_string());
        }
        format!("{} -> {}", parts.join(" & "), self.action)
    }
}
