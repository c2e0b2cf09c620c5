//! Rule matcher.
//!
//! Compiles configured [`CleanupRule`]s into regexes once per cleanup unit
//! and decides, for each message digest, which rule (if any) applies.
//!
//! Patterns use the `regex` crate syntax and are searched anywhere in the
//! field (unanchored). No flags are added implicitly; write `(?i)` or
//! `(?s)` inside a pattern to opt in. A rule with any pattern that fails to
//! compile is reported once and never matches.

use regex::Regex;

use crate::domain::{CleanupRule, MessageDigest, RuleAction, RuleField};

/// Compiled patterns for one field, all of which must match.
#[derive(Debug, Clone, Default)]
struct PatternSet(Vec<Regex>);

impl PatternSet {
    fn compile(sources: &[String]) -> Result<Self, (String, regex::Error)> {
        sources
            .iter()
            .map(|source| Regex::new(source).map_err(|e| (source.clone(), e)))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn matches_all(&self, text: &str) -> bool {
        self.0.iter().all(|re| re.is_match(text))
    }
}

#[derive(Debug, Clone)]
struct Compiled {
    subject: PatternSet,
    body: PatternSet,
    from: PatternSet,
    to: PatternSet,
}

impl Compiled {
    fn matches(&self, digest: &MessageDigest) -> bool {
        self.subject.matches_all(&digest.subject)
            && self.from.matches_all(&digest.from)
            && self.to.matches_all(&digest.to)
            && body_matches(&self.body, digest)
    }
}

/// Body patterns hold if they all match the plain text, or all match the
/// rendered HTML when there is one.
fn body_matches(patterns: &PatternSet, digest: &MessageDigest) -> bool {
    if patterns.is_empty() {
        return true;
    }
    patterns.matches_all(&digest.body_text)
        || digest
            .body_html
            .as_deref()
            .is_some_and(|html| patterns.matches_all(html))
}

type FieldError = (RuleField, String, regex::Error);

fn compile_fields(rule: &CleanupRule) -> Result<Compiled, FieldError> {
    let compile = |field: RuleField| {
        PatternSet::compile(rule.patterns(field)).map_err(|(source, e)| (field, source, e))
    };
    Ok(Compiled {
        subject: compile(RuleField::Subject)?,
        body: compile(RuleField::Body)?,
        from: compile(RuleField::From)?,
        to: compile(RuleField::To)?,
    })
}

#[derive(Debug, Clone)]
enum RuleState {
    Valid(Compiled),
    Invalid(String),
}

/// A rule after pattern compilation.
///
/// Invalid rules keep their position in the rule list so the rules around
/// them are still tried in declaration order.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: CleanupRule,
    state: RuleState,
}

impl CompiledRule {
    /// Compiles every pattern of `rule`.
    ///
    /// An invalid pattern is logged with its field and the whole rule is
    /// disabled.
    pub fn compile(rule: CleanupRule) -> Self {
        match compile_fields(&rule) {
            Ok(compiled) => Self {
                rule,
                state: RuleState::Valid(compiled),
            },
            Err((field, pattern, error)) => {
                tracing::warn!(
                    rule = %rule.describe(),
                    %field,
                    pattern = %pattern,
                    error = %error,
                    "invalid pattern, rule disabled"
                );
                Self {
                    rule,
                    state: RuleState::Invalid(format!("{} pattern {:?}: {}", field, pattern, error)),
                }
            }
        }
    }

    /// Returns whether every pattern compiled.
    pub fn is_valid(&self) -> bool {
        matches!(self.state, RuleState::Valid(_))
    }

    /// Why the rule was disabled, if it was.
    pub fn invalid_reason(&self) -> Option<&str> {
        match &self.state {
            RuleState::Valid(_) => None,
            RuleState::Invalid(reason) => Some(reason),
        }
    }

    /// The rule as configured.
    pub fn rule(&self) -> &CleanupRule {
        &self.rule
    }

    /// Action applied on match.
    pub fn action(&self) -> RuleAction {
        self.rule.action
    }

    /// Returns whether the rule matches the digest. Invalid rules never match.
    pub fn matches(&self, digest: &MessageDigest) -> bool {
        match &self.state {
            RuleState::Valid(compiled) => compiled.matches(digest),
            RuleState::Invalid(_) => false,
        }
    }
}

/// Ordered rules of one cleanup unit.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compiles rules, keeping declaration order.
    pub fn compile(rules: impl IntoIterator<Item = CleanupRule>) -> Self {
        Self {
            rules: rules.into_iter().map(CompiledRule::compile).collect(),
        }
    }

    /// Returns the first rule, in declaration order, that matches.
    pub fn first_match(&self, digest: &MessageDigest) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.matches(digest))
    }

    /// Number of rules, valid or not.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates the compiled rules in order.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(subject: &str, from: &str, body: &str) -> MessageDigest {
        MessageDigest {
            subject: subject.to_string(),
            from: from.to_string(),
            to: "me@example.com".to_string(),
            body_text: body.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_rule_matches_everything() {
        let rule = CompiledRule::compile(CleanupRule::default());
        assert!(rule.is_valid());
        assert!(rule.matches(&MessageDigest::default()));
    }

    #[test]
    fn fields_are_anded() {
        let rule = CompiledRule::compile(
            CleanupRule::new(RuleAction::Delete)
                .subject("spam")
                .from("@promo"),
        );
        assert!(rule.matches(&digest("spam offer", "deals@promo.example", "")));
        assert!(!rule.matches(&digest("spam offer", "friend@example.com", "")));
        assert!(!rule.matches(&digest("hello", "deals@promo.example", "")));
    }

    #[test]
    fn patterns_within_a_field_are_anded() {
        let rule = CompiledRule::compile(
            CleanupRule::new(RuleAction::Delete)
                .subject("weekly")
                .subject("digest"),
        );
        assert!(rule.matches(&digest("Your weekly digest", "", "")));
        assert!(!rule.matches(&digest("Your weekly report", "", "")));
    }

    #[test]
    fn matching_is_case_sensitive_without_flags() {
        let plain = CompiledRule::compile(CleanupRule::new(RuleAction::Delete).subject("sale"));
        assert!(!plain.matches(&digest("BIG SALE", "", "")));

        let insensitive =
            CompiledRule::compile(CleanupRule::new(RuleAction::Delete).subject("(?i)sale"));
        assert!(insensitive.matches(&digest("BIG SALE", "", "")));
    }

    #[test]
    fn body_matches_plain_or_html() {
        let rule = CompiledRule::compile(CleanupRule::new(RuleAction::Delete).body("unsubscribe"));

        let plain_only = digest("", "", "click to unsubscribe");
        assert!(rule.matches(&plain_only));

        let html_only = MessageDigest {
            body_html: Some("click to unsubscribe".to_string()),
            ..Default::default()
        };
        assert!(rule.matches(&html_only));

        let neither = MessageDigest {
            body_text: "hello".to_string(),
            body_html: Some("hello".to_string()),
            ..Default::default()
        };
        assert!(!rule.matches(&neither));
    }

    #[test]
    fn body_patterns_must_all_hold_in_the_same_rendition() {
        let rule = CompiledRule::compile(
            CleanupRule::new(RuleAction::Delete)
                .body("alpha")
                .body("beta"),
        );
        let split = MessageDigest {
            body_text: "alpha".to_string(),
            body_html: Some("beta".to_string()),
            ..Default::default()
        };
        assert!(!rule.matches(&split));
    }

    #[test]
    fn invalid_pattern_disables_rule() {
        let rule = CompiledRule::compile(
            CleanupRule::new(RuleAction::Delete)
                .subject("ok")
                .from("(unclosed"),
        );
        assert!(!rule.is_valid());
        assert!(rule.invalid_reason().unwrap().starts_with("from pattern"));
        assert!(!rule.matches(&digest("ok", "(unclosed", "")));
    }

    #[test]
    fn first_match_wins_in_declaration_order() {
        let rules = RuleSet::compile([
            CleanupRule::new(RuleAction::Trash).subject("[invalid"),
            CleanupRule::new(RuleAction::Trash).from("@news"),
            CleanupRule::new(RuleAction::Delete).subject("offer"),
        ]);
        assert_eq!(rules.len(), 3);

        let hit = rules
            .first_match(&digest("offer", "weekly@news.example", ""))
            .unwrap();
        assert_eq!(hit.action(), RuleAction::Trash);

        let hit = rules
            .first_match(&digest("offer", "shop@example.com", ""))
            .unwrap();
        assert_eq!(hit.action(), RuleAction::Delete);

        assert!(rules
            .first_match(&digest("hello", "friend@example.com", ""))
            .is_none());
    }

    #[test]
    fn patterns_are_unanchored() {
        let rule = CompiledRule::compile(CleanupRule::new(RuleAction::Delete).from("promo"));
        assert!(rule.matches(&digest("", "Promo Team <news@promo.example>", "")));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn literals() -> impl Strategy<Value = Vec<String>> {
            proptest::collection::vec("[a-z]{1,3}", 0..3)
        }

        fn holds(patterns: &[String], text: &str) -> bool {
            patterns.iter().all(|p| text.contains(p.as_str()))
        }

        proptest! {
            #[test]
            fn rule_matches_iff_every_field_pattern_matches(
                subject_patterns in literals(),
                from_patterns in literals(),
                to_patterns in literals(),
                body_patterns in literals(),
                subject in "[a-z ]{0,24}",
                from in "[a-z@.]{0,24}",
                to in "[a-z@.]{0,24}",
                plain in "[a-z ]{0,32}",
                html in proptest::option::of("[a-z ]{0,32}"),
            ) {
                let mut rule = CleanupRule::new(RuleAction::Delete);
                for p in &subject_patterns {
                    rule = rule.subject(p.clone());
                }
                for p in &from_patterns {
                    rule = rule.from(p.clone());
                }
                for p in &to_patterns {
                    rule = rule.to(p.clone());
                }
                for p in &body_patterns {
                    rule = rule.body(p.clone());
                }
                let compiled = CompiledRule::compile(rule);

                let message = MessageDigest {
                    subject: subject.clone(),
                    from: from.clone(),
                    to: to.clone(),
                    body_text: plain.clone(),
                    body_html: html.clone(),
                    ..Default::default()
                };
                let body_ok = holds(&body_patterns, &plain)
                    || html.as_deref().is_some_and(|h| holds(&body_patterns, h));
                let expected = holds(&subject_patterns, &subject)
                    && holds(&from_patterns, &from)
                    && holds(&to_patterns, &to)
                    && body_ok;
                prop_assert_eq!(compiled.matches(&message), expected);
            }
        }
    }
}
