//! Interactive gate.
//!
//! Every matched message passes a [`DecisionGate`] before it is mutated.
//! [`AutoApprove`] proceeds unconditionally (non-interactive runs);
//! [`PromptGate`] shows the candidate to an operator and reads a one-letter
//! answer. Asking for details yields [`Decision::ShowMore`]; the engine then
//! expands the candidate and asks again.

use std::io;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use crate::domain::{excerpt, CleanupRule, MessageDigest, RuleAction, Uid};

/// Number of body characters shown before the operator asks for details.
pub const EXCERPT_CHARS: usize = 200;

/// Operator answer for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Apply the rule's action.
    Proceed,
    /// Leave the message untouched and continue.
    Skip,
    /// Show the full body, then ask again.
    ShowMore,
    /// Stop the whole run.
    Cancel,
}

impl Decision {
    /// Parses an operator answer (`y`, `n`, `d`, `c` or the full word).
    pub fn parse_answer(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(Self::Proceed),
            "n" | "no" => Some(Self::Skip),
            "d" | "details" => Some(Self::ShowMore),
            "c" | "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// What the operator is asked to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Mailbox being cleaned.
    pub mailbox: String,
    /// Message UID.
    pub uid: Uid,
    /// Decoded subject.
    pub subject: String,
    /// Decoded sender.
    pub from: String,
    /// Decoded recipients.
    pub to: String,
    /// Receive time, if known.
    pub received: Option<DateTime<Utc>>,
    /// Description of the matching rule.
    pub rule: String,
    /// Action that will be applied.
    pub action: RuleAction,
    /// Destination for [`RuleAction::Trash`].
    pub trash: Option<String>,
    /// Full display body.
    pub body: String,
    /// Whether the full body should be shown.
    pub expanded: bool,
}

impl Candidate {
    /// Builds a candidate from a matched message.
    pub fn new(
        mailbox: &str,
        digest: &MessageDigest,
        rule: &CleanupRule,
        trash: Option<&str>,
    ) -> Self {
        Self {
            mailbox: mailbox.to_string(),
            uid: digest.uid,
            subject: digest.subject.clone(),
            from: digest.from.clone(),
            to: digest.to.clone(),
            received: digest.received,
            rule: rule.describe(),
            action: rule.action,
            trash: trash.map(str::to_string),
            body: digest.display_body().to_string(),
            expanded: false,
        }
    }

    /// Body as it should be shown: an excerpt, or everything once expanded.
    pub fn shown_body(&self) -> String {
        if self.expanded {
            self.body.trim().to_string()
        } else {
            excerpt(&self.body, EXCERPT_CHARS)
        }
    }

    fn question(&self) -> String {
        match (self.action, &self.trash) {
            (RuleAction::Trash, Some(trash)) => format!("Move to {:?}?", trash),
            (RuleAction::Trash, None) => "Move to Trash?".to_string(),
            (RuleAction::Delete, _) => "Delete permanently?".to_string(),
        }
    }
}

/// Decides whether a matched message is acted on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionGate: Send {
    /// Returns the decision for one candidate.
    async fn decide(&mut self, candidate: &Candidate) -> Decision;
}

/// Gate that approves everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl DecisionGate for AutoApprove {
    async fn decide(&mut self, candidate: &Candidate) -> Decision {
        tracing::debug!(uid = %candidate.uid, rule = %candidate.rule, "auto-approved");
        Decision::Proceed
    }
}

/// Gate that asks an operator on a line-oriented terminal.
///
/// End of input or a read error counts as [`Decision::Cancel`].
pub struct PromptGate<R, W> {
    input: R,
    output: W,
}

impl PromptGate<BufReader<Stdin>, Stdout> {
    /// Prompts on standard input/output.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> PromptGate<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a gate over arbitrary streams.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Returns the output stream.
    pub fn into_output(self) -> W {
        self.output
    }

    async fn render(&mut self, candidate: &Candidate) -> io::Result<()> {
        let mut text = String::new();
        text.push_str(&format!("\n[{}] UID {}\n", candidate.mailbox, candidate.uid));
        text.push_str(&format!("  Subject: {}\n", candidate.subject));
        text.push_str(&format!("  From:    {}\n", candidate.from));
        text.push_str(&format!("  To:      {}\n", candidate.to));
        if let Some(received) = candidate.received {
            text.push_str(&format!("  Date:    {}\n", received.format("%Y-%m-%d %H:%M")));
        }
        text.push_str(&format!("  Rule:    {}\n", candidate.rule));
        let label = if candidate.expanded { "Body" } else { "Excerpt" };
        text.push_str(&format!("  {}:\n", label));
        for line in candidate.shown_body().lines() {
            text.push_str(&format!("    {}\n", line));
        }
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await
    }

    async fn ask(&mut self, candidate: &Candidate) -> io::Result<Decision> {
        self.render(candidate).await?;
        let question = format!("{} [y]es / [n]o / [d]etails / [c]ancel: ", candidate.question());

        loop {
            self.output.write_all(question.as_bytes()).await?;
            self.output.flush().await?;

            let mut line = String::new();
            if self.input.read_line(&mut line).await? == 0 {
                return Ok(Decision::Cancel);
            }
            match Decision::parse_answer(&line) {
                Some(decision) => return Ok(decision),
                None => {
                    self.output
                        .write_all(b"Please answer y, n, d or c.\n")
                        .await?;
                }
            }
        }
    }
}

#[async_trait]
impl<R, W> DecisionGate for PromptGate<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn decide(&mut self, candidate: &Candidate) -> Decision {
        match self.ask(candidate).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(error = %e, "prompt failed, cancelling run");
                Decision::Cancel
            }
        }
    }
}
