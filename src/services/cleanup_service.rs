//! Cleanup engine.
//!
//! Drives one cleanup unit at a time over an open [`MailboxSession`]. For
//! each target mailbox:
//!
//! 1. **Select.** A missing or unselectable mailbox is reported and skipped.
//! 2. **Scan.** UIDs are enumerated in chunks; messages received within the
//!    unit's `skip_days` window are counted and skipped without fetching.
//! 3. **Match / decide / act.** Each remaining message is fetched, matched
//!    against the ordered rules, confirmed through the [`DecisionGate`], and
//!    deleted or moved to Trash.
//! 4. **Finalize.** If anything was flagged, the mailbox is expunged once.
//!
//! Message-level failures are counted and the scan continues. Fatal session
//! errors propagate to the caller, which ends the account. An operator
//! cancel stops immediately without finalizing the current mailbox.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::gate::{Candidate, Decision, DecisionGate};
use super::matcher::RuleSet;
use crate::domain::{Counts, MailboxCleanup, MailboxReport, RuleAction, Summary, Uid};
use crate::providers::imap::{ImapTransport, MailboxSession, Result, SessionError, DEFAULT_CHUNK_SIZE};

/// Run-wide engine settings.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// UIDs per search window.
    pub chunk_size: usize,
    /// Reference time for the age window.
    pub now: DateTime<Utc>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            now: Utc::now(),
        }
    }
}

/// A cleanup unit with compiled rules and a resolved age window.
#[derive(Debug, Clone)]
pub struct CleanupUnit {
    /// Target mailboxes, in order.
    pub mailboxes: Vec<String>,
    /// Compiled rules, in declaration order.
    pub rules: RuleSet,
    /// Messages received within this many days are never touched.
    pub skip_days: u32,
}

impl CleanupUnit {
    /// Compiles a configured unit. `fallback_skip_days` applies when the
    /// unit does not set its own window.
    pub fn compile(cleanup: &MailboxCleanup, fallback_skip_days: u32) -> Self {
        Self {
            mailboxes: cleanup.mailboxes.clone(),
            rules: RuleSet::compile(cleanup.rules.iter().cloned()),
            skip_days: cleanup.skip_days.unwrap_or(fallback_skip_days),
        }
    }

    /// First day whose messages are protected, or `None` with no window.
    pub fn protected_since(&self, now: DateTime<Utc>) -> Option<NaiveDate> {
        (self.skip_days > 0).then(|| (now - Duration::days(i64::from(self.skip_days))).date_naive())
    }
}

/// How a unit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Every mailbox was visited.
    Completed,
    /// The operator cancelled; nothing further should run.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MailboxOutcome {
    Done,
    Skipped,
    Cancelled,
}

enum Step {
    Continue,
    Cancel,
}

/// Applies cleanup units through a decision gate.
pub struct CleanupEngine<'g> {
    gate: &'g mut dyn DecisionGate,
    options: EngineOptions,
}

impl<'g> CleanupEngine<'g> {
    /// Creates an engine.
    pub fn new(gate: &'g mut dyn DecisionGate, options: EngineOptions) -> Self {
        Self { gate, options }
    }

    /// Runs every mailbox of `unit`, recording per-mailbox reports in
    /// `summary` (including the partial report of a mailbox that failed).
    pub async fn run_unit<T: ImapTransport>(
        &mut self,
        session: &mut MailboxSession<T>,
        unit: &CleanupUnit,
        summary: &mut Summary,
    ) -> Result<UnitOutcome> {
        if unit.rules.is_empty() {
            tracing::warn!(mailboxes = ?unit.mailboxes, "cleanup unit has no rules");
        }

        for mailbox in &unit.mailboxes {
            let mut report = MailboxReport::new(mailbox.as_str());
            let outcome = self.run_mailbox(session, unit, mailbox, &mut report).await;

            match outcome {
                Ok(MailboxOutcome::Skipped) => continue,
                Ok(MailboxOutcome::Done) => {
                    tracing::info!(mailbox = %mailbox, counts = %report.counts, "mailbox done");
                    summary.push_mailbox(report);
                }
                Ok(MailboxOutcome::Cancelled) => {
                    summary.push_mailbox(report);
                    return Ok(UnitOutcome::Cancelled);
                }
                Err(e) => {
                    summary.push_mailbox(report);
                    return Err(e);
                }
            }
        }

        Ok(UnitOutcome::Completed)
    }

    async fn run_mailbox<T: ImapTransport>(
        &mut self,
        session: &mut MailboxSession<T>,
        unit: &CleanupUnit,
        mailbox: &str,
        report: &mut MailboxReport,
    ) -> Result<MailboxOutcome> {
        // Select
        if !session.mailbox_exists(mailbox) {
            tracing::warn!(mailbox, "mailbox not found, skipping");
            return Ok(MailboxOutcome::Skipped);
        }
        match session.select_mailbox(mailbox).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(mailbox, error = %e, "mailbox unavailable, skipping");
                return Ok(MailboxOutcome::Skipped);
            }
        }

        // Scan
        let since = unit.protected_since(self.options.now);
        let mut chunks = match session.uid_chunks(self.options.chunk_size).await {
            Ok(chunks) => Some(chunks),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(mailbox, error = %e, "UID enumeration failed, nothing scanned");
                None
            }
        };
        while let Some(plan) = chunks.as_mut() {
            let chunk = match plan.next_chunk(session).await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(mailbox, error = %e, "UID enumeration stopped");
                    break;
                }
            };
            let protected = match since {
                Some(date) => match session.recent_uids(&chunk, date).await {
                    Ok(recent) => recent,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        // Without the age check every message could be recent.
                        tracing::warn!(mailbox, error = %e, "age search failed, skipping chunk");
                        chunk.iter().copied().collect()
                    }
                },
                None => Default::default(),
            };

            for uid in chunk {
                report.counts.checked += 1;
                if protected.contains(&uid) {
                    report.counts.skipped += 1;
                    tracing::debug!(mailbox, %uid, "too recent, skipped");
                    continue;
                }

                if let Step::Cancel = self
                    .visit(session, unit, mailbox, uid, &mut report.counts)
                    .await?
                {
                    tracing::info!(mailbox, %uid, "cancelled by operator");
                    return Ok(MailboxOutcome::Cancelled);
                }
            }
        }

        // Finalize
        match session.finalize().await {
            Ok(expunged) => report.expunged = expunged,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => tracing::warn!(mailbox, error = %e, "expunge failed"),
        }

        Ok(MailboxOutcome::Done)
    }

    async fn visit<T: ImapTransport>(
        &mut self,
        session: &mut MailboxSession<T>,
        unit: &CleanupUnit,
        mailbox: &str,
        uid: Uid,
        counts: &mut Counts,
    ) -> Result<Step> {
        let digest = match session.fetch_message(uid).await {
            Ok(digest) => digest,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                counts.errored += 1;
                tracing::warn!(mailbox, %uid, error = %e, "fetch failed");
                return Ok(Step::Continue);
            }
        };

        let Some(hit) = unit.rules.first_match(&digest) else {
            counts.skipped += 1;
            tracing::debug!(mailbox, %uid, subject = %digest.short_subject(), "no rule matched");
            return Ok(Step::Continue);
        };

        let action = hit.action();
        if action == RuleAction::Trash && session.trash_mailbox().is_none() {
            counts.skipped += 1;
            tracing::info!(
                mailbox,
                %uid,
                subject = %digest.short_subject(),
                "trash mailbox not detected, skipped"
            );
            return Ok(Step::Continue);
        }

        let mut candidate = Candidate::new(mailbox, &digest, hit.rule(), session.trash_mailbox());
        loop {
            match self.gate.decide(&candidate).await {
                Decision::Proceed => break,
                Decision::ShowMore => candidate.expanded = true,
                Decision::Skip => {
                    counts.skipped += 1;
                    tracing::debug!(mailbox, %uid, "skipped by operator");
                    return Ok(Step::Continue);
                }
                Decision::Cancel => return Ok(Step::Cancel),
            }
        }

        let applied = match action {
            RuleAction::Delete => session.apply_delete(uid).await,
            RuleAction::Trash => session.apply_trash(uid).await,
        };

        match applied {
            Ok(()) => {
                match action {
                    RuleAction::Delete => counts.deleted += 1,
                    RuleAction::Trash => counts.trashed += 1,
                }
                tracing::info!(
                    mailbox,
                    %uid,
                    %action,
                    subject = %digest.short_subject(),
                    rule = %candidate.rule,
                    "message cleaned"
                );
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(SessionError::TrashUndetected) => {
                counts.skipped += 1;
                tracing::info!(mailbox, %uid, "trash mailbox not detected, skipped");
            }
            Err(e) => {
                counts.errored += 1;
                tracing::warn!(mailbox, %uid, %action, error = %e, "action failed");
            }
        }

        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountName, CleanupRule, RunStatus};
    use crate::providers::imap::{Call, MailboxEntry, MemoryTransport};
    use crate::services::gate::{AutoApprove, MockDecisionGate};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn options() -> EngineOptions {
        EngineOptions {
            chunk_size: 2,
            now: now(),
        }
    }

    fn message(subject: &str, body: &str) -> String {
        format!("Subject: {subject}\nFrom: sender@example.com\nTo: me@example.com\n\n{body}\n")
    }

    fn unit(mailboxes: &[&str], rules: Vec<CleanupRule>) -> CleanupUnit {
        CleanupUnit::compile(
            &MailboxCleanup {
                mailboxes: mailboxes.iter().map(|m| m.to_string()).collect(),
                rules,
                skip_days: None,
            },
            0,
        )
    }

    async fn open(transport: MemoryTransport) -> MailboxSession<MemoryTransport> {
        let mut session = MailboxSession::new(transport);
        session.load_mailboxes().await.unwrap();
        session.detect_trash();
        session
    }

    fn summary() -> Summary {
        Summary::new(AccountName::from("test"))
    }

    fn old() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn single_match_is_deleted_and_expunged_once() {
        let transport = MemoryTransport::new().with_mailbox(MailboxEntry::new("INBOX"));
        transport.add_message("INBOX", &message("hello", "a"), old());
        transport.add_message("INBOX", &message("spam offer", "b"), old());
        transport.add_message("INBOX", &message("meeting", "c"), old());
        let handle = transport.clone();
        let mut session = open(transport).await;

        let unit = unit(&["INBOX"], vec![CleanupRule::new(RuleAction::Delete).subject("spam")]);
        let mut gate = AutoApprove;
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        let outcome = engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();

        assert_eq!(outcome, UnitOutcome::Completed);
        assert_eq!(
            summary.counts,
            Counts {
                checked: 3,
                deleted: 1,
                skipped: 2,
                ..Default::default()
            }
        );
        assert!(summary.mailboxes[0].expunged);
        assert_eq!(handle.count_calls(|c| *c == Call::Expunge), 1);
        assert_eq!(handle.uids("INBOX"), vec![Uid(1), Uid(3)]);
    }

    #[tokio::test]
    async fn trash_without_detected_mailbox_leaves_message() {
        let transport = MemoryTransport::new().with_mailbox(MailboxEntry::new("INBOX"));
        transport.add_message("INBOX", &message("x", "x then y"), old());
        let handle = transport.clone();
        let mut session = open(transport).await;
        assert_eq!(session.trash_mailbox(), None);

        let unit = unit(
            &["INBOX"],
            vec![CleanupRule::new(RuleAction::Trash).body("x").body("y")],
        );
        let mut gate = MockDecisionGate::new();
        gate.expect_decide().never();
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();

        assert_eq!(summary.counts.checked, 1);
        assert_eq!(summary.counts.skipped, 1);
        assert_eq!(summary.counts.mutations(), 0);
        assert!(!handle.messages("INBOX")[0].deleted);
        assert_eq!(handle.count_calls(|c| *c == Call::Expunge), 0);
        assert_eq!(handle.count_calls(|c| matches!(c, Call::Copy(..))), 0);
    }

    #[tokio::test]
    async fn cancel_stops_the_unit() {
        let transport = MemoryTransport::new()
            .with_mailbox(MailboxEntry::new("INBOX"))
            .with_mailbox(MailboxEntry::new("Archive"));
        for i in 0..5 {
            transport.add_message("INBOX", &message(&format!("promo {i}"), "b"), old());
        }
        transport.add_message("Archive", &message("promo", "b"), old());
        let handle = transport.clone();
        let mut session = open(transport).await;

        let unit = unit(
            &["INBOX", "Archive"],
            vec![CleanupRule::new(RuleAction::Delete).subject("promo")],
        );
        let mut gate = MockDecisionGate::new();
        let mut seq = mockall::Sequence::new();
        gate.expect_decide()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Decision::Skip);
        gate.expect_decide()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Decision::Cancel);
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        let outcome = engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();

        assert_eq!(outcome, UnitOutcome::Cancelled);
        assert_eq!(summary.counts.checked, 2);
        assert_eq!(summary.counts.mutations(), 0);
        assert_eq!(summary.mailboxes.len(), 1);
        assert_eq!(summary.status, RunStatus::Completed);
        assert!(!handle
            .calls()
            .contains(&Call::Select("Archive".to_string())));
    }

    #[tokio::test]
    async fn show_more_expands_and_asks_again() {
        let transport = MemoryTransport::new().with_mailbox(MailboxEntry::new("INBOX"));
        transport.add_message("INBOX", &message("promo", "body"), old());
        let mut session = open(transport).await;

        let unit = unit(&["INBOX"], vec![CleanupRule::new(RuleAction::Delete)]);
        let mut gate = MockDecisionGate::new();
        let mut seq = mockall::Sequence::new();
        gate.expect_decide()
            .withf(|c| !c.expanded)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Decision::ShowMore);
        gate.expect_decide()
            .withf(|c| c.expanded)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Decision::Proceed);
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();
        assert_eq!(summary.counts.deleted, 1);
    }

    #[tokio::test]
    async fn recent_messages_are_protected() {
        let transport = MemoryTransport::new().with_mailbox(MailboxEntry::new("INBOX"));
        transport.add_message("INBOX", &message("promo", "old"), old());
        transport.add_message(
            "INBOX",
            &message("promo", "new"),
            Utc.with_ymd_and_hms(2024, 6, 29, 8, 0, 0).unwrap(),
        );
        let handle = transport.clone();
        let mut session = open(transport).await;

        let mut unit = unit(&["INBOX"], vec![CleanupRule::new(RuleAction::Delete)]);
        unit.skip_days = 7;
        let mut gate = AutoApprove;
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();

        assert_eq!(summary.counts.checked, 2);
        assert_eq!(summary.counts.deleted, 1);
        assert_eq!(summary.counts.skipped, 1);
        assert_eq!(handle.count_calls(|c| *c == Call::Fetch(Uid(2))), 0);
        assert_eq!(handle.uids("INBOX"), vec![Uid(2)]);
    }

    #[tokio::test]
    async fn failed_age_search_protects_the_chunk() {
        let transport = MemoryTransport::new()
            .with_mailbox(MailboxEntry::new("INBOX"))
            .fail_searches_since();
        transport.add_message("INBOX", &message("promo", "old"), old());
        let mut session = open(transport).await;

        let mut unit = unit(&["INBOX"], vec![CleanupRule::new(RuleAction::Delete)]);
        unit.skip_days = 3;
        let mut gate = AutoApprove;
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();
        assert_eq!(summary.counts.skipped, 1);
        assert_eq!(summary.counts.deleted, 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_counted_and_scan_continues() {
        let transport = MemoryTransport::new()
            .with_mailbox(MailboxEntry::new("INBOX"))
            .fail_fetch(Uid(1));
        transport.add_message("INBOX", &message("promo", "a"), old());
        transport.add_message("INBOX", &message("promo", "b"), old());
        let mut session = open(transport).await;

        let unit = unit(&["INBOX"], vec![CleanupRule::new(RuleAction::Delete)]);
        let mut gate = AutoApprove;
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();
        assert_eq!(summary.counts.errored, 1);
        assert_eq!(summary.counts.deleted, 1);
    }

    #[tokio::test]
    async fn copy_failure_counts_as_error() {
        let transport = MemoryTransport::new()
            .with_mailbox(MailboxEntry::new("INBOX"))
            .with_mailbox(MailboxEntry::new("Trash"))
            .fail_copies();
        transport.add_message("INBOX", &message("promo", "a"), old());
        let handle = transport.clone();
        let mut session = open(transport).await;

        let unit = unit(&["INBOX"], vec![CleanupRule::new(RuleAction::Trash)]);
        let mut gate = AutoApprove;
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();
        assert_eq!(summary.counts.errored, 1);
        assert!(!summary.mailboxes[0].expunged);
        assert!(!handle.messages("INBOX")[0].deleted);
    }

    #[tokio::test]
    async fn trash_action_moves_message() {
        let transport = MemoryTransport::new()
            .with_mailbox(MailboxEntry::new("INBOX"))
            .with_mailbox(MailboxEntry::new("Deleted Items"));
        transport.add_message("INBOX", &message("newsletter", "a"), old());
        let handle = transport.clone();
        let mut session = open(transport).await;

        let unit = unit(&["INBOX"], vec![CleanupRule::new(RuleAction::Trash).subject("news")]);
        let mut gate = AutoApprove;
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();
        assert_eq!(summary.counts.trashed, 1);
        assert!(handle.messages("INBOX").is_empty());
        assert_eq!(handle.messages("Deleted Items").len(), 1);
    }

    #[tokio::test]
    async fn missing_and_unselectable_mailboxes_are_skipped() {
        let transport = MemoryTransport::new()
            .with_mailbox(MailboxEntry::new("INBOX"))
            .with_mailbox(MailboxEntry::new("Locked"))
            .fail_select("Locked");
        transport.add_message("INBOX", &message("promo", "a"), old());
        let mut session = open(transport).await;

        let unit = unit(
            &["Nope", "Locked", "INBOX"],
            vec![CleanupRule::new(RuleAction::Delete)],
        );
        let mut gate = AutoApprove;
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        let outcome = engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();
        assert_eq!(outcome, UnitOutcome::Completed);
        assert_eq!(summary.mailboxes.len(), 1);
        assert_eq!(summary.mailboxes[0].mailbox, "INBOX");
        assert_eq!(summary.counts.deleted, 1);
    }

    #[tokio::test]
    async fn failed_uid_listing_skips_only_that_mailbox() {
        let transport = MemoryTransport::new()
            .with_mailbox(MailboxEntry::new("Junk"))
            .with_mailbox(MailboxEntry::new("INBOX"))
            .hide_uid_next()
            .fail_search_all("Junk");
        transport.add_message("Junk", &message("promo", "a"), old());
        transport.add_message("INBOX", &message("promo", "b"), old());
        let handle = transport.clone();
        let mut session = open(transport).await;

        let unit = unit(&["Junk", "INBOX"], vec![CleanupRule::new(RuleAction::Delete)]);
        let mut gate = AutoApprove;
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        let outcome = engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();

        assert_eq!(outcome, UnitOutcome::Completed);
        assert_eq!(summary.mailboxes.len(), 2);
        assert_eq!(summary.mailboxes[0].counts.checked, 0);
        assert!(!summary.mailboxes[0].expunged);
        assert_eq!(summary.mailboxes[1].counts.deleted, 1);
        assert_eq!(handle.uids("Junk"), vec![Uid(1)]);
        assert!(handle.uids("INBOX").is_empty());
    }

    #[tokio::test]
    async fn connection_loss_propagates_with_partial_report() {
        let transport = MemoryTransport::new()
            .with_mailbox(MailboxEntry::new("INBOX"))
            .disconnect_on_fetch(Uid(2));
        transport.add_message("INBOX", &message("promo", "a"), old());
        transport.add_message("INBOX", &message("promo", "b"), old());
        let mut session = open(transport).await;

        let unit = unit(&["INBOX"], vec![CleanupRule::new(RuleAction::Delete)]);
        let mut gate = AutoApprove;
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        let err = engine
            .run_unit(&mut session, &unit, &mut summary)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(summary.counts.checked, 2);
        assert_eq!(summary.counts.deleted, 1);
        assert!(!summary.mailboxes[0].expunged);
    }

    #[tokio::test]
    async fn nothing_flagged_means_no_expunge() {
        let transport = MemoryTransport::new().with_mailbox(MailboxEntry::new("INBOX"));
        transport.add_message("INBOX", &message("hello", "a"), old());
        let handle = transport.clone();
        let mut session = open(transport).await;

        let unit = unit(&["INBOX"], vec![CleanupRule::new(RuleAction::Delete).subject("spam")]);
        let mut gate = AutoApprove;
        let mut engine = CleanupEngine::new(&mut gate, options());
        let mut summary = summary();

        engine.run_unit(&mut session, &unit, &mut summary).await.unwrap();
        assert_eq!(handle.count_calls(|c| *c == Call::Expunge), 0);
    }

    #[test]
    fn unit_window_resolution() {
        let cleanup = MailboxCleanup {
            mailboxes: vec!["INBOX".to_string()],
            rules: Vec::new(),
            skip_days: Some(3),
        };
        assert_eq!(CleanupUnit::compile(&cleanup, 10).skip_days, 3);

        let inherit = MailboxCleanup {
            skip_days: None,
            ..cleanup
        };
        let unit = CleanupUnit::compile(&inherit, 10);
        assert_eq!(unit.skip_days, 10);
        assert_eq!(
            unit.protected_since(now()),
            NaiveDate::from_ymd_opt(2024, 6, 20)
        );
        assert_eq!(CleanupUnit::compile(&inherit, 0).protected_since(now()), None);
    }
}
