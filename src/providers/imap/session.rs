//! Mailbox session.
//!
//! [`MailboxSession`] owns one logged-in transport for the duration of an
//! account run. It caches the mailbox list and the detected Trash mailbox,
//! tracks which mailbox is selected, and remembers whether any message was
//! flagged `\Deleted` since the last expunge.
//!
//! # UID iteration
//!
//! UIDs are enumerated in bounded chunks ([`UidChunks`]). When the server
//! reports UIDNEXT, the range `1..UIDNEXT` is searched in windows of
//! `chunk_size` UIDs; otherwise a single `UID SEARCH ALL` result is sliced.
//! Either way every existing UID is yielded exactly once, ascending.
//! An iterator is bound to the selection it was created under and fails
//! with [`SessionError::StaleIteration`] once another mailbox is selected.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::parse::parse_digest;
use super::{ImapTransport, MailboxEntry, Result, SessionError, UidQuery};
use crate::domain::{MessageDigest, Uid};

/// Default number of UIDs per search window.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Trash mailbox names tried, case-insensitively, when no mailbox carries
/// the `\Trash` attribute.
pub const COMMON_TRASH_NAMES: &[&str] = &[
    "Trash",
    "INBOX.Trash",
    "INBOX/Trash",
    "Deleted Items",
    "Deleted Messages",
    "[Gmail]/Trash",
    "ゴミ箱",
    "ごみ箱",
];

/// Picks the Trash mailbox from a mailbox list.
///
/// Order of preference: a mailbox with the `\Trash` special-use attribute,
/// then an exact (case-insensitive) match against [`COMMON_TRASH_NAMES`] in
/// list order, then the first mailbox whose name contains `trash`.
pub fn find_trash(mailboxes: &[MailboxEntry]) -> Option<&str> {
    if let Some(entry) = mailboxes.iter().find(|m| m.has_attribute("\\Trash")) {
        return Some(&entry.name);
    }

    for candidate in COMMON_TRASH_NAMES {
        if let Some(entry) = mailboxes
            .iter()
            .find(|m| m.name.to_lowercase() == candidate.to_lowercase())
        {
            return Some(&entry.name);
        }
    }

    mailboxes
        .iter()
        .find(|m| m.name.to_lowercase().contains("trash"))
        .map(|m| m.name.as_str())
}

/// Session state over one authenticated transport.
pub struct MailboxSession<T: ImapTransport> {
    transport: T,
    mailboxes: Vec<MailboxEntry>,
    /// `None` until detection ran; `Some(None)` when nothing was found.
    trash: Option<Option<String>>,
    selected: Option<String>,
    epoch: u64,
    mutated: bool,
}

impl<T: ImapTransport> MailboxSession<T> {
    /// Wraps an authenticated transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            mailboxes: Vec::new(),
            trash: None,
            selected: None,
            epoch: 0,
            mutated: false,
        }
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Lists and caches every usable mailbox name (LIST and LSUB, deduplicated).
    ///
    /// Fails with [`SessionError::NoMailboxes`] when nothing usable is listed.
    pub async fn load_mailboxes(&mut self) -> Result<&[MailboxEntry]> {
        let listed = self.transport.list_mailboxes().await?;

        let mut seen = HashSet::new();
        self.mailboxes = listed
            .into_iter()
            .filter(MailboxEntry::is_usable)
            .filter(|m| seen.insert(m.name.clone()))
            .collect();
        self.trash = None;

        if self.mailboxes.is_empty() {
            return Err(SessionError::NoMailboxes);
        }

        tracing::debug!(count = self.mailboxes.len(), "mailboxes loaded");
        Ok(&self.mailboxes)
    }

    /// Cached mailbox list.
    pub fn mailboxes(&self) -> &[MailboxEntry] {
        &self.mailboxes
    }

    /// Returns whether `name` is in the cached list (exact match).
    pub fn mailbox_exists(&self, name: &str) -> bool {
        self.mailboxes.iter().any(|m| m.name == name)
    }

    /// Detects the Trash mailbox once; later calls return the cached answer.
    pub fn detect_trash(&mut self) -> Option<&str> {
        if self.trash.is_none() {
            let found = find_trash(&self.mailboxes).map(str::to_string);
            match &found {
                Some(name) => tracing::info!(trash = %name, "trash mailbox detected"),
                None => tracing::info!("no trash mailbox detected"),
            }
            self.trash = Some(found);
        }
        self.trash_mailbox()
    }

    /// Detected Trash mailbox, if detection ran and found one.
    pub fn trash_mailbox(&self) -> Option<&str> {
        self.trash.as_ref().and_then(|t| t.as_deref())
    }

    /// Selects a mailbox read-write.
    ///
    /// Any existing [`UidChunks`] becomes stale, even if this fails.
    pub async fn select_mailbox(&mut self, name: &str) -> Result<()> {
        if self.mutated {
            tracing::warn!(
                mailbox = ?self.selected,
                "selecting another mailbox with unexpunged deletions"
            );
            self.mutated = false;
        }
        self.selected = None;
        self.epoch += 1;

        if !self.mailboxes.is_empty() && !self.mailbox_exists(name) {
            return Err(SessionError::MailboxUnavailable {
                mailbox: name.to_string(),
                reason: "not found on server".to_string(),
            });
        }

        match self.transport.select(name).await {
            Ok(()) => {
                self.selected = Some(name.to_string());
                tracing::debug!(mailbox = name, "mailbox selected");
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Err(SessionError::MailboxUnavailable {
                mailbox: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Currently selected mailbox.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Starts a chunked enumeration of the selected mailbox's UIDs.
    pub async fn uid_chunks(&mut self, chunk_size: usize) -> Result<UidChunks> {
        let mailbox = self.selected.clone().ok_or(SessionError::NotSelected)?;
        let chunk_size = chunk_size.max(1);

        let plan = match self.transport.uid_next(&mailbox).await? {
            Some(uid_next) => {
                tracing::debug!(mailbox = %mailbox, uid_next, "iterating by UID range");
                ChunkPlan::Range {
                    next: 1,
                    last: uid_next.saturating_sub(1),
                }
            }
            None => {
                let uids = self.transport.uid_search(&UidQuery::All).await?;
                tracing::debug!(mailbox = %mailbox, count = uids.len(), "iterating by SEARCH ALL");
                ChunkPlan::Listed { uids, pos: 0 }
            }
        };

        Ok(UidChunks {
            epoch: self.epoch,
            chunk_size,
            plan,
        })
    }

    /// Returns which UIDs in `chunk` were received on or after `since`.
    pub async fn recent_uids(&mut self, chunk: &[Uid], since: NaiveDate) -> Result<HashSet<Uid>> {
        let (Some(first), Some(last)) = (chunk.iter().min(), chunk.iter().max()) else {
            return Ok(HashSet::new());
        };
        let query = UidQuery::RangeSince {
            first: first.0,
            last: last.0,
            since,
        };
        let found = self.transport.uid_search(&query).await?;
        Ok(found.into_iter().filter(|uid| chunk.contains(uid)).collect())
    }

    /// Fetches and parses one message without marking it `\Seen`.
    pub async fn fetch_message(&mut self, uid: Uid) -> Result<MessageDigest> {
        let fetched = self
            .transport
            .uid_fetch(uid)
            .await?
            .ok_or(SessionError::MessageUnavailable(uid))?;
        parse_digest(&fetched)
    }

    /// Flags a message `\Deleted` in the selected mailbox.
    pub async fn apply_delete(&mut self, uid: Uid) -> Result<()> {
        self.transport.uid_store_deleted(uid).await?;
        self.mutated = true;
        Ok(())
    }

    /// Copies a message to Trash, then flags it `\Deleted`.
    ///
    /// If no Trash was detected or the copy fails, the message is left
    /// untouched.
    pub async fn apply_trash(&mut self, uid: Uid) -> Result<()> {
        let trash = self
            .trash_mailbox()
            .map(str::to_string)
            .ok_or(SessionError::TrashUndetected)?;

        match self.transport.uid_copy(uid, &trash).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                return Err(SessionError::CopyFailed {
                    mailbox: trash,
                    reason: e.to_string(),
                })
            }
        }

        self.apply_delete(uid).await
    }

    /// Returns whether a message was flagged since the last expunge.
    pub fn has_pending_mutations(&self) -> bool {
        self.mutated
    }

    /// Expunges the selected mailbox if anything was flagged.
    ///
    /// Returns whether an EXPUNGE was issued. The pending flag is cleared
    /// either way so a mailbox is never expunged twice.
    pub async fn finalize(&mut self) -> Result<bool> {
        if !self.mutated {
            return Ok(false);
        }
        self.mutated = false;
        self.transport.expunge().await?;
        tracing::debug!(mailbox = ?self.selected, "mailbox expunged");
        Ok(true)
    }

    /// Logs out, consuming the session.
    pub async fn close(mut self) -> Result<()> {
        self.transport.logout().await
    }
}

#[derive(Debug)]
enum ChunkPlan {
    Range { next: u32, last: u32 },
    Listed { uids: Vec<Uid>, pos: usize },
}

/// Chunked, ascending enumeration of one mailbox's UIDs.
#[derive(Debug)]
pub struct UidChunks {
    epoch: u64,
    chunk_size: usize,
    plan: ChunkPlan,
}

impl UidChunks {
    /// Returns the next non-empty chunk, or `None` when done.
    ///
    /// A failed range search is logged and the window skipped.
    pub async fn next_chunk<T: ImapTransport>(
        &mut self,
        session: &mut MailboxSession<T>,
    ) -> Result<Option<Vec<Uid>>> {
        if session.epoch != self.epoch {
            return Err(SessionError::StaleIteration);
        }

        match &mut self.plan {
            ChunkPlan::Listed { uids, pos } => {
                if *pos >= uids.len() {
                    return Ok(None);
                }
                let end = (*pos + self.chunk_size).min(uids.len());
                let chunk = uids[*pos..end].to_vec();
                *pos = end;
                Ok(Some(chunk))
            }
            ChunkPlan::Range { next, last } => {
                let window = u32::try_from(self.chunk_size).unwrap_or(u32::MAX);
                while *next != 0 && *next <= *last {
                    let first = *next;
                    let end = first.saturating_add(window - 1).min(*last);
                    // 0 marks exhaustion when `last` is u32::MAX.
                    *next = end.checked_add(1).unwrap_or(0);

                    let query = UidQuery::Range { first, last: end };
                    match session.transport.uid_search(&query).await {
                        Ok(mut found) => {
                            found.retain(|uid| query.covers(uid.0));
                            found.sort();
                            found.dedup();
                            if !found.is_empty() {
                                return Ok(Some(found));
                            }
                        }
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            tracing::warn!(first, last = end, error = %e, "UID range search failed");
                        }
                    }
                }
                Ok(None)
            }
        }
    }
}
