//! In-memory IMAP transport.
//!
//! Holds mailboxes and messages in process memory and records every call,
//! so the session and cleanup engine can be exercised without a server.
//! Clones share state: keep one handle for assertions and give the other
//! to the code under test.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{FetchedMessage, ImapTransport, MailboxEntry, Result, SessionError, UidQuery};
use crate::domain::Uid;

/// A transport call, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// LIST/LSUB.
    List,
    /// SELECT of the named mailbox.
    Select(String),
    /// STATUS (UIDNEXT) of the named mailbox.
    UidNext(String),
    /// UID SEARCH.
    Search(UidQuery),
    /// UID FETCH.
    Fetch(Uid),
    /// UID STORE +FLAGS (\Deleted).
    StoreDeleted(Uid),
    /// UID COPY into the named mailbox.
    Copy(Uid, String),
    /// EXPUNGE.
    Expunge,
    /// LOGOUT.
    Logout,
}

/// A message stored in a [`MemoryTransport`] mailbox.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    /// UID within its mailbox.
    pub uid: Uid,
    /// RFC 822 bytes.
    pub raw: Vec<u8>,
    /// Server receive time.
    pub internal_date: DateTime<Utc>,
    /// Whether `\Deleted` is set.
    pub deleted: bool,
}

#[derive(Debug)]
struct MemoryMailbox {
    entry: MailboxEntry,
    messages: Vec<StoredMessage>,
    uid_next: u32,
}

#[derive(Debug, Default)]
struct MemoryState {
    mailboxes: Vec<MemoryMailbox>,
    selected: Option<usize>,
    calls: Vec<Call>,
    hide_uid_next: bool,
    failing_fetches: HashSet<Uid>,
    failing_selects: HashSet<String>,
    fail_copies: bool,
    fail_searches_since: bool,
    failing_full_searches: HashSet<String>,
    fail_expunge: bool,
    disconnect_on_fetch: Option<Uid>,
    connected: bool,
}

impl MemoryState {
    fn mailbox_index(&self, name: &str) -> Option<usize> {
        self.mailboxes.iter().position(|m| m.entry.name == name)
    }

    fn selected_mailbox(&mut self) -> Result<&mut MemoryMailbox> {
        let index = self.selected.ok_or(SessionError::NotSelected)?;
        Ok(&mut self.mailboxes[index])
    }

    fn check_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(SessionError::Connection("connection lost".to_string()))
        }
    }
}

/// IMAP transport backed by process memory.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Creates a transport with no mailboxes.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                connected: true,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread may poison the lock; the state is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a mailbox.
    pub fn with_mailbox(self, entry: MailboxEntry) -> Self {
        self.lock().mailboxes.push(MemoryMailbox {
            entry,
            messages: Vec::new(),
            uid_next: 1,
        });
        self
    }

    /// Adds a message to a mailbox, creating the mailbox if needed, and
    /// returns its UID.
    pub fn add_message(&self, mailbox: &str, raw: &str, internal_date: DateTime<Utc>) -> Uid {
        let mut state = self.lock();
        let index = match state.mailbox_index(mailbox) {
            Some(index) => index,
            None => {
                state.mailboxes.push(MemoryMailbox {
                    entry: MailboxEntry::new(mailbox),
                    messages: Vec::new(),
                    uid_next: 1,
                });
                state.mailboxes.len() - 1
            }
        };
        let target = &mut state.mailboxes[index];
        let uid = Uid(target.uid_next);
        target.uid_next += 1;
        target.messages.push(StoredMessage {
            uid,
            raw: raw.replace("\r\n", "\n").replace('\n', "\r\n").into_bytes(),
            internal_date,
            deleted: false,
        });
        uid
    }

    /// Skips the next UIDs of a mailbox so later messages get sparse UIDs.
    pub fn skip_uids(&self, mailbox: &str, count: u32) {
        let mut state = self.lock();
        if let Some(index) = state.mailbox_index(mailbox) {
            state.mailboxes[index].uid_next += count;
        }
    }

    /// Makes STATUS (UIDNEXT) report nothing, forcing the `SEARCH ALL` path.
    pub fn hide_uid_next(self) -> Self {
        self.lock().hide_uid_next = true;
        self
    }

    /// Makes fetching `uid` fail with a NO response.
    pub fn fail_fetch(self, uid: Uid) -> Self {
        self.lock().failing_fetches.insert(uid);
        self
    }

    /// Makes selecting `mailbox` fail with a NO response.
    pub fn fail_select(self, mailbox: &str) -> Self {
        self.lock().failing_selects.insert(mailbox.to_string());
        self
    }

    /// Makes every UID COPY fail with a NO response.
    pub fn fail_copies(self) -> Self {
        self.lock().fail_copies = true;
        self
    }

    /// Makes every `SINCE` search fail with a NO response.
    pub fn fail_searches_since(self) -> Self {
        self.lock().fail_searches_since = true;
        self
    }

    /// Makes `SEARCH ALL` fail with a NO response while `mailbox` is selected.
    pub fn fail_search_all(self, mailbox: &str) -> Self {
        self.lock().failing_full_searches.insert(mailbox.to_string());
        self
    }

    /// Makes EXPUNGE fail with a NO response.
    pub fn fail_expunge(self) -> Self {
        self.lock().fail_expunge = true;
        self
    }

    /// Drops the connection when `uid` is fetched.
    pub fn disconnect_on_fetch(self, uid: Uid) -> Self {
        self.lock().disconnect_on_fetch = Some(uid);
        self
    }

    /// Returns every recorded call.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Counts recorded calls matching a predicate.
    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Returns the messages currently in a mailbox (including `\Deleted` ones).
    pub fn messages(&self, mailbox: &str) -> Vec<StoredMessage> {
        let state = self.lock();
        state
            .mailbox_index(mailbox)
            .map(|i| state.mailboxes[i].messages.clone())
            .unwrap_or_default()
    }

    /// Returns the UIDs currently in a mailbox.
    pub fn uids(&self, mailbox: &str) -> Vec<Uid> {
        self.messages(mailbox).iter().map(|m| m.uid).collect()
    }

    /// Returns whether LOGOUT was issued.
    pub fn logged_out(&self) -> bool {
        !self.lock().connected
    }

    fn record(&self, call: Call) -> MutexGuard<'_, MemoryState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

fn no(message: impl Into<String>) -> SessionError {
    SessionError::Command(format!("NO {}", message.into()))
}

#[async_trait]
impl ImapTransport for MemoryTransport {
    async fn list_mailboxes(&mut self) -> Result<Vec<MailboxEntry>> {
        let state = self.record(Call::List);
        state.check_connected()?;
        Ok(state.mailboxes.iter().map(|m| m.entry.clone()).collect())
    }

    async fn select(&mut self, mailbox: &str) -> Result<()> {
        let mut state = self.record(Call::Select(mailbox.to_string()));
        state.check_connected()?;
        state.selected = None;
        if state.failing_selects.contains(mailbox) {
            return Err(no("SELECT failed"));
        }
        let index = state
            .mailbox_index(mailbox)
            .ok_or_else(|| no("mailbox does not exist"))?;
        state.selected = Some(index);
        Ok(())
    }

    async fn uid_next(&mut self, mailbox: &str) -> Result<Option<u32>> {
        let state = self.record(Call::UidNext(mailbox.to_string()));
        state.check_connected()?;
        if state.hide_uid_next {
            return Ok(None);
        }
        Ok(state.mailbox_index(mailbox).map(|i| state.mailboxes[i].uid_next))
    }

    async fn uid_search(&mut self, query: &UidQuery) -> Result<Vec<Uid>> {
        let mut state = self.record(Call::Search(query.clone()));
        state.check_connected()?;
        if matches!(query, UidQuery::RangeSince { .. }) && state.fail_searches_since {
            return Err(no("SEARCH failed"));
        }
        if matches!(query, UidQuery::All) {
            let selected = state.selected.map(|i| state.mailboxes[i].entry.name.clone());
            if selected.is_some_and(|name| state.failing_full_searches.contains(&name)) {
                return Err(no("SEARCH failed: too many results"));
            }
        }
        let mailbox = state.selected_mailbox()?;
        let uids = mailbox
            .messages
            .iter()
            .filter(|m| query.covers(m.uid.0))
            .filter(|m| match query {
                UidQuery::RangeSince { since, .. } => m.internal_date.date_naive() >= *since,
                _ => true,
            })
            .map(|m| m.uid)
            .collect();
        Ok(uids)
    }

    async fn uid_fetch(&mut self, uid: Uid) -> Result<Option<FetchedMessage>> {
        let mut state = self.record(Call::Fetch(uid));
        state.check_connected()?;
        if state.disconnect_on_fetch == Some(uid) {
            state.connected = false;
            return Err(SessionError::Connection("connection reset by peer".to_string()));
        }
        if state.failing_fetches.contains(&uid) {
            return Err(no("FETCH failed"));
        }
        let mailbox = state.selected_mailbox()?;
        Ok(mailbox
            .messages
            .iter()
            .find(|m| m.uid == uid)
            .map(|m| FetchedMessage {
                uid,
                raw: m.raw.clone(),
                internal_date: Some(m.internal_date),
            }))
    }

    async fn uid_store_deleted(&mut self, uid: Uid) -> Result<()> {
        let mut state = self.record(Call::StoreDeleted(uid));
        state.check_connected()?;
        let mailbox = state.selected_mailbox()?;
        if let Some(message) = mailbox.messages.iter_mut().find(|m| m.uid == uid) {
            message.deleted = true;
        }
        Ok(())
    }

    async fn uid_copy(&mut self, uid: Uid, mailbox: &str) -> Result<()> {
        let mut state = self.record(Call::Copy(uid, mailbox.to_string()));
        state.check_connected()?;
        if state.fail_copies {
            return Err(no("COPY failed"));
        }
        let target = state
            .mailbox_index(mailbox)
            .ok_or_else(|| no("[TRYCREATE] mailbox does not exist"))?;
        let source = state.selected_mailbox()?;
        let Some(message) = source.messages.iter().find(|m| m.uid == uid).cloned() else {
            return Ok(());
        };
        let destination = &mut state.mailboxes[target];
        let copy = StoredMessage {
            uid: Uid(destination.uid_next),
            deleted: false,
            ..message
        };
        destination.uid_next += 1;
        destination.messages.push(copy);
        Ok(())
    }

    async fn expunge(&mut self) -> Result<()> {
        let mut state = self.record(Call::Expunge);
        state.check_connected()?;
        if state.fail_expunge {
            return Err(no("EXPUNGE failed"));
        }
        let mailbox = state.selected_mailbox()?;
        mailbox.messages.retain(|m| !m.deleted);
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        let mut state = self.record(Call::Logout);
        state.check_connected()?;
        state.connected = false;
        state.selected = None;
        Ok(())
    }
}
