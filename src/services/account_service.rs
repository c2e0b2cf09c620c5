//! Account service.
//!
//! Processes accounts one at a time: connect, discover mailboxes, detect
//! Trash once, run every cleanup unit in order, and always log out. A fatal
//! session error ends the account with [`RunStatus::Aborted`]; the next
//! account still runs. An operator cancel ends the whole run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::cleanup_service::{CleanupEngine, CleanupUnit, EngineOptions, UnitOutcome};
use super::gate::DecisionGate;
use crate::config::resolve_password;
use crate::domain::{AccountConfig, RunStatus, RunTotals, ServerConfig, Summary};
use crate::providers::imap::{
    ImapClient, ImapTransport, MailboxSession, Result, SessionError, DEFAULT_CHUNK_SIZE,
};

/// Opens authenticated transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Transport: ImapTransport;

    /// Connects and logs in to `server`.
    async fn connect(&self, server: &ServerConfig) -> Result<Self::Transport>;
}

/// Connects over the network with [`ImapClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapConnector;

#[async_trait]
impl Connector for ImapConnector {
    type Transport = ImapClient;

    async fn connect(&self, server: &ServerConfig) -> Result<ImapClient> {
        let password = resolve_password(&server.credentials)
            .await
            .map_err(|e| SessionError::Authentication(e.to_string()))?;
        ImapClient::connect(server, &password).await
    }
}

/// Run-wide settings.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// UIDs per search window.
    pub chunk_size: usize,
    /// Age window used when neither the account nor the unit sets one.
    pub skip_days: u32,
    /// Reference time for age windows.
    pub now: DateTime<Utc>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            skip_days: 0,
            now: Utc::now(),
        }
    }
}

/// Runs configured accounts through a connector.
pub struct AccountService<C> {
    connector: C,
    options: RunOptions,
}

impl<C: Connector> AccountService<C> {
    /// Creates a new account service.
    pub fn new(connector: C, options: RunOptions) -> Self {
        Self { connector, options }
    }

    /// Returns the run options.
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Processes accounts in order, stopping after an operator cancel.
    pub async fn run_all(
        &self,
        accounts: &[AccountConfig],
        gate: &mut dyn DecisionGate,
    ) -> (Vec<Summary>, RunTotals) {
        let mut summaries = Vec::with_capacity(accounts.len());
        let mut totals = RunTotals::default();

        for account in accounts {
            let summary = self.process_account(account, gate).await;
            totals.record(&summary);
            let cancelled = summary.status.is_cancelled();
            summaries.push(summary);
            if cancelled {
                tracing::info!(account = %account.name, "run cancelled, remaining accounts skipped");
                break;
            }
        }

        (summaries, totals)
    }

    /// Processes one account and returns its summary.
    ///
    /// Never fails: connection and session errors are reported in the
    /// summary status.
    pub async fn process_account(
        &self,
        account: &AccountConfig,
        gate: &mut dyn DecisionGate,
    ) -> Summary {
        let mut summary = Summary::new(account.name.clone());
        let fallback_skip_days = account.skip_days.unwrap_or(self.options.skip_days);
        let units: Vec<CleanupUnit> = account
            .cleanups
            .iter()
            .map(|cleanup| CleanupUnit::compile(cleanup, fallback_skip_days))
            .collect();

        tracing::info!(
            account = %account.name,
            server = %account.server.address(),
            mode = %account.server.mode,
            units = units.len(),
            "processing account"
        );

        let transport = match self.connector.connect(&account.server).await {
            Ok(transport) => transport,
            Err(e) => {
                tracing::error!(account = %account.name, error = %e, "connection failed");
                summary.status = RunStatus::Aborted(e.to_string());
                return summary;
            }
        };

        let mut session = MailboxSession::new(transport);
        let result = self.run_units(&mut session, &units, gate, &mut summary).await;

        if let Err(e) = session.close().await {
            tracing::debug!(account = %account.name, error = %e, "logout failed");
        }

        summary.status = match result {
            Ok(UnitOutcome::Completed) => RunStatus::Completed,
            Ok(UnitOutcome::Cancelled) => RunStatus::Cancelled,
            Err(e) => {
                tracing::error!(account = %account.name, error = %e, "account aborted");
                RunStatus::Aborted(e.to_string())
            }
        };

        tracing::info!(summary = %summary, "account finished");
        summary
    }

    async fn run_units<T: ImapTransport>(
        &self,
        session: &mut MailboxSession<T>,
        units: &[CleanupUnit],
        gate: &mut dyn DecisionGate,
        summary: &mut Summary,
    ) -> Result<UnitOutcome> {
        session.load_mailboxes().await?;
        session.detect_trash();

        let mut engine = CleanupEngine::new(
            gate,
            EngineOptions {
                chunk_size: self.options.chunk_size,
                now: self.options.now,
            },
        );

        for unit in units {
            if engine.run_unit(session, unit, summary).await? == UnitOutcome::Cancelled {
                return Ok(UnitOutcome::Cancelled);
            }
        }
        Ok(UnitOutcome::Completed)
    }
}
