//! Single in-flight write: validate → submit → await confirmation → report.
//!
//! Only one `PendingTransaction` exists at a time. A confirmed wave is not
//! added to the feed here; it arrives through the live subscription like
//! everyone else's.

use crate::error::{SubmitRejection, WaveError};
use crate::events::{spawn_effect, AppEvent, EventSender, TxEvent};
use crate::gateway::{Confirmation, LedgerGateway};
use crate::notifications::Notice;
use crate::types::Account;
use ethers::types::TxHash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Phase of the current write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPhase {
    Idle,
    Submitting,
    AwaitingConfirmation,
    Confirmed,
    Failed,
}

impl TxPhase {
    pub fn label(&self) -> &'static str {
        match self {
            TxPhase::Idle => "Idle",
            TxPhase::Submitting => "Waiting for wallet signature...",
            TxPhase::AwaitingConfirmation => "Mining...",
            TxPhase::Confirmed => "Confirmed",
            TxPhase::Failed => "Failed",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, TxPhase::Submitting | TxPhase::AwaitingConfirmation)
    }
}

/// The write currently in flight.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub message: String,
    pub phase: TxPhase,
    pub tx_hash: Option<TxHash>,
}

/// How the last write ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed(Confirmation),
    Failed {
        tx_hash: Option<TxHash>,
        error: WaveError,
    },
}

impl TxOutcome {
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            TxOutcome::Confirmed(confirmation) => Some(confirmation.tx_hash),
            TxOutcome::Failed { tx_hash, .. } => *tx_hash,
        }
    }
}

pub struct TransactionCoordinator {
    gateway: Arc<dyn LedgerGateway>,
    events: EventSender,
    confirmation_timeout: Duration,
    draft: String,
    draft_revision: u64,
    pending: Option<PendingTransaction>,
    transitions: Vec<TxPhase>,
    last_outcome: Option<TxOutcome>,
    total_records: Option<u64>,
}

impl TransactionCoordinator {
    pub fn new(gateway: Arc<dyn LedgerGateway>, events: EventSender, confirmation_timeout: Duration) -> Self {
        Self {
            gateway,
            events,
            confirmation_timeout,
            draft: String::new(),
            draft_revision: 0,
            pending: None,
            transitions: Vec::new(),
            last_outcome: None,
            total_records: None,
        }
    }

    pub fn phase(&self) -> TxPhase {
        self.pending.as_ref().map(|p| p.phase).unwrap_or(TxPhase::Idle)
    }

    pub fn pending(&self) -> Option<&PendingTransaction> {
        self.pending.as_ref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Bumped whenever the coordinator itself rewrites the draft.
    pub fn draft_revision(&self) -> u64 {
        self.draft_revision
    }

    /// Phases the latest write went through, starting at `Idle`.
    pub fn transitions(&self) -> &[TxPhase] {
        &self.transitions
    }

    pub fn last_outcome(&self) -> Option<&TxOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn total_records(&self) -> Option<u64> {
        self.total_records
    }

    pub fn set_draft(&mut self, draft: String) {
        self.draft = draft;
    }

    /// Start a write of the current draft from `account`.
    pub fn submit(&mut self, account: Option<Account>) -> Result<(), SubmitRejection> {
        if self.pending.is_some() {
            return Err(SubmitRejection::InProgress);
        }
        let account = account.ok_or(SubmitRejection::NoAccount)?;
        if self.draft.trim().is_empty() {
            return Err(SubmitRejection::EmptyMessage);
        }

        let message = std::mem::take(&mut self.draft);
        self.draft_revision += 1;
        self.pending = Some(PendingTransaction {
            message: message.clone(),
            phase: TxPhase::Submitting,
            tx_hash: None,
        });
        self.transitions = vec![TxPhase::Idle, TxPhase::Submitting];
        self.last_outcome = None;
        info!("Submitting wave from {}", account);

        self.refresh_total();

        let gateway = self.gateway.clone();
        let events = self.events.clone();
        let timeout = self.confirmation_timeout;
        tokio::spawn(async move {
            let handle = match gateway.submit_write(account, &message).await {
                Ok(handle) => handle,
                Err(e) => {
                    let _ = events.send(AppEvent::Transaction(TxEvent::Submitted(Err(e))));
                    return;
                }
            };
            let _ = events.send(AppEvent::Transaction(TxEvent::Submitted(Ok(handle.tx_hash()))));

            let result = match tokio::time::timeout(timeout, handle.await_confirmation()).await {
                Ok(result) => result,
                Err(_) => Err(WaveError::ConfirmationTimeout(timeout.as_secs())),
            };
            let _ = events.send(AppEvent::Transaction(TxEvent::Resolved(result)));
        });
        Ok(())
    }

    /// Ask the contract for its wave counter; the answer arrives as an event.
    pub fn refresh_total(&self) {
        let gateway = self.gateway.clone();
        spawn_effect(&self.events, async move {
            AppEvent::Transaction(TxEvent::TotalRecords(gateway.total_records().await))
        });
    }

    pub fn handle(&mut self, event: TxEvent) -> Option<Notice> {
        match event {
            TxEvent::TotalRecords(Ok(total)) => {
                info!("Retrieved total wave count... {}", total);
                self.total_records = Some(total);
                None
            }
            TxEvent::TotalRecords(Err(e)) => {
                warn!("Could not read total wave count: {}", e);
                None
            }
            TxEvent::Submitted(result) => {
                if self.phase() != TxPhase::Submitting {
                    warn!("Submission result with no write being submitted");
                    return None;
                }
                match result {
                    Ok(tx_hash) => {
                        info!("Mining... {:?}", tx_hash);
                        self.advance(TxPhase::AwaitingConfirmation);
                        if let Some(pending) = self.pending.as_mut() {
                            pending.tx_hash = Some(tx_hash);
                        }
                        Some(Notice::info(format!("Wave sent, waiting for confirmation ({:?})", tx_hash)))
                    }
                    Err(e) => Some(self.fail(e)),
                }
            }
            TxEvent::Resolved(result) => {
                if self.phase() != TxPhase::AwaitingConfirmation {
                    warn!("Confirmation result with no write awaiting confirmation");
                    return None;
                }
                match result {
                    Ok(confirmation) => {
                        info!(
                            "Mined -- {:?} (block {:?}, gas {})",
                            confirmation.tx_hash, confirmation.block_number, confirmation.gas_used
                        );
                        self.advance(TxPhase::Confirmed);
                        let notice = Notice::info(match confirmation.block_number {
                            Some(block) => format!("Wave confirmed in block {}", block),
                            None => "Wave confirmed".to_string(),
                        });
                        self.last_outcome = Some(TxOutcome::Confirmed(confirmation));
                        self.finish();
                        self.refresh_total();
                        Some(notice)
                    }
                    Err(e) => Some(self.fail(e)),
                }
            }
        }
    }

    fn advance(&mut self, phase: TxPhase) {
        if let Some(pending) = self.pending.as_mut() {
            debug!("Transaction phase {:?} -> {:?}", pending.phase, phase);
            pending.phase = phase;
            self.transitions.push(phase);
        }
    }

    fn fail(&mut self, error: WaveError) -> Notice {
        error!("Wave failed: {}", error);
        self.advance(TxPhase::Failed);
        if let Some(pending) = self.pending.as_ref() {
            self.last_outcome = Some(TxOutcome::Failed {
                tx_hash: pending.tx_hash,
                error: error.clone(),
            });
            if self.draft.is_empty() {
                self.draft = pending.message.clone();
                self.draft_revision += 1;
            }
        }
        self.finish();
        Notice::error(format!("Wave failed: {}", error.user_notice()))
    }

    /// Terminal phase observed: drop the pending write and return to Idle.
    fn finish(&mut self) {
        self.pending = None;
        self.transitions.push(TxPhase::Idle);
    }
}
