//! Application state: the single owner of session, feed and transaction state.
//!
//! Every UI action and effect result is an [`AppEvent`] on one channel.
//! `handle` applies one event to completion, then publishes a fresh
//! [`AppSnapshot`] on a `watch` channel for the UI.

use crate::config::Config;
use crate::events::{Action, AppEvent, EventReceiver, EventSender};
use crate::feed::{FeedSynchronizer, SourceStatus};
use crate::gateway::LedgerGateway;
use crate::notifications::{push_notice, Notice};
use crate::session::SessionManager;
use crate::transaction_coordinator::{TransactionCoordinator, TxOutcome, TxPhase};
use crate::types::{Account, WaveRecord};
use crate::wallet::WalletCapability;
use ethers::types::TxHash;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// How the last write ended, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastTransaction {
    pub tx_hash: Option<TxHash>,
    pub explorer_url: Option<String>,
    pub confirmed: bool,
    pub error: Option<String>,
}

/// Immutable view of the application state handed to the UI.
#[derive(Debug, Clone)]
pub struct AppSnapshot {
    pub network_label: String,
    pub account: Option<Account>,
    pub wallet_unavailable: bool,
    pub connecting: bool,
    pub records: Vec<WaveRecord>,
    pub history_status: SourceStatus,
    pub live_status: SourceStatus,
    pub total_records: Option<u64>,
    pub phase: TxPhase,
    pub pending_tx_hash: Option<TxHash>,
    pub draft: String,
    pub draft_revision: u64,
    pub notices: Vec<Notice>,
    pub last_transaction: Option<LastTransaction>,
}

impl Default for AppSnapshot {
    fn default() -> Self {
        Self {
            network_label: String::new(),
            account: None,
            wallet_unavailable: false,
            connecting: false,
            records: Vec::new(),
            history_status: SourceStatus::Idle,
            live_status: SourceStatus::Idle,
            total_records: None,
            phase: TxPhase::Idle,
            pending_tx_hash: None,
            draft: String::new(),
            draft_revision: 0,
            notices: Vec::new(),
            last_transaction: None,
        }
    }
}

/// The UI's side of the controller.
#[derive(Clone)]
pub struct ControllerHandle {
    pub actions: EventSender,
    pub snapshot: watch::Receiver<AppSnapshot>,
}

impl ControllerHandle {
    /// Returns false once the controller has stopped.
    pub fn send(&self, action: Action) -> bool {
        self.actions.send(action.into()).is_ok()
    }
}

pub struct WaveController {
    config: Config,
    session: SessionManager,
    feed: FeedSynchronizer,
    tx: TransactionCoordinator,
    notices: VecDeque<Notice>,
    events: EventReceiver,
    snapshot: watch::Sender<AppSnapshot>,
    shutting_down: bool,
}

impl WaveController {
    pub fn new(
        config: Config,
        wallet: Arc<dyn WalletCapability>,
        gateway: Arc<dyn LedgerGateway>,
    ) -> (Self, ControllerHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(AppSnapshot::default());

        let controller = Self {
            session: SessionManager::new(wallet, event_tx.clone()),
            feed: FeedSynchronizer::new(gateway.clone(), event_tx.clone()),
            tx: TransactionCoordinator::new(gateway, event_tx.clone(), config.confirmation_timeout()),
            config,
            notices: VecDeque::new(),
            events: event_rx,
            snapshot: snapshot_tx,
            shutting_down: false,
        };
        controller.publish();

        let handle = ControllerHandle {
            actions: event_tx,
            snapshot: snapshot_rx,
        };
        (controller, handle)
    }

    /// Launch: look for an already-authorized account.
    pub fn start(&mut self) {
        info!(
            "Wave portal on {} (chain {}), contract {:?}",
            self.config.network_label(),
            self.config.chain_id,
            self.config.contract_address
        );
        self.session.restore_session();
        self.publish();
    }

    /// Apply one event, then publish the resulting state.
    pub fn handle(&mut self, event: AppEvent) {
        match event {
            AppEvent::Action(action) => self.handle_action(action),
            AppEvent::Session(event) => {
                let outcome = self.session.handle(event);
                if let Some(account) = outcome.established {
                    self.feed.initialize(account);
                }
                self.notify(outcome.notice);
            }
            AppEvent::Feed(event) => {
                let notice = self.feed.handle(event);
                self.notify(notice);
            }
            AppEvent::Transaction(event) => {
                let notice = self.tx.handle(event);
                self.notify(notice);
            }
        }
        self.publish();
    }

    fn handle_action(&mut self, action: Action) {
        debug!("Action {:?}", action);
        match action {
            Action::Connect => {
                if let Err(notice) = self.session.connect() {
                    self.notify(Some(notice));
                }
            }
            Action::Disconnect => {
                if self.session.disconnect() {
                    self.feed.reset();
                    self.notify(Some(Notice::info("Disconnected")));
                }
            }
            Action::SetDraft(draft) => self.tx.set_draft(draft),
            Action::SubmitWrite => {
                if let Err(rejection) = self.tx.submit(self.session.account()) {
                    self.notify(Some(Notice::warning(rejection.to_string())));
                }
            }
            Action::Shutdown => {
                info!("Shutdown requested");
                self.shutting_down = true;
            }
        }
    }

    /// Wait for and apply the next event. Returns false when the controller should stop.
    pub async fn step(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => {
                self.handle(event);
                !self.shutting_down
            }
            None => false,
        }
    }

    /// Process events until `Shutdown`, then tear the session down.
    pub async fn run(mut self) {
        self.start();
        while self.step().await {}
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.feed.reset();
        self.session.disconnect();
        self.publish();
        info!("Controller stopped");
    }

    fn notify(&mut self, notice: Option<Notice>) {
        if let Some(notice) = notice {
            push_notice(&mut self.notices, notice);
        }
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let last_transaction = self.tx.last_outcome().map(|outcome| {
            let tx_hash = outcome.tx_hash();
            LastTransaction {
                tx_hash,
                explorer_url: tx_hash.and_then(|hash| self.config.tx_explorer_url(&format!("{:?}", hash))),
                confirmed: matches!(outcome, TxOutcome::Confirmed(_)),
                error: match outcome {
                    TxOutcome::Failed { error, .. } => Some(error.user_notice()),
                    TxOutcome::Confirmed(_) => None,
                },
            }
        });

        AppSnapshot {
            network_label: self.config.network_label().to_string(),
            account: self.session.account(),
            wallet_unavailable: self.session.wallet_unavailable(),
            connecting: self.session.is_connecting(),
            records: self.feed.feed().records().to_vec(),
            history_status: self.feed.history_status(),
            live_status: self.feed.live_status(),
            total_records: self.tx.total_records(),
            phase: self.tx.phase(),
            pending_tx_hash: self.tx.pending().and_then(|p| p.tx_hash),
            draft: self.tx.draft().to_string(),
            draft_revision: self.tx.draft_revision(),
            notices: self.notices.iter().cloned().collect(),
            last_transaction,
        }
    }

    fn publish(&self) {
        // No receivers left means the UI is gone; the next Shutdown stops us.
        let _ = self.snapshot.send(self.snapshot());
    }
}
