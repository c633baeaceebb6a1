//! Wallet session: discovers or requests an authorized account and owns it.

use crate::error::WaveError;
use crate::events::{spawn_effect, AppEvent, EventSender, SessionEvent};
use crate::notifications::Notice;
use crate::types::Account;
use crate::wallet::WalletCapability;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the controller has to react to after a session event.
#[derive(Debug, Default)]
pub struct SessionOutcome {
    /// Set when the current account changed to a new value; the feed must re-initialize.
    pub established: Option<Account>,
    pub notice: Option<Notice>,
}

pub struct SessionManager {
    wallet: Arc<dyn WalletCapability>,
    events: EventSender,
    account: Option<Account>,
    wallet_unavailable: bool,
    restore_started: bool,
    connecting: bool,
}

impl SessionManager {
    pub fn new(wallet: Arc<dyn WalletCapability>, events: EventSender) -> Self {
        Self {
            wallet,
            events,
            account: None,
            wallet_unavailable: false,
            restore_started: false,
            connecting: false,
        }
    }

    pub fn account(&self) -> Option<Account> {
        self.account
    }

    pub fn wallet_unavailable(&self) -> bool {
        self.wallet_unavailable
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    /// Look for an already-authorized account without prompting. Runs once per launch.
    pub fn restore_session(&mut self) {
        if self.restore_started {
            debug!("Session restore already attempted");
            return;
        }
        self.restore_started = true;
        let wallet = self.wallet.clone();
        spawn_effect(&self.events, async move {
            AppEvent::Session(SessionEvent::Restored(wallet.list_authorized_accounts().await))
        });
    }

    /// Ask the wallet for authorization. Rejected while another request is pending.
    pub fn connect(&mut self) -> Result<(), Notice> {
        if self.connecting {
            return Err(Notice::warning("Wallet connection request already pending"));
        }
        self.connecting = true;
        let wallet = self.wallet.clone();
        spawn_effect(&self.events, async move {
            AppEvent::Session(SessionEvent::Connected(wallet.request_authorization().await))
        });
        Ok(())
    }

    pub fn handle(&mut self, event: SessionEvent) -> SessionOutcome {
        match event {
            SessionEvent::Restored(_) if self.account.is_some() => {
                debug!("Ignoring restore result; an account is already active");
                SessionOutcome::default()
            }
            SessionEvent::Restored(Ok(accounts)) => match accounts.first() {
                Some(account) => {
                    info!("Found an authorized account: {}", account);
                    SessionOutcome {
                        established: self.adopt(*account),
                        notice: None,
                    }
                }
                None => {
                    info!("No authorized account found");
                    SessionOutcome::default()
                }
            },
            SessionEvent::Restored(Err(e)) => {
                if !e.is_retryable() {
                    self.wallet_unavailable = true;
                }
                warn!("Session restore failed: {}", e);
                SessionOutcome {
                    established: None,
                    notice: Some(Notice::warning(e.user_notice())),
                }
            }
            SessionEvent::Connected(result) => {
                self.connecting = false;
                match result {
                    Ok(accounts) => match accounts.first() {
                        Some(account) => {
                            info!("Connected {}", account);
                            self.wallet_unavailable = false;
                            SessionOutcome {
                                established: self.adopt(*account),
                                notice: Some(Notice::info(format!("Connected {}", account.short()))),
                            }
                        }
                        None => SessionOutcome {
                            established: None,
                            notice: Some(Notice::warning(WaveError::AuthorizationDenied.user_notice())),
                        },
                    },
                    Err(e) => {
                        warn!("Wallet connection failed: {}", e);
                        SessionOutcome {
                            established: None,
                            notice: Some(Notice::error(e.user_notice())),
                        }
                    }
                }
            }
        }
    }

    /// Returns the account only if it differs from the current one.
    fn adopt(&mut self, account: Account) -> Option<Account> {
        if self.account == Some(account) {
            debug!("Account {} already active", account);
            return None;
        }
        self.account = Some(account);
        Some(account)
    }

    /// Clear the account. Returns whether one was set.
    pub fn disconnect(&mut self) -> bool {
        match self.account.take() {
            Some(account) => {
                info!("Disconnected {}", account);
                true
            }
            None => false,
        }
    }
}
