//! Events flowing into the application controller.
//!
//! UI actions and the results of every asynchronous effect arrive on one
//! channel and are applied one at a time, so each state transition works on
//! the latest state rather than a captured copy.

use crate::error::WaveError;
use crate::gateway::{Confirmation, Subscription};
use crate::types::{Account, WaveRecord};
use ethers::types::TxHash;
use std::future::Future;
use tokio::sync::mpsc;

pub type EventSender = mpsc::UnboundedSender<AppEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

/// Actions the UI can invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Connect,
    Disconnect,
    SetDraft(String),
    SubmitWrite,
    /// Window closed.
    Shutdown,
}

#[derive(Debug)]
pub enum SessionEvent {
    Restored(Result<Vec<Account>, WaveError>),
    Connected(Result<Vec<Account>, WaveError>),
}

/// Feed results, tagged with the session epoch they were started for.
#[derive(Debug)]
pub enum FeedEvent {
    HistoryLoaded {
        epoch: u64,
        result: Result<Vec<WaveRecord>, WaveError>,
    },
    Subscribed {
        epoch: u64,
        result: Result<Subscription, WaveError>,
    },
    LiveRecord {
        epoch: u64,
        record: WaveRecord,
    },
    LiveClosed {
        epoch: u64,
    },
}

#[derive(Debug)]
pub enum TxEvent {
    Submitted(Result<TxHash, WaveError>),
    Resolved(Result<Confirmation, WaveError>),
    TotalRecords(Result<u64, WaveError>),
}

#[derive(Debug)]
pub enum AppEvent {
    Action(Action),
    Session(SessionEvent),
    Feed(FeedEvent),
    Transaction(TxEvent),
}

impl From<Action> for AppEvent {
    fn from(action: Action) -> Self {
        AppEvent::Action(action)
    }
}

/// Run `effect` on the runtime and post its result back as an event.
pub fn spawn_effect<F>(events: &EventSender, effect: F)
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    let events = events.clone();
    tokio::spawn(async move {
        let event = effect.await;
        if events.send(event).is_err() {
            tracing::debug!("Controller gone, dropping effect result");
        }
    });
}
