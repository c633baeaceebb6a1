//! Wave Portal: wallet session and ledger feed synchronization for a
//! WavePortal contract, with an eframe desktop shell.

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod gateway;
pub mod gui;
pub mod notifications;
pub mod session;
pub mod transaction_coordinator;
pub mod types;
pub mod user_settings;
pub mod wallet;
pub mod wave_contract;

#[cfg(test)]
mod testing;
