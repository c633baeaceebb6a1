//! Ledger gateway: typed access to the WavePortal contract.
//!
//! Three capabilities: a one-shot historical query, a signed write that yields
//! a confirmation handle, and a live subscription for newly appended waves.
//! The gateway owns no session state.

use crate::error::WaveError;
use crate::types::{Account, WaveRecord};
use crate::wallet::{SendOptions, WalletCapability};
use crate::wave_contract;
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// What a mined write reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// A submitted write awaiting finalization.
#[async_trait]
pub trait TransactionHandle: Send + Sync {
    fn tx_hash(&self) -> TxHash;

    /// Resolves once the write is mined or reverted. It never gives up on
    /// its own; callers bound the wait.
    async fn await_confirmation(&self) -> Result<Confirmation, WaveError>;
}

/// Detaches a live listener. Consumed on use, so it can run at most once.
///
/// Dropping an un-invoked handle detaches too, but logs it as a leak.
pub struct UnsubscribeHandle {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl UnsubscribeHandle {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for UnsubscribeHandle {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            warn!("Live subscription dropped without unsubscribe; detaching");
            detach();
        }
    }
}

impl std::fmt::Debug for UnsubscribeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsubscribeHandle")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

/// A live stream of waves appended after the subscription started.
#[derive(Debug)]
pub struct Subscription {
    pub records: mpsc::UnboundedReceiver<WaveRecord>,
    pub handle: UnsubscribeHandle,
}

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Every wave recorded so far, in ledger append order.
    async fn fetch_all_records(&self) -> Result<Vec<WaveRecord>, WaveError>;

    /// The contract's own wave counter.
    async fn total_records(&self) -> Result<u64, WaveError>;

    /// Sign and broadcast `wave(message)` from `from`.
    async fn submit_write(
        &self,
        from: Account,
        message: &str,
    ) -> Result<Box<dyn TransactionHandle>, WaveError>;

    /// Start delivering waves appended from now on, in append order.
    async fn subscribe(&self) -> Result<Subscription, WaveError>;
}

/// Gateway backed by an EVM JSON-RPC node, with writes signed by the wallet.
pub struct ContractGateway {
    provider: Arc<Provider<Http>>,
    wallet: Arc<dyn WalletCapability>,
    contract: Address,
    gas_limit: u64,
}

impl ContractGateway {
    pub fn new(
        provider: Arc<Provider<Http>>,
        wallet: Arc<dyn WalletCapability>,
        contract: Address,
        gas_limit: u64,
    ) -> Self {
        Self {
            provider,
            wallet,
            contract,
            gas_limit,
        }
    }

    async fn view_call(&self, calldata: Vec<u8>) -> Result<Bytes, WaveError> {
        let tx = TransactionRequest::new().to(self.contract).data(calldata);
        self.provider
            .call(&tx.into(), None)
            .await
            .map_err(WaveError::from_gateway)
    }
}

fn abi_failure(err: wave_contract::AbiError) -> WaveError {
    WaveError::RemoteError(err.to_string())
}

#[async_trait]
impl LedgerGateway for ContractGateway {
    async fn fetch_all_records(&self) -> Result<Vec<WaveRecord>, WaveError> {
        let calldata = wave_contract::encode_get_all_waves().map_err(abi_failure)?;
        let result = self.view_call(calldata).await?;
        let records = wave_contract::decode_all_waves(&result).map_err(abi_failure)?;
        info!("Fetched {} historical wave(s) from {:?}", records.len(), self.contract);
        Ok(records)
    }

    async fn total_records(&self) -> Result<u64, WaveError> {
        let calldata = wave_contract::encode_get_total_waves().map_err(abi_failure)?;
        let result = self.view_call(calldata).await?;
        wave_contract::decode_total_waves(&result).map_err(abi_failure)
    }

    async fn submit_write(
        &self,
        from: Account,
        message: &str,
    ) -> Result<Box<dyn TransactionHandle>, WaveError> {
        let calldata = wave_contract::encode_wave(message).map_err(abi_failure)?;
        let tx_hash = self
            .wallet
            .sign_and_send(
                from,
                self.contract,
                calldata,
                SendOptions {
                    gas_limit: self.gas_limit,
                },
            )
            .await?;
        Ok(Box::new(ProviderTransactionHandle {
            provider: self.provider.clone(),
            tx_hash,
        }))
    }

    async fn subscribe(&self) -> Result<Subscription, WaveError> {
        let (record_tx, records) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let provider = self.provider.clone();
        let filter = wave_contract::new_wave_filter(self.contract);

        tokio::spawn(async move {
            let mut stream = match provider.watch(&filter).await {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(WaveError::from_gateway(e)));
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    log = stream.next() => match log {
                        Some(log) => match wave_contract::decode_new_wave(&log) {
                            Ok(record) => {
                                if record_tx.send(record).is_err() {
                                    debug!("NewWave receiver closed, stopping watcher");
                                    break;
                                }
                            }
                            Err(e) => warn!("Skipping undecodable NewWave log: {}", e),
                        },
                        None => {
                            debug!("NewWave watcher stream ended");
                            return;
                        }
                    },
                }
            }

            let filter_id = stream.id;
            match provider.uninstall_filter(filter_id).await {
                Ok(_) => debug!("Uninstalled NewWave filter {}", filter_id),
                Err(e) => warn!("Failed to uninstall NewWave filter {}: {}", filter_id, e),
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                info!("Subscribed to NewWave on {:?}", self.contract);
                Ok(Subscription {
                    records,
                    handle: UnsubscribeHandle::new(move || {
                        let _ = cancel_tx.send(());
                    }),
                })
            }
            Ok(Err(e)) => {
                error!("Failed to install NewWave filter: {}", e);
                Err(e)
            }
            Err(_) => Err(WaveError::GatewayUnreachable(
                "NewWave watcher exited before it was ready".to_string(),
            )),
        }
    }
}

struct ProviderTransactionHandle {
    provider: Arc<Provider<Http>>,
    tx_hash: TxHash,
}

#[async_trait]
impl TransactionHandle for ProviderTransactionHandle {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    async fn await_confirmation(&self) -> Result<Confirmation, WaveError> {
        // No receipt yet means not visible on this node, not dropped.
        let mut polls: u64 = 0;
        let receipt = loop {
            match self.provider.get_transaction_receipt(self.tx_hash).await {
                Ok(Some(receipt)) => break receipt,
                Ok(None) => {}
                Err(e) => debug!("Receipt lookup for {:?} failed: {}", self.tx_hash, e),
            }
            polls += 1;
            if polls % 30 == 0 {
                debug!("Still waiting for {:?} after {} polls", self.tx_hash, polls);
            }
            tokio::time::sleep(self.provider.get_interval()).await;
        };

        if receipt.status == Some(U64::zero()) {
            return Err(WaveError::RemoteError(format!(
                "Transaction {:?} reverted",
                self.tx_hash
            )));
        }

        Ok(Confirmation {
            tx_hash: self.tx_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            gas_used: receipt.gas_used.map(|g| g.as_u64()).unwrap_or(0),
        })
    }
}
