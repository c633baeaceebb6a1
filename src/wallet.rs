//! Wallet capability: account discovery, interactive authorization and signing.
//!
//! The production implementation talks to an EIP-1193 style JSON-RPC wallet
//! endpoint (a desktop wallet exposing its provider over HTTP). The wallet
//! holds the keys; this client only asks it to authorize and to sign-and-send.

use crate::error::WaveError;
use crate::types::Account;
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-call options for `sign_and_send`.
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    pub gas_limit: u64,
}

#[async_trait]
pub trait WalletCapability: Send + Sync {
    /// Accounts this client is already authorized for. Never prompts.
    async fn list_authorized_accounts(&self) -> Result<Vec<Account>, WaveError>;

    /// Ask the user to authorize this client. May prompt.
    async fn request_authorization(&self) -> Result<Vec<Account>, WaveError>;

    /// Have the wallet sign `calldata` for `contract` and broadcast it.
    async fn sign_and_send(
        &self,
        from: Account,
        contract: Address,
        calldata: Vec<u8>,
        options: SendOptions,
    ) -> Result<TxHash, WaveError>;
}

/// Wallet reached over JSON-RPC (`eth_accounts`, `eth_requestAccounts`, `eth_sendTransaction`).
pub struct JsonRpcWallet {
    provider: Arc<Provider<Http>>,
    endpoint: String,
}

impl JsonRpcWallet {
    pub fn new(provider: Arc<Provider<Http>>, endpoint: impl Into<String>) -> Self {
        Self {
            provider,
            endpoint: endpoint.into(),
        }
    }

    fn unavailable(&self, err: ProviderError) -> WaveError {
        match WaveError::from_wallet(err) {
            WaveError::WalletUnavailable(reason) => {
                WaveError::WalletUnavailable(format!("{} ({})", self.endpoint, reason))
            }
            other => other,
        }
    }
}

#[async_trait]
impl WalletCapability for JsonRpcWallet {
    async fn list_authorized_accounts(&self) -> Result<Vec<Account>, WaveError> {
        let accounts: Vec<Address> = self
            .provider
            .request("eth_accounts", ())
            .await
            .map_err(|e| self.unavailable(e))?;
        debug!("Wallet reports {} authorized account(s)", accounts.len());
        Ok(accounts.into_iter().map(Account).collect())
    }

    async fn request_authorization(&self) -> Result<Vec<Account>, WaveError> {
        info!("Requesting wallet authorization from {}", self.endpoint);
        let accounts: Vec<Address> = self
            .provider
            .request("eth_requestAccounts", ())
            .await
            .map_err(|e| self.unavailable(e))?;
        if accounts.is_empty() {
            warn!("Wallet returned no accounts after authorization request");
            return Err(WaveError::AuthorizationDenied);
        }
        Ok(accounts.into_iter().map(Account).collect())
    }

    async fn sign_and_send(
        &self,
        from: Account,
        contract: Address,
        calldata: Vec<u8>,
        options: SendOptions,
    ) -> Result<TxHash, WaveError> {
        debug!(
            "eth_sendTransaction from {} to {:?} gas {} data 0x{}",
            from,
            contract,
            options.gas_limit,
            hex::encode(&calldata)
        );
        let tx: TypedTransaction = TransactionRequest::new()
            .from(from.address())
            .to(contract)
            .data(calldata)
            .gas(options.gas_limit)
            .into();

        let tx_hash: TxHash = self
            .provider
            .request("eth_sendTransaction", [tx])
            .await
            .map_err(|e| self.unavailable(e))?;
        info!("Wallet broadcast transaction {:?}", tx_hash);
        Ok(tx_hash)
    }
}
