//! Error taxonomy for wallet, gateway and transaction failures.

use ethers::providers::{ProviderError, RpcError};
use thiserror::Error;

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 "the requested method/account has not been authorized".
pub const UNAUTHORIZED_CODE: i64 = 4100;

/// Failures reported by the wallet or the ledger gateway.
///
/// None of these are retried automatically; retries are always a user action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaveError {
    /// No wallet capability is reachable. Terminal for restore on this launch.
    #[error("No wallet available: {0}")]
    WalletUnavailable(String),
    #[error("Authorization denied in wallet")]
    AuthorizationDenied,
    #[error("Ledger gateway unreachable: {0}")]
    GatewayUnreachable(String),
    #[error("Remote error: {0}")]
    RemoteError(String),
    #[error("Confirmation not received within {0}s")]
    ConfirmationTimeout(u64),
}

impl WaveError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WaveError::WalletUnavailable(_))
    }

    /// Text shown to the user, with a hint where one helps.
    pub fn user_notice(&self) -> String {
        match self {
            WaveError::WalletUnavailable(_) => format!(
                "{}\n\nStart a wallet that exposes a JSON-RPC endpoint (check the wallet URL in Settings).",
                self
            ),
            WaveError::AuthorizationDenied => {
                "Request was rejected in the wallet. You can try again.".to_string()
            }
            WaveError::ConfirmationTimeout(_) => format!(
                "{}\n\nThe transaction may still be mined; check the explorer before retrying.",
                self
            ),
            _ => self.to_string(),
        }
    }

    /// Map a wallet-side provider failure. Transport failures mean the wallet is absent.
    pub fn from_wallet(err: ProviderError) -> Self {
        match err.as_error_response() {
            Some(resp) => classify_rpc_code(resp.code, &resp.message),
            None => WaveError::WalletUnavailable(err.to_string()),
        }
    }

    /// Map a ledger-side provider failure. Transport failures mean the gateway is unreachable.
    pub fn from_gateway(err: ProviderError) -> Self {
        match err.as_error_response() {
            Some(resp) => classify_rpc_code(resp.code, &resp.message),
            None => WaveError::GatewayUnreachable(err.to_string()),
        }
    }
}

/// Classify a JSON-RPC error object returned by a wallet or node.
pub fn classify_rpc_code(code: i64, message: &str) -> WaveError {
    match code {
        USER_REJECTED_CODE | UNAUTHORIZED_CODE => WaveError::AuthorizationDenied,
        _ => WaveError::RemoteError(format!("{} (code {})", message, code)),
    }
}

/// Local validation failures for a write request. These never reach the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("Connect wallet first")]
    NoAccount,
    #[error("Message required")]
    EmptyMessage,
    #[error("Transaction already in progress")]
    InProgress,
}
