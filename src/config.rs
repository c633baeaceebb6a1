use anyhow::{anyhow, Context, Result};
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::wave_contract::{DEFAULT_CONTRACT_ADDRESS, DEFAULT_WAVE_GAS_LIMIT};

/// Local desktop wallet endpoint (Frame's default).
pub const DEFAULT_WALLET_URL: &str = "http://127.0.0.1:1248";

/// Bounded wait for a submitted wave to be mined.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 90;

/// How often the node is polled for new logs and receipts.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// A predefined EVM-compatible network with label, chain ID, native token, and default RPC.
#[derive(Clone, Debug)]
pub struct EvmNetwork {
    pub label: &'static str,
    pub chain_id: u64,
    pub native_token: &'static str,
    pub default_rpc: &'static str,
}

impl EvmNetwork {
    pub const fn new(label: &'static str, chain_id: u64, native_token: &'static str, default_rpc: &'static str) -> Self {
        Self {
            label,
            chain_id,
            native_token,
            default_rpc,
        }
    }
}

pub const NETWORKS: &[EvmNetwork] = &[
    EvmNetwork::new("Ethereum", 1, "ETH", "https://ethereum-rpc.publicnode.com"),
    EvmNetwork::new("Sepolia", 11155111, "ETH", "https://ethereum-sepolia-rpc.publicnode.com"),
    EvmNetwork::new("Hoodi", 560048, "ETH", "https://rpc.hoodi.ethpandaops.io"),
    EvmNetwork::new("Optimism", 10, "ETH", "https://mainnet.optimism.io"),
    EvmNetwork::new("Base", 8453, "ETH", "https://mainnet.base.org"),
    EvmNetwork::new("Polygon", 137, "POL", "https://polygon-rpc.com"),
    EvmNetwork::new("Localhost", 31337, "ETH", "http://127.0.0.1:8545"),
];

/// Find a network by chain ID
pub fn find_network_by_chain_id(chain_id: u64) -> Option<&'static EvmNetwork> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Get the block explorer URL for a given chain ID
pub fn get_block_explorer_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("https://etherscan.io"),
        11155111 => Some("https://sepolia.etherscan.io"),
        560048 => Some("https://hoodi.ethpandaops.io"),
        10 => Some("https://optimistic.etherscan.io"),
        8453 => Some("https://basescan.org"),
        137 => Some("https://polygonscan.com"),
        _ => None,
    }
}

/// Get the full URL to view a transaction on the block explorer
pub fn get_tx_explorer_url(chain_id: u64, tx_hash: &str) -> Option<String> {
    get_block_explorer_url(chain_id).map(|base| format!("{}/tx/{}", base, tx_hash))
}

/// Get the full URL to view an address on the block explorer
pub fn get_address_explorer_url(chain_id: u64, address: &str) -> Option<String> {
    get_block_explorer_url(chain_id).map(|base| format!("{}/address/{}", base, address))
}

#[derive(Clone, Debug)]
pub struct Config {
    pub wallet_url: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: Address,
    pub gas_limit: u64,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Config {
    pub fn new(rpc_url: String, chain_id: u64) -> Self {
        Self {
            wallet_url: DEFAULT_WALLET_URL.to_string(),
            rpc_url,
            chain_id,
            contract_address: default_contract_address(),
            gas_limit: DEFAULT_WAVE_GAS_LIMIT,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    pub fn from_network(network: &EvmNetwork) -> Self {
        Self::new(network.default_rpc.to_string(), network.chain_id)
    }

    /// Defaults overridden by `WAVE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let chain_id = match env::var("WAVE_CHAIN_ID") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("Invalid WAVE_CHAIN_ID: {}", v))?,
            Err(_) => Self::default().chain_id,
        };
        let mut config = match find_network_by_chain_id(chain_id) {
            Some(network) => Self::from_network(network),
            None => Self::new(String::new(), chain_id),
        };

        if let Ok(v) = env::var("WAVE_RPC_URL") {
            config.rpc_url = v;
        }
        if config.rpc_url.is_empty() {
            return Err(anyhow!("WAVE_RPC_URL is required for chain {}", chain_id));
        }
        if let Ok(v) = env::var("WAVE_WALLET_URL") {
            config.wallet_url = v;
        }
        if let Ok(v) = env::var("WAVE_CONTRACT_ADDRESS") {
            config.contract_address = parse_address(&v)?;
        }
        if let Ok(v) = env::var("WAVE_GAS_LIMIT") {
            config.gas_limit = v.parse().with_context(|| format!("Invalid WAVE_GAS_LIMIT: {}", v))?;
        }
        if let Ok(v) = env::var("WAVE_CONFIRMATION_TIMEOUT_SECS") {
            config.confirmation_timeout_secs = v
                .parse()
                .with_context(|| format!("Invalid WAVE_CONFIRMATION_TIMEOUT_SECS: {}", v))?;
        }
        if let Ok(v) = env::var("WAVE_POLL_INTERVAL_MS") {
            config.poll_interval_ms = v
                .parse()
                .with_context(|| format!("Invalid WAVE_POLL_INTERVAL_MS: {}", v))?;
        }
        Ok(config)
    }

    pub fn network_label(&self) -> &str {
        find_network_by_chain_id(self.chain_id)
            .map(|n| n.label)
            .unwrap_or("Unknown")
    }

    pub fn native_token(&self) -> &str {
        find_network_by_chain_id(self.chain_id)
            .map(|n| n.native_token)
            .unwrap_or("ETH")
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn tx_explorer_url(&self, tx_hash: &str) -> Option<String> {
        get_tx_explorer_url(self.chain_id, tx_hash)
    }

    /// Provider for the ledger node.
    pub fn get_provider(&self) -> Result<Arc<Provider<Http>>> {
        build_provider(&self.rpc_url, self.poll_interval())
    }

    /// Provider for the wallet endpoint.
    pub fn get_wallet_provider(&self) -> Result<Arc<Provider<Http>>> {
        build_provider(&self.wallet_url, self.poll_interval())
    }
}

impl Default for Config {
    fn default() -> Self {
        // Default to Sepolia testnet - user settings may override
        if let Some(sepolia) = find_network_by_chain_id(11155111) {
            Self::from_network(sepolia)
        } else {
            Self::new("https://rpc.sepolia.org".to_string(), 11155111)
        }
    }
}

fn build_provider(url: &str, interval: Duration) -> Result<Arc<Provider<Http>>> {
    let url = Url::parse(url).with_context(|| format!("Invalid endpoint URL: {}", url))?;
    let provider = Provider::<Http>::try_from(url.as_str())?.interval(interval);
    Ok(Arc::new(provider))
}

pub fn parse_address(value: &str) -> Result<Address> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| anyhow!("Invalid contract address {}: {}", value, e))
}

fn default_contract_address() -> Address {
    DEFAULT_CONTRACT_ADDRESS.parse().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== find_network_by_chain_id tests ====================

    #[test]
    fn test_find_network_by_chain_id_sepolia() {
        let network = find_network_by_chain_id(11155111);
        assert!(network.is_some());
        assert_eq!(network.unwrap().label, "Sepolia");
    }

    #[test]
    fn test_find_network_by_chain_id_not_found() {
        assert!(find_network_by_chain_id(999999).is_none());
    }

    // ==================== explorer url tests ====================

    #[test]
    fn test_get_tx_explorer_url_known_chain() {
        assert_eq!(
            get_tx_explorer_url(11155111, "0xabc"),
            Some("https://sepolia.etherscan.io/tx/0xabc".to_string())
        );
    }

    #[test]
    fn test_get_tx_explorer_url_local_chain() {
        assert!(get_tx_explorer_url(31337, "0xabc").is_none());
    }

    #[test]
    fn test_get_address_explorer_url() {
        assert_eq!(
            get_address_explorer_url(1, "0x01"),
            Some("https://etherscan.io/address/0x01".to_string())
        );
    }

    // ==================== Config tests ====================

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.chain_id, 11155111);
        assert_eq!(config.wallet_url, DEFAULT_WALLET_URL);
        assert_eq!(config.gas_limit, 300_000);
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(90));
        assert_eq!(
            config.contract_address,
            "0x1fb2bbD9C38Ada3B41F78Ed0c2aeb3e3d3b601F2".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_config_network_label() {
        let config = Config::new("https://example.com".to_string(), 999999);
        assert_eq!(config.network_label(), "Unknown");
        assert_eq!(config.native_token(), "ETH");
        let config = Config::from_network(find_network_by_chain_id(137).unwrap());
        assert_eq!(config.network_label(), "Polygon");
        assert_eq!(config.native_token(), "POL");
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        assert!(parse_address("not-an-address").is_err());
        assert!(parse_address(" 0x1fb2bbD9C38Ada3B41F78Ed0c2aeb3e3d3b601F2 ").is_ok());
    }

    #[test]
    fn test_get_provider_rejects_invalid_url() {
        let mut config = Config::default();
        config.rpc_url = "not a url".to_string();
        assert!(config.get_provider().is_err());
    }

    #[test]
    fn test_get_wallet_provider() {
        let config = Config::default();
        assert!(config.get_wallet_provider().is_ok());
    }
}
