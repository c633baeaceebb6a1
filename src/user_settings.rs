use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{find_network_by_chain_id, parse_address, Config};

const SETTINGS_FILE: &str = "wave_portal_settings.json";

/// User settings that persist between sessions. Unset fields keep the
/// environment/default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Wallet JSON-RPC endpoint
    #[serde(default)]
    pub wallet_url: Option<String>,
    /// Ledger node RPC endpoint
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// WavePortal contract address (hex)
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,
}

impl UserSettings {
    /// Get the settings file path
    fn settings_path() -> PathBuf {
        // Try to use the app data directory, fall back to current directory
        if let Some(config_dir) = dirs::config_dir() {
            let app_dir = config_dir.join("wave-portal");
            if !app_dir.exists() {
                let _ = fs::create_dir_all(&app_dir);
            }
            app_dir.join(SETTINGS_FILE)
        } else {
            PathBuf::from(SETTINGS_FILE)
        }
    }

    pub fn settings_path_display() -> String {
        Self::settings_path().display().to_string()
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(settings) => {
                        tracing::info!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse settings file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read settings file: {}", e);
                }
            }
        }
        tracing::info!("Using default settings");
        Self::default()
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Overlay the stored values onto `config`.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(chain_id) = self.chain_id {
            config.chain_id = chain_id;
            if non_empty(&self.rpc_url).is_none() {
                if let Some(network) = find_network_by_chain_id(chain_id) {
                    config.rpc_url = network.default_rpc.to_string();
                }
            }
        }
        if let Some(url) = non_empty(&self.rpc_url) {
            config.rpc_url = url.to_string();
        }
        if let Some(url) = non_empty(&self.wallet_url) {
            config.wallet_url = url.to_string();
        }
        if let Some(address) = non_empty(&self.contract_address) {
            config.contract_address = parse_address(address)?;
        }
        if let Some(secs) = self.confirmation_timeout_secs {
            config.confirmation_timeout_secs = secs;
        }
        Ok(())
    }

    /// Capture the user-editable fields of `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            wallet_url: Some(config.wallet_url.clone()),
            rpc_url: Some(config.rpc_url.clone()),
            chain_id: Some(config.chain_id),
            contract_address: Some(format!("{:?}", config.contract_address)),
            confirmation_timeout_secs: Some(config.confirmation_timeout_secs),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
