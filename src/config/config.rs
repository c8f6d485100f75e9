// src/config/config.rs
use crate::node::RemoteNodeConfig;
use crate::utils::error::MinerError;
use crate::wallet::RpcWalletConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the solo miner.
///
/// Loaded from TOML; every field has a usable default so partial files
/// work. The coordinator persists this structure after each accepted block
/// submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Account address block rewards are paid to.
    #[serde(default)]
    pub mine_address: String,

    /// Number of hashing worker threads
    /// (default: number of CPU cores).
    #[serde(default = "default_mining_threads")]
    pub mining_threads: usize,

    /// Defer mining until the node looks synchronized instead of hashing
    /// against a template that catching up will immediately obsolete.
    #[serde(default)]
    pub wait_for_sync: bool,

    /// Seconds between periodic template refreshes (default: 15).
    #[serde(default = "default_template_refresh_secs")]
    pub template_refresh_secs: u64,

    /// Seconds between hashrate samples (default: 2).
    #[serde(default = "default_hashrate_merge_secs")]
    pub hashrate_merge_secs: u64,

    /// Milliseconds to let the wallet catch up after a chain-height change
    /// before requesting a stake transaction (default: 5000).
    #[serde(default = "default_wallet_refresh_delay_ms")]
    pub wallet_refresh_delay_ms: u64,

    /// Mixin used for the stake transaction (default: 0).
    #[serde(default)]
    pub stake_mixin: u64,

    /// CryptoNight variant of the chain's slow hash (default: 1).
    #[serde(default = "default_cn_variant")]
    pub cn_variant: i32,

    /// Daemon RPC connection.
    #[serde(default)]
    pub node: RemoteNodeConfig,

    /// Wallet RPC connection.
    #[serde(default)]
    pub wallet: RpcWalletConfig,
}

fn default_mining_threads() -> usize {
    num_cpus::get()
}

fn default_template_refresh_secs() -> u64 {
    15
}

fn default_hashrate_merge_secs() -> u64 {
    2
}

fn default_wallet_refresh_delay_ms() -> u64 {
    5000
}

fn default_cn_variant() -> i32 {
    1
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            mine_address: String::new(),
            mining_threads: default_mining_threads(),
            wait_for_sync: false,
            template_refresh_secs: default_template_refresh_secs(),
            hashrate_merge_secs: default_hashrate_merge_secs(),
            wallet_refresh_delay_ms: default_wallet_refresh_delay_ms(),
            stake_mixin: 0,
            cn_variant: default_cn_variant(),
            node: RemoteNodeConfig::default(),
            wallet: RpcWalletConfig::default(),
        }
    }
}

impl MinerConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&config_str)
            .map_err(|e| MinerError::ConfigError(format!("invalid config format: {}", e)))
    }

    /// Writes the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), MinerError> {
        let rendered = toml::to_string_pretty(self)
            .map_err(|e| MinerError::ConfigError(format!("failed to render config: {}", e)))?;
        std::fs::write(path, rendered)?;
        Ok(())
    }

    /// Generates a commented configuration template string.
    pub fn generate_template() -> String {
        let mut template = String::new();
        template.push_str("# Solo miner configuration\n\n");
        template.push_str("# Address block rewards are paid to\n");
        template.push_str("mine_address = \"\"\n");
        template.push_str("# Number of hashing threads (defaults to CPU count)\n");
        template.push_str("mining_threads = 2\n");
        template.push_str("# Defer mining until the node looks synchronized\n");
        template.push_str("wait_for_sync = false\n");
        template.push_str("# Seconds between block template refreshes\n");
        template.push_str("template_refresh_secs = 15\n");
        template.push_str("# Mixin for the stake transaction\n");
        template.push_str("stake_mixin = 0\n\n");
        template.push_str("[node]\n");
        template.push_str("rpc_url = \"http://127.0.0.1:32348/json_rpc\"\n");
        template.push_str("rpc_user = \"\"\n");
        template.push_str("rpc_password = \"\"\n\n");
        template.push_str("[wallet]\n");
        template.push_str("rpc_url = \"http://127.0.0.1:8071/json_rpc\"\n");
        template.push_str("rpc_user = \"\"\n");
        template.push_str("rpc_password = \"\"\n");
        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_uses_defaults() {
        let config: MinerConfig = toml::from_str("mine_address = \"Kabc\"").unwrap();
        assert_eq!(config.mine_address, "Kabc");
        assert_eq!(config.template_refresh_secs, 15);
        assert_eq!(config.hashrate_merge_secs, 2);
        assert_eq!(config.wallet_refresh_delay_ms, 5000);
        assert_eq!(config.cn_variant, 1);
        assert!(!config.wait_for_sync);
    }

    #[test]
    fn generated_template_parses() {
        let config: MinerConfig = toml::from_str(&MinerConfig::generate_template()).unwrap();
        assert_eq!(config.mining_threads, 2);
        assert_eq!(config.node.rpc_url, "http://127.0.0.1:32348/json_rpc");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("miner.toml");

        let mut config = MinerConfig::default();
        config.mine_address = "K".repeat(95);
        config.mining_threads = 3;
        config.save(&path).unwrap();

        let loaded = MinerConfig::load(&path).unwrap();
        assert_eq!(loaded.mine_address, config.mine_address);
        assert_eq!(loaded.mining_threads, 3);
    }
}
