// src/wallet/rpc.rs
use crate::types::{AccountAddress, Hash, StakeTransaction};
use crate::utils::error::MinerError;
use crate::wallet::WalletHandler;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Configuration for connecting to a wallet daemon's RPC interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcWalletConfig {
    /// URL of the wallet's JSON-RPC endpoint
    /// (e.g. "http://127.0.0.1:8071/json_rpc").
    #[serde(default)]
    pub rpc_url: String,
    /// Username for RPC authentication (if required).
    #[serde(default)]
    pub rpc_user: String,
    /// Password for RPC authentication (if required).
    #[serde(default)]
    pub rpc_password: String,
}

/// [`WalletHandler`] backed by a wallet daemon.
///
/// Same transport shape as [`crate::node::RemoteNode`]: an owned runtime,
/// one blocking JSON-RPC round trip per call.
pub struct RpcWallet {
    config: RpcWalletConfig,
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl RpcWallet {
    /// Creates a client for the given wallet endpoint.
    pub fn new(config: RpcWalletConfig) -> Result<Self, MinerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        Ok(RpcWallet {
            config,
            client: Client::new(),
            runtime,
        })
    }

    fn rpc_call(&self, method: &str, params: Value) -> Result<Value, MinerError> {
        let response: Value = self.runtime.block_on(async {
            self.client
                .post(&self.config.rpc_url)
                .basic_auth(&self.config.rpc_user, Some(&self.config.rpc_password))
                .json(&json!({
                    "jsonrpc": "2.0",
                    "id": "0",
                    "method": method,
                    "params": params
                }))
                .send()
                .await?
                .json()
                .await
        })?;

        if let Some(err) = response.get("error").filter(|e| !e.is_null()) {
            return Err(MinerError::WalletError(format!("{} failed: {}", method, err)));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| MinerError::WalletError(format!("{}: missing result object", method)))
    }
}

/// Decodes the wallet's stake transaction answer.
fn parse_stake_transaction(result: &Value) -> Result<StakeTransaction, MinerError> {
    let tx_blob = hex::decode(
        result["tx_blob"]
            .as_str()
            .ok_or_else(|| MinerError::WalletError("missing field tx_blob".to_string()))?,
    )?;
    let key_bytes = hex::decode(
        result["stake_key"]
            .as_str()
            .ok_or_else(|| MinerError::WalletError("missing field stake_key".to_string()))?,
    )?;
    let stake_key: Hash = key_bytes
        .try_into()
        .map_err(|k: Vec<u8>| MinerError::WalletError(format!("stake key of {} bytes", k.len())))?;
    Ok(StakeTransaction { tx_blob, stake_key })
}

impl WalletHandler for RpcWallet {
    fn build_stake_transaction(
        &self,
        address: &AccountAddress,
        stake: u64,
        reward: u64,
        mixin: u64,
        unlock_height: u32,
    ) -> Result<StakeTransaction, MinerError> {
        let result = self.rpc_call(
            "getstaketransaction",
            json!({
                "address": address.as_str(),
                "stake": stake,
                "reward": reward,
                "mixin": mixin,
                "unlock_height": unlock_height
            }),
        )?;
        parse_stake_transaction(&result)
    }
}
