// src/node/remote.rs
use crate::node::NodeHandler;
use crate::types::{
    AccountAddress, BlockTemplate, FoundBlock, PreparedTemplate, StakeParameters, StakeQuery,
};
use crate::utils::error::MinerError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Byte offset of the nonce inside a standard CryptoNote hashing blob,
/// used when the daemon does not report one.
const DEFAULT_NONCE_OFFSET: usize = 39;

/// Coinbase reserve requested with each template.
const RESERVE_SIZE: usize = 8;

/// Configuration for connecting to a remote daemon's RPC interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteNodeConfig {
    /// URL of the daemon's JSON-RPC endpoint
    /// (e.g. "http://127.0.0.1:32348/json_rpc").
    #[serde(default)]
    pub rpc_url: String,
    /// Username for RPC authentication (if required).
    #[serde(default)]
    pub rpc_user: String,
    /// Password for RPC authentication (if required).
    #[serde(default)]
    pub rpc_password: String,
}

/// [`NodeHandler`] variant backed by a remote daemon.
///
/// Owns its async runtime so the coordinator's thread-based control surface
/// stays synchronous; each call blocks on one JSON-RPC round trip.
pub struct RemoteNode {
    config: RemoteNodeConfig,
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl RemoteNode {
    /// Creates a client for the given daemon endpoint.
    pub fn new(config: RemoteNodeConfig) -> Result<Self, MinerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        Ok(RemoteNode {
            config,
            client: Client::new(),
            runtime,
        })
    }

    /// Makes one JSON-RPC call and returns the `result` object.
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
            return Err(MinerError::ProtocolError(format!(
                "{} failed: {}",
                method, err
            )));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| MinerError::ProtocolError(format!("{}: missing result object", method)))
    }
}

fn str_field<'a>(result: &'a Value, name: &str) -> Result<&'a str, MinerError> {
    result[name]
        .as_str()
        .ok_or_else(|| MinerError::ProtocolError(format!("missing field {}", name)))
}

fn u64_field(result: &Value, name: &str) -> Result<u64, MinerError> {
    result[name]
        .as_u64()
        .ok_or_else(|| MinerError::ProtocolError(format!("missing field {}", name)))
}

/// Maps a `getblocktemplate` result onto a [`PreparedTemplate`].
///
/// Only the blob, difficulty and height are mandatory; size and emission
/// metadata default to zero for daemons that do not report them.
fn parse_template_result(result: &Value) -> Result<PreparedTemplate, MinerError> {
    let blob = hex::decode(str_field(result, "blocktemplate_blob")?)?;
    let difficulty = u64_field(result, "difficulty")?;
    let height = u64_field(result, "height")? as u32;

    let template = BlockTemplate {
        major_version: result["major_version"].as_u64().unwrap_or(1) as u8,
        height,
        nonce_offset: result["nonce_offset"]
            .as_u64()
            .map(|o| o as usize)
            .unwrap_or(DEFAULT_NONCE_OFFSET),
        blob,
        base_transaction: Vec::new(),
        parent_extra: Vec::new(),
    };

    let extra_nonce = match result["reserved_offset"].as_u64() {
        Some(_) => vec![0u8; RESERVE_SIZE],
        None => Vec::new(),
    };

    Ok(PreparedTemplate {
        template,
        fee: result["fee"].as_u64().unwrap_or(0),
        difficulty,
        height,
        extra_nonce,
        median_size: result["median_size"].as_u64().unwrap_or(0) as usize,
        txs_size: result["txs_size"].as_u64().unwrap_or(0) as usize,
        already_generated_coins: result["already_generated_coins"].as_u64().unwrap_or(0),
    })
}

impl NodeHandler for RemoteNode {
    fn prepare_block_template(
        &self,
        address: &AccountAddress,
    ) -> Result<PreparedTemplate, MinerError> {
        let result = self.rpc_call(
            "getblocktemplate",
            json!({
                "wallet_address": address.as_str(),
                "reserve_size": RESERVE_SIZE
            }),
        )?;
        parse_template_result(&result)
    }

    fn stake_parameters(&self, query: &StakeQuery) -> Result<StakeParameters, MinerError> {
        let result = self.rpc_call(
            "getstake",
            json!({
                "block_major_version": query.block_major_version,
                "fee": query.fee,
                "height": query.height,
                "difficulty": query.difficulty,
                "median_size": query.median_size,
                "already_generated_coins": query.already_generated_coins,
                "txs_size": query.txs_size
            }),
        )?;
        Ok(StakeParameters {
            stake: u64_field(&result, "stake")?,
            reward: u64_field(&result, "reward")?,
        })
    }

    fn submit_block(&self, block: &FoundBlock) -> Result<(), MinerError> {
        let result = self.rpc_call("submitblock", json!([hex::encode(block.full_blob())]))?;
        match result["status"].as_str() {
            Some("OK") => Ok(()),
            status => Err(MinerError::SubmitRejected(format!(
                "daemon answered {:?}",
                status.unwrap_or("<no status>")
            ))),
        }
    }

    fn last_known_block_height(&self) -> Result<u64, MinerError> {
        let result = self.rpc_call("get_info", json!({}))?;
        u64_field(&result, "height")
    }

    fn peer_count(&self) -> Result<u64, MinerError> {
        let result = self.rpc_call("get_info", json!({}))?;
        let incoming = result["incoming_connections_count"].as_u64().unwrap_or(0);
        let outgoing = result["outgoing_connections_count"].as_u64().unwrap_or(0);
        Ok(incoming + outgoing)
    }
}
