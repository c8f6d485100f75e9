// src/wallet/mod.rs
//! Wallet abstraction consumed by the mining coordinator.
//!
//! The wallet's only job here is to produce the stake/coinbase transaction
//! a template needs before it can be hashed.

use crate::types::{AccountAddress, StakeTransaction};
use crate::utils::error::MinerError;

/// JSON-RPC wallet client.
pub mod rpc;

pub use rpc::{RpcWallet, RpcWalletConfig};

/// Stake transaction capability required for each template round.
pub trait WalletHandler: Send + Sync {
    /// Builds the coinbase transaction staking `stake` and collecting
    /// `reward`, locked until `unlock_height`.
    fn build_stake_transaction(
        &self,
        address: &AccountAddress,
        stake: u64,
        reward: u64,
        mixin: u64,
        unlock_height: u32,
    ) -> Result<StakeTransaction, MinerError>;
}
