//! CN Solo Miner - CryptoNote solo mining coordinator in Rust
//!
//! This crate provides a complete solo miner for CryptoNote chains:
//! - Multi-threaded CryptoNight proof-of-work search
//! - Versioned block template distribution with stake transactions
//! - Remote (JSON-RPC) and in-process node backends
//! - Pause/resume control and hashrate tracking

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Mining coordinator, template store, workers and hashrate tracking
pub mod miner;

/// Node backends the coordinator mines against
pub mod node;

/// Wallet backend producing stake transactions
pub mod wallet;

/// Proof-of-work hashing and difficulty checks
pub mod pow;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::{ConfigStore, FileConfigStore, MinerConfig};
pub use miner::{HashrateTracker, Miner, TemplateStore};
pub use node::{EmbeddedNode, NodeHandler, RemoteNode, RemoteNodeConfig};
pub use pow::{CryptoNightPow, PowAlgorithm};
pub use types::{AccountAddress, BlockTemplate, FoundBlock, MiningState};
pub use utils::{MinerError, init_logging};
pub use wallet::{RpcWallet, RpcWalletConfig, WalletHandler};
