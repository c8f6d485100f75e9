// src/node/mod.rs
//! Node abstraction consumed by the mining coordinator.
//!
//! The coordinator is a pure client of one behavioral contract,
//! [`NodeHandler`], with two variants: [`RemoteNode`] speaks JSON-RPC to an
//! external daemon, [`EmbeddedNode`] bridges to an in-process core over a
//! request/reply channel. Callers are generic over the trait, never over a
//! concrete variant.

use crate::types::{AccountAddress, FoundBlock, PreparedTemplate, StakeParameters, StakeQuery};
use crate::utils::error::MinerError;

/// Remote daemon variant speaking JSON-RPC.
pub mod remote;

/// In-process daemon variant bridged over a channel.
pub mod embedded;

pub use embedded::{CoreEnvelope, CoreInfo, CoreRequest, CoreResponse, EmbeddedNode};
pub use remote::{RemoteNode, RemoteNodeConfig};

/// Everything the coordinator needs from the chain core.
pub trait NodeHandler: Send + Sync {
    /// Produces a block template (without its coinbase transaction) paying
    /// to `address`.
    fn prepare_block_template(
        &self,
        address: &AccountAddress,
    ) -> Result<PreparedTemplate, MinerError>;

    /// Derives stake and reward amounts for a prepared template.
    fn stake_parameters(&self, query: &StakeQuery) -> Result<StakeParameters, MinerError>;

    /// Submits a solved block; `Err` means the core rejected it.
    fn submit_block(&self, block: &FoundBlock) -> Result<(), MinerError>;

    /// Height of the best block the node knows about.
    fn last_known_block_height(&self) -> Result<u64, MinerError>;

    /// Number of connected peers.
    fn peer_count(&self) -> Result<u64, MinerError>;
}
