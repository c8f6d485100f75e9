// src/pow.rs
//! Proof-of-work seam between the coordinator and the hash function.
//!
//! The coordinator never computes hashes itself; workers call through the
//! [`PowAlgorithm`] trait injected at construction. The stock implementation
//! wraps the CryptoNight slow hash; the difficulty check and the identity
//! hash used for logging live here as well.

use crate::types::{Difficulty, Hash};
use crate::utils::error::MinerError;
use cryptonight::cryptonight;
use sha3::{Digest, Keccak256};

/// Slow-hash capability required by the worker pool.
///
/// Implementations must be cheap to share across threads; workers call
/// `long_hash` once per nonce attempt.
pub trait PowAlgorithm: Send + Sync {
    /// Computes the proof-of-work hash of a full hashing blob (nonce
    /// already patched in).
    ///
    /// A failure here is treated as fatal by the worker pool: it signals a
    /// corrupted template rather than a transient condition.
    fn long_hash(&self, blob: &[u8]) -> Result<Hash, MinerError>;
}

/// CryptoNight slow hash.
pub struct CryptoNightPow {
    /// CryptoNight variant identifier (1 = V7, 4 = R).
    variant: i32,
}

impl CryptoNightPow {
    /// Creates a CryptoNight hasher for the given variant.
    pub fn new(variant: i32) -> Self {
        Self { variant }
    }
}

impl PowAlgorithm for CryptoNightPow {
    fn long_hash(&self, blob: &[u8]) -> Result<Hash, MinerError> {
        let digest = cryptonight(blob, blob.len(), self.variant);
        digest.try_into().map_err(|d: Vec<u8>| {
            MinerError::HashFailure(format!("slow hash returned {} bytes", d.len()))
        })
    }
}

/// Keccak-256 identity hash of a serialized blob.
///
/// Used for the merge-mining root and for logging block ids; not a
/// proof-of-work hash.
pub fn block_id(blob: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(blob);
    hasher.finalize().into()
}

/// CryptoNote difficulty check.
///
/// `hash`, read as a little-endian 256-bit integer, qualifies for
/// `difficulty` iff `hash * difficulty < 2^256`. Computed limb-wise; only
/// the carry out of the top limb matters.
pub fn check_hash(hash: &Hash, difficulty: Difficulty) -> bool {
    let mut carry: u64 = 0;
    for i in 0..4 {
        let mut limb = [0u8; 8];
        limb.copy_from_slice(&hash[i * 8..(i + 1) * 8]);
        let t = (u64::from_le_bytes(limb) as u128) * (difficulty as u128) + (carry as u128);
        carry = (t >> 64) as u64;
    }
    carry == 0
}
