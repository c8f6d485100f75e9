// src/types.rs
use crate::utils::error::MinerError;
use std::fmt;
use std::str::FromStr;

/// 32-byte hash value (proof-of-work hash, block id, transaction key).
pub type Hash = [u8; 32];

/// Difficulty threshold associated with a block template.
///
/// A candidate block qualifies when its proof-of-work hash, interpreted as a
/// little-endian 256-bit integer, multiplied by the difficulty does not
/// overflow 2^256 (see [`crate::pow::check_hash`]).
pub type Difficulty = u64;

/// Block major versions that carry a merge-mining tag in the parent
/// coinbase extra (see [`BlockTemplate::finalize`]).
pub const MERGE_MINING_BLOCK_VERSIONS: [u8; 2] = [2, 3];

/// Characters permitted in a base58 account address.
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Minimum plausible length of an encoded account address.
const ADDRESS_MIN_LEN: usize = 64;

/// Maximum plausible length of an encoded account address.
const ADDRESS_MAX_LEN: usize = 128;

/// A validated miner account address.
///
/// Full address decoding belongs to the chain core; this type only rejects
/// strings that cannot possibly be an address (wrong length, characters
/// outside the base58 alphabet) so that `start` fails before any worker is
/// spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountAddress(String);

impl AccountAddress {
    /// Returns the encoded address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountAddress {
    type Err = MinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < ADDRESS_MIN_LEN || s.len() > ADDRESS_MAX_LEN {
            return Err(MinerError::InvalidAddress(format!(
                "address has invalid length {}",
                s.len()
            )));
        }
        if let Some(c) = s.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(MinerError::InvalidAddress(format!(
                "address contains invalid character {:?}",
                c
            )));
        }
        Ok(AccountAddress(s.to_string()))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An unfinished candidate block handed out by the node core.
///
/// The hashing `blob` is the serialized block header with the nonce field at
/// `nonce_offset`; workers patch the nonce bytes and hash the whole blob.
/// Once published through the template store a template is never mutated in
/// place, only replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTemplate {
    /// Block major version; versions 2 and 3 require a merge-mining tag.
    pub major_version: u8,
    /// Height this template builds at.
    pub height: u32,
    /// Serialized hashing blob with the nonce field at `nonce_offset`.
    pub blob: Vec<u8>,
    /// Byte offset of the 4-byte little-endian nonce inside `blob`.
    pub nonce_offset: usize,
    /// Serialized coinbase (stake) transaction attached by the wallet.
    pub base_transaction: Vec<u8>,
    /// Parent block coinbase extra; receives the merge-mining tag.
    pub parent_extra: Vec<u8>,
}

/// Tag byte marking a merge-mining entry in a coinbase extra field.
const TX_EXTRA_MERGE_MINING_TAG: u8 = 0x03;

impl BlockTemplate {
    /// Returns the header prefix covered by the merge-mining root, i.e. the
    /// blob up to (not including) the nonce field.
    pub fn header_prefix(&self) -> Option<&[u8]> {
        if self.nonce_offset == 0 || self.nonce_offset + 4 > self.blob.len() {
            return None;
        }
        Some(&self.blob[..self.nonce_offset])
    }

    /// Prepares the template for hashing.
    ///
    /// For merge-mined block versions the auxiliary header hash is computed
    /// and appended to the (cleared) parent coinbase extra as a merge-mining
    /// tag with depth 0. Fails without side effects when the blob cannot
    /// hold a nonce field, so a broken template is never published.
    pub fn finalize(&mut self) -> Result<(), MinerError> {
        let prefix = self.header_prefix().ok_or_else(|| {
            MinerError::MalformedTemplate(format!(
                "blob of {} bytes cannot hold a nonce at offset {}",
                self.blob.len(),
                self.nonce_offset
            ))
        })?;

        if MERGE_MINING_BLOCK_VERSIONS.contains(&self.major_version) {
            let root = crate::pow::block_id(prefix);
            self.parent_extra.clear();
            self.parent_extra.push(TX_EXTRA_MERGE_MINING_TAG);
            self.parent_extra.push(0); // depth
            self.parent_extra.extend_from_slice(&root);
        }
        Ok(())
    }

    /// Returns a copy of the hashing blob with `nonce` patched in.
    pub fn blob_with_nonce(&self, nonce: u32) -> Vec<u8> {
        let mut blob = self.blob.clone();
        write_nonce(&mut blob, self.nonce_offset, nonce);
        blob
    }
}

/// Patches a 4-byte little-endian nonce into a hashing blob.
///
/// The caller guarantees the blob was validated by
/// [`BlockTemplate::finalize`]; out-of-range offsets are ignored rather than
/// panicking in a worker thread.
pub(crate) fn write_nonce(blob: &mut [u8], offset: usize, nonce: u32) {
    if let Some(slot) = blob.get_mut(offset..offset + 4) {
        slot.copy_from_slice(&nonce.to_le_bytes());
    }
}

/// Everything the node core returns for one template round, before the
/// wallet attaches the stake transaction.
#[derive(Debug, Clone, Default)]
pub struct PreparedTemplate {
    /// The candidate block, without its coinbase transaction.
    pub template: BlockTemplate,
    /// Total transaction fees included in the template.
    pub fee: u64,
    /// Difficulty target for this round.
    pub difficulty: Difficulty,
    /// Height the template builds at.
    pub height: u32,
    /// Reserved extra-nonce bytes inside the coinbase.
    pub extra_nonce: Vec<u8>,
    /// Median block size at the template height.
    pub median_size: usize,
    /// Cumulative size of the included transactions.
    pub txs_size: usize,
    /// Coins emitted by the chain so far.
    pub already_generated_coins: u64,
}

/// Template metadata the node needs to derive stake and reward amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeQuery {
    /// Block major version of the template.
    pub block_major_version: u8,
    /// Total fees in the template.
    pub fee: u64,
    /// Template height.
    pub height: u32,
    /// Difficulty of the round.
    pub difficulty: Difficulty,
    /// Median block size.
    pub median_size: usize,
    /// Coins emitted so far.
    pub already_generated_coins: u64,
    /// Cumulative transaction size.
    pub txs_size: usize,
}

impl StakeQuery {
    /// Builds the stake query for a prepared template.
    pub fn for_template(prepared: &PreparedTemplate) -> Self {
        StakeQuery {
            block_major_version: prepared.template.major_version,
            fee: prepared.fee,
            height: prepared.height,
            difficulty: prepared.difficulty,
            median_size: prepared.median_size,
            already_generated_coins: prepared.already_generated_coins,
            txs_size: prepared.txs_size,
        }
    }
}

/// Stake and reward amounts for one template round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StakeParameters {
    /// Amount the miner must stake.
    pub stake: u64,
    /// Block reward credited on success.
    pub reward: u64,
}

/// Coinbase transaction produced by the wallet for a template round.
#[derive(Debug, Clone, Default)]
pub struct StakeTransaction {
    /// Serialized coinbase transaction.
    pub tx_blob: Vec<u8>,
    /// Secret key of the stake output.
    pub stake_key: Hash,
}

/// A solved block reported by a worker to the coordinator.
#[derive(Debug, Clone)]
pub struct FoundBlock {
    /// Full hashing blob with the winning nonce applied.
    pub blob: Vec<u8>,
    /// Serialized coinbase (stake) transaction of the template the block
    /// was mined against; submitted to the core together with the blob.
    pub base_transaction: Vec<u8>,
    /// The winning nonce.
    pub nonce: u32,
    /// Proof-of-work hash of `blob`.
    pub pow_hash: Hash,
    /// Template version the block was mined against; used for
    /// first-submission-wins deduplication.
    pub template_version: u64,
}

impl FoundBlock {
    /// Serialized block handed to the core: the hashing blob followed by
    /// the coinbase transaction.
    pub fn full_blob(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(self.blob.len() + self.base_transaction.len());
        blob.extend_from_slice(&self.blob);
        blob.extend_from_slice(&self.base_transaction);
        blob
    }
}

/// Coarse coordinator state as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningState {
    /// No workers are registered and the stop flag is set.
    Stopped,
    /// Workers are hashing.
    Running,
    /// Workers are alive but idling behind the pause counter.
    Paused,
}
