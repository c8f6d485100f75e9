//! End-to-end coordinator tests against scripted collaborators.

use cn_solo_miner::types::{
    AccountAddress, BlockTemplate, FoundBlock, Hash, MiningState, PreparedTemplate,
    StakeParameters, StakeQuery, StakeTransaction,
};
use cn_solo_miner::{
    ConfigStore, Miner, MinerConfig, MinerError, NodeHandler, PowAlgorithm, WalletHandler,
};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const DIFFICULTY: u64 = 1000;

fn valid_address() -> String {
    "K".repeat(95)
}

/// Polls `condition` until it holds or `timeout` elapses.
fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Test configuration with periodic work effectively disabled so tests
/// drive every transition explicitly.
fn test_config() -> MinerConfig {
    MinerConfig {
        wallet_refresh_delay_ms: 0,
        template_refresh_secs: 3600,
        hashrate_merge_secs: 3600,
        ..MinerConfig::default()
    }
}

/// Scripted node: serves templates at an advancing height and records
/// submissions.
struct MockNode {
    fail_template: AtomicBool,
    reject_submit: AtomicBool,
    height: AtomicU64,
    submissions: Mutex<Vec<FoundBlock>>,
}

impl MockNode {
    fn new() -> Self {
        MockNode {
            fail_template: AtomicBool::new(false),
            reject_submit: AtomicBool::new(false),
            height: AtomicU64::new(100),
            submissions: Mutex::new(Vec::new()),
        }
    }

    fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

impl NodeHandler for MockNode {
    fn prepare_block_template(
        &self,
        _address: &AccountAddress,
    ) -> Result<PreparedTemplate, MinerError> {
        if self.fail_template.load(Ordering::Relaxed) {
            return Err(MinerError::TemplateUnavailable(
                "node is busy".to_string(),
            ));
        }
        let height = self.height.fetch_add(1, Ordering::Relaxed) as u32;
        Ok(PreparedTemplate {
            template: BlockTemplate {
                major_version: 1,
                height,
                blob: vec![0u8; 76],
                nonce_offset: 39,
                base_transaction: Vec::new(),
                parent_extra: Vec::new(),
            },
            fee: 0,
            difficulty: DIFFICULTY,
            height,
            extra_nonce: Vec::new(),
            median_size: 0,
            txs_size: 0,
            already_generated_coins: 0,
        })
    }

    fn stake_parameters(&self, _query: &StakeQuery) -> Result<StakeParameters, MinerError> {
        Ok(StakeParameters {
            stake: 100,
            reward: 70,
        })
    }

    fn submit_block(&self, block: &FoundBlock) -> Result<(), MinerError> {
        self.submissions.lock().unwrap().push(block.clone());
        if self.reject_submit.load(Ordering::Relaxed) {
            return Err(MinerError::SubmitRejected("block is stale".to_string()));
        }
        Ok(())
    }

    fn last_known_block_height(&self) -> Result<u64, MinerError> {
        Ok(self.height.load(Ordering::Relaxed))
    }

    fn peer_count(&self) -> Result<u64, MinerError> {
        Ok(8)
    }
}

struct MockWallet;

impl WalletHandler for MockWallet {
    fn build_stake_transaction(
        &self,
        _address: &AccountAddress,
        _stake: u64,
        _reward: u64,
        _mixin: u64,
        _unlock_height: u32,
    ) -> Result<StakeTransaction, MinerError> {
        Ok(StakeTransaction {
            tx_blob: vec![7u8; 64],
            stake_key: [9u8; 32],
        })
    }
}

struct CountingConfigStore {
    saves: AtomicUsize,
}

impl CountingConfigStore {
    fn new() -> Self {
        CountingConfigStore {
            saves: AtomicUsize::new(0),
        }
    }
}

impl ConfigStore for CountingConfigStore {
    fn save(&self, _config: &MinerConfig) -> Result<(), MinerError> {
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Every nonce qualifies; throttled so solutions trickle rather than flood.
struct SolvingPow;

impl PowAlgorithm for SolvingPow {
    fn long_hash(&self, _blob: &[u8]) -> Result<Hash, MinerError> {
        thread::sleep(Duration::from_millis(1));
        Ok([0u8; 32])
    }
}

/// No nonce ever qualifies above difficulty 1.
struct StuckPow;

impl PowAlgorithm for StuckPow {
    fn long_hash(&self, _blob: &[u8]) -> Result<Hash, MinerError> {
        thread::sleep(Duration::from_micros(50));
        Ok([0xffu8; 32])
    }
}

/// Hashing itself fails; the pool must shut down rather than loop on it.
struct BrokenPow;

impl PowAlgorithm for BrokenPow {
    fn long_hash(&self, _blob: &[u8]) -> Result<Hash, MinerError> {
        Err(MinerError::HashFailure("scratchpad allocation".to_string()))
    }
}

fn build_miner(
    node: Arc<MockNode>,
    pow: Arc<dyn PowAlgorithm>,
) -> (Miner, Arc<CountingConfigStore>) {
    let store = Arc::new(CountingConfigStore::new());
    let miner = Miner::new(
        node,
        Arc::new(MockWallet),
        store.clone(),
        pow,
        test_config(),
    );
    (miner, store)
}

#[test]
fn start_rejects_malformed_address() {
    let (miner, _) = build_miner(Arc::new(MockNode::new()), Arc::new(StuckPow));
    let err = miner.start("not-an-address", 2).unwrap_err();
    assert!(matches!(err, MinerError::InvalidAddress(_)));
    assert!(!miner.is_mining());
    assert_eq!(miner.state(), MiningState::Stopped);
    assert_eq!(miner.get_speed(), 0);
}

#[test]
fn start_rejects_zero_threads() {
    let (miner, _) = build_miner(Arc::new(MockNode::new()), Arc::new(StuckPow));
    let err = miner.start(&valid_address(), 0).unwrap_err();
    assert!(matches!(err, MinerError::ZeroThreads));
    assert!(!miner.is_mining());
}

#[test]
fn failed_template_acquisition_leaves_miner_stopped() {
    let node = Arc::new(MockNode::new());
    node.fail_template.store(true, Ordering::Relaxed);
    let (miner, _) = build_miner(node.clone(), Arc::new(StuckPow));

    assert!(miner.start(&valid_address(), 2).is_err());
    assert!(!miner.is_mining());

    // the same coordinator can start once the node recovers
    node.fail_template.store(false, Ordering::Relaxed);
    miner.start(&valid_address(), 2).unwrap();
    assert!(miner.is_mining());
    miner.stop();
}

#[test]
fn double_start_is_rejected() {
    let (miner, _) = build_miner(Arc::new(MockNode::new()), Arc::new(StuckPow));
    miner.start(&valid_address(), 2).unwrap();
    assert!(matches!(
        miner.start(&valid_address(), 2),
        Err(MinerError::AlreadyRunning)
    ));
    miner.stop();
}

#[test]
fn stop_is_idempotent() {
    let (miner, _) = build_miner(Arc::new(MockNode::new()), Arc::new(StuckPow));
    miner.stop();
    miner.start(&valid_address(), 2).unwrap();
    miner.stop();
    assert!(!miner.is_mining());
    miner.stop();
    assert!(!miner.is_mining());

    // a fresh session starts cleanly after stop
    miner.start(&valid_address(), 2).unwrap();
    assert!(miner.is_mining());
    miner.stop();
}

#[test]
fn solved_block_is_submitted_once_per_template() {
    let node = Arc::new(MockNode::new());
    let (miner, store) = build_miner(node.clone(), Arc::new(SolvingPow));
    miner.start(&valid_address(), 2).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        node.submission_count() >= 1
    }));

    // workers keep solving the same template, but later solutions for an
    // already-handled version are redundant and never reach the node
    thread::sleep(Duration::from_millis(500));
    assert_eq!(node.submission_count(), 1);

    // the submitted block carries the wallet's coinbase transaction
    assert_eq!(
        node.submissions.lock().unwrap()[0].base_transaction,
        vec![7u8; 64]
    );

    // the accepted block persisted the configuration
    assert!(wait_until(Duration::from_secs(2), || {
        store.saves.load(Ordering::Relaxed) == 1
    }));

    miner.stop();
}

#[test]
fn chain_update_yields_a_new_template_and_submission() {
    let node = Arc::new(MockNode::new());
    let (miner, _) = build_miner(node.clone(), Arc::new(SolvingPow));
    miner.start(&valid_address(), 2).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        node.submission_count() >= 1
    }));

    miner.on_block_chain_update().unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        node.submission_count() >= 2
    }));

    let submissions = node.submissions.lock().unwrap();
    assert!(submissions[1].template_version > submissions[0].template_version);
    drop(submissions);

    miner.stop();
}

#[test]
fn restart_submits_each_template_version_at_most_once() {
    let node = Arc::new(MockNode::new());
    let (miner, _) = build_miner(node.clone(), Arc::new(SolvingPow));

    miner.start(&valid_address(), 2).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        node.submission_count() >= 1
    }));

    // restart immediately; a listener left over from the first session
    // must not compete with the new one for solutions
    miner.stop();
    miner.start(&valid_address(), 2).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        node.submission_count() >= 2
    }));
    thread::sleep(Duration::from_millis(500));
    miner.stop();

    let submissions = node.submissions.lock().unwrap();
    let mut per_version = std::collections::HashMap::new();
    for block in submissions.iter() {
        *per_version.entry(block.template_version).or_insert(0u32) += 1;
    }
    assert!(
        per_version.values().all(|&count| count == 1),
        "a template version was submitted more than once: {:?}",
        per_version
    );
}

#[test]
fn rejected_block_keeps_mining_and_skips_persistence() {
    let node = Arc::new(MockNode::new());
    node.reject_submit.store(true, Ordering::Relaxed);
    let (miner, store) = build_miner(node.clone(), Arc::new(SolvingPow));
    miner.start(&valid_address(), 2).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        node.submission_count() >= 1
    }));
    thread::sleep(Duration::from_millis(300));

    assert!(miner.is_mining());
    assert_eq!(store.saves.load(Ordering::Relaxed), 0);

    miner.stop();
}

#[test]
fn hash_failure_halts_the_whole_pool() {
    let node = Arc::new(MockNode::new());
    let (miner, _) = build_miner(node.clone(), Arc::new(BrokenPow));
    miner.start(&valid_address(), 2).unwrap();

    assert!(wait_until(Duration::from_secs(5), || !miner.is_mining()));
    assert_eq!(node.submission_count(), 0);
    miner.stop();
}

#[test]
fn pause_stalls_hashing_until_every_pauser_resumes() {
    let node = Arc::new(MockNode::new());
    let (miner, _) = build_miner(node.clone(), Arc::new(StuckPow));
    miner.start(&valid_address(), 2).unwrap();

    assert!(wait_until(Duration::from_secs(5), || miner.total_hashes() > 0));

    miner.pause();
    miner.pause();
    assert_eq!(miner.state(), MiningState::Paused);

    // let in-flight iterations drain, then the counter must stand still
    thread::sleep(Duration::from_millis(300));
    let stalled = miner.total_hashes();
    thread::sleep(Duration::from_millis(300));
    assert_eq!(miner.total_hashes(), stalled);

    // one resume is not enough: another pauser is still active
    miner.resume();
    assert_eq!(miner.state(), MiningState::Paused);
    thread::sleep(Duration::from_millis(300));
    assert_eq!(miner.total_hashes(), stalled);

    miner.resume();
    assert_eq!(miner.state(), MiningState::Running);
    assert!(wait_until(Duration::from_secs(5), || {
        miner.total_hashes() > stalled
    }));

    miner.stop();
}

#[test]
fn deferred_start_fires_on_synchronization() {
    let (miner, _) = build_miner(Arc::new(MockNode::new()), Arc::new(StuckPow));

    miner.start_on_sync(&valid_address(), 2).unwrap();
    assert!(!miner.is_mining());

    miner.on_synchronized();
    assert!(miner.is_mining());

    // stop disarms the deferred start; synchronizing again stays stopped
    miner.stop();
    miner.on_synchronized();
    assert!(!miner.is_mining());
}

#[test]
fn deferred_start_validates_its_parameters() {
    let (miner, _) = build_miner(Arc::new(MockNode::new()), Arc::new(StuckPow));
    assert!(matches!(
        miner.start_on_sync("bogus", 2),
        Err(MinerError::InvalidAddress(_))
    ));
    assert!(matches!(
        miner.start_on_sync(&valid_address(), 0),
        Err(MinerError::ZeroThreads)
    ));
    miner.on_synchronized();
    assert!(!miner.is_mining());
}
