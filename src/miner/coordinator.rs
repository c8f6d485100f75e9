// src/miner/coordinator.rs
//! The mining coordinator.
//!
//! Owns the template store, hashrate tracker, interval timers and worker
//! pool; drives template rounds against the node and wallet collaborators
//! and submits solved blocks. All collaborators are injected at
//! construction.

use crate::config::{ConfigStore, MinerConfig};
use crate::miner::hashrate::HashrateTracker;
use crate::miner::interval::Interval;
use crate::miner::worker::{ActiveGuard, MinerShared, run_worker};
use crate::node::NodeHandler;
use crate::pow::{PowAlgorithm, block_id};
use crate::types::{AccountAddress, FoundBlock, MiningState, StakeQuery};
use crate::utils::error::MinerError;
use crate::wallet::WalletHandler;
use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Blocks a mined coinbase stays locked for, added to the template height
/// when the wallet builds the stake transaction.
const MINED_MONEY_UNLOCK_WINDOW: u32 = 10;

/// Upper bound on how long `stop` waits for workers to wind down before
/// detaching them.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How often the submit listener re-checks the stop flag while idle.
const SUBMIT_POLL: Duration = Duration::from_millis(250);

/// Coordinates a pool of hashing workers against a periodically refreshed
/// block template.
///
/// Created once per session next to the node abstraction; dropping the
/// coordinator forces a stop.
pub struct Miner {
    node: Arc<dyn NodeHandler>,
    wallet: Arc<dyn WalletHandler>,
    config_store: Arc<dyn ConfigStore>,
    pow: Arc<dyn PowAlgorithm>,
    config: Arc<Mutex<MinerConfig>>,

    shared: Arc<MinerShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    hashrate: Mutex<HashrateTracker>,
    refresh_interval: Mutex<Interval>,
    merge_interval: Mutex<Interval>,

    mine_address: Mutex<Option<AccountAddress>>,
    auto_start: AtomicBool,

    template_refresh: Duration,
    hashrate_merge: Duration,
    wallet_refresh_delay: Duration,
    stake_mixin: u64,
}

impl Miner {
    /// Creates a stopped coordinator wired to its collaborators.
    ///
    /// Timing knobs (template refresh period, hashrate merge period, wallet
    /// catch-up delay) and the stake mixin come from `config`; the config
    /// is also what gets persisted after an accepted block submission.
    pub fn new(
        node: Arc<dyn NodeHandler>,
        wallet: Arc<dyn WalletHandler>,
        config_store: Arc<dyn ConfigStore>,
        pow: Arc<dyn PowAlgorithm>,
        config: MinerConfig,
    ) -> Self {
        let template_refresh = Duration::from_secs(config.template_refresh_secs);
        let hashrate_merge = Duration::from_secs(config.hashrate_merge_secs);
        let wallet_refresh_delay = Duration::from_millis(config.wallet_refresh_delay_ms);
        let stake_mixin = config.stake_mixin;

        Miner {
            node,
            wallet,
            config_store,
            pow,
            config: Arc::new(Mutex::new(config)),
            shared: Arc::new(MinerShared::new()),
            workers: Mutex::new(Vec::new()),
            hashrate: Mutex::new(HashrateTracker::new()),
            refresh_interval: Mutex::new(Interval::new(template_refresh)),
            merge_interval: Mutex::new(Interval::new(hashrate_merge)),
            mine_address: Mutex::new(None),
            auto_start: AtomicBool::new(false),
            template_refresh,
            hashrate_merge,
            wallet_refresh_delay,
            stake_mixin,
        }
    }

    /// True from a successful `start` until `stop` (or a fatal worker
    /// failure). Orthogonal to pause.
    pub fn is_mining(&self) -> bool {
        !self.shared.stop.load(Ordering::Acquire)
    }

    /// Coarse state for the presentation layer.
    pub fn state(&self) -> MiningState {
        if !self.is_mining() {
            MiningState::Stopped
        } else if self.shared.pause.is_paused() {
            MiningState::Paused
        } else {
            MiningState::Running
        }
    }

    /// Starts mining to `address` with `threads` workers.
    ///
    /// Validates the address and acquires an initial template before any
    /// worker is spawned; a failed start leaves the coordinator fully
    /// stopped with no workers registered.
    pub fn start(&self, address: &str, threads: usize) -> Result<(), MinerError> {
        if self.is_mining() {
            log::error!("starting miner but it's already started");
            return Err(MinerError::AlreadyRunning);
        }

        let mut workers = self.workers.lock().unwrap();
        if !workers.is_empty() {
            log::error!("unable to start miner: previous mining threads are still registered");
            return Err(MinerError::WorkersStillRegistered);
        }
        if threads == 0 {
            return Err(MinerError::ZeroThreads);
        }

        let address: AccountAddress = address.parse().map_err(|e| {
            log::error!("target account address has wrong format, mining canceled");
            e
        })?;
        *self.mine_address.lock().unwrap() = Some(address.clone());
        self.shared
            .threads_total
            .store(threads as u32, Ordering::Release);

        // always acquire a template before spawning anything
        self.request_block_template(false)?;

        self.shared.stop.store(false, Ordering::Release);
        self.shared.pause.reset(); // in case mining wasn't resumed after pause
        self.shared.hashes.store(0, Ordering::Relaxed);
        self.hashrate.lock().unwrap().reset();
        *self.refresh_interval.lock().unwrap() = Interval::new(self.template_refresh);
        *self.merge_interval.lock().unwrap() = Interval::new(self.hashrate_merge);

        {
            let mut config = self.config.lock().unwrap();
            config.mine_address = address.to_string();
            config.mining_threads = threads;
        }

        // each session gets its own solution channel, so a listener from a
        // previous session can never pick up this session's blocks
        let (found_tx, found_rx) = unbounded();
        for index in 0..threads as u32 {
            let shared = Arc::clone(&self.shared);
            let pow = Arc::clone(&self.pow);
            let found_tx = found_tx.clone();
            workers.push(thread::spawn(move || {
                run_worker(shared, pow, found_tx, index);
            }));
        }
        drop(found_tx); // workers hold the only senders now
        workers.push(self.spawn_submit_listener(found_rx));

        log::info!("mining has started with {} threads, good luck!", threads);
        Ok(())
    }

    /// Signals all workers to stop without waiting for them.
    pub fn send_stop_signal(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Stops mining.
    ///
    /// Idempotent; callable from any state. Waits a bounded time for the
    /// workers and the submit listener to observe the stop flag, then
    /// detaches any stragglers, so hashing may continue for at most one
    /// iteration after this returns.
    pub fn stop(&self) {
        self.send_stop_signal();
        self.auto_start.store(false, Ordering::Relaxed);

        let mut workers = self.workers.lock().unwrap();
        if workers.is_empty() {
            return;
        }

        let deadline = Instant::now() + STOP_JOIN_TIMEOUT;
        while self.shared.active_workers.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        let stragglers = self.shared.active_workers.load(Ordering::SeqCst);
        if stragglers > 0 {
            log::warn!("{} mining threads are still finishing up", stragglers);
        }
        workers.clear();
        log::info!("mining has been stopped");
    }

    /// Suspends hashing without stopping worker threads.
    ///
    /// Pause calls nest: mining resumes only after every pauser called
    /// [`Miner::resume`].
    pub fn pause(&self) {
        if self.shared.pause.pause() == 1 && self.is_mining() {
            log::trace!("mining paused");
        }
    }

    /// Releases one pause.
    ///
    /// A resume without a matching pause is logged and ignored; the counter
    /// never goes negative.
    pub fn resume(&self) {
        match self.shared.pause.resume() {
            None => log::error!("unexpected miner resume without matching pause"),
            Some(0) => {
                if self.is_mining() {
                    log::trace!("mining resumed");
                }
            }
            Some(_) => {}
        }
    }

    /// Instantaneous hashrate in hashes per second; 0 while not mining.
    pub fn get_speed(&self) -> u64 {
        if self.is_mining() {
            self.hashrate.lock().unwrap().current_rate()
        } else {
            0
        }
    }

    /// Windowed average hashrate; a smoother signal for charts.
    pub fn get_average_speed(&self) -> u64 {
        if self.is_mining() {
            self.hashrate.lock().unwrap().average()
        } else {
            0
        }
    }

    /// Hashes attempted since the last hashrate merge. Approximate by
    /// design: workers increment it without strict synchronization.
    pub fn total_hashes(&self) -> u64 {
        self.shared.hashes.load(Ordering::Relaxed)
    }

    /// Periodic housekeeping, called from the control thread's event loop.
    ///
    /// While mining, refreshes the template no more often than the
    /// configured period (a failed refresh is logged and retried next
    /// cycle) and folds the hash counter into the hashrate window.
    pub fn on_idle(&self) {
        if !self.is_mining() {
            return;
        }

        if self.refresh_interval.lock().unwrap().tick() {
            if let Err(e) = self.request_block_template(false) {
                log::error!("periodic template refresh failed, retrying next cycle: {}", e);
            }
        }

        if self.merge_interval.lock().unwrap().tick() {
            let hashes = self.shared.hashes.swap(0, Ordering::Relaxed);
            self.hashrate.lock().unwrap().merge(hashes);
        }
    }

    /// Requests a fresh template after the chain tip moved.
    ///
    /// Waits the configured delay first so the wallet can catch up with the
    /// new height; a stake transaction built against stale wallet state
    /// would be rejected by the core. No-op while not mining.
    pub fn on_block_chain_update(&self) -> Result<(), MinerError> {
        if !self.is_mining() {
            return Ok(());
        }
        self.request_block_template(true)
    }

    /// Remembers `address` and `threads` and arms a deferred start.
    ///
    /// Mining on a template that catching up will immediately obsolete is
    /// wasted work, so the actual start happens in
    /// [`Miner::on_synchronized`].
    pub fn start_on_sync(&self, address: &str, threads: usize) -> Result<(), MinerError> {
        if threads == 0 {
            return Err(MinerError::ZeroThreads);
        }
        let address: AccountAddress = address.parse()?;
        *self.mine_address.lock().unwrap() = Some(address);
        self.shared
            .threads_total
            .store(threads as u32, Ordering::Release);
        self.auto_start.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Called when the node reports it caught up with the network; starts
    /// mining with the remembered parameters if a deferred start is armed.
    pub fn on_synchronized(&self) {
        if !self.auto_start.load(Ordering::Relaxed) || self.is_mining() {
            return;
        }
        let address = self.mine_address.lock().unwrap().clone();
        let threads = self.shared.threads_total.load(Ordering::Acquire) as usize;
        if let Some(address) = address {
            if let Err(e) = self.start(address.as_str(), threads) {
                log::error!("deferred mining start failed: {}", e);
            }
        }
    }

    /// Runs one template round: node template, stake parameters, wallet
    /// stake transaction, publish.
    ///
    /// Every collaborator failure propagates to the caller; nothing is
    /// published on failure.
    fn request_block_template(&self, wait_wallet_refresh: bool) -> Result<(), MinerError> {
        if wait_wallet_refresh {
            log::info!("giving the wallet some time to refresh...");
            thread::sleep(self.wallet_refresh_delay);
        }

        let address = self
            .mine_address
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| MinerError::ConfigError("no mining address set".to_string()))?;

        let prepared = self.node.prepare_block_template(&address)?;
        let stake = self
            .node
            .stake_parameters(&StakeQuery::for_template(&prepared))?;
        let stake_tx = self.wallet.build_stake_transaction(
            &address,
            stake.stake,
            stake.reward,
            self.stake_mixin,
            prepared.height + MINED_MONEY_UNLOCK_WINDOW,
        )?;

        let mut template = prepared.template;
        template.base_transaction = stake_tx.tx_blob;
        let version = self
            .shared
            .template
            .set_template(template, prepared.difficulty)?;
        log::debug!(
            "published template version {} at height {} (difficulty {})",
            version,
            prepared.height,
            prepared.difficulty
        );
        Ok(())
    }

    /// Spawns the thread that drains this session's worker solutions and
    /// submits them.
    fn spawn_submit_listener(&self, found_rx: Receiver<FoundBlock>) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let node = Arc::clone(&self.node);
        let config_store = Arc::clone(&self.config_store);
        let config = Arc::clone(&self.config);

        thread::spawn(move || {
            run_submit_loop(shared, node, config_store, config, found_rx);
        })
    }
}

impl Drop for Miner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Submission loop: first solution per template version wins, later ones
/// are redundant and discarded. An accepted submission persists the miner
/// config; persistence failure is logged, never fatal. A rejected block is
/// discarded without retry, mining continues until the next refresh.
///
/// The listener counts as an active worker so `stop` waits for it; its
/// channel belongs to one session and disconnects once that session's
/// workers are gone.
fn run_submit_loop(
    shared: Arc<MinerShared>,
    node: Arc<dyn NodeHandler>,
    config_store: Arc<dyn ConfigStore>,
    config: Arc<Mutex<MinerConfig>>,
    found_rx: Receiver<FoundBlock>,
) {
    let _guard = ActiveGuard::register(Arc::clone(&shared));
    let mut last_handled: Option<u64> = None;

    loop {
        match found_rx.recv_timeout(SUBMIT_POLL) {
            Ok(found) => {
                if last_handled.is_some_and(|v| found.template_version <= v) {
                    log::info!(
                        "discarding redundant solution for template version {}",
                        found.template_version
                    );
                    continue;
                }
                last_handled = Some(found.template_version);

                log::info!("block id: {}", hex::encode(block_id(&found.blob)));
                match node.submit_block(&found) {
                    Ok(()) => {
                        let snapshot = config.lock().unwrap().clone();
                        if let Err(e) = config_store.save(&snapshot) {
                            log::warn!("failed to persist miner config: {}", e);
                        }
                    }
                    Err(e) => {
                        log::error!("solved block was rejected, continuing to mine: {}", e);
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if shared.stop.load(Ordering::Acquire) {
                    break;
                }
            }
            // all workers of this session dropped their senders
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
