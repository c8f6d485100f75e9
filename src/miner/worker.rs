// src/miner/worker.rs
//! Worker thread loop and the state shared with the coordinator.
//!
//! Each worker independently scans a disjoint arithmetic progression of
//! nonces against the current template snapshot, re-synchronizing whenever
//! the template version changes. Stop is cooperative: the shared flag is
//! polled once per hash attempt.

use crate::miner::template::{TemplateSnapshot, TemplateStore};
use crate::pow::{PowAlgorithm, check_hash};
use crate::types::{FoundBlock, write_nonce};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Idle time while the pause counter is raised; keeps the pause check from
/// busy-spinning.
const PAUSE_IDLE: Duration = Duration::from_millis(100);

/// Idle time while no template has ever been published (startup race).
const FIRST_TEMPLATE_IDLE: Duration = Duration::from_secs(1);

/// Nested pause counter.
///
/// Independent callers (chain synchronization, future pausers) each call
/// `pause`/`resume`; hashing resumes only when every pauser has resumed.
/// A `resume` without a matching `pause` is clamped to zero and recorded as
/// a misuse rather than corrupting the counter.
pub struct PauseGate {
    count: Mutex<u32>,
    misuses: AtomicU64,
}

impl PauseGate {
    /// Creates an unpaused gate.
    pub fn new() -> Self {
        PauseGate {
            count: Mutex::new(0),
            misuses: AtomicU64::new(0),
        }
    }

    /// Raises the pause counter; returns the new count.
    pub fn pause(&self) -> u32 {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        *count
    }

    /// Lowers the pause counter; returns the new count, or `None` when the
    /// call had no matching `pause` (counter stays at zero, misuse
    /// recorded).
    pub fn resume(&self) -> Option<u32> {
        let mut count = self.count.lock().unwrap();
        if *count == 0 {
            self.misuses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        *count -= 1;
        Some(*count)
    }

    /// True while at least one pauser is active.
    pub fn is_paused(&self) -> bool {
        *self.count.lock().unwrap() > 0
    }

    /// Number of `resume` calls that had no matching `pause`.
    pub fn misuse_count(&self) -> u64 {
        self.misuses.load(Ordering::Relaxed)
    }

    /// Forces the counter back to zero; used when a mining session starts
    /// in case a previous session was never resumed.
    pub fn reset(&self) {
        *self.count.lock().unwrap() = 0;
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared between the coordinator's control thread and all workers.
///
/// The template store is the only snapshot-consistent piece; the hash
/// counter is deliberately approximate (relaxed increments).
pub(crate) struct MinerShared {
    /// Cooperative stop flag; polled once per hash attempt.
    pub stop: AtomicBool,
    /// Nested pause counter.
    pub pause: PauseGate,
    /// Versioned template store.
    pub template: TemplateStore,
    /// Hashes attempted since the last hashrate merge.
    pub hashes: AtomicU64,
    /// Total worker count; the common difference of every nonce
    /// progression.
    pub threads_total: AtomicU32,
    /// Session threads (hash workers and the submit listener) still inside
    /// their loops; lets `stop` do a bounded best-effort wait instead of an
    /// unbounded join.
    pub active_workers: AtomicUsize,
}

impl MinerShared {
    pub(crate) fn new() -> Self {
        MinerShared {
            stop: AtomicBool::new(true),
            pause: PauseGate::new(),
            template: TemplateStore::new(),
            hashes: AtomicU64::new(0),
            threads_total: AtomicU32::new(0),
            active_workers: AtomicUsize::new(0),
        }
    }
}

/// Registers a thread in the active-worker count for its lifetime, so
/// shutdown can wait on a single counter however the thread exits.
pub(crate) struct ActiveGuard(Arc<MinerShared>);

impl ActiveGuard {
    pub(crate) fn register(shared: Arc<MinerShared>) -> Self {
        shared.active_workers.fetch_add(1, Ordering::SeqCst);
        ActiveGuard(shared)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// First nonce probed by worker `index` for a round.
///
/// Worker `i` of `W` scans `starter + i, starter + i + W, ...`; the
/// progressions of distinct workers are disjoint for any starter.
pub(crate) fn initial_nonce(starter: u32, index: u32) -> u32 {
    starter.wrapping_add(index)
}

/// Body of one worker thread.
pub(crate) fn run_worker(
    shared: Arc<MinerShared>,
    pow: Arc<dyn PowAlgorithm>,
    found_tx: Sender<FoundBlock>,
    index: u32,
) {
    log::info!("miner thread started [{}]", index);
    let _guard = ActiveGuard::register(Arc::clone(&shared));

    let stride = shared.threads_total.load(Ordering::Acquire).max(1);
    let mut local: Option<Arc<TemplateSnapshot>> = None;
    let mut local_version = 0u64;
    let mut blob: Vec<u8> = Vec::new();
    let mut nonce = 0u32;

    while !shared.stop.load(Ordering::Acquire) {
        if shared.pause.is_paused() {
            thread::sleep(PAUSE_IDLE);
            continue;
        }

        if local_version != shared.template.version() {
            if let Some(snap) = shared.template.snapshot() {
                blob = snap.template.blob.clone();
                nonce = initial_nonce(snap.starter_nonce, index);
                local_version = snap.version;
                local = Some(snap);
            }
        }

        let Some(snap) = local.as_ref() else {
            log::trace!("block template not set yet [{}]", index);
            thread::sleep(FIRST_TEMPLATE_IDLE);
            continue;
        };

        write_nonce(&mut blob, snap.template.nonce_offset, nonce);
        let hash = match pow.long_hash(&blob) {
            Ok(hash) => hash,
            Err(e) => {
                // A slow-hash failure means the template itself is suspect;
                // halt all mining instead of hashing garbage.
                log::error!("failed to compute block long hash: {}", e);
                shared.stop.store(true, Ordering::Release);
                break;
            }
        };

        if !shared.stop.load(Ordering::Acquire) && check_hash(&hash, snap.difficulty) {
            log::info!(
                "found block for difficulty {} pow: {}",
                snap.difficulty,
                hex::encode(hash)
            );
            let _ = found_tx.send(FoundBlock {
                blob: blob.clone(),
                base_transaction: snap.template.base_transaction.clone(),
                nonce,
                pow_hash: hash,
                template_version: snap.version,
            });
        }

        nonce = nonce.wrapping_add(stride);
        shared.hashes.fetch_add(1, Ordering::Relaxed);
    }
    log::info!("miner thread stopped [{}]", index);
}
