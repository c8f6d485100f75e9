// src/miner/template.rs
//! Versioned block template store.
//!
//! Holds the current template, its difficulty and the per-round starter
//! nonce as one immutable snapshot behind an atomically swappable cell.
//! Workers detect staleness by comparing their cached version against the
//! store's counter and then copy the snapshot out; no reader ever holds a
//! lock while hashing.

use crate::types::{BlockTemplate, Difficulty};
use crate::utils::error::MinerError;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A consistent point-in-time view of the published template.
///
/// The triple (template, difficulty, version) is immutable once published;
/// replacement happens only via a full snapshot swap.
#[derive(Debug)]
pub struct TemplateSnapshot {
    /// The finalized template workers hash against.
    pub template: BlockTemplate,
    /// Difficulty target paired with this template.
    pub difficulty: Difficulty,
    /// Monotonically increasing template generation.
    pub version: u64,
    /// Random starting nonce for this round; worker `i` probes
    /// `starter_nonce + i, starter_nonce + i + W, ...` for `W` workers.
    pub starter_nonce: u32,
}

/// Single-writer, multi-reader store for the current block template.
///
/// The writer is the coordinator (its control thread or the periodic
/// refresh); readers are the workers, once per observed version change.
pub struct TemplateStore {
    current: ArcSwapOption<TemplateSnapshot>,
    version: AtomicU64,
}

impl TemplateStore {
    /// Creates an empty store; [`TemplateStore::version`] is 0 until the
    /// first successful [`TemplateStore::set_template`].
    pub fn new() -> Self {
        TemplateStore {
            current: ArcSwapOption::from(None),
            version: AtomicU64::new(0),
        }
    }

    /// Validates and publishes a new template with its difficulty.
    ///
    /// Finalization (merge-mining tag construction) happens before anything
    /// is published: on failure the store is left untouched and the version
    /// counter does not advance. On success a fresh random starter nonce is
    /// drawn and the whole snapshot is swapped in atomically.
    ///
    /// Returns the new version.
    pub fn set_template(
        &self,
        mut template: BlockTemplate,
        difficulty: Difficulty,
    ) -> Result<u64, MinerError> {
        template.finalize()?;

        let starter_nonce = rand::random::<u32>();
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        self.current.store(Some(Arc::new(TemplateSnapshot {
            template,
            difficulty,
            version,
            starter_nonce,
        })));
        Ok(version)
    }

    /// Current template generation; 0 means no template was ever published.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Returns the current snapshot, if any.
    ///
    /// The returned snapshot never pairs a template from one version with a
    /// difficulty from another; the triple is swapped as a unit.
    pub fn snapshot(&self) -> Option<Arc<TemplateSnapshot>> {
        self.current.load_full()
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}
