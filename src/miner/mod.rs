// src/miner/mod.rs
//! Core mining coordination.
//!
//! Everything that owns worker lifecycle, template versioning and progress
//! accounting lives here:
//! - the coordinator (start/stop/pause/resume control surface)
//! - the versioned template store
//! - the worker thread loop
//! - hashrate tracking and the interval timers that pace refreshes

/// The mining coordinator: orchestrates workers, template rounds and block
/// submission.
pub mod coordinator;

/// Sliding-window hashrate tracking.
pub mod hashrate;

/// Rate-limited interval timer used by the coordinator's idle loop.
pub mod interval;

/// Versioned, atomically swappable block template store.
pub mod template;

/// Worker thread loop and shared mining state.
pub mod worker;

// Re-export main components for cleaner imports
pub use self::coordinator::Miner;
pub use self::hashrate::{HASHRATE_WINDOW, HashrateTracker};
pub use self::interval::Interval;
pub use self::template::{TemplateSnapshot, TemplateStore};
pub use self::worker::PauseGate;
