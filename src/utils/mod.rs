// src/utils/mod.rs
//! Shared error handling and logging infrastructure.

/// Error types for the mining coordinator.
///
/// Contains the [`MinerError`] enum covering configuration, upstream and
/// worker failure conditions.
pub mod error;

/// Logging configuration.
///
/// Provides [`init_logging`] which sets up the `env_logger` backend.
pub mod logging;

// Re-export for easier access
pub use error::MinerError;
pub use logging::init_logging;
