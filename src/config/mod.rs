// src/config/mod.rs
//! Configuration management for the solo miner
//!
//! This module handles all configuration-related functionality including:
//! - Loading and parsing configuration files
//! - Generating configuration templates
//! - Persisting the active configuration after accepted blocks
//!
//! The configuration uses TOML format.

/// Core configuration implementation
///
/// Contains the [`MinerConfig`] struct defining the miner's
/// configuration structure and defaults.
pub mod config;

/// Configuration persistence
///
/// Contains the [`ConfigStore`] seam the coordinator saves through,
/// and its file-backed implementation.
pub mod store;

// Re-export key items for easy access
pub use config::MinerConfig;
pub use store::{ConfigStore, FileConfigStore};

use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Loads miner configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the configuration file (anything convertible to PathBuf)
///
/// # Returns
/// * `Ok(MinerConfig)` - Successfully loaded configuration
/// * `Err(MinerError)` - If the file couldn't be read or parsed
pub fn load(path: impl Into<PathBuf>) -> Result<MinerConfig, MinerError> {
    MinerConfig::load(path)
}

/// Generates a commented configuration template
///
/// # Returns
/// String containing a ready-to-use TOML configuration template
pub fn generate_template() -> String {
    MinerConfig::generate_template()
}
