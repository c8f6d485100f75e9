// src/cli/mod.rs
//! Command-line interface definitions
//!
//! Contains the clap command tree parsed by the binary entry point.

/// Command and option structures
pub mod commands;

// Re-export for easier access
pub use commands::{Action, Commands, ConfigOptions, StartOptions};
