// src/cli/commands.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CryptoNote solo miner CLI
#[derive(Parser, Debug)]
#[command(name = "cn-solo-miner")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (start mining or generate config)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Start mining with the specified options
    Start(StartOptions),

    /// Generate a configuration file template
    Config(ConfigOptions),
}

/// Options for starting the mining operation
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Address block rewards are paid to (overrides config)
    #[arg(short, long)]
    pub address: Option<String>,

    /// Number of hashing threads to use (overrides config)
    #[arg(short, long)]
    pub threads: Option<usize>,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,
}
