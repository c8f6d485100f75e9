// src/main.rs
use clap::Parser;
use cn_solo_miner::{self, *};
use std::sync::Arc;
use std::time::Duration;

/// How often the control loop wakes up to drive the coordinator.
const IDLE_TICK: Duration = Duration::from_secs(1);

/// How often the control loop logs the current hashrate.
const SPEED_REPORT_PERIOD: Duration = Duration::from_secs(30);

/// Main entry point for the solo miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Starts the mining operation with given configuration options
///
/// # Arguments
/// * `opts` - Command line options for mining operation
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads the configuration and applies CLI overrides
/// 3. Wires the coordinator to its node, wallet and config store
/// 4. Drives periodic work until mining stops
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    utils::init_logging();

    let mut config = config::load(&opts.config)?;
    // Apply CLI overrides
    if let Some(address) = opts.address {
        config.mine_address = address;
    }
    if let Some(threads) = opts.threads {
        config.mining_threads = threads;
    }
    if config.mine_address.is_empty() {
        return Err(MinerError::ConfigError(
            "no mining address configured; set mine_address or pass --address".to_string(),
        ));
    }

    let node = Arc::new(RemoteNode::new(config.node.clone())?);
    let wallet = Arc::new(RpcWallet::new(config.wallet.clone())?);
    let config_store = Arc::new(FileConfigStore::new(&opts.config));
    let pow = Arc::new(CryptoNightPow::new(config.cn_variant));

    let address = config.mine_address.clone();
    let threads = config.mining_threads;
    let wait_for_sync = config.wait_for_sync;
    let miner = Miner::new(node.clone(), wallet, config_store, pow, config);

    if wait_for_sync {
        miner.start_on_sync(&address, threads)?;
        wait_for_node_sync(&miner, node.as_ref());
    } else {
        miner.start(&address, threads)?;
    }

    run_control_loop(&miner, node.as_ref())
}

/// Blocks until the node looks synchronized and the deferred start fired.
///
/// Without a push-style sync event from a remote daemon, a stable chain
/// height across consecutive polls plus at least one peer serves as the
/// synchronization signal.
fn wait_for_node_sync(miner: &Miner, node: &dyn NodeHandler) {
    log::info!("waiting for the node to synchronize before mining");
    let mut last_height = None;
    while !miner.is_mining() {
        std::thread::sleep(IDLE_TICK);
        let height = match node.last_known_block_height() {
            Ok(height) => height,
            Err(e) => {
                log::warn!("chain height query failed: {}", e);
                continue;
            }
        };
        let peers = node.peer_count().unwrap_or(0);
        if last_height == Some(height) && peers > 0 {
            miner.on_synchronized();
        }
        last_height = Some(height);
    }
}

/// Drives the coordinator until mining stops.
///
/// Calls `on_idle` every tick, watches the chain height to trigger
/// template refreshes, and reports the hashrate periodically.
fn run_control_loop(miner: &Miner, node: &dyn NodeHandler) -> Result<(), MinerError> {
    let mut last_height = node.last_known_block_height().unwrap_or(0);
    let mut speed_report = miner::Interval::new(SPEED_REPORT_PERIOD);

    while miner.is_mining() {
        std::thread::sleep(IDLE_TICK);
        miner.on_idle();

        match node.last_known_block_height() {
            Ok(height) if height != last_height => {
                last_height = height;
                if let Err(e) = miner.on_block_chain_update() {
                    log::warn!("template refresh after chain update failed: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("chain height query failed: {}", e),
        }

        if speed_report.tick() {
            log::info!(
                "speed: {} H/s (average {} H/s)",
                miner.get_speed(),
                miner.get_average_speed()
            );
        }
    }

    log::info!("mining stopped");
    Ok(())
}

/// Generates configuration template file
///
/// # Arguments
/// * `opts` - Configuration generation options
///
/// # Operations
/// 1. Generates template content
/// 2. Writes template to specified output file
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    let config = config::generate_template();
    std::fs::write(opts.output, config)?;
    Ok(())
}
