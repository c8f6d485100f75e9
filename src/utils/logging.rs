// src/utils/logging.rs
//! Logging setup for the miner.
//!
//! Uses `env_logger` with a compact `[ts level module:line]` format written
//! to stdout. The default level is Info; `RUST_LOG` overrides it.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Initializes the logging subsystem.
///
/// Safe to call once per process; respects `RUST_LOG` when set, otherwise
/// logs at Info.
pub fn init_logging() {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.module_path().unwrap_or_default(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(Target::Stdout);

    if env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        builder.filter_level(LevelFilter::Info);
    }

    builder.init();
}
