// src/utils/error.rs
use std::io;
use thiserror::Error;

/// Main error type for the mining coordinator.
///
/// Covers the three failure families the coordinator distinguishes:
/// configuration errors reported synchronously from `start`, transient
/// upstream failures (template, stake, wallet, submission), and fatal
/// worker-side failures (hash computation).
#[derive(Error, Debug)]
pub enum MinerError {
    /// The mining address failed validation.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// `start` was called while the coordinator is already mining.
    #[error("miner is already running")]
    AlreadyRunning,

    /// Worker threads from a previous round are still registered; `stop`
    /// must clear them before `start` can succeed.
    #[error("previous mining threads are still registered")]
    WorkersStillRegistered,

    /// `start` was called with a zero thread count.
    #[error("thread count must be greater than zero")]
    ZeroThreads,

    /// The node core could not produce a block template.
    #[error("block template unavailable: {0}")]
    TemplateUnavailable(String),

    /// The node core could not derive stake and reward amounts.
    #[error("stake parameters unavailable: {0}")]
    StakeUnavailable(String),

    /// The wallet could not build a stake transaction.
    #[error("wallet error: {0}")]
    WalletError(String),

    /// A template failed validation before publication.
    #[error("malformed block template: {0}")]
    MalformedTemplate(String),

    /// The node rejected a solved block.
    #[error("block submission rejected: {0}")]
    SubmitRejected(String),

    /// The proof-of-work hash could not be computed; fatal to mining.
    #[error("hash computation failed: {0}")]
    HashFailure(String),

    /// Invalid or missing response data from an RPC collaborator.
    #[error("protocol violation: {0}")]
    ProtocolError(String),

    /// The embedded node did not answer within the reply timeout.
    #[error("node channel error: {0}")]
    ChannelError(String),

    /// Configuration file or parameter errors.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Standard I/O operation errors.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP request/response errors.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Converts hex decoding errors into MinerError.
///
/// Hex decoding happens on RPC responses (template blobs, keys), so a bad
/// payload surfaces as a protocol violation.
impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::ProtocolError(format!("hex decoding failed: {}", e))
    }
}
