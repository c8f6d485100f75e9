// src/node/embedded.rs
use crate::node::NodeHandler;
use crate::types::{AccountAddress, FoundBlock, PreparedTemplate, StakeParameters, StakeQuery};
use crate::utils::error::MinerError;
use crossbeam_channel::{Sender, bounded};
use std::time::Duration;

/// Default time to wait for the in-process core to answer a request.
const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// A request the miner sends to an in-process core.
#[derive(Debug, Clone)]
pub enum CoreRequest {
    /// Produce a block template paying to the given address.
    PrepareBlockTemplate(AccountAddress),
    /// Derive stake and reward amounts for a template.
    StakeParameters(StakeQuery),
    /// Accept or reject a serialized solved block (hashing blob followed
    /// by its coinbase transaction).
    SubmitBlock(Vec<u8>),
    /// Report chain height and peer count.
    GetInfo,
}

/// The in-process core's answer to a [`CoreRequest`].
#[derive(Debug, Clone)]
pub enum CoreResponse {
    /// Answer to [`CoreRequest::PrepareBlockTemplate`].
    Template(Box<PreparedTemplate>),
    /// Answer to [`CoreRequest::StakeParameters`].
    Stake(StakeParameters),
    /// The submitted block was accepted.
    SubmitAccepted,
    /// The submitted block was rejected, with the core's reason.
    SubmitRejected(String),
    /// Answer to [`CoreRequest::GetInfo`].
    Info(CoreInfo),
    /// The core failed to service the request.
    Error(String),
}

/// Chain and connectivity summary of an in-process core.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreInfo {
    /// Height of the best known block.
    pub height: u64,
    /// Connected peer count.
    pub peer_count: u64,
}

/// One request with its reply channel.
#[derive(Debug)]
pub struct CoreEnvelope {
    /// The request to service.
    pub request: CoreRequest,
    /// Where the core sends exactly one [`CoreResponse`].
    pub reply: Sender<CoreResponse>,
}

/// [`NodeHandler`] variant bridging to a core running in this process.
///
/// The embedded daemon services [`CoreEnvelope`]s from the request channel
/// on its own threads; the miner side blocks on the reply with a timeout so
/// a wedged core cannot hang the control thread forever.
pub struct EmbeddedNode {
    requests: Sender<CoreEnvelope>,
    reply_timeout: Duration,
}

impl EmbeddedNode {
    /// Wraps the request channel of an in-process core.
    pub fn new(requests: Sender<CoreEnvelope>) -> Self {
        Self::with_timeout(requests, DEFAULT_REPLY_TIMEOUT)
    }

    /// Same as [`EmbeddedNode::new`] with an explicit reply timeout.
    pub fn with_timeout(requests: Sender<CoreEnvelope>, reply_timeout: Duration) -> Self {
        EmbeddedNode {
            requests,
            reply_timeout,
        }
    }

    fn call(&self, request: CoreRequest) -> Result<CoreResponse, MinerError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.requests
            .send(CoreEnvelope {
                request,
                reply: reply_tx,
            })
            .map_err(|_| MinerError::ChannelError("embedded core is gone".to_string()))?;
        let response = reply_rx.recv_timeout(self.reply_timeout).map_err(|e| {
            MinerError::ChannelError(format!("embedded core did not answer: {}", e))
        })?;
        match response {
            CoreResponse::Error(msg) => Err(MinerError::ProtocolError(msg)),
            other => Ok(other),
        }
    }
}

impl NodeHandler for EmbeddedNode {
    fn prepare_block_template(
        &self,
        address: &AccountAddress,
    ) -> Result<PreparedTemplate, MinerError> {
        match self.call(CoreRequest::PrepareBlockTemplate(address.clone()))? {
            CoreResponse::Template(prepared) => Ok(*prepared),
            other => Err(unexpected("template", &other)),
        }
    }

    fn stake_parameters(&self, query: &StakeQuery) -> Result<StakeParameters, MinerError> {
        match self.call(CoreRequest::StakeParameters(query.clone()))? {
            CoreResponse::Stake(stake) => Ok(stake),
            other => Err(unexpected("stake parameters", &other)),
        }
    }

    fn submit_block(&self, block: &FoundBlock) -> Result<(), MinerError> {
        match self.call(CoreRequest::SubmitBlock(block.full_blob()))? {
            CoreResponse::SubmitAccepted => Ok(()),
            CoreResponse::SubmitRejected(reason) => Err(MinerError::SubmitRejected(reason)),
            other => Err(unexpected("submission result", &other)),
        }
    }

    fn last_known_block_height(&self) -> Result<u64, MinerError> {
        match self.call(CoreRequest::GetInfo)? {
            CoreResponse::Info(info) => Ok(info.height),
            other => Err(unexpected("info", &other)),
        }
    }

    fn peer_count(&self) -> Result<u64, MinerError> {
        match self.call(CoreRequest::GetInfo)? {
            CoreResponse::Info(info) => Ok(info.peer_count),
            other => Err(unexpected("info", &other)),
        }
    }
}

fn unexpected(wanted: &str, got: &CoreResponse) -> MinerError {
    MinerError::ProtocolError(format!("expected {}, core answered {:?}", wanted, got))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::thread;

    /// Minimal in-process core servicing requests on its own thread.
    fn spawn_core(height: u64) -> Sender<CoreEnvelope> {
        let (tx, rx) = unbounded::<CoreEnvelope>();
        thread::spawn(move || {
            for envelope in rx {
                let response = match envelope.request {
                    CoreRequest::PrepareBlockTemplate(_) => {
                        CoreResponse::Template(Box::default())
                    }
                    CoreRequest::StakeParameters(_) => CoreResponse::Stake(StakeParameters {
                        stake: 100,
                        reward: 70,
                    }),
                    CoreRequest::SubmitBlock(blob) if blob.is_empty() => {
                        CoreResponse::SubmitRejected("empty blob".to_string())
                    }
                    CoreRequest::SubmitBlock(_) => CoreResponse::SubmitAccepted,
                    CoreRequest::GetInfo => CoreResponse::Info(CoreInfo {
                        height,
                        peer_count: 8,
                    }),
                };
                let _ = envelope.reply.send(response);
            }
        });
        tx
    }

    #[test]
    fn round_trips_requests_through_the_bridge() {
        let node = EmbeddedNode::new(spawn_core(42));
        assert_eq!(node.last_known_block_height().unwrap(), 42);
        assert_eq!(node.peer_count().unwrap(), 8);

        let stake = node.stake_parameters(&StakeQuery::default()).unwrap();
        assert_eq!(stake.stake, 100);
        assert_eq!(stake.reward, 70);
    }

    #[test]
    fn maps_rejection_to_submit_error() {
        let node = EmbeddedNode::new(spawn_core(1));
        let block = FoundBlock {
            blob: Vec::new(),
            base_transaction: Vec::new(),
            nonce: 0,
            pow_hash: [0u8; 32],
            template_version: 1,
        };
        assert!(matches!(
            node.submit_block(&block),
            Err(MinerError::SubmitRejected(_))
        ));
    }

    #[test]
    fn submission_payload_includes_the_coinbase() {
        let (tx, rx) = unbounded::<CoreEnvelope>();
        let captured = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&captured);
        thread::spawn(move || {
            for envelope in rx {
                if let CoreRequest::SubmitBlock(blob) = envelope.request {
                    *sink.lock().unwrap() = blob;
                    let _ = envelope.reply.send(CoreResponse::SubmitAccepted);
                }
            }
        });

        let node = EmbeddedNode::new(tx);
        let block = FoundBlock {
            blob: vec![1, 2, 3],
            base_transaction: vec![9, 9],
            nonce: 0,
            pow_hash: [0u8; 32],
            template_version: 1,
        };
        node.submit_block(&block).unwrap();
        assert_eq!(*captured.lock().unwrap(), vec![1, 2, 3, 9, 9]);
    }

    #[test]
    fn times_out_when_the_core_never_answers() {
        let (tx, rx) = unbounded::<CoreEnvelope>();
        // keep the receiver alive but never answer
        let node = EmbeddedNode::with_timeout(tx, Duration::from_millis(50));
        let result = node.last_known_block_height();
        assert!(matches!(result, Err(MinerError::ChannelError(_))));
        drop(rx);
    }
}
