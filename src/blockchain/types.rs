//! Chain client interface and error definitions.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::blockchain::fees::FeePolicy;
use crate::codec::{CodecError, RevealOperation, SignedOperation, UnsignedOperation};
use crate::tezos::{Address, ChainId, OperationHash};

/// Node error id suffix reported when the operation counter is stale.
pub const COUNTER_IN_THE_PAST: &str = "counter_in_the_past";

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// No endpoint could be reached or all of them timed out.
    #[error("node unavailable: {0}")]
    NodeUnavailable(String),

    /// The fee could not be settled within bounds.
    #[error("fee estimation failed: {0}")]
    FeeEstimationFailed(String),

    /// The node refused the operation.
    #[error("node rejected operation: {reason}")]
    Rejected { reason: String },

    /// The injection request was sent but its outcome is unknown.
    #[error("broadcast outcome unknown: {0}")]
    AmbiguousBroadcast(String),

    /// The source account already has a manager key on chain.
    #[error("{0} is already revealed")]
    AlreadyRevealed(Address),

    /// Chain configuration mismatch.
    #[error("chain id mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: ChainId, actual: ChainId },

    /// The node answered with something that could not be understood.
    #[error("invalid node response: {0}")]
    InvalidResponse(String),

    /// The operation could not be encoded while settling the fee.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ChainError {
    /// Whether the node rejected the operation for a stale counter.
    pub fn is_stale_counter(&self) -> bool {
        matches!(self, Self::Rejected { reason } if reason.contains(COUNTER_IN_THE_PAST))
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// What the workflow needs from a node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chain identifier; fetched once and cached.
    async fn resolve_chain_id(&self) -> ChainResult<ChainId>;

    /// Fill in branch, protocol, counter and fee.
    async fn complete(
        &self,
        operation: RevealOperation,
        policy: &FeePolicy,
    ) -> ChainResult<UnsignedOperation>;

    /// Inject a signed operation, returning its hash.
    async fn broadcast(&self, operation: &SignedOperation) -> ChainResult<OperationHash>;
}

/// One entry of the error array the node returns on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeError {
    #[serde(default)]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Turn a node error body into a readable reason. Falls back to the raw
/// body when it is not the usual error array.
pub fn rejection_reason(body: &str) -> String {
    match serde_json::from_str::<Vec<NodeError>>(body) {
        Ok(errors) if !errors.is_empty() => errors
            .iter()
            .map(|e| match &e.msg {
                Some(msg) => format!("{} ({})", e.id, msg),
                None => e.id.clone(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}
