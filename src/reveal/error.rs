//! Workflow error taxonomy.
//!
//! Every adapter failure is classified by what a caller may safely do next:
//!
//! | variant              | retry                                        |
//! |----------------------|----------------------------------------------|
//! | `Transport`          | safe, from the start                         |
//! | `Validation`         | never                                        |
//! | `NodeRejection`      | only for a stale counter                     |
//! | `AmbiguousBroadcast` | never blindly; query the chain for the hash  |
//! | `Cancelled`          | caller decides                               |

use thiserror::Error;

use crate::blockchain::ChainError;
use crate::codec::{CodecError, SignedOperation};
use crate::reveal::state::RevealStage;
use crate::signer::SignerError;
use crate::tezos::OperationHash;

/// The adapter failure behind a transport or validation error.
#[derive(Debug, Error)]
pub enum Cause {
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Debug, Error)]
pub enum RevealError {
    /// Signer or node unreachable or too slow.
    #[error("transport failure at {stage}: {source}")]
    Transport { stage: RevealStage, source: Cause },

    /// The operation, key, signature or chain state is unusable.
    #[error("validation failure at {stage}: {source}")]
    Validation { stage: RevealStage, source: Cause },

    #[error("node rejected operation: {reason}")]
    NodeRejection { reason: String },

    /// The injection may have been accepted; `operation_hash` is the locally
    /// computed hash to look for on chain.
    #[error("broadcast of {operation_hash} has an unknown outcome: {source}")]
    AmbiguousBroadcast {
        operation_hash: OperationHash,
        source: ChainError,
    },

    /// Stopped on request. `signed` holds the operation when the run got as
    /// far as signing it.
    #[error("cancelled at {stage}")]
    Cancelled {
        stage: RevealStage,
        signed: Option<Box<SignedOperation>>,
    },
}

impl RevealError {
    pub(crate) fn from_signer(stage: RevealStage, err: SignerError) -> Self {
        if err.is_transport() {
            Self::Transport {
                stage,
                source: err.into(),
            }
        } else {
            Self::Validation {
                stage,
                source: err.into(),
            }
        }
    }

    pub(crate) fn from_chain(stage: RevealStage, err: ChainError) -> Self {
        match err {
            ChainError::Rejected { reason } => Self::NodeRejection { reason },
            ChainError::NodeUnavailable(_) | ChainError::InvalidResponse(_) => Self::Transport {
                stage,
                source: err.into(),
            },
            other => Self::Validation {
                stage,
                source: other.into(),
            },
        }
    }

    pub(crate) fn from_codec(stage: RevealStage, err: CodecError) -> Self {
        Self::Validation {
            stage,
            source: err.into(),
        }
    }

    /// Whether re-running the workflow cannot double-apply the reveal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::NodeRejection { .. } => self.is_stale_counter(),
            Self::Validation { .. } | Self::AmbiguousBroadcast { .. } | Self::Cancelled { .. } => {
                false
            }
        }
    }

    /// Whether the node refused the operation because its counter was used.
    pub fn is_stale_counter(&self) -> bool {
        match self {
            Self::NodeRejection { reason } => ChainError::Rejected {
                reason: reason.clone(),
            }
            .is_stale_counter(),
            _ => false,
        }
    }

    /// State the run was in when it stopped.
    pub fn stage(&self) -> RevealStage {
        match self {
            Self::Transport { stage, .. }
            | Self::Validation { stage, .. }
            | Self::Cancelled { stage, .. } => *stage,
            Self::NodeRejection { .. } | Self::AmbiguousBroadcast { .. } => RevealStage::Broadcast,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Validation { .. } => "validation",
            Self::NodeRejection { .. } => "rejected",
            Self::AmbiguousBroadcast { .. } => "ambiguous",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// The signed operation a cancelled run left behind, if any.
    pub fn into_signed(self) -> Option<SignedOperation> {
        match self {
            Self::Cancelled { signed, .. } => signed.map(|op| *op),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::KeyHandle;

    #[test]
    fn test_signer_classification() {
        let err = RevealError::from_signer(
            RevealStage::Init,
            SignerError::Unavailable("connection refused".into()),
        );
        assert!(matches!(err, RevealError::Transport { .. }));
        assert!(err.is_retryable());
        assert_eq!(err.stage(), RevealStage::Init);

        let err = RevealError::from_signer(
            RevealStage::Init,
            SignerError::KeyNotFound(KeyHandle::new("k")),
        );
        assert!(matches!(err, RevealError::Validation { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_chain_classification() {
        let err = RevealError::from_chain(
            RevealStage::Built,
            ChainError::NodeUnavailable("timeout".into()),
        );
        assert!(err.is_retryable());

        let err = RevealError::from_chain(
            RevealStage::Built,
            ChainError::FeeEstimationFailed("cap".into()),
        );
        assert_eq!(err.kind(), "validation");
        assert!(!err.is_retryable());

        let err = RevealError::from_chain(
            RevealStage::Broadcast,
            ChainError::Rejected {
                reason: "proto.018-Proxford.contract.counter_in_the_past".into(),
            },
        );
        assert!(err.is_stale_counter());
        assert!(err.is_retryable());
        assert_eq!(err.stage(), RevealStage::Broadcast);

        let err = RevealError::from_chain(
            RevealStage::Broadcast,
            ChainError::Rejected {
                reason: "proto.018-Proxford.implicit.empty_implicit_contract".into(),
            },
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_ambiguous_never_retryable() {
        let err = RevealError::AmbiguousBroadcast {
            operation_hash: OperationHash([0u8; 32]),
            source: ChainError::AmbiguousBroadcast("reset by peer".into()),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "ambiguous");
    }
}
