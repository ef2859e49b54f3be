//! Reveal the public key of a KMS-held key on a Tezos chain.
//!
//! The private key never leaves the key management service: the reveal is
//! built and encoded here, its digest is signed remotely, and the signed
//! operation is injected through a node.

// Chain primitives and wire format
pub mod codec;
pub mod tezos;

// External collaborators
pub mod blockchain;
pub mod signer;

// Orchestration
pub mod reveal;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use blockchain::{ChainClient, ChainError, FeePolicy, RpcClient};
pub use codec::{CodecError, RevealOperation, SignedOperation, UnsignedOperation};
pub use config::RevealConfig;
pub use lifecycle::CancelToken;
pub use reveal::{RevealError, RevealStage, RevealWorkflow};
pub use signer::{KeyHandle, KmsSigner, RemoteSigner, SignerError};
