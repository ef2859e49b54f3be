//! Chain node integration subsystem.
//!
//! # Data Flow
//! ```text
//! RevealOperation (built with fee/limit hints)
//!     → client.rs (chain id, branch, protocol, counter from the node)
//!     → fees.rs (fee fixed point over the encoded size)
//!     → UnsignedOperation (ready to digest and sign)
//!
//! SignedOperation
//!     → client.rs (inject, classify failure as rejection or ambiguity)
//!     → OperationHash
//! ```
//!
//! # Security Constraints
//! - Never log signatures or tokens
//! - All RPC calls have configurable timeouts
//! - Injection never fails over once a request may have reached a node

pub mod client;
pub mod fees;
pub mod types;

pub use client::RpcClient;
pub use fees::{FeeParams, FeePolicy, NanotezRate};
pub use types::{ChainClient, ChainError, ChainResult};
