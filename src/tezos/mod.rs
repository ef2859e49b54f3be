//! Tezos chain primitives.
//!
//! # Data Flow
//! ```text
//! KMS public key (SPKI)
//!     → keys.rs (PublicKey, KeyType, Signature)
//!     → address.rs (Blake2b-160 → tz1/tz2/tz3/tz4)
//!     → hash.rs (digests, chain id, block and operation hashes)
//!     → protocol.rs (which operation tags a protocol expects)
//! ```
//!
//! # Design Decisions
//! - Every human-readable value is base58check with a fixed prefix
//! - Types validate their length on construction, never on use
//! - Serde goes through the base58 form so config and JSON output agree

pub mod address;
pub mod base58;
pub mod hash;
pub mod keys;
pub mod protocol;

use thiserror::Error;

pub use address::Address;
pub use hash::{BlockHash, ChainId, OperationHash};
pub use keys::{KeyType, PublicKey, Signature};
pub use protocol::{ProtocolParams, TagsVersion};

/// Errors raised while parsing or constructing chain primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// The string is not valid base58 or its checksum does not match.
    #[error("invalid base58check string: {0}")]
    Base58(String),

    /// The decoded payload does not start with the expected prefix.
    #[error("unexpected prefix for {kind}")]
    Prefix { kind: &'static str },

    /// The payload has the wrong number of bytes.
    #[error("invalid length for {kind}: expected {expected}, got {actual}")]
    Length {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A type tag byte is not one the chain defines.
    #[error("unknown {kind} tag {tag}")]
    UnknownTag { kind: &'static str, tag: u8 },
}
