//! Blake2b digests and the hash-like identifiers built from them.

use blake2::digest::consts::{U20, U32};
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::tezos::base58;
use crate::tezos::EncodingError;

/// Watermark prefixed to manager operations before hashing for signature.
pub const GENERIC_OPERATION_WATERMARK: u8 = 0x03;

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let digest = Blake2b::<U32>::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

pub fn blake2b_160(data: &[u8]) -> [u8; 20] {
    let digest = Blake2b::<U20>::digest(data);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    out
}

/// Digest that gets signed: Blake2b-256 over `0x03 ‖ unsigned bytes`.
pub fn operation_digest(unsigned: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update([GENERIC_OPERATION_WATERMARK]);
    hasher.update(unsigned);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Network identifier (`Net...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId(pub [u8; 4]);

/// Block hash (`B...`), used as the operation branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockHash(pub [u8; 32]);

/// Operation hash (`o...`) as returned by injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationHash(pub [u8; 32]);

impl OperationHash {
    /// Hash of a fully signed operation.
    pub fn of_signed_bytes(signed: &[u8]) -> Self {
        Self(blake2b_256(signed))
    }
}

// All three identifiers share the same shape: fixed bytes behind a prefix.
macro_rules! b58_identifier {
    ($ty:ident, $len:expr, $prefix:expr, $kind:expr) => {
        impl $ty {
            pub fn to_b58check(&self) -> String {
                base58::encode($prefix, &self.0)
            }
        }

        impl FromStr for $ty {
            type Err = EncodingError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let payload = base58::decode(s, $prefix, $len, $kind)?;
                let mut bytes = [0u8; $len];
                bytes.copy_from_slice(&payload);
                Ok(Self(bytes))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_b58check())
            }
        }

        impl TryFrom<String> for $ty {
            type Error = EncodingError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.to_b58check()
            }
        }
    };
}

b58_identifier!(ChainId, 4, base58::CHAIN_ID, "chain id");
b58_identifier!(BlockHash, 32, base58::BLOCK_HASH, "block hash");
b58_identifier!(OperationHash, 32, base58::OPERATION_HASH, "operation hash");
