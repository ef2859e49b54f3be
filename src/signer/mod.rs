//! Remote signing subsystem.
//!
//! # Responsibilities
//! - Fetch the public key behind an opaque key handle
//! - Produce raw signatures over 32-byte operation digests
//! - Keep private key material out of this process entirely
//!
//! # Data Flow
//! ```text
//! KeyHandle
//!     → kms.rs (REST calls to the key management service)
//!     → spki.rs (PEM/DER → wire-format public key and signature)
//!     → verify.rs (optional local check of returned signatures)
//! ```
//!
//! # Design Decisions
//! - The workflow only sees the [`RemoteSigner`] trait; tests plug in fakes
//! - Transport failures and rejections are distinct variants so callers can
//!   tell a retryable outage from a permanent refusal

pub mod kms;
pub mod spki;
pub mod verify;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::tezos::{EncodingError, PublicKey};

pub use kms::KmsSigner;

/// Opaque reference to a key held by the signing service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyHandle(String);

impl KeyHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised by a remote signer.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The service could not be reached or did not answer in time.
    #[error("signer unavailable: {0}")]
    Unavailable(String),

    #[error("key not found: {0}")]
    KeyNotFound(KeyHandle),

    /// The service answered but refused to sign.
    #[error("signing rejected: {0}")]
    SignRejected(String),

    /// The returned public key could not be parsed or is unsupported.
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// The returned signature is malformed or does not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

impl SignerError {
    /// Whether the failure came from the transport rather than the content.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<EncodingError> for SignerError {
    fn from(err: EncodingError) -> Self {
        Self::InvalidKey(err.to_string())
    }
}

pub type SignerResult<T> = Result<T, SignerError>;

/// A service holding private keys that signs on request.
#[async_trait]
pub trait RemoteSigner: Send + Sync {
    /// Public key of the key behind `handle`, in wire form.
    async fn get_public_key(&self, handle: &KeyHandle) -> SignerResult<PublicKey>;

    /// Raw signature over `digest`, in the wire layout of the key's scheme.
    async fn sign(&self, handle: &KeyHandle, digest: &[u8; 32]) -> SignerResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_handle_serde_is_transparent() {
        let handle = KeyHandle::new("projects/p/locations/global/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1");
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{}\"", handle.as_str()));
    }

    #[test]
    fn test_only_unavailable_is_transport() {
        assert!(SignerError::Unavailable("down".into()).is_transport());
        assert!(!SignerError::SignRejected("no".into()).is_transport());
        assert!(!SignerError::KeyNotFound(KeyHandle::new("k")).is_transport());
    }
}
