//! Public keys, signatures and the key types they belong to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::tezos::base58;
use crate::tezos::EncodingError;

/// Signature scheme of a key. The same tag byte is used for public keys,
/// public key hashes and signatures on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    Ed25519,
    Secp256k1,
    P256,
    Bls12_381,
}

impl KeyType {
    /// Wire tag.
    pub const fn tag(self) -> u8 {
        match self {
            Self::Ed25519 => 0,
            Self::Secp256k1 => 1,
            Self::P256 => 2,
            Self::Bls12_381 => 3,
        }
    }

    /// Resolve a wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, EncodingError> {
        match tag {
            0 => Ok(Self::Ed25519),
            1 => Ok(Self::Secp256k1),
            2 => Ok(Self::P256),
            3 => Ok(Self::Bls12_381),
            _ => Err(EncodingError::UnknownTag { kind: "key type", tag }),
        }
    }

    /// Length of the raw public key (compressed for ECDSA curves).
    pub const fn public_key_len(self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::Secp256k1 | Self::P256 => 33,
            Self::Bls12_381 => 48,
        }
    }

    /// Length of a raw signature.
    pub const fn signature_len(self) -> usize {
        match self {
            Self::Ed25519 | Self::Secp256k1 | Self::P256 => 64,
            Self::Bls12_381 => 96,
        }
    }

    pub(crate) const fn public_key_prefix(self) -> &'static [u8] {
        match self {
            Self::Ed25519 => base58::ED25519_PUBLIC_KEY,
            Self::Secp256k1 => base58::SECP256K1_PUBLIC_KEY,
            Self::P256 => base58::P256_PUBLIC_KEY,
            Self::Bls12_381 => base58::BLS12_381_PUBLIC_KEY,
        }
    }

    pub(crate) const fn public_key_hash_prefix(self) -> &'static [u8] {
        match self {
            Self::Ed25519 => base58::ED25519_PUBLIC_KEY_HASH,
            Self::Secp256k1 => base58::SECP256K1_PUBLIC_KEY_HASH,
            Self::P256 => base58::P256_PUBLIC_KEY_HASH,
            Self::Bls12_381 => base58::BLS12_381_PUBLIC_KEY_HASH,
        }
    }

    pub(crate) const fn signature_prefix(self) -> &'static [u8] {
        match self {
            Self::Ed25519 => base58::ED25519_SIGNATURE,
            Self::Secp256k1 => base58::SECP256K1_SIGNATURE,
            Self::P256 => base58::P256_SIGNATURE,
            Self::Bls12_381 => base58::BLS12_381_SIGNATURE,
        }
    }

    const ALL: [KeyType; 4] = [Self::Ed25519, Self::Secp256k1, Self::P256, Self::Bls12_381];
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ed25519 => "ed25519",
            Self::Secp256k1 => "secp256k1",
            Self::P256 => "p256",
            Self::Bls12_381 => "bls12_381",
        };
        f.write_str(name)
    }
}

/// A public key as revealed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey {
    key_type: KeyType,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Create a public key, checking the byte length against the key type.
    pub fn new(key_type: KeyType, bytes: impl Into<Vec<u8>>) -> Result<Self, EncodingError> {
        let bytes = bytes.into();
        if bytes.len() != key_type.public_key_len() {
            return Err(EncodingError::Length {
                kind: "public key",
                expected: key_type.public_key_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self { key_type, bytes })
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Raw key bytes without the type tag.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_b58check(&self) -> String {
        base58::encode(self.key_type.public_key_prefix(), &self.bytes)
    }
}

impl FromStr for PublicKey {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for key_type in KeyType::ALL {
            let prefix = key_type.public_key_prefix();
            if let Ok(bytes) =
                base58::decode(s, prefix, key_type.public_key_len(), "public key")
            {
                return Self::new(key_type, bytes);
            }
        }
        Err(EncodingError::Prefix { kind: "public key" })
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_b58check())
    }
}

impl TryFrom<String> for PublicKey {
    type Error = EncodingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_b58check()
    }
}

/// A raw signature tagged with the scheme that produced it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature {
    key_type: KeyType,
    bytes: Vec<u8>,
}

impl Signature {
    /// Create a signature, checking its length against the key type.
    pub fn new(key_type: KeyType, bytes: impl Into<Vec<u8>>) -> Result<Self, EncodingError> {
        let bytes = bytes.into();
        if bytes.len() != key_type.signature_len() {
            return Err(EncodingError::Length {
                kind: "signature",
                expected: key_type.signature_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self { key_type, bytes })
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_b58check(&self) -> String {
        base58::encode(self.key_type.signature_prefix(), &self.bytes)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("key_type", &self.key_type)
            .field("bytes", &hex::encode(&self.bytes))
            .finish()
    }
}

impl FromStr for Signature {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for key_type in KeyType::ALL {
            let prefix = key_type.signature_prefix();
            if let Ok(bytes) = base58::decode(s, prefix, key_type.signature_len(), "signature") {
                return Self::new(key_type, bytes);
            }
        }
        Err(EncodingError::Prefix { kind: "signature" })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_b58check())
    }
}

impl TryFrom<String> for Signature {
    type Error = EncodingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Signature> for String {
    fn from(signature: Signature) -> Self {
        signature.to_b58check()
    }
}
