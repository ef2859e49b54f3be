//! Implicit account addresses (tz1, tz2, tz3, tz4).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::tezos::base58;
use crate::tezos::hash::blake2b_160;
use crate::tezos::keys::{KeyType, PublicKey};
use crate::tezos::EncodingError;

/// Length of a public key hash.
pub const ADDRESS_HASH_LEN: usize = 20;

/// An implicit account: the Blake2b-160 hash of a public key plus its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    key_type: KeyType,
    hash: [u8; ADDRESS_HASH_LEN],
}

impl Address {
    pub fn new(key_type: KeyType, hash: [u8; ADDRESS_HASH_LEN]) -> Self {
        Self { key_type, hash }
    }

    /// Derive the address owning `key`.
    pub fn from_public_key(key: &PublicKey) -> Self {
        Self {
            key_type: key.key_type(),
            hash: blake2b_160(key.as_bytes()),
        }
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn hash(&self) -> &[u8; ADDRESS_HASH_LEN] {
        &self.hash
    }

    pub fn to_b58check(&self) -> String {
        base58::encode(self.key_type.public_key_hash_prefix(), &self.hash)
    }
}

impl FromStr for Address {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key_type = match s.get(..3) {
            Some("tz1") => KeyType::Ed25519,
            Some("tz2") => KeyType::Secp256k1,
            Some("tz3") => KeyType::P256,
            Some("tz4") => KeyType::Bls12_381,
            _ => return Err(EncodingError::Prefix { kind: "address" }),
        };
        let payload = base58::decode(
            s,
            key_type.public_key_hash_prefix(),
            ADDRESS_HASH_LEN,
            "address",
        )?;
        let mut hash = [0u8; ADDRESS_HASH_LEN];
        hash.copy_from_slice(&payload);
        Ok(Self { key_type, hash })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_b58check())
    }
}

impl TryFrom<String> for Address {
    type Error = EncodingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_b58check()
    }
}
