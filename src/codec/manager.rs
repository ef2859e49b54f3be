//! Fields shared by every manager operation, and the field encoders for
//! addresses and public keys.

use serde::{Deserialize, Serialize};

use crate::codec::zarith::{nat_len, read_nat, write_nat};
use crate::codec::{CodecError, CodecResult, Cursor};
use crate::tezos::address::ADDRESS_HASH_LEN;
use crate::tezos::{Address, KeyType, PublicKey};

/// Source, fee, counter and limits, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerFields {
    pub source: Address,
    pub fee: u64,
    pub counter: u64,
    pub gas_limit: u64,
    pub storage_limit: u64,
}

impl ManagerFields {
    pub fn encode(&self, out: &mut Vec<u8>) {
        write_address(out, &self.source);
        write_nat(out, self.fee);
        write_nat(out, self.counter);
        write_nat(out, self.gas_limit);
        write_nat(out, self.storage_limit);
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> CodecResult<Self> {
        Ok(Self {
            source: read_address(cursor)?,
            fee: read_nat(cursor, "fee")?,
            counter: read_nat(cursor, "counter")?,
            gas_limit: read_nat(cursor, "gas_limit")?,
            storage_limit: read_nat(cursor, "storage_limit")?,
        })
    }

    /// Encoded length, without allocating.
    pub fn encoded_len(&self) -> usize {
        1 + ADDRESS_HASH_LEN
            + nat_len(self.fee)
            + nat_len(self.counter)
            + nat_len(self.gas_limit)
            + nat_len(self.storage_limit)
    }
}

pub fn write_address(out: &mut Vec<u8>, address: &Address) {
    out.push(address.key_type().tag());
    out.extend_from_slice(address.hash());
}

pub fn read_address(cursor: &mut Cursor<'_>) -> CodecResult<Address> {
    let tag = cursor.read_u8("source")?;
    let key_type = KeyType::from_tag(tag).map_err(|e| CodecError::malformed("source", e.to_string()))?;
    let bytes = cursor.read_bytes(ADDRESS_HASH_LEN, "source")?;
    let mut hash = [0u8; ADDRESS_HASH_LEN];
    hash.copy_from_slice(bytes);
    Ok(Address::new(key_type, hash))
}

pub fn write_public_key(out: &mut Vec<u8>, key: &PublicKey) {
    out.push(key.key_type().tag());
    out.extend_from_slice(key.as_bytes());
}

pub fn read_public_key(cursor: &mut Cursor<'_>) -> CodecResult<PublicKey> {
    let tag = cursor.read_u8("public_key")?;
    let key_type =
        KeyType::from_tag(tag).map_err(|e| CodecError::malformed("public_key", e.to_string()))?;
    let bytes = cursor.read_bytes(key_type.public_key_len(), "public_key")?;
    PublicKey::new(key_type, bytes).map_err(|e| CodecError::malformed("public_key", e.to_string()))
}
