//! Base58check with Tezos prefixes.

use crate::tezos::EncodingError;

pub const ED25519_PUBLIC_KEY_HASH: &[u8] = &[6, 161, 159];
pub const SECP256K1_PUBLIC_KEY_HASH: &[u8] = &[6, 161, 161];
pub const P256_PUBLIC_KEY_HASH: &[u8] = &[6, 161, 164];
pub const BLS12_381_PUBLIC_KEY_HASH: &[u8] = &[6, 161, 166];

pub const ED25519_PUBLIC_KEY: &[u8] = &[13, 15, 37, 217];
pub const SECP256K1_PUBLIC_KEY: &[u8] = &[3, 254, 226, 86];
pub const P256_PUBLIC_KEY: &[u8] = &[3, 178, 139, 127];
pub const BLS12_381_PUBLIC_KEY: &[u8] = &[6, 149, 135, 204];

pub const ED25519_SIGNATURE: &[u8] = &[9, 245, 205, 134, 18];
pub const SECP256K1_SIGNATURE: &[u8] = &[13, 115, 101, 19, 63];
pub const P256_SIGNATURE: &[u8] = &[54, 240, 44, 52];
pub const BLS12_381_SIGNATURE: &[u8] = &[40, 171, 64, 207];

pub const CHAIN_ID: &[u8] = &[87, 82, 0];
pub const BLOCK_HASH: &[u8] = &[1, 52];
pub const OPERATION_HASH: &[u8] = &[5, 116];

/// Encode `payload` behind `prefix` with a double-SHA256 checksum.
pub fn encode(prefix: &[u8], payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(prefix.len() + payload.len());
    data.extend_from_slice(prefix);
    data.extend_from_slice(payload);
    bs58::encode(data).with_check().into_string()
}

/// Decode a base58check string, strip `prefix` and check the payload length.
pub fn decode(
    value: &str,
    prefix: &[u8],
    expected_len: usize,
    kind: &'static str,
) -> Result<Vec<u8>, EncodingError> {
    let data = bs58::decode(value)
        .with_check(None)
        .into_vec()
        .map_err(|e| EncodingError::Base58(e.to_string()))?;

    let payload = data
        .strip_prefix(prefix)
        .ok_or(EncodingError::Prefix { kind })?;

    if payload.len() != expected_len {
        return Err(EncodingError::Length {
            kind,
            expected: expected_len,
            actual: payload.len(),
        });
    }

    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_burn_address() {
        assert_eq!(
            encode(ED25519_PUBLIC_KEY_HASH, &[0u8; 20]),
            "tz1Ke2h7sDdakHJQh8WX4Z372du1KChsksyU"
        );
    }

    #[test]
    fn test_decode_strips_prefix() {
        let payload = decode(
            "tz1Ke2h7sDdakHJQh8WX4Z372du1KChsksyU",
            ED25519_PUBLIC_KEY_HASH,
            20,
            "address",
        )
        .unwrap();
        assert_eq!(payload, vec![0u8; 20]);
    }

    #[test]
    fn test_decode_rejects_wrong_prefix() {
        let err = decode(
            "tz1Ke2h7sDdakHJQh8WX4Z372du1KChsksyU",
            OPERATION_HASH,
            20,
            "operation hash",
        )
        .unwrap_err();
        assert_eq!(err, EncodingError::Prefix { kind: "operation hash" });
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let err = decode(
            "tz1Ke2h7sDdakHJQh8WX4Z372du1KChsksyV",
            ED25519_PUBLIC_KEY_HASH,
            20,
            "address",
        )
        .unwrap_err();
        assert!(matches!(err, EncodingError::Base58(_)));
    }
}
