//! The reveal operation: publishes the public key behind an implicit account.

use serde::{Deserialize, Serialize};

use crate::codec::manager::{read_public_key, write_public_key, ManagerFields};
use crate::codec::{CodecError, CodecResult, Cursor, OpKind, Operation};
use crate::tezos::{Address, KeyType, ProtocolParams, PublicKey, TagsVersion};

/// Byte written after the key from Oxford on: no proof of possession follows.
const NO_PROOF: u8 = 0x00;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "reveal")]
pub struct RevealOperation {
    #[serde(flatten)]
    pub manager: ManagerFields,
    pub public_key: PublicKey,
}

impl RevealOperation {
    /// Reveal `public_key` from the address it hashes to.
    pub fn new(public_key: PublicKey, fee: u64, gas_limit: u64, storage_limit: u64) -> Self {
        Self {
            manager: ManagerFields {
                source: Address::from_public_key(&public_key),
                fee,
                counter: 0,
                gas_limit,
                storage_limit,
            },
            public_key,
        }
    }

    pub fn source(&self) -> &Address {
        &self.manager.source
    }

    /// Check that `source` is the address `public_key` hashes to.
    ///
    /// The encoder writes whatever it is given; a mismatched pair would only
    /// be refused by the node.
    pub fn validate(&self) -> CodecResult<()> {
        if Address::from_public_key(&self.public_key) != self.manager.source {
            return Err(CodecError::Encode {
                field: "source",
                reason: format!(
                    "{} is not the address of {}",
                    self.manager.source, self.public_key
                ),
            });
        }
        Ok(())
    }

    /// Encoded length including the tag, without allocating.
    pub fn encoded_len(&self, params: &ProtocolParams) -> usize {
        let terminator = usize::from(params.tags_version >= TagsVersion::V2);
        1 + self.manager.encoded_len() + 1 + self.public_key.as_bytes().len() + terminator
    }
}

impl Operation for RevealOperation {
    const KIND: OpKind = OpKind::Reveal;

    fn encode_fields(&self, out: &mut Vec<u8>, params: &ProtocolParams) -> CodecResult<()> {
        let key_type = self.public_key.key_type();
        if key_type == KeyType::Bls12_381 && params.tags_version == TagsVersion::V0 {
            return Err(CodecError::Encode {
                field: "public_key",
                reason: format!("{} keys cannot be revealed with {:?} tags", key_type, params.tags_version),
            });
        }
        self.manager.encode(out);
        write_public_key(out, &self.public_key);
        if params.tags_version >= TagsVersion::V2 {
            out.push(NO_PROOF);
        }
        Ok(())
    }

    fn decode_fields(cursor: &mut Cursor<'_>, params: &ProtocolParams) -> CodecResult<Self> {
        let manager = ManagerFields::decode(cursor)?;
        let public_key = read_public_key(cursor)?;
        if params.tags_version >= TagsVersion::V2 {
            let flag = cursor.read_u8("proof")?;
            if flag != NO_PROOF {
                return Err(CodecError::malformed(
                    "proof",
                    format!("unsupported proof presence byte {:#04x}", flag),
                ));
            }
        }
        Ok(Self {
            manager,
            public_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_EDPK: &str = "edpkvRQaXJ26ZAFi2ZNq5Hb5wXcc3S1Q8kVaXNjxXDfmtWEp9DkpFZ";
    const REVEAL_V1_HEX: &str = "6b003923a4e9144201ffcc3d4ac891d14a14df438c52f60207b4010000\
                                 ea4a6c63e29c520abef5507b132ec5f9954776aebebe7b92421eea691446d22c";

    fn test_reveal() -> RevealOperation {
        let mut op = RevealOperation::new(TEST_EDPK.parse().unwrap(), 374, 180, 0);
        op.manager.counter = 7;
        op
    }

    fn all_versions() -> [ProtocolParams; 3] {
        [
            ProtocolParams::new(TagsVersion::V0),
            ProtocolParams::new(TagsVersion::V1),
            ProtocolParams::new(TagsVersion::V2),
        ]
    }

    #[test]
    fn test_encode_known_bytes() {
        let op = test_reveal();
        let v1 = op.to_bytes(&ProtocolParams::new(TagsVersion::V1)).unwrap();
        assert_eq!(hex::encode(&v1), REVEAL_V1_HEX);

        let v2 = op.to_bytes(&ProtocolParams::new(TagsVersion::V2)).unwrap();
        assert_eq!(hex::encode(&v2), format!("{}00", REVEAL_V1_HEX));

        let v0 = op.to_bytes(&ProtocolParams::new(TagsVersion::V0)).unwrap();
        assert_eq!(v0[0], 7);
        assert_eq!(&v0[1..], &v1[1..]);
    }

    #[test]
    fn test_roundtrip_every_version() {
        let op = test_reveal();
        for params in all_versions() {
            let bytes = op.to_bytes(&params).unwrap();
            assert_eq!(op.encoded_len(&params), bytes.len());

            let mut cursor = Cursor::new(&bytes);
            let decoded = RevealOperation::decode(&mut cursor, &params).unwrap();
            assert_eq!(decoded, op);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn test_decode_wrong_tag_keeps_cursor() {
        let op = test_reveal();
        let mut bytes = op.to_bytes(&ProtocolParams::default()).unwrap();
        bytes[0] = 110;
        let snapshot = bytes.clone();

        let mut cursor = Cursor::new(&bytes);
        let err = RevealOperation::decode(&mut cursor, &ProtocolParams::default()).unwrap_err();
        assert!(matches!(err, CodecError::TagMismatch { found: 110, .. }));
        assert_eq!(cursor.position(), 0);
        assert_eq!(bytes, snapshot);
    }

    #[test]
    fn test_decode_short_buffer_keeps_cursor() {
        let op = test_reveal();
        let bytes = op.to_bytes(&ProtocolParams::default()).unwrap();
        let truncated = &bytes[..40];

        let mut cursor = Cursor::new(truncated);
        let err = RevealOperation::decode(&mut cursor, &ProtocolParams::default()).unwrap_err();
        assert_eq!(
            err,
            CodecError::ShortBuffer {
                kind: OpKind::Reveal,
                needed: 59,
                available: 39
            }
        );
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_decode_truncated_v0_is_field_error() {
        let op = test_reveal();
        let params = ProtocolParams::new(TagsVersion::V0);
        let bytes = op.to_bytes(&params).unwrap();

        let err = RevealOperation::decode(&mut Cursor::new(&bytes[..40]), &params).unwrap_err();
        assert!(matches!(err, CodecError::MalformedField { .. }));
        assert!(!err.is_repairable());
    }

    #[test]
    fn test_decode_rejects_proof() {
        let op = test_reveal();
        let mut bytes = op.to_bytes(&ProtocolParams::default()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 0xff;
        let err = RevealOperation::decode(&mut Cursor::new(&bytes), &ProtocolParams::default())
            .unwrap_err();
        assert!(matches!(err, CodecError::MalformedField { field: "proof", .. }));
    }

    #[test]
    fn test_validate_rejects_foreign_source() {
        let mut op = test_reveal();
        assert!(op.validate().is_ok());

        op.manager.source = "tz1Ke2h7sDdakHJQh8WX4Z372du1KChsksyU".parse().unwrap();
        let err = op.validate().unwrap_err();
        assert!(matches!(err, CodecError::Encode { field: "source", .. }));

        // still encodable; the pair is only checked on request
        let bytes = op.to_bytes(&ProtocolParams::default()).unwrap();
        let decoded = RevealOperation::decode(&mut Cursor::new(&bytes), &ProtocolParams::default())
            .unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn test_json_shape() {
        let op = test_reveal();
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["kind"], "reveal");
        assert_eq!(json["counter"], 7);
        assert_eq!(json["source"], "tz1Qr9uevaimfiPS6X1otehsKrwvZjX7bsyL");
        assert_eq!(json["public_key"], TEST_EDPK);
    }
}
