//! Operation kinds, their tags and minimum sizes per tags version.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::{CodecError, CodecResult, Cursor};
use crate::tezos::{ProtocolParams, TagsVersion};

/// Operation kinds known to the tag tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Endorsement,
    SeedNonceRevelation,
    DoubleEndorsementEvidence,
    DoubleBakingEvidence,
    ActivateAccount,
    Proposals,
    Ballot,
    Reveal,
    Transaction,
    Origination,
    Delegation,
}

impl OpKind {
    /// Every kind, in the order a multi-kind decoder probes them.
    pub const ALL: [OpKind; 11] = [
        Self::Reveal,
        Self::Transaction,
        Self::Origination,
        Self::Delegation,
        Self::Endorsement,
        Self::SeedNonceRevelation,
        Self::DoubleEndorsementEvidence,
        Self::DoubleBakingEvidence,
        Self::ActivateAccount,
        Self::Proposals,
        Self::Ballot,
    ];

    /// Tag byte for this kind under `version`.
    pub const fn tag(self, version: TagsVersion) -> u8 {
        match (self, version) {
            (Self::Endorsement, TagsVersion::V2) => 21,
            (Self::Endorsement, _) => 0,
            (Self::SeedNonceRevelation, _) => 1,
            (Self::DoubleEndorsementEvidence, _) => 2,
            (Self::DoubleBakingEvidence, _) => 3,
            (Self::ActivateAccount, _) => 4,
            (Self::Proposals, _) => 5,
            (Self::Ballot, _) => 6,
            (Self::Reveal, TagsVersion::V0) => 7,
            (Self::Transaction, TagsVersion::V0) => 8,
            (Self::Origination, TagsVersion::V0) => 9,
            (Self::Delegation, TagsVersion::V0) => 10,
            (Self::Reveal, _) => 107,
            (Self::Transaction, _) => 108,
            (Self::Origination, _) => 109,
            (Self::Delegation, _) => 110,
        }
    }

    /// Minimum encoded size including the tag, or 0 where none is defined.
    pub const fn min_size(self, version: TagsVersion) -> usize {
        match (self, version) {
            (_, TagsVersion::V0) => 0,
            // tag + source + 4 one-byte naturals + ed25519 key
            (Self::Reveal, TagsVersion::V1) => 59,
            // plus the proof presence byte
            (Self::Reveal, TagsVersion::V2) => 60,
            // tag + source + 4 naturals + amount + destination + parameters flag
            (Self::Transaction, _) => 50,
            // tag + source + 4 naturals + delegate flag
            (Self::Delegation, _) => 27,
            _ => 0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Endorsement => "endorsement",
            Self::SeedNonceRevelation => "seed_nonce_revelation",
            Self::DoubleEndorsementEvidence => "double_endorsement_evidence",
            Self::DoubleBakingEvidence => "double_baking_evidence",
            Self::ActivateAccount => "activate_account",
            Self::Proposals => "proposals",
            Self::Ballot => "ballot",
            Self::Reveal => "reveal",
            Self::Transaction => "transaction",
            Self::Origination => "origination",
            Self::Delegation => "delegation",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check that `cursor` starts with `kind` and holds at least its minimum size.
///
/// Returns a cursor positioned after the tag. On failure nothing is consumed:
/// the caller's cursor is a separate copy.
pub fn probe<'a>(
    kind: OpKind,
    cursor: Cursor<'a>,
    params: &ProtocolParams,
) -> CodecResult<Cursor<'a>> {
    let version = params.tags_version;
    let min_size = kind.min_size(version);

    let Some(found) = cursor.peek_u8() else {
        if min_size == 0 {
            return Err(CodecError::EndOfBuffer { kind });
        }
        return Err(CodecError::ShortBuffer {
            kind,
            needed: min_size,
            available: 0,
        });
    };

    let expected = kind.tag(version);
    if found != expected {
        return Err(CodecError::TagMismatch {
            kind,
            expected,
            found,
        });
    }

    let mut fields = cursor;
    fields.read_u8("tag")?;

    // undefined minimum sizes never fail
    let needed = min_size.saturating_sub(1);
    if fields.remaining() < needed {
        tracing::debug!(
            tag = found,
            op_type = %kind,
            expected = needed,
            got = fields.remaining(),
            "short buffer"
        );
        return Err(CodecError::ShortBuffer {
            kind,
            needed,
            available: fields.remaining(),
        });
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_tags_per_version() {
        assert_eq!(OpKind::Reveal.tag(TagsVersion::V0), 7);
        assert_eq!(OpKind::Reveal.tag(TagsVersion::V1), 107);
        assert_eq!(OpKind::Reveal.tag(TagsVersion::V2), 107);
    }

    #[test]
    fn test_tags_unique_within_version() {
        for version in [TagsVersion::V0, TagsVersion::V1, TagsVersion::V2] {
            let mut tags: Vec<u8> = OpKind::ALL.iter().map(|k| k.tag(version)).collect();
            tags.sort_unstable();
            tags.dedup();
            assert_eq!(tags.len(), OpKind::ALL.len(), "duplicate tag in {:?}", version);
        }
    }

    #[test]
    fn test_probe_match_advances_copy_only() {
        let mut data = vec![107u8];
        data.extend_from_slice(&[0u8; 59]);
        let cursor = Cursor::new(&data);
        let fields = probe(OpKind::Reveal, cursor, &ProtocolParams::default()).unwrap();
        assert_eq!(fields.position(), 1);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_probe_tag_mismatch() {
        let data = [108u8, 0, 0];
        let err = probe(OpKind::Reveal, Cursor::new(&data), &ProtocolParams::default())
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::TagMismatch {
                kind: OpKind::Reveal,
                expected: 107,
                found: 108
            }
        );
    }

    #[test]
    fn test_probe_short_buffer_only_when_defined() {
        let data = [107u8, 0, 0];
        let err = probe(
            OpKind::Reveal,
            Cursor::new(&data),
            &ProtocolParams::new(TagsVersion::V1),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CodecError::ShortBuffer {
                kind: OpKind::Reveal,
                needed: 58,
                available: 2
            }
        );

        let data = [7u8, 0, 0];
        assert!(probe(
            OpKind::Reveal,
            Cursor::new(&data),
            &ProtocolParams::new(TagsVersion::V0)
        )
        .is_ok());
    }

    #[test]
    fn test_probe_empty_buffer() {
        let err = probe(OpKind::Ballot, Cursor::new(&[]), &ProtocolParams::default()).unwrap_err();
        assert_eq!(err, CodecError::EndOfBuffer { kind: OpKind::Ballot });
        assert!(err.is_repairable());

        let v0 = ProtocolParams::new(TagsVersion::V0);
        let err = probe(OpKind::Reveal, Cursor::new(&[]), &v0).unwrap_err();
        assert_eq!(err, CodecError::EndOfBuffer { kind: OpKind::Reveal });
        assert!(err.is_repairable());

        let err = probe(OpKind::Reveal, Cursor::new(&[]), &ProtocolParams::default()).unwrap_err();
        assert_eq!(
            err,
            CodecError::ShortBuffer {
                kind: OpKind::Reveal,
                needed: 60,
                available: 0
            }
        );
    }
}
