//! Binary operation codec.
//!
//! # Data Flow
//! ```text
//! encode:  RevealOperation → tag ‖ manager fields ‖ public key [‖ 0x00]
//! decode:  Cursor → probe (tag, minimum size) → decode_fields → RevealOperation
//! group:   branch ‖ contents            → digest (0x03 watermark) → signature
//!          branch ‖ contents ‖ signature → operation hash
//! ```
//!
//! # Design Decisions
//! - Tag and minimum size are pure functions of (kind, tags version)
//! - Structural failures (tag, size) never move the caller's cursor, so a
//!   multi-kind decoder can try kinds in order on the same position
//! - Field failures are fatal; the cursor position afterwards is unspecified
//! - The cursor is a `Copy` value instead of an implicit stream position

pub mod cursor;
pub mod group;
pub mod kind;
pub mod manager;
pub mod reveal;
pub mod zarith;

use thiserror::Error;

use crate::tezos::ProtocolParams;

pub use cursor::Cursor;
pub use group::{decode_contents, Contents, SignedOperation, UnsignedOperation};
pub use kind::{probe, OpKind};
pub use manager::ManagerFields;
pub use reveal::RevealOperation;

/// Codec failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The next byte is not this kind's tag. Cursor unchanged.
    #[error("invalid tag {found} for op type {kind} (expected {expected})")]
    TagMismatch { kind: OpKind, expected: u8, found: u8 },

    /// Fewer bytes than the kind's minimum size. Cursor unchanged.
    #[error("short buffer for op type {kind}: need {needed} bytes, have {available}")]
    ShortBuffer {
        kind: OpKind,
        needed: usize,
        available: usize,
    },

    /// Nothing left to read where a tag was expected, for a kind without a
    /// minimum size. Cursor unchanged.
    #[error("end of buffer before op type {kind}")]
    EndOfBuffer { kind: OpKind },

    /// A field could not be decoded. Not repairable.
    #[error("malformed {field}: {reason}")]
    MalformedField { field: &'static str, reason: String },

    /// A field value cannot be represented on the wire.
    #[error("cannot encode {field}: {reason}")]
    Encode { field: &'static str, reason: String },

    /// The tag names a kind this crate recognises but cannot decode.
    #[error("operation kind {0} is not supported")]
    UnsupportedKind(OpKind),

    /// No known kind uses this tag for the active version.
    #[error("unknown operation tag {0}")]
    UnknownTag(u8),
}

impl CodecError {
    /// True for the structural mismatches that leave the cursor untouched.
    pub fn is_repairable(&self) -> bool {
        matches!(
            self,
            Self::TagMismatch { .. } | Self::ShortBuffer { .. } | Self::EndOfBuffer { .. }
        )
    }

    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedField {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// A typed operation payload with a fixed kind.
pub trait Operation: Sized {
    /// The kind every value of this type encodes as.
    const KIND: OpKind;

    /// Write everything after the tag byte.
    fn encode_fields(&self, out: &mut Vec<u8>, params: &ProtocolParams) -> CodecResult<()>;

    /// Read everything after the tag byte.
    fn decode_fields(cursor: &mut Cursor<'_>, params: &ProtocolParams) -> CodecResult<Self>;

    /// Append the tagged encoding to `out`.
    fn encode(&self, out: &mut Vec<u8>, params: &ProtocolParams) -> CodecResult<()> {
        out.push(Self::KIND.tag(params.tags_version));
        self.encode_fields(out, params)
    }

    /// Decode a tagged payload, advancing `cursor` only on success.
    fn decode(cursor: &mut Cursor<'_>, params: &ProtocolParams) -> CodecResult<Self> {
        let mut fields = probe(Self::KIND, *cursor, params)?;
        let operation = Self::decode_fields(&mut fields, params)?;
        *cursor = fields;
        Ok(operation)
    }

    fn to_bytes(&self, params: &ProtocolParams) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out, params)?;
        Ok(out)
    }
}
