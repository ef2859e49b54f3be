//! Unsigned and signed operations: a branch, one content, and a signature.

use serde::{Deserialize, Serialize};

use crate::codec::{probe, CodecError, CodecResult, Cursor, OpKind, Operation, RevealOperation};
use crate::tezos::hash::operation_digest;
use crate::tezos::{BlockHash, OperationHash, ProtocolParams, Signature};

const BRANCH_LEN: usize = 32;

/// Decoded operation content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum Contents {
    Reveal(RevealOperation),
}

/// Decode one content by probing every known kind in turn.
///
/// Tag mismatches move on to the next kind without touching `cursor`. A
/// matching kind that this crate cannot decode is reported as unsupported.
pub fn decode_contents(cursor: &mut Cursor<'_>, params: &ProtocolParams) -> CodecResult<Contents> {
    for kind in OpKind::ALL {
        match probe(kind, *cursor, params) {
            Ok(_) => {
                return match kind {
                    OpKind::Reveal => RevealOperation::decode(cursor, params).map(Contents::Reveal),
                    other => Err(CodecError::UnsupportedKind(other)),
                };
            }
            Err(CodecError::TagMismatch { .. }) => continue,
            Err(e) => return Err(e),
        }
    }

    match cursor.peek_u8() {
        Some(tag) => Err(CodecError::UnknownTag(tag)),
        None => Err(CodecError::malformed("contents", "empty buffer")),
    }
}

/// A completed reveal waiting for its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedOperation {
    pub branch: BlockHash,
    pub contents: RevealOperation,
    /// Protocol the encoding targets; set during completion.
    pub protocol: ProtocolParams,
}

impl UnsignedOperation {
    pub fn new(branch: BlockHash, contents: RevealOperation, protocol: ProtocolParams) -> Self {
        Self {
            branch,
            contents,
            protocol,
        }
    }

    /// `branch ‖ contents`.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut out = Vec::with_capacity(BRANCH_LEN + self.contents.encoded_len(&self.protocol));
        out.extend_from_slice(&self.branch.0);
        self.contents.encode(&mut out, &self.protocol)?;
        Ok(out)
    }

    pub fn decode(bytes: &[u8], protocol: ProtocolParams) -> CodecResult<Self> {
        let mut cursor = Cursor::new(bytes);
        let operation = Self::decode_prefix(&mut cursor, protocol)?;
        if !cursor.is_empty() {
            return Err(CodecError::malformed(
                "operation",
                format!("{} trailing bytes", cursor.remaining()),
            ));
        }
        Ok(operation)
    }

    fn decode_prefix(cursor: &mut Cursor<'_>, protocol: ProtocolParams) -> CodecResult<Self> {
        let mut branch = [0u8; BRANCH_LEN];
        branch.copy_from_slice(cursor.read_bytes(BRANCH_LEN, "branch")?);
        let Contents::Reveal(contents) = decode_contents(cursor, &protocol)?;
        Ok(Self::new(BlockHash(branch), contents, protocol))
    }

    /// The digest a signer must sign.
    pub fn digest(&self) -> CodecResult<[u8; 32]> {
        Ok(operation_digest(&self.encode()?))
    }

    /// Size of the operation once signed, which is what the fee pays for.
    pub fn signed_len(&self) -> usize {
        BRANCH_LEN
            + self.contents.encoded_len(&self.protocol)
            + self.contents.public_key.key_type().signature_len()
    }

    /// Attach `signature`, which must come from the revealed key's scheme.
    pub fn attach_signature(self, signature: Signature) -> CodecResult<SignedOperation> {
        let key_type = self.contents.public_key.key_type();
        if signature.key_type() != key_type {
            return Err(CodecError::Encode {
                field: "signature",
                reason: format!(
                    "{} signature for a {} key",
                    signature.key_type(),
                    key_type
                ),
            });
        }
        let digest = self.digest()?;
        Ok(SignedOperation {
            operation: self,
            digest,
            signature,
        })
    }
}

/// An operation ready for injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedOperation {
    operation: UnsignedOperation,
    digest: [u8; 32],
    signature: Signature,
}

impl SignedOperation {
    pub fn operation(&self) -> &UnsignedOperation {
        &self.operation
    }

    pub fn contents(&self) -> &RevealOperation {
        &self.operation.contents
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// `branch ‖ contents ‖ signature`.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut out = self.operation.encode()?;
        out.extend_from_slice(self.signature.as_bytes());
        Ok(out)
    }

    /// Hash the node will report for this operation.
    pub fn hash(&self) -> CodecResult<OperationHash> {
        Ok(OperationHash::of_signed_bytes(&self.encode()?))
    }

    pub fn decode(bytes: &[u8], protocol: ProtocolParams) -> CodecResult<Self> {
        let mut cursor = Cursor::new(bytes);
        let operation = UnsignedOperation::decode_prefix(&mut cursor, protocol)?;

        let key_type = operation.contents.public_key.key_type();
        if cursor.remaining() != key_type.signature_len() {
            return Err(CodecError::malformed(
                "signature",
                format!(
                    "expected {} bytes for {}, have {}",
                    key_type.signature_len(),
                    key_type,
                    cursor.remaining()
                ),
            ));
        }
        let signature = Signature::new(key_type, cursor.rest())
            .map_err(|e| CodecError::malformed("signature", e.to_string()))?;

        operation.attach_signature(signature)
    }
}
