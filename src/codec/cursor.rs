//! Read position over a borrowed buffer.

use crate::codec::{CodecError, CodecResult};

/// A read position over a byte slice.
///
/// `Copy` on purpose: probing works on a copy and only hands back the
/// advanced cursor when the probe matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unread bytes.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    pub fn read_u8(&mut self, field: &'static str) -> CodecResult<u8> {
        let byte = self
            .peek_u8()
            .ok_or_else(|| CodecError::malformed(field, "unexpected end of buffer"))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize, field: &'static str) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::malformed(
                field,
                format!("need {} bytes, have {}", len, self.remaining()),
            ));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}
