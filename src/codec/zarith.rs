//! Zarith natural numbers: little-endian 7-bit groups, high bit means "more".

use crate::codec::{CodecError, CodecResult, Cursor};

/// A `u64` never needs more than ten 7-bit groups.
const MAX_BYTES: usize = 10;

pub fn write_nat(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Encoded length of `value` in bytes.
pub fn nat_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

pub fn read_nat(cursor: &mut Cursor<'_>, field: &'static str) -> CodecResult<u64> {
    let mut value: u64 = 0;
    for i in 0..MAX_BYTES {
        let byte = cursor.read_u8(field)?;
        let group = u64::from(byte & 0x7f);
        let shift = 7 * i as u32;

        if i == MAX_BYTES - 1 && group > 1 {
            return Err(CodecError::malformed(field, "value exceeds 64 bits"));
        }
        value |= group << shift;

        if byte & 0x80 == 0 {
            if byte == 0 && i > 0 {
                return Err(CodecError::malformed(field, "trailing zero byte"));
            }
            return Ok(value);
        }
    }
    Err(CodecError::malformed(field, "value exceeds 64 bits"))
}
