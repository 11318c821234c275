//! Variable-length integers
//!
//! Zero-compressed encoding for signed 64-bit values:
//!
//! ```text
//! -112 <= v <= 127      one byte, the value itself
//! otherwise             [tag][n big-endian magnitude bytes], 1 <= n <= 8
//!
//! tag in -113..=-120    v >= 0,  n = -(tag + 112)
//! tag in -121..=-128    v <  0,  n = -(tag + 120), magnitude = !v
//! ```
//!
//! The first byte alone determines the total size, which lets raw comparators
//! skip a length prefix without decoding it.

use std::io::Read;

use bytes::BufMut;

use crate::error::{Result, SeqFileError};

/// Largest encoded size of a single value
pub const MAX_VINT_SIZE: usize = 9;

/// Encode `value` into `out`
pub fn write_vlong<B: BufMut>(out: &mut B, value: i64) {
    if (-112..=127).contains(&value) {
        out.put_i8(value as i8);
        return;
    }

    let (magnitude, mut tag) = if value < 0 { (!value, -120i32) } else { (value, -112i32) };

    let n = byte_count(magnitude);
    tag -= n as i32;
    out.put_i8(tag as i8);

    for idx in (0..n).rev() {
        out.put_u8((magnitude >> (idx * 8)) as u8);
    }
}

/// Number of magnitude bytes needed for a non-negative value
fn byte_count(magnitude: i64) -> usize {
    let bits = 64 - (magnitude as u64).leading_zeros() as usize;
    bits.div_ceil(8)
}

/// Total encoded size of `value`, tag byte included
pub fn vint_size(value: i64) -> usize {
    if (-112..=127).contains(&value) {
        return 1;
    }
    let magnitude = if value < 0 { !value } else { value };
    1 + byte_count(magnitude)
}

/// Total encoded size implied by the first byte
pub fn decode_vint_size(first: u8) -> usize {
    let tag = first as i8;
    if tag >= -112 {
        1
    } else if tag < -120 {
        (-119 - tag as i32) as usize
    } else {
        (-111 - tag as i32) as usize
    }
}

/// True when the first byte announces a negative value
pub fn is_negative_vint(first: u8) -> bool {
    let tag = first as i8;
    tag < -120 || (-112..0).contains(&tag)
}

/// Decode one value from the front of `bytes`, returning it with its size
pub fn decode_vlong(bytes: &[u8]) -> Result<(i64, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| SeqFileError::malformed("unexpected end of buffer reading vint"))?;
    let size = decode_vint_size(first);
    if size == 1 {
        return Ok((first as i8 as i64, 1));
    }
    if bytes.len() < size {
        return Err(SeqFileError::malformed(format!(
            "truncated vint: need {} bytes, {} remaining",
            size,
            bytes.len()
        )));
    }

    let mut value: i64 = 0;
    for &b in &bytes[1..size] {
        value = (value << 8) | b as i64;
    }
    Ok((if is_negative_vint(first) { !value } else { value }, size))
}

/// Decode one value from a stream
pub fn read_vlong<R: Read>(reader: &mut R) -> Result<i64> {
    let mut buf = [0u8; MAX_VINT_SIZE];
    reader.read_exact(&mut buf[..1])?;
    let size = decode_vint_size(buf[0]);
    if size > 1 {
        reader.read_exact(&mut buf[1..size])?;
    }
    decode_vlong(&buf[..size]).map(|(value, _)| value)
}
