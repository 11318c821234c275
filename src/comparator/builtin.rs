//! Raw comparators for the built-in writables
//!
//! Each one orders encoded values exactly as the decoded values' `Ord` would,
//! without constructing them.

use std::cmp::Ordering;

use crate::comparator::{compare_bytes, RawComparator};
use crate::error::{Result, SeqFileError};
use crate::writable::varint;

fn check_len(kind: &str, a: &[u8], b: &[u8], width: usize) -> Result<()> {
    if a.len() != width || b.len() != width {
        return Err(SeqFileError::malformed(format!(
            "{} comparator expects {} bytes, got {} and {}",
            kind,
            width,
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// Two's-complement big-endian integers of one width.
///
/// Flipping the sign bit maps signed order onto unsigned byte order.
#[derive(Debug, Clone, Copy)]
pub struct SignedIntComparator {
    width: usize,
}

impl SignedIntComparator {
    pub const BYTE: Self = Self { width: 1 };
    pub const SHORT: Self = Self { width: 2 };
    pub const INT: Self = Self { width: 4 };
    pub const LONG: Self = Self { width: 8 };
}

impl RawComparator for SignedIntComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        check_len("integer", a, b, self.width)?;
        Ok((a[0] ^ 0x80)
            .cmp(&(b[0] ^ 0x80))
            .then_with(|| compare_bytes(&a[1..], &b[1..])))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BooleanComparator;

impl RawComparator for BooleanComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        check_len("boolean", a, b, 1)?;
        Ok((a[0] != 0).cmp(&(b[0] != 0)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FloatComparator;

impl RawComparator for FloatComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        check_len("float", a, b, 4)?;
        let x = f32::from_be_bytes([a[0], a[1], a[2], a[3]]);
        let y = f32::from_be_bytes([b[0], b[1], b[2], b[3]]);
        Ok(x.total_cmp(&y))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DoubleComparator;

impl RawComparator for DoubleComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        check_len("double", a, b, 8)?;
        let x = f64::from_bits(load_u64(a));
        let y = f64::from_bits(load_u64(b));
        Ok(x.total_cmp(&y))
    }
}

fn load_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    u64::from_be_bytes(word)
}

/// Zero-compressed integers (both `VIntWritable` and `VLongWritable`)
#[derive(Debug, Clone, Copy)]
pub struct VLongComparator;

impl RawComparator for VLongComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        let (x, _) = varint::decode_vlong(a)?;
        let (y, _) = varint::decode_vlong(b)?;
        Ok(x.cmp(&y))
    }
}

/// Text: skip the vint length, then compare the UTF-8 bytes
#[derive(Debug, Clone, Copy)]
pub struct TextComparator;

impl TextComparator {
    fn body(bytes: &[u8]) -> Result<&[u8]> {
        let first = *bytes
            .first()
            .ok_or_else(|| SeqFileError::malformed("empty text encoding"))?;
        let prefix = varint::decode_vint_size(first);
        bytes
            .get(prefix..)
            .ok_or_else(|| SeqFileError::malformed("truncated text length prefix"))
    }
}

impl RawComparator for TextComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        Ok(compare_bytes(Self::body(a)?, Self::body(b)?))
    }
}

/// Byte sequences: skip the 4-byte length, then compare
#[derive(Debug, Clone, Copy)]
pub struct BytesComparator;

impl RawComparator for BytesComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        if a.len() < 4 || b.len() < 4 {
            return Err(SeqFileError::malformed("byte sequence shorter than its length prefix"));
        }
        Ok(compare_bytes(&a[4..], &b[4..]))
    }
}

/// Every null equals every other
#[derive(Debug, Clone, Copy)]
pub struct NullComparator;

impl RawComparator for NullComparator {
    fn compare(&self, _a: &[u8], _b: &[u8]) -> Result<Ordering> {
        Ok(Ordering::Equal)
    }
}
