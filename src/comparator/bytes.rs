//! Unsigned lexicographic byte comparison
//!
//! [`compare_bytes`] walks both slices eight bytes at a time as big-endian
//! words; [`compare_bytes_bytewise`] is the straightforward fallback. They
//! must agree on every input.

use std::cmp::Ordering;

const WORD: usize = 8;

/// Compare two byte ranges a word at a time
pub fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    let common = a.len().min(b.len());
    let words = common / WORD;

    for i in 0..words {
        let start = i * WORD;
        let x = load_be(&a[start..start + WORD]);
        let y = load_be(&b[start..start + WORD]);
        if x != y {
            // Big-endian words order the same way as their bytes
            return x.cmp(&y);
        }
    }

    let done = words * WORD;
    compare_bytes_bytewise(&a[done..], &b[done..])
}

/// Compare two byte ranges one byte at a time
pub fn compare_bytes_bytewise(a: &[u8], b: &[u8]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        if x != y {
            return x.cmp(y);
        }
    }
    a.len().cmp(&b.len())
}

#[inline]
fn load_be(chunk: &[u8]) -> u64 {
    let mut word = [0u8; WORD];
    word.copy_from_slice(chunk);
    u64::from_be_bytes(word)
}

/// Hash of a byte range: `h = 31 * h + b` over signed bytes, seeded with 1
pub fn hash_bytes(bytes: &[u8]) -> i32 {
    bytes
        .iter()
        .fold(1i32, |h, &b| h.wrapping_mul(31).wrapping_add(b as i8 as i32))
}
