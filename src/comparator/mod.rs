//! Raw Comparators
//!
//! Order two encoded values straight from their bytes, which is what lets the
//! sorter and the sorted-index lookup avoid decoding every key they touch.
//!
//! ```text
//! ComparatorRegistry ── type_name ──▶ Arc<dyn RawComparator>
//!        │                                 ▲
//!        └── no entry ──▶ DecodingComparator<T> (decode both, then Ord)
//! ```
//!
//! A specialized comparator must return exactly what the decoding comparator
//! returns for every valid pair of encodings.

mod builtin;
mod bytes;
mod registry;

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use crate::error::Result;
use crate::writable::{from_bytes, Writable};

pub use self::builtin::{
    BooleanComparator, BytesComparator, DoubleComparator, FloatComparator, NullComparator,
    SignedIntComparator, TextComparator, VLongComparator,
};
pub use self::bytes::{compare_bytes, compare_bytes_bytewise, hash_bytes};
pub use self::registry::ComparatorRegistry;

/// Orders two encoded values of the same type.
///
/// Each slice holds exactly one complete encoding.
pub trait RawComparator: Send + Sync {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering>;
}

/// Fallback comparator: decode both operands and use their natural order
pub struct DecodingComparator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> DecodingComparator<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for DecodingComparator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DecodingComparator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DecodingComparator")
    }
}

impl<T: Writable + Ord + Default> RawComparator for DecodingComparator<T> {
    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        let x: T = from_bytes(a)?;
        let y: T = from_bytes(b)?;
        Ok(x.cmp(&y))
    }
}
