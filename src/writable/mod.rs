//! Record Codec
//!
//! Values stored in containers implement [`Writable`]: a self-describing binary
//! encoding plus a stable type name recorded in file headers.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Writable                               │
//! │  write(&self, out)          read_fields(&mut self, input)  │
//! │  type_name()  ─────────▶ recorded in container headers     │
//! └──────────────┬─────────────────────────────────────────────┘
//!                │ + Ord
//!                ▼
//!        WritableComparable ──▶ usable as a container key
//! ```
//!
//! `read_fields` overwrites the receiver in place so hot loops can decode into
//! one long-lived instance. Any value can be round-tripped through
//! [`to_bytes`] / [`from_bytes`] to obtain an independent copy.

pub mod array;
pub mod binary;
pub mod object;
pub mod primitives;
pub mod serialized;
pub mod text;
pub mod varint;

use crate::buffer::{DataInputBuffer, DataOutputBuffer};
use crate::error::{Result, SeqFileError};

pub use self::array::ArrayWritable;
pub use self::binary::BytesWritable;
pub use self::object::{ObjectWritable, RecordValue, TypeRegistry, Value};
pub use self::primitives::{
    BooleanWritable, ByteWritable, DoubleWritable, FloatWritable, IntWritable, LongWritable,
    NullWritable, ShortWritable, VIntWritable, VLongWritable,
};
pub use self::serialized::SerdeWritable;
pub use self::text::Text;

// =============================================================================
// Traits
// =============================================================================

/// A value with a binary encoding
pub trait Writable {
    /// Stable identifier for the type, recorded in container headers
    fn type_name() -> String;

    /// Append the encoding of `self`
    fn write(&self, out: &mut DataOutputBuffer) -> Result<()>;

    /// Replace the contents of `self` with a value decoded from `input`
    fn read_fields(&mut self, input: &mut DataInputBuffer) -> Result<()>;
}

/// A writable with a total order, usable as a container key
pub trait WritableComparable: Writable + Ord {}

impl<T: Writable + Ord> WritableComparable for T {}

/// A value whose ordering and hash derive from an exposed byte slice
pub trait BinaryComparable {
    /// The bytes that define ordering
    fn bytes(&self) -> &[u8];

    /// Hash of the bytes (`31 * h + b` over every byte)
    fn hash_bytes(&self) -> i32 {
        crate::comparator::hash_bytes(self.bytes())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Encode a value into a fresh byte vector
pub fn to_bytes<W: Writable>(value: &W) -> Result<Vec<u8>> {
    let mut out = DataOutputBuffer::new();
    value.write(&mut out)?;
    Ok(out.to_vec())
}

/// Decode a value that must occupy all of `bytes`
pub fn from_bytes<W: Writable + Default>(bytes: &[u8]) -> Result<W> {
    let mut input = DataInputBuffer::new();
    input.reset_from_slice(bytes);
    let mut value = W::default();
    value.read_fields(&mut input)?;
    if input.remaining() != 0 {
        return Err(SeqFileError::malformed(format!(
            "{} trailing bytes after {}",
            input.remaining(),
            W::type_name()
        )));
    }
    Ok(value)
}

/// Independent copy of `value` obtained through its encoding
pub fn clone_writable<W: Writable + Default>(value: &W) -> Result<W> {
    from_bytes(&to_bytes(value)?)
}
