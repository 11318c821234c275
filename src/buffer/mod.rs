//! Reusable Buffers
//!
//! Growable output and resettable input buffers shared by every codec in the
//! crate. Both are meant to be kept around and reused across encode/decode
//! cycles so hot loops do not reallocate.
//!
//! All multi-byte integers are big-endian; floats are IEEE-754 bit patterns.

mod input;
mod output;

pub use input::DataInputBuffer;
pub use output::DataOutputBuffer;
