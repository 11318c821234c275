//! Raw byte sequences
//!
//! Encoded as a 4-byte big-endian length followed by the bytes.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::buffer::{DataInputBuffer, DataOutputBuffer};
use crate::error::{Result, SeqFileError};
use crate::writable::{BinaryComparable, Writable};

/// Byte sequence usable as a key or value
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct BytesWritable {
    bytes: Vec<u8>,
}

impl BytesWritable {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Replace the contents, keeping the allocation
    pub fn set(&mut self, bytes: &[u8]) {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
    }

    /// Resize to `size` bytes, zero-filling any growth
    pub fn set_size(&mut self, size: usize) {
        self.bytes.resize(size, 0);
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Make room for at least `capacity` bytes without changing the length
    pub fn set_capacity(&mut self, capacity: usize) {
        if capacity > self.bytes.capacity() {
            self.bytes.reserve(capacity - self.bytes.len());
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn copy_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }
}

impl Writable for BytesWritable {
    fn type_name() -> String {
        "BytesWritable".to_string()
    }

    fn write(&self, out: &mut DataOutputBuffer) -> Result<()> {
        let len = i32::try_from(self.bytes.len())
            .map_err(|_| SeqFileError::InvalidArgument("byte sequence longer than 2 GiB".into()))?;
        out.write_i32(len);
        out.write_bytes(&self.bytes);
        Ok(())
    }

    fn read_fields(&mut self, input: &mut DataInputBuffer) -> Result<()> {
        let len = input.read_i32()?;
        if len < 0 || len as usize > input.remaining() {
            return Err(SeqFileError::malformed(format!(
                "byte sequence length {} with {} bytes remaining",
                len,
                input.remaining()
            )));
        }
        self.bytes.resize(len as usize, 0);
        input.read_into(&mut self.bytes)
    }
}

impl BinaryComparable for BytesWritable {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Hashes through [`BinaryComparable::hash_bytes`]
impl Hash for BytesWritable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_bytes().hash(state);
    }
}

impl From<Vec<u8>> for BytesWritable {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for BytesWritable {
    fn from(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}

/// Hex pairs separated by spaces
impl fmt::Display for BytesWritable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
