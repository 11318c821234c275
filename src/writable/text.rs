//! UTF-8 text
//!
//! Encoded as a vint byte length followed by the UTF-8 bytes. Ordering is
//! unsigned lexicographic over those bytes, which matches code-point order for
//! valid UTF-8.
//!
//! Decoding does not validate UTF-8: a `Text` can hold whatever bytes were on
//! disk. [`Text::validate_utf8`] and [`Text::as_str`] check on demand.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::buffer::{DataInputBuffer, DataOutputBuffer};
use crate::error::{Result, SeqFileError};
use crate::writable::{BinaryComparable, Writable};

/// Growable UTF-8 string with a reusable backing buffer
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Text {
    bytes: Vec<u8>,
}

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `value`
    pub fn set(&mut self, value: &str) {
        self.bytes.clear();
        self.bytes.extend_from_slice(value.as_bytes());
    }

    /// Replace the contents with raw bytes (not validated)
    pub fn set_bytes(&mut self, bytes: &[u8]) {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
    }

    /// Append raw bytes (not validated)
    pub fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Empty the text, keeping the allocation
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy of the bytes
    pub fn copy_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Contents as `&str`, failing on invalid UTF-8
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes)
            .map_err(|e| SeqFileError::malformed(format!("invalid UTF-8 in text: {}", e)))
    }

    /// Check that the contents are valid UTF-8
    pub fn validate_utf8(&self) -> Result<()> {
        self.as_str().map(|_| ())
    }

    /// Number of code points (invalid sequences count one per byte)
    pub fn text_length(&self) -> usize {
        String::from_utf8_lossy(&self.bytes).chars().count()
    }

    /// Byte offset of the first occurrence of `what` at or after byte `start`
    pub fn find(&self, what: &str, start: usize) -> Option<usize> {
        let needle = what.as_bytes();
        if start > self.bytes.len() {
            return None;
        }
        if needle.is_empty() {
            return Some(start);
        }
        self.bytes[start..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|i| i + start)
    }

    /// Code point starting at byte `position`
    pub fn char_at(&self, position: usize) -> Option<char> {
        let rest = self.bytes.get(position..)?;
        let len = utf8_sequence_len(*rest.first()?)?;
        let seq = rest.get(..len)?;
        std::str::from_utf8(seq).ok()?.chars().next()
    }

    // =========================================================================
    // Codec Helpers
    // =========================================================================

    /// Write `value` in text encoding, returning the bytes written
    pub fn write_string(out: &mut DataOutputBuffer, value: &str) -> usize {
        let before = out.len();
        out.write_vint(value.len() as i32);
        out.write_bytes(value.as_bytes());
        out.len() - before
    }

    /// Read a text-encoded string, validating UTF-8
    pub fn read_string(input: &mut DataInputBuffer) -> Result<String> {
        Self::read_string_bounded(input, i32::MAX as usize)
    }

    /// Read a text-encoded string of at most `max_len` bytes
    pub fn read_string_bounded(input: &mut DataInputBuffer, max_len: usize) -> Result<String> {
        let len = read_bounded_length(input, max_len)?;
        let bytes = input.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| SeqFileError::malformed(format!("invalid UTF-8 in text: {}", e)))
    }

    /// Like `read_fields`, refusing lengths above `max_len`
    pub fn read_fields_bounded(&mut self, input: &mut DataInputBuffer, max_len: usize) -> Result<()> {
        let len = read_bounded_length(input, max_len)?;
        self.bytes.resize(len, 0);
        input.read_into(&mut self.bytes)
    }
}

fn read_bounded_length(input: &mut DataInputBuffer, max_len: usize) -> Result<usize> {
    let len = input.read_length()?;
    if len > max_len {
        return Err(SeqFileError::malformed(format!(
            "text length {} exceeds limit {}",
            len, max_len
        )));
    }
    Ok(len)
}

/// Total length of a UTF-8 sequence from its lead byte
fn utf8_sequence_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7f => Some(1),
        0xc0..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf7 => Some(4),
        _ => None,
    }
}

impl Writable for Text {
    fn type_name() -> String {
        "Text".to_string()
    }

    fn write(&self, out: &mut DataOutputBuffer) -> Result<()> {
        out.write_vint(self.bytes.len() as i32);
        out.write_bytes(&self.bytes);
        Ok(())
    }

    fn read_fields(&mut self, input: &mut DataInputBuffer) -> Result<()> {
        let len = input.read_length()?;
        self.bytes.resize(len, 0);
        input.read_into(&mut self.bytes)
    }
}

impl BinaryComparable for Text {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Hashes through [`BinaryComparable::hash_bytes`]
impl Hash for Text {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_bytes().hash(state);
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Self {
            bytes: value.as_bytes().to_vec(),
        }
    }
}

impl From<String> for Text {
    fn from(value: String) -> Self {
        Self {
            bytes: value.into_bytes(),
        }
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}
