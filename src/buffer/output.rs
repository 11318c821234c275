//! Output buffer
//!
//! A growable byte sink that records are encoded into.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};

use crate::writable::varint;

/// Growable output buffer, reset between records instead of reallocated
#[derive(Debug, Default, Clone)]
pub struct DataOutputBuffer {
    buf: BytesMut,
}

impl DataOutputBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written since the last reset
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    /// Number of valid bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Forget the contents, keeping the allocation
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Drop everything past `len` bytes
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    /// Copy of the valid bytes
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Take the contents as immutable `Bytes`, leaving the buffer empty
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    // =========================================================================
    // Primitive Writers
    // =========================================================================

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.put_i16(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.put_f32(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64(value);
    }

    /// Append raw bytes with no length prefix
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Write a variable-length integer (see [`varint`])
    pub fn write_vlong(&mut self, value: i64) {
        varint::write_vlong(&mut self.buf, value);
    }

    pub fn write_vint(&mut self, value: i32) {
        varint::write_vlong(&mut self.buf, value as i64);
    }
}

impl io::Write for DataOutputBuffer {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.put_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsRef<[u8]> for DataOutputBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}
