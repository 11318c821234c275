//! Input buffer
//!
//! A resettable byte source that records are decoded from. Every read checks
//! the remaining length first; running off the end is a framing error, never a
//! panic.

use std::io;

use bytes::{Buf, Bytes};

use crate::error::{Result, SeqFileError};
use crate::writable::varint;

/// Resettable input buffer over an immutable byte range
#[derive(Debug, Default, Clone)]
pub struct DataInputBuffer {
    data: Bytes,
    /// Length of the range at the last reset (for `position`)
    len: usize,
}

impl DataInputBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer over `data`
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let mut buf = Self::new();
        buf.reset(data);
        buf
    }

    /// Point the buffer at a new range
    pub fn reset(&mut self, data: impl Into<Bytes>) {
        self.data = data.into();
        self.len = self.data.len();
    }

    /// Point the buffer at a copy of `data`
    pub fn reset_from_slice(&mut self, data: &[u8]) {
        self.reset(Bytes::copy_from_slice(data));
    }

    /// Bytes consumed since the last reset
    pub fn position(&self) -> usize {
        self.len - self.data.remaining()
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    /// Total length of the range at the last reset
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The unread bytes
    pub fn unread(&self) -> &[u8] {
        self.data.chunk()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.data.remaining() < needed {
            return Err(SeqFileError::malformed(format!(
                "unexpected end of buffer: need {} bytes at position {}, {} remaining",
                needed,
                self.position(),
                self.data.remaining()
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Primitive Readers
    // =========================================================================

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.data.get_u8())
    }

    /// Any non-zero byte is true
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.ensure(1)?;
        Ok(self.data.get_i8())
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.data.get_i16())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.data.get_i32())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.data.get_i64())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.ensure(4)?;
        Ok(self.data.get_f32())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.ensure(8)?;
        Ok(self.data.get_f64())
    }

    /// Read exactly `len` bytes without copying
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len)?;
        Ok(self.data.split_to(len))
    }

    /// Fill `dst` completely
    pub fn read_into(&mut self, dst: &mut [u8]) -> Result<()> {
        self.ensure(dst.len())?;
        self.data.copy_to_slice(dst);
        Ok(())
    }

    /// Skip exactly `len` bytes
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure(len)?;
        self.data.advance(len);
        Ok(())
    }

    /// Read a variable-length integer (see [`varint`])
    pub fn read_vlong(&mut self) -> Result<i64> {
        let (value, size) = varint::decode_vlong(self.data.chunk())?;
        self.data.advance(size);
        Ok(value)
    }

    /// Read a variable-length integer that must fit in 32 bits
    pub fn read_vint(&mut self) -> Result<i32> {
        let value = self.read_vlong()?;
        i32::try_from(value)
            .map_err(|_| SeqFileError::malformed(format!("value {} too long to fit in integer", value)))
    }

    /// Read a variable-length integer and check it lies in `[lower, upper]`
    pub fn read_vint_range(&mut self, lower: i32, upper: i32) -> Result<i32> {
        let value = self.read_vlong()?;
        if value < lower as i64 {
            return Err(SeqFileError::malformed(if lower == 0 {
                format!("expected non-negative integer, got {}", value)
            } else {
                format!("expected integer >= {}, got {}", lower, value)
            }));
        }
        if value > upper as i64 {
            return Err(SeqFileError::malformed(format!(
                "expected integer <= {}, got {}",
                upper, value
            )));
        }
        Ok(value as i32)
    }

    /// Read a non-negative length prefix and check the bytes are present
    pub fn read_length(&mut self) -> Result<usize> {
        let len = self.read_vint_range(0, i32::MAX)? as usize;
        self.ensure(len)?;
        Ok(len)
    }
}

impl io::Read for DataInputBuffer {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let n = dst.len().min(self.data.remaining());
        self.data.copy_to_slice(&mut dst[..n]);
        Ok(n)
    }
}
