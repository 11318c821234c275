//! Homogeneous arrays
//!
//! Encoded as a 4-byte element count followed by each element's encoding.

use crate::buffer::{DataInputBuffer, DataOutputBuffer};
use crate::error::{Result, SeqFileError};
use crate::writable::Writable;

/// Array of one writable type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayWritable<T> {
    values: Vec<T>,
}

impl<T> Default for ArrayWritable<T> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T> ArrayWritable<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self { values }
    }

    pub fn get(&self) -> &[T] {
        &self.values
    }

    pub fn set(&mut self, values: Vec<T>) {
        self.values = values;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.values
    }
}

impl<T: Writable + Default> Writable for ArrayWritable<T> {
    fn type_name() -> String {
        format!("ArrayWritable<{}>", T::type_name())
    }

    fn write(&self, out: &mut DataOutputBuffer) -> Result<()> {
        let count = i32::try_from(self.values.len())
            .map_err(|_| SeqFileError::InvalidArgument("array too long".into()))?;
        out.write_i32(count);
        for value in &self.values {
            value.write(out)?;
        }
        Ok(())
    }

    fn read_fields(&mut self, input: &mut DataInputBuffer) -> Result<()> {
        let count = input.read_i32()?;
        if count < 0 {
            return Err(SeqFileError::malformed(format!("negative array length {}", count)));
        }
        self.values.clear();
        // Every element occupies at least one byte unless the type is empty,
        // so cap the preallocation by what is actually left.
        self.values.reserve((count as usize).min(input.remaining()));
        for _ in 0..count {
            let mut value = T::default();
            value.read_fields(input)?;
            self.values.push(value);
        }
        Ok(())
    }
}

impl<T> From<Vec<T>> for ArrayWritable<T> {
    fn from(values: Vec<T>) -> Self {
        Self { values }
    }
}
