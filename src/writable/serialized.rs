//! Serde-backed writable
//!
//! Wraps any `serde` type and stores it as a vint length followed by its
//! bincode encoding. Ordering uses the wrapped type's `Ord`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::buffer::{DataInputBuffer, DataOutputBuffer};
use crate::error::{Result, SeqFileError};
use crate::writable::Writable;

/// A serde value carried as a record
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerdeWritable<T>(pub T);

impl<T> SerdeWritable<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn get(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize + DeserializeOwned> Writable for SerdeWritable<T> {
    fn type_name() -> String {
        format!("Serde<{}>", std::any::type_name::<T>())
    }

    fn write(&self, out: &mut DataOutputBuffer) -> Result<()> {
        let encoded = bincode::serialize(&self.0)
            .map_err(|e| SeqFileError::InvalidArgument(format!("serialize failed: {}", e)))?;
        out.write_vint(encoded.len() as i32);
        out.write_bytes(&encoded);
        Ok(())
    }

    fn read_fields(&mut self, input: &mut DataInputBuffer) -> Result<()> {
        let len = input.read_length()?;
        let bytes = input.read_bytes(len)?;
        self.0 = bincode::deserialize(&bytes)
            .map_err(|e| SeqFileError::malformed(format!("deserialize failed: {}", e)))?;
        Ok(())
    }
}
