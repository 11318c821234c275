//! Array files: map files keyed by a dense record number

use std::path::Path;

use crate::context::StorageContext;
use crate::error::Result;
use crate::storage::sequence::WriterOptions;
use crate::writable::{LongWritable, Writable};

use super::{MapFileReader, MapFileWriter};

/// Appends values under keys 0, 1, 2, ...
pub struct ArrayFileWriter<V> {
    inner: MapFileWriter<LongWritable, V>,
    count: LongWritable,
}

impl<V: Writable> ArrayFileWriter<V> {
    pub fn create(ctx: &StorageContext, dir: &Path, options: WriterOptions) -> Result<Self> {
        Ok(Self {
            inner: MapFileWriter::create(ctx, dir, options)?,
            count: LongWritable::new(0),
        })
    }

    /// Append a value under the next record number
    pub fn append(&mut self, value: &V) -> Result<()> {
        self.inner.append(&self.count, value)?;
        self.count.set(self.count.get() + 1);
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

/// Random and sequential access to an array file
pub struct ArrayFileReader<V> {
    inner: MapFileReader<LongWritable, V>,
    key: LongWritable,
}

impl<V: Writable> ArrayFileReader<V> {
    pub fn open(ctx: &StorageContext, dir: &Path) -> Result<Self> {
        Ok(Self {
            inner: MapFileReader::open(ctx, dir)?,
            key: LongWritable::default(),
        })
    }

    /// Position so that `next` returns record `n + 1`; false if `n` is out
    /// of range
    pub fn seek(&mut self, n: i64) -> Result<bool> {
        self.key.set(n);
        self.inner.seek(&self.key)
    }

    /// Read the next value; its record number is then [`key`](Self::key)
    pub fn next(&mut self, value: &mut V) -> Result<bool> {
        self.inner.next(&mut self.key, value)
    }

    /// Record number of the last value read by `next`
    pub fn key(&self) -> i64 {
        self.key.get()
    }

    /// Decode record `n` into `value`
    pub fn get(&mut self, n: i64, value: &mut V) -> Result<bool> {
        self.key.set(n);
        self.inner.get(&self.key, value)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.inner.reset()
    }
}
