//! Bloom Map File Writer

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::buffer::DataOutputBuffer;
use crate::context::StorageContext;
use crate::error::Result;
use crate::storage::map::MapFileWriter;
use crate::storage::sequence::{SequenceWriter, WriterOptions};
use crate::writable::{NullWritable, Writable, WritableComparable};

use super::{DynamicBloomFilter, BLOOM_FILE_NAME};

/// Map file writer that also records every key in a Bloom filter.
///
/// The filter is sized from `bloom_expected_keys`, `bloom_error_rate` and
/// `bloom_hash_count` and written to `bloom` on close.
pub struct BloomMapFileWriter<K, V> {
    ctx: StorageContext,
    dir: PathBuf,
    inner: MapFileWriter<K, V>,
    filter: DynamicBloomFilter,
    key_buf: DataOutputBuffer,
    overwrite: bool,
    closed: bool,
}

impl<K: WritableComparable, V: Writable> BloomMapFileWriter<K, V> {
    pub fn create(ctx: &StorageContext, dir: &Path, options: WriterOptions) -> Result<Self> {
        let config = &ctx.config;
        let filter =
            DynamicBloomFilter::with_error_rate(config.bloom_expected_keys, config.bloom_error_rate, config.bloom_hash_count)?;
        let overwrite = options.overwrite;
        let inner = MapFileWriter::create(ctx, dir, options)?;

        Ok(Self {
            ctx: ctx.clone(),
            dir: dir.to_path_buf(),
            inner,
            filter,
            key_buf: DataOutputBuffer::new(),
            overwrite,
            closed: false,
        })
    }

    /// Append one record and add its encoded key to the filter
    pub fn append(&mut self, key: &K, value: &V) -> Result<()> {
        self.inner.append(key, value)?;
        self.key_buf.reset();
        key.write(&mut self.key_buf)?;
        self.filter.add(self.key_buf.data());
        Ok(())
    }

    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn bloom_filter(&self) -> &DynamicBloomFilter {
        &self.filter
    }

    /// Close the map file, then write the filter
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.inner.close()?;

        let path = self.dir.join(BLOOM_FILE_NAME);
        let options = WriterOptions::new().sync_interval(0).overwrite(self.overwrite);
        let mut writer = SequenceWriter::<NullWritable, DynamicBloomFilter>::create(&self.ctx, &path, options)?;
        writer.append(&NullWritable, &self.filter)?;
        writer.close()?;
        self.closed = true;

        debug!(
            dir = %self.dir.display(),
            keys = self.filter.key_count(),
            rows = self.filter.row_count(),
            vector_size = self.filter.vector_size(),
            "Wrote bloom filter"
        );
        Ok(())
    }
}

impl<K, V> Drop for BloomMapFileWriter<K, V> {
    fn drop(&mut self) {
        if !self.closed {
            warn!(dir = %self.dir.display(), "Bloom map file dropped without close, filter not written");
        }
    }
}
