//! Map File Writer

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::StorageContext;
use crate::error::{Result, SeqFileError};
use crate::storage::sequence::{SequenceWriter, WriterOptions};
use crate::writable::{LongWritable, Writable, WritableComparable};

use super::{index_options, DATA_FILE_NAME, INDEX_FILE_NAME};

/// Writes a map file directory.
///
/// Keys must be appended in non-decreasing order of `K`'s comparator. Out of
/// order keys are written as given and break lookups on the result.
pub struct MapFileWriter<K, V> {
    dir: PathBuf,
    data: SequenceWriter<K, V>,
    index: SequenceWriter<K, LongWritable>,
    /// Records between index entries
    index_interval: u64,
    /// Records appended so far
    size: u64,
    position: LongWritable,
}

impl<K: WritableComparable, V: Writable> MapFileWriter<K, V> {
    /// Create the directory and its `data` and `index` files.
    ///
    /// `options` apply to the data file; the index is always block
    /// compressed with the default codec.
    pub fn create(ctx: &StorageContext, dir: &Path, options: WriterOptions) -> Result<Self> {
        ctx.config.validate()?;
        ctx.fs.mkdirs(dir)?;
        let overwrite = options.overwrite;
        let data = SequenceWriter::create(ctx, &dir.join(DATA_FILE_NAME), options)?;
        let index = SequenceWriter::create(ctx, &dir.join(INDEX_FILE_NAME), index_options(overwrite))?;

        debug!(
            dir = %dir.display(),
            index_interval = ctx.config.index_interval,
            "Created map file"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            data,
            index,
            index_interval: ctx.config.index_interval,
            size: 0,
            position: LongWritable::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_interval(&self) -> u64 {
        self.index_interval
    }

    /// Change the sampling interval for the records still to come
    pub fn set_index_interval(&mut self, interval: u64) -> Result<()> {
        if interval == 0 {
            return Err(SeqFileError::InvalidArgument("index interval must be > 0".into()));
        }
        self.index_interval = interval;
        Ok(())
    }

    /// Records appended so far
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Append one record; every `index_interval`-th key is also indexed
    pub fn append(&mut self, key: &K, value: &V) -> Result<()> {
        if self.size % self.index_interval == 0 {
            self.position.set(self.data.position() as i64);
            self.index.append(key, &self.position)?;
        }
        self.data.append(key, value)?;
        self.size += 1;
        Ok(())
    }

    /// Close the data file, then the index
    pub fn close(&mut self) -> Result<()> {
        self.data.close()?;
        self.index.close()?;
        debug!(dir = %self.dir.display(), records = self.size, "Closed map file");
        Ok(())
    }
}
