//! Map File Module
//!
//! A map file is a directory holding a key-sorted sequence file and a sparse
//! index over it.
//!
//! ```text
//! <dir>/
//! ├── data     sequence file of (K, V), keys non-decreasing
//! └── index    block-compressed sequence file of (K, LongWritable)
//!              one entry per `index_interval` records: the interval's
//!              first key and the data offset to seek to for it
//! ```
//!
//! Lookups binary-search the in-memory index for the closest entry at or
//! below the key, seek the data file there and scan forward. Keys must be
//! appended in order; the writer does not check.

mod array;
mod reader;
mod writer;

use std::path::Path;

use tracing::debug;

use crate::context::StorageContext;
use crate::error::{Result, SeqFileError};
use crate::writable::{LongWritable, Writable};

use super::sequence::{CompressionType, RawSequenceReader, RawSequenceWriter, WriterOptions};

pub use array::{ArrayFileReader, ArrayFileWriter};
pub use reader::MapFileReader;
pub use writer::MapFileWriter;

/// Name of the data file inside a map file directory
pub const DATA_FILE_NAME: &str = "data";

/// Name of the index file inside a map file directory
pub const INDEX_FILE_NAME: &str = "index";

/// Options used for every index file
pub(crate) fn index_options(overwrite: bool) -> WriterOptions {
    WriterOptions::new()
        .compression(CompressionType::Block)
        .overwrite(overwrite)
}

/// Directory-level operations on map files
pub struct MapFile;

impl MapFile {
    /// Rebuild a missing index from the data file.
    ///
    /// Returns the number of data records, or `None` when an index already
    /// exists. With `dry_run` the data is scanned but nothing is written.
    pub fn fix(ctx: &StorageContext, dir: &Path, dry_run: bool) -> Result<Option<u64>> {
        ctx.config.validate()?;
        let index_path = dir.join(INDEX_FILE_NAME);
        if ctx.fs.exists(&index_path) {
            return Ok(None);
        }

        let mut data = RawSequenceReader::open(ctx, &dir.join(DATA_FILE_NAME))?;
        let key_type = data.header().key_type.clone();
        let mut index = if dry_run {
            None
        } else {
            Some(RawSequenceWriter::create(
                ctx,
                &index_path,
                &key_type,
                &LongWritable::type_name(),
                index_options(false),
            )?)
        };

        let interval = ctx.config.index_interval;
        let mut count = 0u64;
        let mut position = Vec::with_capacity(8);
        while data.next_record()? {
            if count % interval == 0 {
                if let Some(index) = index.as_mut() {
                    position.clear();
                    position.extend_from_slice(&(data.record_offset() as i64).to_be_bytes());
                    index.append_raw(data.key_bytes(), &position)?;
                }
            }
            count += 1;
        }
        if let Some(mut index) = index {
            index.close()?;
        }

        debug!(dir = %dir.display(), records = count, dry_run, "Rebuilt map file index");
        Ok(Some(count))
    }

    /// Rename a map file directory; the target must not exist
    pub fn rename(ctx: &StorageContext, from: &Path, to: &Path) -> Result<()> {
        if ctx.fs.exists(to) {
            return Err(SeqFileError::InvalidArgument(format!(
                "cannot rename {} to {}: target exists",
                from.display(),
                to.display()
            )));
        }
        ctx.fs.rename(from, to)
    }

    /// Delete a map file directory and its files
    pub fn delete(ctx: &StorageContext, dir: &Path) -> Result<()> {
        ctx.fs.delete(&dir.join(DATA_FILE_NAME), false)?;
        ctx.fs.delete(&dir.join(INDEX_FILE_NAME), false)?;
        ctx.fs.delete(dir, true)?;
        Ok(())
    }
}
