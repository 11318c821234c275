//! Bloom Map File Module
//!
//! A map file plus a Bloom filter over every key, so lookups for absent keys
//! usually return without touching the index or data.
//!
//! ```text
//! <dir>/
//! ├── data     as in a map file
//! ├── index    as in a map file
//! └── bloom    sequence file holding one (NullWritable, DynamicBloomFilter)
//! ```
//!
//! A missing or corrupt `bloom` file never fails a reader; it logs a warning
//! and answers every lookup from the map file.

mod filter;
mod reader;
mod writer;

use std::path::Path;

use crate::context::StorageContext;
use crate::error::Result;

use super::map::MapFile;

pub use filter::{optimal_vector_size, DynamicBloomFilter};
pub use reader::BloomMapFileReader;
pub use writer::BloomMapFileWriter;

/// Name of the filter file inside a Bloom map file directory
pub const BLOOM_FILE_NAME: &str = "bloom";

/// Directory-level operations on Bloom map files
pub struct BloomMapFile;

impl BloomMapFile {
    /// Delete the filter, then the map file it belongs to
    pub fn delete(ctx: &StorageContext, dir: &Path) -> Result<()> {
        ctx.fs.delete(&dir.join(BLOOM_FILE_NAME), false)?;
        MapFile::delete(ctx, dir)
    }
}
