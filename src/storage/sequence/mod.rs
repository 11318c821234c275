//! Sequence File Module
//!
//! Append-only container of key/value records with a self-describing header,
//! periodic sync markers, and optional per-record or per-block compression.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Header                                                           │
//! │   Magic "SEQF" (4) | Version (1)                                 │
//! │   KeyType (vint len + UTF-8) | ValueType (vint len + UTF-8)      │
//! │   Compression (1): 0 none, 1 record, 2 block                     │
//! │   [Codec name (vint len + UTF-8)]   only when compression != 0   │
//! │   Metadata: Count i32 | (Name Text, Value Text) * Count, sorted  │
//! │   Sync token (16)                                                │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Records (none / record compression)                              │
//! │   [RecordLen i32][KeyLen i32][Key][Value]                        │
//! │   Value is compressed on its own in record mode                  │
//! │   Sync marker [-1 i32][Sync token 16] every ~sync_interval bytes │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Blocks (block compression)                                       │
//! │   [Sync marker][Count vint]                                      │
//! │   [len vint][KeyLens*]  [len vint][Keys*]                        │
//! │   [len vint][ValLens*]  [len vint][Values*]     * = compressed   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A reader dropped at an arbitrary offset calls `sync(offset)` to move to the
//! next marker; markers only ever sit on record or block boundaries.

mod header;
mod reader;
mod sorter;
mod split;
mod writer;

use std::fmt;

use crate::error::{Result, SeqFileError};

pub use header::{Header, Metadata};
pub(crate) use reader::RecordSnapshot;
pub use reader::{RawSequenceReader, Records, SequenceReader};
pub use sorter::{sort_file, SortOptions, Sorter};
pub use split::{compute_splits, scan_splits_parallel, FileSplit, SplitReader};
pub use writer::{RawSequenceWriter, SequenceWriter, WriterOptions};

// =============================================================================
// Shared Constants (used by writer, reader, splits)
// =============================================================================

/// Magic bytes identifying a sequence file
pub(crate) const MAGIC: &[u8; 4] = b"SEQF";

/// Current format version
pub(crate) const VERSION: u8 = 1;

/// Record length value announcing a sync marker
pub(crate) const SYNC_ESCAPE: i32 = -1;

/// Length of the random sync token
pub const SYNC_HASH_SIZE: usize = 16;

/// Escape (4) + token (16)
pub const SYNC_SIZE: usize = 4 + SYNC_HASH_SIZE;

// =============================================================================
// Compression Type
// =============================================================================

/// How record bytes are compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    /// Records stored as written
    #[default]
    None,
    /// Each value compressed on its own
    Record,
    /// Runs of records compressed together, column by column
    Block,
}

impl CompressionType {
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            CompressionType::None => 0,
            CompressionType::Record => 1,
            CompressionType::Block => 2,
        }
    }

    pub(crate) fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Record),
            2 => Ok(CompressionType::Block),
            other => Err(SeqFileError::malformed(format!("unknown compression type {}", other))),
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompressionType::None => "none",
            CompressionType::Record => "record",
            CompressionType::Block => "block",
        })
    }
}

impl std::str::FromStr for CompressionType {
    type Err = SeqFileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionType::None),
            "record" => Ok(CompressionType::Record),
            "block" => Ok(CompressionType::Block),
            other => Err(SeqFileError::Config(format!("unknown compression type {:?}", other))),
        }
    }
}
