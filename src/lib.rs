//! # seqfile
//!
//! Binary record serialization and the file formats built on it:
//! - `Writable` records with deterministic, self-delimiting encodings
//! - Raw comparators that order encoded records without decoding them
//! - Sequence files: append-only, splittable, optionally compressed
//! - Map files: sorted sequence files with a sparse key index
//! - Bloom map files: map files that reject absent keys up front
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageContext                          │
//! │   Config · FileSystem · Comparators · Codecs · Type ids     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼──────────────────┐
//!          ▼            ▼                  ▼
//!   ┌─────────────┐ ┌──────────────┐ ┌────────────┐
//!   │  Sequence   │◀│   MapFile    │◀│ BloomMap   │
//!   │   File      │ │ data + index │ │ + filter   │
//!   └──────┬──────┘ └──────────────┘ └────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐     ┌─────────────┐
//!   │  Writable   │────▶│   Buffers   │
//!   │ + RawComp.  │     │  (in/out)   │
//!   └─────────────┘     └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use seqfile::storage::sequence::{SequenceReader, SequenceWriter, WriterOptions};
//! use seqfile::writable::{IntWritable, Text};
//! use seqfile::{Config, StorageContext};
//!
//! # fn main() -> seqfile::Result<()> {
//! let ctx = StorageContext::local(Config::default())?;
//! let path = std::path::Path::new("/tmp/numbers.seq");
//!
//! let mut writer = SequenceWriter::<IntWritable, Text>::create(&ctx, path, WriterOptions::new())?;
//! writer.append(&IntWritable::new(1), &Text::from("one"))?;
//! writer.close()?;
//!
//! let mut reader = SequenceReader::<IntWritable, Text>::open(&ctx, path)?;
//! let (mut key, mut value) = (IntWritable::default(), Text::new());
//! while reader.next(&mut key, &mut value)? {
//!     println!("{} => {}", key, value);
//! }
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod context;
pub mod fs;
pub mod compress;

pub mod buffer;
pub mod writable;
pub mod comparator;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, SeqFileError};
pub use config::Config;
pub use context::StorageContext;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of seqfile
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
