//! Storage Module
//!
//! Three file formats, each built on the one below it.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ bloom     BloomMapFile   map file + Bloom filter file    │
//! ├──────────────────────────────────────────────────────────┤
//! │ map       MapFile        sorted data file + sparse index │
//! ├──────────────────────────────────────────────────────────┤
//! │ sequence  SequenceFile   header, records, sync markers   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Files are written once by a single writer and are immutable after close;
//! any number of readers may then open them concurrently.

pub mod bloom;
pub mod map;
pub mod sequence;

pub use bloom::{BloomMapFile, BloomMapFileReader, BloomMapFileWriter, DynamicBloomFilter};
pub use map::{ArrayFileReader, ArrayFileWriter, MapFile, MapFileReader, MapFileWriter};
pub use sequence::{
    CompressionType, Header, Metadata, RawSequenceReader, RawSequenceWriter, SequenceReader, SequenceWriter,
    WriterOptions,
};
