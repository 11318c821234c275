//! Compression codecs
//!
//! Containers only need symmetric transforms over byte runs. A codec is looked
//! up by the name recorded in the container header, so a reader can open any
//! file whose codec the factory knows.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, SeqFileError};

/// Default zstd level for block and record compression
const ZSTD_LEVEL: i32 = 3;

/// A symmetric compress/decompress pair over byte runs
pub trait CompressionCodec: Send + Sync {
    /// Name recorded in container headers
    fn name(&self) -> &str;

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>>;

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>>;
}

// =============================================================================
// Built-in Codecs
// =============================================================================

/// Zstandard via the `zstd` crate
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new(ZSTD_LEVEL)
    }
}

impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        zstd::encode_all(Cursor::new(input), self.level)
            .map_err(|e| SeqFileError::Compression(format!("zstd compress: {}", e)))
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        zstd::decode_all(Cursor::new(input))
            .map_err(|e| SeqFileError::Compression(format!("zstd decompress: {}", e)))
    }
}

/// Raw-format Snappy via the `snap` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SnappyCodec;

impl CompressionCodec for SnappyCodec {
    fn name(&self) -> &str {
        "snappy"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Encoder::new()
            .compress_vec(input)
            .map_err(|e| SeqFileError::Compression(format!("snappy compress: {}", e)))
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Decoder::new()
            .decompress_vec(input)
            .map_err(|e| SeqFileError::Compression(format!("snappy decompress: {}", e)))
    }
}

// =============================================================================
// Codec Factory
// =============================================================================

/// Maps codec names to codecs
pub struct CodecFactory {
    codecs: RwLock<HashMap<String, Arc<dyn CompressionCodec>>>,
}

impl CodecFactory {
    /// Factory holding the built-in `zstd` and `snappy` codecs
    pub fn new() -> Self {
        let factory = Self {
            codecs: RwLock::new(HashMap::new()),
        };
        factory.register(Arc::new(ZstdCodec::default()));
        factory.register(Arc::new(SnappyCodec));
        factory
    }

    /// Add (or replace) a codec under its own name
    pub fn register(&self, codec: Arc<dyn CompressionCodec>) {
        self.codecs.write().insert(codec.name().to_string(), codec);
    }

    /// Codec for a header name
    pub fn get(&self, name: &str) -> Result<Arc<dyn CompressionCodec>> {
        self.codecs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SeqFileError::UnknownCodec(name.to_string()))
    }

    /// Names of every registered codec, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.codecs.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for CodecFactory {
    fn default() -> Self {
        Self::new()
    }
}
