//! Configuration for seqfile
//!
//! Centralized configuration with sensible defaults. Every option can also be
//! loaded from string properties under its conventional name (see
//! [`Config::from_properties`]).

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeqFileError};

// =============================================================================
// Property Names
// =============================================================================

pub const IO_FILE_BUFFER_SIZE: &str = "io.file.buffer.size";
pub const SEQFILE_SYNC_INTERVAL: &str = "io.seqfile.sync.interval";
pub const SEQFILE_COMPRESS_BLOCKSIZE: &str = "io.seqfile.compress.blocksize";
pub const SEQFILE_COMPRESSION_CODEC: &str = "io.seqfile.compression.codec";
pub const MAP_INDEX_INTERVAL: &str = "io.map.index.interval";
pub const MAP_INDEX_SKIP: &str = "io.map.index.skip";
pub const MAPFILE_BLOOM_SIZE: &str = "io.mapfile.bloom.size";
pub const MAPFILE_BLOOM_ERROR_RATE: &str = "io.mapfile.bloom.error.rate";

/// Sync escape (4) + sync token (16)
const SYNC_SIZE: usize = 20;

/// Main configuration for seqfile readers and writers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // -------------------------------------------------------------------------
    // I/O Configuration
    // -------------------------------------------------------------------------
    /// Buffer size for file streams (in bytes)
    pub io_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Container Configuration
    // -------------------------------------------------------------------------
    /// Minimum bytes of record data between sync markers (0 disables markers
    /// in record mode; block mode always marks each block)
    pub sync_interval: u64,

    /// Uncompressed key+value bytes buffered before a block is flushed
    pub compress_block_size: usize,

    /// Codec used when compression is requested without naming one
    pub default_codec: String,

    // -------------------------------------------------------------------------
    // Sorted-Index Configuration
    // -------------------------------------------------------------------------
    /// Records between index samples
    pub index_interval: u64,

    /// Index entries skipped between each entry kept in memory by readers
    pub index_skip: usize,

    // -------------------------------------------------------------------------
    // Bloom Configuration
    // -------------------------------------------------------------------------
    /// Keys per filter row before a new row is started
    pub bloom_expected_keys: usize,

    /// Target false-positive rate per row
    pub bloom_error_rate: f64,

    /// Hash functions per key
    pub bloom_hash_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_buffer_size: 4096,
            sync_interval: (100 * SYNC_SIZE) as u64, // ~2000 bytes
            compress_block_size: 1_000_000,
            default_codec: "zstd".to_string(),
            index_interval: 128,
            index_skip: 0,
            bloom_expected_keys: 1024 * 1024,
            bloom_error_rate: 0.005,
            bloom_hash_count: 5,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build a config from `name = value` properties, starting from defaults.
    ///
    /// Unknown names are ignored so a shared property set can feed several
    /// subsystems.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Config::default();
        for (name, value) in properties {
            let (name, value) = (name.as_ref(), value.as_ref().trim());
            match name {
                IO_FILE_BUFFER_SIZE => config.io_buffer_size = parse_size(name, value)? as usize,
                SEQFILE_SYNC_INTERVAL => config.sync_interval = parse_size(name, value)?,
                SEQFILE_COMPRESS_BLOCKSIZE => {
                    config.compress_block_size = parse_size(name, value)? as usize
                }
                SEQFILE_COMPRESSION_CODEC => config.default_codec = value.to_string(),
                MAP_INDEX_INTERVAL => config.index_interval = parse_size(name, value)?,
                MAP_INDEX_SKIP => config.index_skip = parse_size(name, value)? as usize,
                MAPFILE_BLOOM_SIZE => config.bloom_expected_keys = parse_size(name, value)? as usize,
                MAPFILE_BLOOM_ERROR_RATE => {
                    config.bloom_error_rate = value.parse().map_err(|_| {
                        SeqFileError::Config(format!("{}: not a number: {:?}", name, value))
                    })?
                }
                _ => {}
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject option combinations no reader or writer can honor
    pub fn validate(&self) -> Result<()> {
        if self.io_buffer_size == 0 {
            return Err(SeqFileError::Config("io buffer size must be > 0".into()));
        }
        if self.index_interval == 0 {
            return Err(SeqFileError::Config("index interval must be > 0".into()));
        }
        if self.bloom_expected_keys == 0 {
            return Err(SeqFileError::Config("bloom size must be > 0".into()));
        }
        if !(self.bloom_error_rate > 0.0 && self.bloom_error_rate < 1.0) {
            return Err(SeqFileError::Config(format!(
                "bloom error rate must be in (0, 1), got {}",
                self.bloom_error_rate
            )));
        }
        if self.bloom_hash_count == 0 {
            return Err(SeqFileError::Config("bloom hash count must be > 0".into()));
        }
        Ok(())
    }
}

/// Parse a size: decimal digits with an optional `k`, `m` or `g` suffix
/// (binary multiples, case-insensitive).
pub fn parse_size(name: &str, value: &str) -> Result<u64> {
    let bad = || SeqFileError::Config(format!("{}: invalid size {:?}", name, value));

    let value = value.trim();
    let (digits, shift) = match value.char_indices().last() {
        Some((i, c)) if c.eq_ignore_ascii_case(&'k') => (&value[..i], 10),
        Some((i, c)) if c.eq_ignore_ascii_case(&'m') => (&value[..i], 20),
        Some((i, c)) if c.eq_ignore_ascii_case(&'g') => (&value[..i], 30),
        Some(_) => (value, 0),
        None => return Err(bad()),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let base: u64 = digits.parse().map_err(|_| bad())?;
    base.checked_mul(1u64 << shift).ok_or_else(bad)
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the stream buffer size (in bytes)
    pub fn io_buffer_size(mut self, size: usize) -> Self {
        self.config.io_buffer_size = size;
        self
    }

    /// Set the sync marker interval (in bytes)
    pub fn sync_interval(mut self, bytes: u64) -> Self {
        self.config.sync_interval = bytes;
        self
    }

    /// Set the block compression threshold (in bytes)
    pub fn compress_block_size(mut self, bytes: usize) -> Self {
        self.config.compress_block_size = bytes;
        self
    }

    /// Set the default codec name
    pub fn default_codec(mut self, name: impl Into<String>) -> Self {
        self.config.default_codec = name.into();
        self
    }

    /// Set the number of records between index samples
    pub fn index_interval(mut self, interval: u64) -> Self {
        self.config.index_interval = interval;
        self
    }

    /// Set how many index entries readers skip between loaded entries
    pub fn index_skip(mut self, skip: usize) -> Self {
        self.config.index_skip = skip;
        self
    }

    /// Set the expected key count per Bloom row
    pub fn bloom_expected_keys(mut self, keys: usize) -> Self {
        self.config.bloom_expected_keys = keys;
        self
    }

    /// Set the target Bloom false-positive rate
    pub fn bloom_error_rate(mut self, rate: f64) -> Self {
        self.config.bloom_error_rate = rate;
        self
    }

    /// Set the number of Bloom hash functions
    pub fn bloom_hash_count(mut self, count: u32) -> Self {
        self.config.bloom_hash_count = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
