//! Dynamic Bloom filter
//!
//! A list of equally sized bit rows. Each row takes up to `keys_per_row`
//! keys; when the last row is full a fresh one is added, so the false
//! positive rate degrades gracefully instead of saturating when more keys
//! arrive than expected. A key tests positive if any row holds it.
//!
//! Every row uses the same `hash_count` bit positions per key, derived by
//! double hashing: `h(i) = h1 + i * h2 (mod vector_size)`.
//!
//! ## Encoding
//! ```text
//! [Version u8][HashCount i32][VectorSize i64][KeysPerRow i32]
//! [CurrentRowKeys i32][Rows i32][Row words i64 * ceil(VectorSize/64)]*
//! [CRC32 of row words i32]
//! ```

use std::fmt;

use crate::buffer::{DataInputBuffer, DataOutputBuffer};
use crate::error::{Result, SeqFileError};
use crate::writable::Writable;

const ENCODING_VERSION: u8 = 1;

const FNV_BASIS_1: u64 = 0xcbf29ce484222325;
const FNV_BASIS_2: u64 = 0x517cc1b727220a95;

/// Bits per row for `expected_keys` keys at false positive rate `error_rate`
/// with `hash_count` hashes: `ceil(-k*n / ln(1 - p^(1/k)))`
pub fn optimal_vector_size(expected_keys: usize, error_rate: f64, hash_count: u32) -> Result<u64> {
    if expected_keys == 0 {
        return Err(SeqFileError::Config("bloom expected keys must be > 0".into()));
    }
    if !(error_rate > 0.0 && error_rate < 1.0) {
        return Err(SeqFileError::Config(format!(
            "bloom error rate must be in (0, 1), got {}",
            error_rate
        )));
    }
    if hash_count == 0 {
        return Err(SeqFileError::Config("bloom hash count must be > 0".into()));
    }
    let k = f64::from(hash_count);
    let n = expected_keys as f64;
    let bits = (-k * n / (1.0 - error_rate.powf(1.0 / k)).ln()).ceil();
    Ok((bits as u64).max(64))
}

/// Bloom filter that grows by whole rows
#[derive(Clone, PartialEq, Eq)]
pub struct DynamicBloomFilter {
    /// Bits in each row
    vector_size: u64,
    hash_count: u32,
    /// Keys a row takes before a new row is started
    keys_per_row: usize,
    /// Keys added to the last row
    current_row_keys: usize,
    rows: Vec<Vec<u64>>,
}

impl DynamicBloomFilter {
    pub fn new(vector_size: u64, hash_count: u32, keys_per_row: usize) -> Result<Self> {
        if vector_size == 0 || hash_count == 0 || keys_per_row == 0 {
            return Err(SeqFileError::InvalidArgument(format!(
                "invalid bloom filter shape: {} bits, {} hashes, {} keys per row",
                vector_size, hash_count, keys_per_row
            )));
        }
        Ok(Self {
            vector_size,
            hash_count,
            keys_per_row,
            current_row_keys: 0,
            rows: vec![empty_row(vector_size)],
        })
    }

    /// Filter whose rows hold `expected_keys` keys at `error_rate`
    pub fn with_error_rate(expected_keys: usize, error_rate: f64, hash_count: u32) -> Result<Self> {
        let vector_size = optimal_vector_size(expected_keys, error_rate, hash_count)?;
        Self::new(vector_size, hash_count, expected_keys)
    }

    /// Record `key`
    pub fn add(&mut self, key: &[u8]) {
        if self.current_row_keys >= self.keys_per_row || self.rows.is_empty() {
            self.rows.push(empty_row(self.vector_size));
            self.current_row_keys = 0;
        }
        let (h1, h2) = hash_pair(key);
        let vector_size = self.vector_size;
        let hash_count = self.hash_count;
        if let Some(row) = self.rows.last_mut() {
            for i in 0..hash_count {
                let bit = bit_index(h1, h2, i, vector_size);
                row[(bit / 64) as usize] |= 1u64 << (bit % 64);
            }
        }
        self.current_row_keys += 1;
    }

    /// False only if `key` was never added
    pub fn membership_test(&self, key: &[u8]) -> bool {
        let (h1, h2) = hash_pair(key);
        let bits: Vec<u64> = (0..self.hash_count)
            .map(|i| bit_index(h1, h2, i, self.vector_size))
            .collect();
        self.rows
            .iter()
            .any(|row| bits.iter().all(|bit| row[(bit / 64) as usize] & (1u64 << (bit % 64)) != 0))
    }

    pub fn vector_size(&self) -> u64 {
        self.vector_size
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    pub fn keys_per_row(&self) -> usize {
        self.keys_per_row
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Keys added so far
    pub fn key_count(&self) -> u64 {
        match self.rows.len() {
            0 => 0,
            n => (n as u64 - 1) * self.keys_per_row as u64 + self.current_row_keys as u64,
        }
    }

    fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for row in &self.rows {
            for word in row {
                hasher.update(&word.to_be_bytes());
            }
        }
        hasher.finalize()
    }
}

impl Default for DynamicBloomFilter {
    /// One-key placeholder, meant to be overwritten by `read_fields`
    fn default() -> Self {
        Self {
            vector_size: 64,
            hash_count: 1,
            keys_per_row: 1,
            current_row_keys: 0,
            rows: vec![empty_row(64)],
        }
    }
}

impl fmt::Debug for DynamicBloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicBloomFilter")
            .field("vector_size", &self.vector_size)
            .field("hash_count", &self.hash_count)
            .field("keys_per_row", &self.keys_per_row)
            .field("rows", &self.rows.len())
            .field("keys", &self.key_count())
            .finish()
    }
}

impl Writable for DynamicBloomFilter {
    fn type_name() -> String {
        "DynamicBloomFilter".to_string()
    }

    fn write(&self, out: &mut DataOutputBuffer) -> Result<()> {
        out.write_u8(ENCODING_VERSION);
        out.write_i32(to_i32("hash count", self.hash_count as usize)?);
        out.write_i64(self.vector_size as i64);
        out.write_i32(to_i32("keys per row", self.keys_per_row)?);
        out.write_i32(to_i32("row keys", self.current_row_keys)?);
        out.write_i32(to_i32("rows", self.rows.len())?);
        for row in &self.rows {
            for word in row {
                out.write_i64(*word as i64);
            }
        }
        out.write_i32(self.checksum() as i32);
        Ok(())
    }

    fn read_fields(&mut self, input: &mut DataInputBuffer) -> Result<()> {
        let version = input.read_u8()?;
        if version != ENCODING_VERSION {
            return Err(SeqFileError::malformed(format!("unknown bloom filter version {}", version)));
        }
        let hash_count = input.read_i32()?;
        let vector_size = input.read_i64()?;
        let keys_per_row = input.read_i32()?;
        let current_row_keys = input.read_i32()?;
        let row_count = input.read_i32()?;
        if hash_count <= 0 || vector_size <= 0 || keys_per_row <= 0 || row_count <= 0 {
            return Err(SeqFileError::malformed(format!(
                "invalid bloom filter shape: {} hashes, {} bits, {} keys per row, {} rows",
                hash_count, vector_size, keys_per_row, row_count
            )));
        }
        if current_row_keys < 0 || current_row_keys > keys_per_row {
            return Err(SeqFileError::malformed(format!(
                "bloom row holds {} keys of {}",
                current_row_keys, keys_per_row
            )));
        }

        let words = words_for(vector_size as u64);
        let needed = (words as u128) * (row_count as u128) * 8 + 4;
        if needed > input.remaining() as u128 {
            return Err(SeqFileError::malformed(format!(
                "bloom filter needs {} bytes, {} remain",
                needed,
                input.remaining()
            )));
        }

        let mut rows = Vec::with_capacity(row_count as usize);
        for _ in 0..row_count {
            let mut row = Vec::with_capacity(words);
            for _ in 0..words {
                row.push(input.read_i64()? as u64);
            }
            rows.push(row);
        }

        *self = Self {
            vector_size: vector_size as u64,
            hash_count: hash_count as u32,
            keys_per_row: keys_per_row as usize,
            current_row_keys: current_row_keys as usize,
            rows,
        };

        let stored = input.read_i32()? as u32;
        let actual = self.checksum();
        if stored != actual {
            return Err(SeqFileError::malformed(format!(
                "bloom filter checksum mismatch: stored {:08x}, computed {:08x}",
                stored, actual
            )));
        }
        Ok(())
    }
}

fn empty_row(vector_size: u64) -> Vec<u64> {
    vec![0; words_for(vector_size)]
}

fn words_for(vector_size: u64) -> usize {
    vector_size.div_ceil(64) as usize
}

fn to_i32(what: &str, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| SeqFileError::InvalidArgument(format!("bloom {} {} too large", what, value)))
}

fn bit_index(h1: u64, h2: u64, i: u32, vector_size: u64) -> u64 {
    h1.wrapping_add(u64::from(i).wrapping_mul(h2)) % vector_size
}

/// Two hashes of `key`; the second is odd so probes never collapse
fn hash_pair(key: &[u8]) -> (u64, u64) {
    let h1 = fmix64(fnv1a_64(key, FNV_BASIS_1));
    let h2 = fmix64(fnv1a_64(key, FNV_BASIS_2)) | 1;
    (h1, h2)
}

fn fnv1a_64(data: &[u8], basis: u64) -> u64 {
    const FNV_PRIME: u64 = 0x00000100000001b3;
    let mut hash = basis;
    for &byte in data {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// MurmurHash3 finalizer
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51afd7ed558ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ceb9fe1a85ec53);
    k ^= k >> 33;
    k
}
