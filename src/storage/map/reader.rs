//! Map File Reader
//!
//! The whole index is loaded on open. A lookup picks the index entry to
//! start from, seeks the data file there and scans forward:
//!
//! ```text
//!   index:  k0 ─────────── k128 ─────────── k256 ──────────
//!           │               │                │
//!   data:   r0 r1 ... r127  r128 r129 ... ▲  r256 ...
//!                           └── scan ─────┘ target
//! ```

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::buffer::DataOutputBuffer;
use crate::comparator::RawComparator;
use crate::context::StorageContext;
use crate::error::{Result, SeqFileError};
use crate::storage::sequence::{Header, RawSequenceReader, RecordSnapshot, SequenceReader};
use crate::writable::{LongWritable, Writable, WritableComparable};

use super::{DATA_FILE_NAME, INDEX_FILE_NAME};

/// Where a key scan left the data reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanStop {
    /// Current record equals the key
    Exact,
    /// Current record is the first one greater than the key
    Greater,
    /// Current record is the last one less than the key
    Less,
    /// No record at or after the key
    End,
}

/// Reads a map file directory
pub struct MapFileReader<K, V> {
    ctx: StorageContext,
    dir: PathBuf,
    data: SequenceReader<K, V>,
    comparator: Arc<dyn RawComparator>,
    /// Encoded index keys, ascending
    index_keys: Vec<Bytes>,
    /// Data offsets matching `index_keys`
    positions: Vec<u64>,
    key_buf: DataOutputBuffer,
}

impl<K, V> MapFileReader<K, V>
where
    K: WritableComparable + Default + 'static,
    V: Writable,
{
    /// Open a map file and load its index
    pub fn open(ctx: &StorageContext, dir: &Path) -> Result<Self> {
        let data = SequenceReader::open(ctx, &dir.join(DATA_FILE_NAME))?;
        let (index_keys, positions) = load_index::<K>(ctx, &dir.join(INDEX_FILE_NAME))?;

        debug!(
            dir = %dir.display(),
            index_entries = index_keys.len(),
            "Opened map file"
        );

        Ok(Self {
            ctx: ctx.clone(),
            dir: dir.to_path_buf(),
            data,
            comparator: ctx.comparators.get::<K>(),
            index_keys,
            positions,
            key_buf: DataOutputBuffer::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Header of the data file
    pub fn header(&self) -> &Header {
        self.data.header()
    }

    /// Index entries held in memory
    pub fn index_len(&self) -> usize {
        self.index_keys.len()
    }

    /// Encoded keys and data offsets of the in-memory index
    pub fn index_entries(&self) -> impl Iterator<Item = (&[u8], u64)> + '_ {
        self.index_keys
            .iter()
            .zip(self.positions.iter())
            .map(|(key, position)| (key.as_ref(), *position))
    }

    // =========================================================================
    // Sequential Access
    // =========================================================================

    /// Move back to the first record
    pub fn reset(&mut self) -> Result<()> {
        self.data.seek(0)
    }

    /// Read the next record in file order
    pub fn next(&mut self, key: &mut K, value: &mut V) -> Result<bool> {
        self.data.next(key, value)
    }

    // =========================================================================
    // Keyed Access
    // =========================================================================

    /// Position at `key` so that `next` returns the record after it.
    /// Returns whether the key exists.
    pub fn seek(&mut self, key: &K) -> Result<bool> {
        Ok(self.seek_key(key, false)? == ScanStop::Exact)
    }

    /// Decode the value stored under `key` into `value`; `false` if absent
    pub fn get(&mut self, key: &K, value: &mut V) -> Result<bool> {
        if self.seek_key(key, false)? != ScanStop::Exact {
            return Ok(false);
        }
        self.data.current_value(value)?;
        Ok(true)
    }

    /// Find the record closest to `key`.
    ///
    /// With `before` false this is the first record at or after `key`,
    /// otherwise the last record at or before it. The record's value is
    /// decoded into `value` and its key returned.
    pub fn get_closest(&mut self, key: &K, value: &mut V, before: bool) -> Result<Option<K>> {
        let found = match self.seek_key(key, before)? {
            ScanStop::Exact => true,
            ScanStop::Greater => !before,
            ScanStop::Less => before,
            ScanStop::End => false,
        };
        if !found {
            return Ok(None);
        }
        let mut closest = K::default();
        self.data.raw().decode_key(&mut closest)?;
        self.data.current_value(value)?;
        Ok(Some(closest))
    }

    /// Key of the middle index entry
    pub fn mid_key(&self) -> Result<Option<K>> {
        if self.index_keys.is_empty() {
            return Ok(None);
        }
        let mid = (self.index_keys.len() - 1) / 2;
        decode_key(&self.index_keys[mid]).map(Some)
    }

    /// Last key in the file; leaves this reader's position untouched
    pub fn final_key(&self) -> Result<Option<K>> {
        let mut data = RawSequenceReader::open(&self.ctx, &self.dir.join(DATA_FILE_NAME))?;
        if let Some(last) = self.positions.last() {
            data.seek(*last)?;
        }
        let mut last_key: Option<Bytes> = None;
        while data.next_record()? {
            last_key = Some(Bytes::copy_from_slice(data.key_bytes()));
        }
        last_key.map(|bytes| decode_key(&bytes)).transpose()
    }

    fn seek_key(&mut self, key: &K, before: bool) -> Result<ScanStop> {
        self.key_buf.reset();
        key.write(&mut self.key_buf)?;
        let target = Bytes::copy_from_slice(self.key_buf.data());
        self.scan_to(&target, before)
    }

    /// Seek to the closest index entry and scan the data file for `target`
    fn scan_to(&mut self, target: &[u8], before: bool) -> Result<ScanStop> {
        let start = match self.index_floor(target)? {
            Some(i) => self.positions[i],
            None => 0,
        };

        let comparator = Arc::clone(&self.comparator);
        let data = self.data.raw();
        data.seek(start)?;

        let mut previous: Option<RecordSnapshot> = None;
        while data.next_record()? {
            match comparator.compare(target, data.key_bytes())? {
                Ordering::Equal => return Ok(ScanStop::Exact),
                Ordering::Less if before => {
                    let Some(previous) = previous else {
                        // Every record is past the key; leave the first one for `next`
                        data.unread();
                        return Ok(ScanStop::Greater);
                    };
                    data.unread();
                    data.restore(previous);
                    return Ok(ScanStop::Less);
                }
                Ordering::Less => return Ok(ScanStop::Greater),
                Ordering::Greater => {
                    if before {
                        previous = data.snapshot();
                    }
                }
            }
        }

        match previous {
            Some(previous) => {
                data.restore(previous);
                Ok(ScanStop::Less)
            }
            None => Ok(ScanStop::End),
        }
    }

    /// Index of the entry to start scanning from: the leftmost entry equal
    /// to `target`, else the last entry below it
    fn index_floor(&self, target: &[u8]) -> Result<Option<usize>> {
        let mut lo = 0;
        let mut hi = self.index_keys.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.comparator.compare(&self.index_keys[mid], target)? == Ordering::Less {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo < self.index_keys.len() && self.comparator.compare(&self.index_keys[lo], target)? == Ordering::Equal {
            return Ok(Some(lo));
        }
        Ok(lo.checked_sub(1))
    }
}

fn decode_key<K: Writable + Default>(bytes: &[u8]) -> Result<K> {
    crate::writable::from_bytes(bytes)
}

/// Read the index into memory, keeping one entry in `index_skip + 1` and
/// dropping entries that repeat the previous offset
fn load_index<K: Writable>(ctx: &StorageContext, path: &Path) -> Result<(Vec<Bytes>, Vec<u64>)> {
    let mut index = SequenceReader::<K, LongWritable>::open(ctx, path)?;
    let stride = ctx.config.index_skip + 1;

    let mut keys = Vec::new();
    let mut positions: Vec<u64> = Vec::new();
    let mut position = LongWritable::default();
    let mut seen = 0usize;

    let raw = index.raw();
    while raw.next_record()? {
        let entry = seen;
        seen += 1;
        if entry % stride != 0 {
            continue;
        }
        raw.decode_value(&mut position)?;
        let offset = u64::try_from(position.get()).map_err(|_| SeqFileError::Framing {
            path: raw.path().to_string(),
            offset: raw.record_offset(),
            reason: format!("negative index offset {}", position.get()),
        })?;
        if positions.last() == Some(&offset) {
            continue;
        }
        keys.push(Bytes::copy_from_slice(raw.key_bytes()));
        positions.push(offset);
    }
    Ok((keys, positions))
}
