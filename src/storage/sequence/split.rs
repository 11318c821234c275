//! File splits
//!
//! A container can be cut into byte ranges read independently. Each reader
//! syncs to the first marker at or after its start and stops at the first
//! record whose preceding marker lies at or beyond its end, so every record
//! belongs to exactly one split.
//!
//! ```text
//!   split 0            │ split 1            │ split 2
//! ───H──r──r──S──r──r──┼──r──S──r──r──S──r──┼──r──r──S──r──
//!       └─ read by 0 ─────────┘└ read by 1 ─────────┘└ by 2 ─
//! ```

use std::path::{Path, PathBuf};

use crate::context::StorageContext;
use crate::error::{Result, SeqFileError};
use crate::writable::Writable;

use super::RawSequenceReader;

/// A byte range of one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSplit {
    pub path: PathBuf,
    pub start: u64,
    pub length: u64,
}

impl FileSplit {
    pub fn end(&self) -> u64 {
        self.start + self.length
    }
}

/// Cut a file into `count` nearly equal byte ranges covering all of it
pub fn compute_splits(ctx: &StorageContext, path: &Path, count: usize) -> Result<Vec<FileSplit>> {
    if count == 0 {
        return Err(SeqFileError::InvalidArgument("split count must be > 0".into()));
    }
    let len = ctx.fs.len(path)?;
    let count = (count as u64).min(len.max(1));
    let base = len / count;
    let extra = len % count;

    let mut splits = Vec::with_capacity(count as usize);
    let mut start = 0;
    for i in 0..count {
        let length = base + u64::from(i < extra);
        splits.push(FileSplit {
            path: path.to_path_buf(),
            start,
            length,
        });
        start += length;
    }
    Ok(splits)
}

/// Reads the records that belong to one split
pub struct SplitReader {
    reader: RawSequenceReader,
    end: u64,
    done: bool,
}

impl SplitReader {
    /// Open the split's file and sync to the split start.
    ///
    /// Records ahead of the first marker belong to the split at offset 0;
    /// any later split starting inside the header scans for a marker instead.
    pub fn open(ctx: &StorageContext, split: &FileSplit) -> Result<Self> {
        let mut reader = RawSequenceReader::open(ctx, &split.path)?;
        if split.start == 0 {
            reader.sync(0)?;
        } else {
            reader.sync(split.start.max(reader.header_end()))?;
        }
        Ok(Self {
            reader,
            end: split.end(),
            done: false,
        })
    }

    /// Advance to the next record of this split
    pub fn next_record(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        let pos = self.reader.position();
        let more = self.reader.next_record()?;
        if !more || (pos >= self.end && self.reader.sync_seen()) {
            self.done = true;
            return Ok(false);
        }
        Ok(true)
    }

    /// Decode the next record of this split
    pub fn next<K: Writable, V: Writable>(&mut self, key: &mut K, value: &mut V) -> Result<bool> {
        if !self.next_record()? {
            return Ok(false);
        }
        self.reader.decode_key(key)?;
        self.reader.decode_value(value)?;
        Ok(true)
    }

    pub fn key_bytes(&self) -> &[u8] {
        self.reader.key_bytes()
    }

    pub fn value_bytes(&mut self) -> Result<&[u8]> {
        self.reader.value_bytes()
    }

    pub fn reader(&mut self) -> &mut RawSequenceReader {
        &mut self.reader
    }
}

/// Run `visit` over every split on its own thread, returning results in
/// split order
pub fn scan_splits_parallel<T, F>(ctx: &StorageContext, splits: &[FileSplit], visit: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&mut SplitReader) -> Result<T> + Sync,
{
    let visit = &visit;
    let outcome = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = splits
            .iter()
            .map(|split| {
                scope.spawn(move |_| {
                    let mut reader = SplitReader::open(ctx, split)?;
                    visit(&mut reader)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    });

    let joined = match outcome {
        Ok(joined) => joined,
        Err(payload) => std::panic::resume_unwind(payload),
    };
    joined
        .into_iter()
        .map(|result| match result {
            Ok(value) => value,
            Err(payload) => std::panic::resume_unwind(payload),
        })
        .collect()
}
