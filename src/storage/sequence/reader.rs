//! Sequence File Reader
//!
//! Reads records sequentially, resynchronizes on sync markers, and decodes
//! values lazily.
//!
//! End of file and a truncated tail both end iteration cleanly (`Ok(false)`);
//! a malformed length or a foreign sync token is a framing error carrying the
//! file name and offset.

use std::io::{self, Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::buffer::{DataInputBuffer, DataOutputBuffer};
use crate::compress::CompressionCodec;
use crate::context::StorageContext;
use crate::error::{Result, SeqFileError};
use crate::fs::InputStream;
use crate::writable::{varint, Writable};

use super::{CompressionType, Header, SYNC_ESCAPE, SYNC_HASH_SIZE, SYNC_SIZE};

/// Bytes read per step while scanning for a sync marker
const SCAN_CHUNK: usize = 64 * 1024;

/// Decoded columns of the current block
struct BlockCursor {
    /// Offset of the block's sync marker
    start: u64,
    remaining: usize,
    key_lengths: DataInputBuffer,
    keys: DataInputBuffer,
    value_lengths: DataInputBuffer,
    values: DataInputBuffer,
}

impl BlockCursor {
    fn next(&mut self) -> Result<(Bytes, Bytes)> {
        let key_len = self.key_lengths.read_vint_range(0, i32::MAX)? as usize;
        let key = self.keys.read_bytes(key_len)?;
        let value_len = self.value_lengths.read_vint_range(0, i32::MAX)? as usize;
        let value = self.values.read_bytes(value_len)?;
        self.remaining -= 1;
        Ok((key, value))
    }
}

/// Detached copy of one record as stored
#[derive(Debug, Clone)]
pub(crate) struct RecordSnapshot {
    key: Bytes,
    value: Bytes,
    value_compressed: bool,
    offset: u64,
    sync_seen: bool,
}

// =============================================================================
// Raw Reader
// =============================================================================

/// Reader over encoded records; performs no type checks
pub struct RawSequenceReader {
    path: String,
    input: Box<dyn InputStream>,
    header: Header,
    /// Offset of the first byte after the header
    header_end: u64,
    /// File length at open
    end: u64,
    /// Stream offset of the next unread byte
    pos: u64,
    codec: Option<Arc<dyn CompressionCodec>>,
    /// A sync marker preceded the current record
    sync_seen: bool,
    block: Option<BlockCursor>,
    /// Current record
    key: Bytes,
    value: Bytes,
    value_compressed: bool,
    record_offset: u64,
    has_record: bool,
    /// Record handed out again by the next `next_record`
    pushed_back: Option<RecordSnapshot>,
}

impl RawSequenceReader {
    /// Open a container and read its header
    pub fn open(ctx: &StorageContext, path: &Path) -> Result<Self> {
        let path_str = path.display().to_string();
        let end = ctx.fs.len(path)?;
        let mut input = ctx.fs.open(path)?;
        let header = Header::read(&mut input, &path_str, end)?;
        let header_end = input.stream_position()?;

        let codec = match (&header.compression, &header.codec) {
            (CompressionType::None, _) => None,
            (_, Some(name)) => Some(ctx.codecs.get(name)?),
            (_, None) => {
                return Err(SeqFileError::Framing {
                    path: path_str,
                    offset: 0,
                    reason: "compressed file names no codec".into(),
                })
            }
        };

        debug!(
            path = %path_str,
            key_type = %header.key_type,
            value_type = %header.value_type,
            compression = %header.compression,
            length = end,
            "Opened sequence file"
        );

        Ok(Self {
            path: path_str,
            input,
            header,
            header_end,
            end,
            pos: header_end,
            codec,
            sync_seen: false,
            block: None,
            key: Bytes::new(),
            value: Bytes::new(),
            value_compressed: false,
            record_offset: header_end,
            has_record: false,
            pushed_back: None,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// File length in bytes
    pub fn len(&self) -> u64 {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.header_end
    }

    /// Offset of the first record
    pub fn header_end(&self) -> u64 {
        self.header_end
    }

    /// Offset of the next unread byte.
    ///
    /// In block mode this stays at the end of the current block until every
    /// record in it has been returned.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// True when a sync marker was crossed to reach the current record
    pub fn sync_seen(&self) -> bool {
        self.sync_seen
    }

    // =========================================================================
    // Positioning
    // =========================================================================

    /// Move to an exact record or block boundary.
    ///
    /// `offset` must come from a writer's `position()` or an index; offsets
    /// inside the header land on the first record. Use [`sync`](Self::sync)
    /// for arbitrary offsets.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        let target = offset.max(self.header_end).min(self.end);
        self.input.seek(SeekFrom::Start(target))?;
        self.pos = target;
        self.block = None;
        self.has_record = false;
        self.sync_seen = false;
        self.pushed_back = None;
        Ok(())
    }

    /// Move to the first sync marker at or after `position`, or to the end
    pub fn sync(&mut self, position: u64) -> Result<()> {
        if position < self.header_end {
            self.seek(self.header_end)?;
            self.sync_seen = true;
            return Ok(());
        }
        if position + SYNC_SIZE as u64 > self.end {
            return self.seek(self.end);
        }

        let mut pattern = [0u8; SYNC_SIZE];
        pattern[..4].copy_from_slice(&SYNC_ESCAPE.to_be_bytes());
        pattern[4..].copy_from_slice(&self.header.sync);

        self.input.seek(SeekFrom::Start(position))?;
        let mut window: Vec<u8> = Vec::with_capacity(SCAN_CHUNK + SYNC_SIZE);
        let mut window_start = position;
        let mut chunk = vec![0u8; SCAN_CHUNK];

        loop {
            let n = match self.input.read(&mut chunk) {
                Ok(0) => return self.seek(self.end),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            window.extend_from_slice(&chunk[..n]);

            if let Some(i) = window.windows(SYNC_SIZE).position(|w| w == pattern) {
                let found = window_start + i as u64;
                trace!(path = %self.path, from = position, found, "Synced to marker");
                return self.seek(found);
            }

            // Keep a tail so a marker split across chunks is still found
            let keep = window.len().min(SYNC_SIZE - 1);
            let consumed = window.len() - keep;
            window.drain(..consumed);
            window_start += consumed as u64;
        }
    }

    // =========================================================================
    // Record Iteration
    // =========================================================================

    /// Advance to the next record; `false` at end of stream
    pub fn next_record(&mut self) -> Result<bool> {
        if let Some(snapshot) = self.pushed_back.take() {
            self.restore(snapshot);
            return Ok(true);
        }
        self.has_record = false;
        if self.header.compression == CompressionType::Block {
            return self.next_block_record();
        }

        self.sync_seen = false;
        loop {
            if self.pos >= self.end {
                return Ok(false);
            }
            let record_start = self.pos;
            let Some(len) = self.read_i32()? else {
                return self.truncated(record_start);
            };

            if len == SYNC_ESCAPE {
                if !self.read_sync_token(record_start)? {
                    return self.truncated(record_start);
                }
                self.sync_seen = true;
                continue;
            }
            if len < 0 {
                return Err(self.framing(record_start, format!("negative record length {}", len)));
            }

            let Some(key_len) = self.read_i32()? else {
                return self.truncated(record_start);
            };
            if key_len < 0 || key_len > len {
                return Err(self.framing(
                    record_start,
                    format!("key length {} outside record length {}", key_len, len),
                ));
            }
            if len as u64 > self.end - self.pos {
                return self.truncated(record_start);
            }

            let mut buf = vec![0u8; len as usize];
            if !self.read_fully(&mut buf)? {
                return self.truncated(record_start);
            }
            let mut bytes = Bytes::from(buf);
            self.key = bytes.split_to(key_len as usize);
            self.value = bytes;
            self.value_compressed = self.header.compression == CompressionType::Record;
            self.record_offset = record_start;
            self.has_record = true;
            return Ok(true);
        }
    }

    fn next_block_record(&mut self) -> Result<bool> {
        let exhausted = self.block.as_ref().map_or(true, |b| b.remaining == 0);
        if exhausted {
            if !self.read_block()? {
                return Ok(false);
            }
            self.sync_seen = true;
        } else {
            self.sync_seen = false;
        }

        let Some(block) = self.block.as_mut() else {
            return Ok(false);
        };
        let start = block.start;
        let (key, value) = block.next().map_err(|e| e.at(&self.path, start))?;
        self.key = key;
        self.value = value;
        self.value_compressed = false;
        self.record_offset = start;
        self.has_record = true;
        Ok(true)
    }

    /// Read and decompress the next block; `false` at end of stream
    fn read_block(&mut self) -> Result<bool> {
        self.block = None;
        if self.pos >= self.end {
            return Ok(false);
        }
        let start = self.pos;

        let Some(escape) = self.read_i32()? else {
            return self.truncated(start);
        };
        if escape != SYNC_ESCAPE {
            return Err(self.framing(start, "block does not start with a sync marker".into()));
        }
        if !self.read_sync_token(start)? {
            return self.truncated(start);
        }
        let Some(count) = self.read_stream_vint()? else {
            return self.truncated(start);
        };
        if count <= 0 || count > i32::MAX as i64 {
            return Err(self.framing(start, format!("invalid block record count {}", count)));
        }

        let codec = self
            .codec
            .clone()
            .ok_or_else(|| self.framing(start, "block without a codec".into()))?;

        let mut columns: [DataInputBuffer; 4] = Default::default();
        for column in columns.iter_mut() {
            let Some(len) = self.read_stream_vint()? else {
                return self.truncated(start);
            };
            if len < 0 {
                return Err(self.framing(start, format!("negative column length {}", len)));
            }
            if len as u64 > self.end - self.pos {
                return self.truncated(start);
            }
            let mut compressed = vec![0u8; len as usize];
            if !self.read_fully(&mut compressed)? {
                return self.truncated(start);
            }
            let raw = codec.decompress(&compressed).map_err(|e| e.at(&self.path, start))?;
            column.reset(raw);
        }

        let [key_lengths, keys, value_lengths, values] = columns;
        trace!(path = %self.path, offset = start, records = count, "Read block");
        self.block = Some(BlockCursor {
            start,
            remaining: count as usize,
            key_lengths,
            keys,
            value_lengths,
            values,
        });
        Ok(true)
    }

    /// Offset that `seek` takes to re-read the current record: the record
    /// itself, or its block in block mode
    pub fn record_offset(&self) -> u64 {
        self.record_offset
    }

    pub(crate) fn snapshot(&self) -> Option<RecordSnapshot> {
        self.has_record.then(|| RecordSnapshot {
            key: self.key.clone(),
            value: self.value.clone(),
            value_compressed: self.value_compressed,
            offset: self.record_offset,
            sync_seen: self.sync_seen,
        })
    }

    /// Make `snapshot` the current record without moving the stream
    pub(crate) fn restore(&mut self, snapshot: RecordSnapshot) {
        self.key = snapshot.key;
        self.value = snapshot.value;
        self.value_compressed = snapshot.value_compressed;
        self.record_offset = snapshot.offset;
        self.sync_seen = snapshot.sync_seen;
        self.has_record = true;
    }

    /// Return the current record again from the next `next_record`
    pub(crate) fn unread(&mut self) {
        self.pushed_back = self.snapshot();
    }

    /// Encoded key of the current record
    pub fn key_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Encoded value of the current record, decompressed on first access
    pub fn value_bytes(&mut self) -> Result<&[u8]> {
        if !self.has_record {
            return Err(SeqFileError::InvalidArgument("no current record".into()));
        }
        if self.value_compressed {
            let codec = self
                .codec
                .clone()
                .ok_or_else(|| self.framing(self.record_offset, "record without a codec".into()))?;
            let raw = codec
                .decompress(&self.value)
                .map_err(|e| e.at(&self.path, self.record_offset))?;
            self.value = Bytes::from(raw);
            self.value_compressed = false;
        }
        Ok(&self.value)
    }

    /// Encoded key and (decompressed) value of the current record
    pub fn record(&mut self) -> Result<(&[u8], &[u8])> {
        self.value_bytes()?;
        Ok((&self.key, &self.value))
    }

    /// Copy the next record's encoded key and value into the buffers
    pub fn next_raw(&mut self, key: &mut DataOutputBuffer, value: &mut DataOutputBuffer) -> Result<bool> {
        if !self.next_record()? {
            return Ok(false);
        }
        key.reset();
        key.write_bytes(&self.key);
        let bytes = self.value_bytes()?;
        value.reset();
        value.write_bytes(bytes);
        Ok(true)
    }

    /// Decode the current key into `key`
    pub fn decode_key<K: Writable>(&self, key: &mut K) -> Result<()> {
        if !self.has_record {
            return Err(SeqFileError::InvalidArgument("no current record".into()));
        }
        let mut input = DataInputBuffer::from_bytes(self.key.clone());
        self.decode_exact(&mut input, key, "key")
    }

    /// Decode the current value into `value`
    pub fn decode_value<V: Writable>(&mut self, value: &mut V) -> Result<()> {
        self.value_bytes()?;
        let mut input = DataInputBuffer::from_bytes(self.value.clone());
        self.decode_exact(&mut input, value, "value")
    }

    fn decode_exact<W: Writable>(&self, input: &mut DataInputBuffer, target: &mut W, what: &str) -> Result<()> {
        target
            .read_fields(input)
            .map_err(|e| e.at(&self.path, self.record_offset))?;
        if input.remaining() != 0 {
            return Err(self.framing(
                self.record_offset,
                format!("{} {} left {} bytes unread", what, W::type_name(), input.remaining()),
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Stream Helpers
    // =========================================================================

    /// Fill `buf`; `false` if the file ends first
    fn read_fully(&mut self, buf: &mut [u8]) -> Result<bool> {
        match self.input.read_exact(buf) {
            Ok(()) => {
                self.pos += buf.len() as u64;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn read_i32(&mut self) -> Result<Option<i32>> {
        let mut buf = [0u8; 4];
        Ok(self.read_fully(&mut buf)?.then(|| i32::from_be_bytes(buf)))
    }

    fn read_stream_vint(&mut self) -> Result<Option<i64>> {
        let mut buf = [0u8; varint::MAX_VINT_SIZE];
        if !self.read_fully(&mut buf[..1])? {
            return Ok(None);
        }
        let size = varint::decode_vint_size(buf[0]);
        if size > 1 && !self.read_fully(&mut buf[1..size])? {
            return Ok(None);
        }
        let (value, _) = varint::decode_vlong(&buf[..size])?;
        Ok(Some(value))
    }

    /// Read the token after a sync escape; `false` if the file ends first
    fn read_sync_token(&mut self, offset: u64) -> Result<bool> {
        let mut token = [0u8; SYNC_HASH_SIZE];
        if !self.read_fully(&mut token)? {
            return Ok(false);
        }
        if token != self.header.sync {
            return Err(SeqFileError::SyncMismatch {
                path: self.path.clone(),
                offset,
            });
        }
        Ok(true)
    }

    /// Stop iteration at a truncated tail
    fn truncated(&mut self, offset: u64) -> Result<bool> {
        warn!(
            path = %self.path,
            offset,
            length = self.end,
            "Truncated record at end of file, stopping"
        );
        self.pos = self.end;
        self.block = None;
        self.has_record = false;
        Ok(false)
    }

    fn framing(&self, offset: u64, reason: String) -> SeqFileError {
        SeqFileError::Framing {
            path: self.path.clone(),
            offset,
            reason,
        }
    }
}

// =============================================================================
// Typed Reader
// =============================================================================

/// Reader that checks the header's key and value types against `K` and `V`
pub struct SequenceReader<K, V> {
    raw: RawSequenceReader,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K: Writable, V: Writable> SequenceReader<K, V> {
    /// Open a container; fails if its types are not `K` and `V`
    pub fn open(ctx: &StorageContext, path: &Path) -> Result<Self> {
        let raw = RawSequenceReader::open(ctx, path)?;
        check_type(raw.path(), &K::type_name(), &raw.header().key_type)?;
        check_type(raw.path(), &V::type_name(), &raw.header().value_type)?;
        Ok(Self {
            raw,
            _marker: PhantomData,
        })
    }

    /// Decode the next record into `key` and `value`; `false` at end of stream.
    ///
    /// Both are overwritten in place, so anything kept from the previous call
    /// must be copied first.
    pub fn next(&mut self, key: &mut K, value: &mut V) -> Result<bool> {
        if !self.raw.next_record()? {
            return Ok(false);
        }
        self.raw.decode_key(key)?;
        self.raw.decode_value(value)?;
        Ok(true)
    }

    /// Decode only the next key; the value stays available through
    /// [`current_value`](Self::current_value)
    pub fn next_key(&mut self, key: &mut K) -> Result<bool> {
        if !self.raw.next_record()? {
            return Ok(false);
        }
        self.raw.decode_key(key)?;
        Ok(true)
    }

    /// Decode the value of the record returned by the last `next_key`
    pub fn current_value(&mut self, value: &mut V) -> Result<()> {
        self.raw.decode_value(value)
    }

    pub fn next_raw(&mut self, key: &mut DataOutputBuffer, value: &mut DataOutputBuffer) -> Result<bool> {
        self.raw.next_raw(key, value)
    }

    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.raw.seek(offset)
    }

    pub fn sync(&mut self, position: u64) -> Result<()> {
        self.raw.sync(position)
    }

    pub fn sync_seen(&self) -> bool {
        self.raw.sync_seen()
    }

    pub fn position(&self) -> u64 {
        self.raw.position()
    }

    pub fn len(&self) -> u64 {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn header(&self) -> &Header {
        self.raw.header()
    }

    pub fn raw(&mut self) -> &mut RawSequenceReader {
        &mut self.raw
    }

    pub fn into_raw(self) -> RawSequenceReader {
        self.raw
    }

    /// Iterate over fresh copies of the remaining records
    pub fn records(&mut self) -> Records<'_, K, V>
    where
        K: Default,
        V: Default,
    {
        Records {
            reader: self,
            done: false,
        }
    }
}

fn check_type(path: &str, expected: &str, found: &str) -> Result<()> {
    if expected != found {
        return Err(SeqFileError::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Iterator returned by [`SequenceReader::records`]
pub struct Records<'a, K, V> {
    reader: &'a mut SequenceReader<K, V>,
    done: bool,
}

impl<K: Writable + Default, V: Writable + Default> Iterator for Records<'_, K, V> {
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut key = K::default();
        let mut value = V::default();
        match self.reader.next(&mut key, &mut value) {
            Ok(true) => Some(Ok((key, value))),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
