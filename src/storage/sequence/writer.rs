//! Sequence File Writer
//!
//! Writes the header on create, then appends records. In block mode records
//! accumulate in four column buffers that are compressed and written together
//! behind a sync marker.

use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::buffer::DataOutputBuffer;
use crate::compress::CompressionCodec;
use crate::context::StorageContext;
use crate::error::{Result, SeqFileError};
use crate::fs::OutputStream;
use crate::writable::Writable;

use super::{CompressionType, Header, Metadata, SYNC_ESCAPE, SYNC_SIZE};

// =============================================================================
// Writer Options
// =============================================================================

/// Options for creating a sequence file.
///
/// Unset values fall back to the context's [`Config`](crate::Config).
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    pub compression: CompressionType,
    /// Codec name; defaults to `config.default_codec` when compressing
    pub codec: Option<String>,
    pub metadata: Metadata,
    /// Bytes between sync markers (record modes)
    pub sync_interval: Option<u64>,
    /// Uncompressed bytes buffered per block (block mode)
    pub block_size: Option<usize>,
    /// Replace an existing file instead of failing
    pub overwrite: bool,
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    pub fn codec(mut self, name: impl Into<String>) -> Self {
        self.codec = Some(name.into());
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn sync_interval(mut self, bytes: u64) -> Self {
        self.sync_interval = Some(bytes);
        self
    }

    pub fn block_size(mut self, bytes: usize) -> Self {
        self.block_size = Some(bytes);
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

// =============================================================================
// Raw Writer
// =============================================================================

/// Column buffers for the block being assembled
#[derive(Debug, Default)]
struct PendingBlock {
    records: usize,
    key_lengths: DataOutputBuffer,
    keys: DataOutputBuffer,
    value_lengths: DataOutputBuffer,
    values: DataOutputBuffer,
}

impl PendingBlock {
    fn data_len(&self) -> usize {
        self.keys.len() + self.values.len()
    }

    fn reset(&mut self) {
        self.records = 0;
        self.key_lengths.reset();
        self.keys.reset();
        self.value_lengths.reset();
        self.values.reset();
    }
}

/// Writer over already-encoded keys and values.
///
/// Type names are recorded in the header but never checked against the
/// bytes appended.
pub struct RawSequenceWriter {
    /// Output file path
    path: PathBuf,
    out: Box<dyn OutputStream>,
    header: Header,
    codec: Option<Arc<dyn CompressionCodec>>,
    /// Bytes written to `out` so far
    position: u64,
    /// Position of the last sync marker (or the header end)
    last_sync: u64,
    sync_interval: u64,
    block_size: usize,
    block: PendingBlock,
    /// Scratch for one framed record or block
    scratch: DataOutputBuffer,
    records: u64,
    closed: bool,
}

impl RawSequenceWriter {
    /// Create the file and write its header
    pub fn create(
        ctx: &StorageContext,
        path: &Path,
        key_type: &str,
        value_type: &str,
        options: WriterOptions,
    ) -> Result<Self> {
        let codec = match options.compression {
            CompressionType::None => None,
            _ => {
                let name = options
                    .codec
                    .clone()
                    .unwrap_or_else(|| ctx.config.default_codec.clone());
                Some(ctx.codecs.get(&name)?)
            }
        };

        let header = Header::new(
            key_type.to_string(),
            value_type.to_string(),
            options.compression,
            codec.as_ref().map(|c| c.name().to_string()),
            options.metadata,
        );

        let mut out = ctx.fs.create(path, options.overwrite)?;
        let mut scratch = DataOutputBuffer::with_capacity(4096);
        header.write(&mut scratch);
        out.write_all(scratch.data())?;
        let position = scratch.len() as u64;
        scratch.reset();

        debug!(
            path = %path.display(),
            key_type,
            value_type,
            compression = %options.compression,
            "Created sequence file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            out,
            header,
            codec,
            position,
            last_sync: position,
            sync_interval: options.sync_interval.unwrap_or(ctx.config.sync_interval),
            block_size: options.block_size.unwrap_or(ctx.config.compress_block_size),
            block: PendingBlock::default(),
            scratch,
            records: 0,
            closed: false,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended so far
    pub fn record_count(&self) -> u64 {
        self.records
    }

    /// Bytes written to the file so far.
    ///
    /// In block mode this is where the pending block will start, so it is a
    /// valid seek target for every record buffered in it.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Append one record from its encoded key and value
    pub fn append_raw(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let key_len = length_i32("key", key.len())?;
        length_i32("value", value.len())?;

        match self.header.compression {
            CompressionType::Block => {
                self.block.key_lengths.write_vint(key_len);
                self.block.keys.write_bytes(key);
                self.block.value_lengths.write_vint(value.len() as i32);
                self.block.values.write_bytes(value);
                self.block.records += 1;
                if self.block.data_len() >= self.block_size {
                    self.write_block()?;
                }
            }
            CompressionType::Record => {
                let compressed = self.compress(value)?;
                self.write_record(key, &compressed)?;
            }
            CompressionType::None => self.write_record(key, value)?,
        }

        self.records += 1;
        Ok(())
    }

    fn write_record(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.sync_interval > 0 && self.position >= self.last_sync + self.sync_interval {
            self.write_sync_marker()?;
        }

        let record_len = length_i32("record", key.len() + value.len())?;
        self.scratch.reset();
        self.scratch.write_i32(record_len);
        self.scratch.write_i32(key.len() as i32);
        self.scratch.write_bytes(key);
        self.scratch.write_bytes(value);
        self.out.write_all(self.scratch.data())?;
        self.position += self.scratch.len() as u64;
        Ok(())
    }

    fn write_sync_marker(&mut self) -> Result<()> {
        self.out.write_all(&SYNC_ESCAPE.to_be_bytes())?;
        self.out.write_all(&self.header.sync)?;
        self.position += SYNC_SIZE as u64;
        self.last_sync = self.position;
        Ok(())
    }

    /// Compress, frame and write the pending block
    fn write_block(&mut self) -> Result<()> {
        if self.block.records == 0 {
            return Ok(());
        }
        let codec = self
            .codec
            .clone()
            .ok_or_else(|| SeqFileError::InvalidArgument("block mode without a codec".into()))?;

        let start = self.position;
        self.write_sync_marker()?;

        self.scratch.reset();
        self.scratch.write_vint(length_i32("block", self.block.records)?);
        for column in [
            &self.block.key_lengths,
            &self.block.keys,
            &self.block.value_lengths,
            &self.block.values,
        ] {
            let compressed = codec.compress(column.data())?;
            self.scratch.write_vint(length_i32("column", compressed.len())?);
            self.scratch.write_bytes(&compressed);
        }
        self.out.write_all(self.scratch.data())?;
        self.position += self.scratch.len() as u64;

        trace!(
            path = %self.path.display(),
            offset = start,
            records = self.block.records,
            raw_bytes = self.block.data_len(),
            stored_bytes = self.position - start,
            "Wrote block"
        );

        self.block.reset();
        Ok(())
    }

    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        match &self.codec {
            Some(codec) => codec.compress(bytes),
            None => Ok(bytes.to_vec()),
        }
    }

    /// Force a sync marker at the current position.
    ///
    /// In block mode this writes out the pending block, which always starts
    /// with a marker.
    pub fn sync(&mut self) -> Result<()> {
        self.ensure_open()?;
        match self.header.compression {
            CompressionType::Block => self.write_block(),
            _ if self.last_sync != self.position => self.write_sync_marker(),
            _ => Ok(()),
        }
    }

    /// Write out any pending block and flush the stream
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.write_block()?;
        self.out.flush()?;
        Ok(())
    }

    /// Write out pending data and make the file durable
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.write_block()?;
        self.out.sync()?;
        self.closed = true;

        debug!(
            path = %self.path.display(),
            records = self.records,
            bytes = self.position,
            "Closed sequence file"
        );
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(SeqFileError::InvalidArgument(format!(
                "writer for {} is closed",
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl Drop for RawSequenceWriter {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                warn!(path = %self.path.display(), error = %e, "Failed to close sequence file on drop");
            }
        }
    }
}

fn length_i32(what: &str, len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| SeqFileError::InvalidArgument(format!("{} length {} exceeds 2 GiB", what, len)))
}

// =============================================================================
// Typed Writer
// =============================================================================

/// Writer whose header records `K` and `V` as the key and value types
pub struct SequenceWriter<K, V> {
    raw: RawSequenceWriter,
    key_buf: DataOutputBuffer,
    value_buf: DataOutputBuffer,
    _marker: PhantomData<fn(&K, &V)>,
}

impl<K: Writable, V: Writable> SequenceWriter<K, V> {
    pub fn create(ctx: &StorageContext, path: &Path, options: WriterOptions) -> Result<Self> {
        let raw = RawSequenceWriter::create(ctx, path, &K::type_name(), &V::type_name(), options)?;
        Ok(Self {
            raw,
            key_buf: DataOutputBuffer::new(),
            value_buf: DataOutputBuffer::new(),
            _marker: PhantomData,
        })
    }

    /// Encode and append one record
    pub fn append(&mut self, key: &K, value: &V) -> Result<()> {
        self.key_buf.reset();
        key.write(&mut self.key_buf)?;
        self.value_buf.reset();
        value.write(&mut self.value_buf)?;
        self.raw.append_raw(self.key_buf.data(), self.value_buf.data())
    }

    /// Append an already-encoded record
    pub fn append_raw(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.raw.append_raw(key, value)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.raw.sync()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.raw.flush()
    }

    pub fn position(&self) -> u64 {
        self.raw.position()
    }

    pub fn record_count(&self) -> u64 {
        self.raw.record_count()
    }

    pub fn header(&self) -> &Header {
        self.raw.header()
    }

    pub fn path(&self) -> &Path {
        self.raw.path()
    }

    pub fn close(&mut self) -> Result<()> {
        self.raw.close()
    }
}
