//! Container header and metadata

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::Path;

use rand::RngCore;

use crate::buffer::DataOutputBuffer;
use crate::context::StorageContext;
use crate::error::{Result, SeqFileError};
use crate::writable::{varint, Text};

use super::{CompressionType, MAGIC, SYNC_HASH_SIZE, VERSION};

// =============================================================================
// Metadata
// =============================================================================

/// String-keyed metadata stored in the header, kept sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write(&self, out: &mut DataOutputBuffer) {
        out.write_i32(self.entries.len() as i32);
        for (name, value) in &self.entries {
            Text::write_string(out, name);
            Text::write_string(out, value);
        }
    }

    fn read<R: Read>(input: &mut R, limit: u64) -> Result<Self> {
        let mut count = [0u8; 4];
        input.read_exact(&mut count)?;
        let count = i32::from_be_bytes(count);
        if count < 0 {
            return Err(SeqFileError::malformed(format!("negative metadata count {}", count)));
        }
        let mut metadata = Metadata::new();
        for _ in 0..count {
            let name = read_string(input, limit)?;
            let value = read_string(input, limit)?;
            metadata.entries.insert(name, value);
        }
        Ok(metadata)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// =============================================================================
// Header
// =============================================================================

/// Everything written once at the start of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub key_type: String,
    pub value_type: String,
    pub compression: CompressionType,
    /// Present exactly when compression is not `None`
    pub codec: Option<String>,
    pub metadata: Metadata,
    /// Random token that follows every sync escape in this file
    pub sync: [u8; SYNC_HASH_SIZE],
}

impl Header {
    /// New header with a fresh random sync token
    pub(crate) fn new(
        key_type: String,
        value_type: String,
        compression: CompressionType,
        codec: Option<String>,
        metadata: Metadata,
    ) -> Self {
        let mut sync = [0u8; SYNC_HASH_SIZE];
        rand::thread_rng().fill_bytes(&mut sync);
        Self {
            version: VERSION,
            key_type,
            value_type,
            compression,
            codec,
            metadata,
            sync,
        }
    }

    pub(crate) fn write(&self, out: &mut DataOutputBuffer) {
        out.write_bytes(MAGIC);
        out.write_u8(self.version);
        Text::write_string(out, &self.key_type);
        Text::write_string(out, &self.value_type);
        out.write_u8(self.compression.to_byte());
        if let Some(codec) = &self.codec {
            Text::write_string(out, codec);
        }
        self.metadata.write(out);
        out.write_bytes(&self.sync);
    }

    /// Read a header from the start of a stream.
    ///
    /// `file_len` bounds every length prefix so garbage cannot trigger huge
    /// allocations.
    pub(crate) fn read<R: Read>(input: &mut R, path: &str, file_len: u64) -> Result<Self> {
        let mut magic = [0u8; 4];
        match input.read_exact(&mut magic) {
            Ok(()) if &magic == MAGIC => {}
            Ok(()) => {
                return Err(SeqFileError::NotAContainer {
                    path: path.to_string(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(SeqFileError::NotAContainer {
                    path: path.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        Self::read_body(input, path, file_len).map_err(|e| match e {
            SeqFileError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => SeqFileError::Framing {
                path: path.to_string(),
                offset: 0,
                reason: "truncated header".to_string(),
            },
            other => other.at(path, 0),
        })
    }

    fn read_body<R: Read>(input: &mut R, path: &str, file_len: u64) -> Result<Self> {
        let mut byte = [0u8; 1];
        input.read_exact(&mut byte)?;
        let version = byte[0];
        if version != VERSION {
            return Err(SeqFileError::VersionMismatch {
                path: path.to_string(),
                found: version,
            });
        }

        let key_type = read_string(input, file_len)?;
        let value_type = read_string(input, file_len)?;

        input.read_exact(&mut byte)?;
        let compression = CompressionType::from_byte(byte[0])?;
        let codec = match compression {
            CompressionType::None => None,
            _ => Some(read_string(input, file_len)?),
        };

        let metadata = Metadata::read(input, file_len)?;

        let mut sync = [0u8; SYNC_HASH_SIZE];
        input.read_exact(&mut sync)?;

        Ok(Self {
            version,
            key_type,
            value_type,
            compression,
            codec,
            metadata,
            sync,
        })
    }

    /// Read only the header of a container
    pub fn read_from(ctx: &StorageContext, path: &Path) -> Result<Self> {
        let file_len = ctx.fs.len(path)?;
        let mut input = ctx.fs.open(path)?;
        Self::read(&mut input, &path.display().to_string(), file_len)
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        let mut out = DataOutputBuffer::new();
        self.write(&mut out);
        out.len()
    }
}

fn read_string<R: Read>(input: &mut R, limit: u64) -> Result<String> {
    let len = varint::read_vlong(input)?;
    if len < 0 || len as u64 > limit {
        return Err(SeqFileError::malformed(format!("invalid string length {}", len)));
    }
    let mut bytes = vec![0u8; len as usize];
    input.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| SeqFileError::malformed(format!("invalid UTF-8: {}", e)))
}
