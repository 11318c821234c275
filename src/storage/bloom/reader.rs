//! Bloom Map File Reader

use std::ops::{Deref, DerefMut};
use std::path::Path;

use tracing::{debug, warn};

use crate::buffer::DataOutputBuffer;
use crate::context::StorageContext;
use crate::error::{Result, SeqFileError};
use crate::storage::map::MapFileReader;
use crate::storage::sequence::SequenceReader;
use crate::writable::{NullWritable, Writable, WritableComparable};

use super::{DynamicBloomFilter, BLOOM_FILE_NAME};

/// Map file reader that consults the Bloom filter before each `get`.
///
/// Everything else derefs to the underlying [`MapFileReader`].
pub struct BloomMapFileReader<K, V> {
    inner: MapFileReader<K, V>,
    /// `None` when the filter could not be loaded
    filter: Option<DynamicBloomFilter>,
    key_buf: DataOutputBuffer,
}

impl<K, V> BloomMapFileReader<K, V>
where
    K: WritableComparable + Default + 'static,
    V: Writable,
{
    /// Open the map file and load its filter.
    ///
    /// A missing or unreadable filter is logged and the reader falls back
    /// to plain map file lookups.
    pub fn open(ctx: &StorageContext, dir: &Path) -> Result<Self> {
        let inner = MapFileReader::open(ctx, dir)?;
        let filter = match load_filter(ctx, &dir.join(BLOOM_FILE_NAME)) {
            Ok(filter) => {
                debug!(dir = %dir.display(), ?filter, "Loaded bloom filter");
                Some(filter)
            }
            Err(e) => {
                warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Can't open bloom filter, falling back to map file lookups"
                );
                None
            }
        };

        Ok(Self {
            inner,
            filter,
            key_buf: DataOutputBuffer::new(),
        })
    }

    /// False only if `key` is certainly absent
    pub fn probably_has_key(&mut self, key: &K) -> Result<bool> {
        let Some(filter) = &self.filter else {
            return Ok(true);
        };
        self.key_buf.reset();
        key.write(&mut self.key_buf)?;
        Ok(filter.membership_test(self.key_buf.data()))
    }

    /// Decode the value stored under `key`; filtered keys return `false`
    /// without reading the map file
    pub fn get(&mut self, key: &K, value: &mut V) -> Result<bool> {
        if !self.probably_has_key(key)? {
            return Ok(false);
        }
        self.inner.get(key, value)
    }

    /// The loaded filter, if any
    pub fn bloom_filter(&self) -> Option<&DynamicBloomFilter> {
        self.filter.as_ref()
    }
}

impl<K, V> Deref for BloomMapFileReader<K, V> {
    type Target = MapFileReader<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<K, V> DerefMut for BloomMapFileReader<K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

fn load_filter(ctx: &StorageContext, path: &Path) -> Result<DynamicBloomFilter> {
    let mut reader = SequenceReader::<NullWritable, DynamicBloomFilter>::open(ctx, path)?;
    let mut key = NullWritable;
    let mut filter = DynamicBloomFilter::default();
    if !reader.next(&mut key, &mut filter)? {
        return Err(SeqFileError::Framing {
            path: path.display().to_string(),
            offset: reader.position(),
            reason: "bloom file holds no filter".into(),
        });
    }
    Ok(filter)
}
