//! Storage context
//!
//! Everything a reader or writer needs from its surroundings, passed in
//! explicitly: options, the file system, and the comparator, codec, and
//! record-type registries.

use std::sync::Arc;

use crate::comparator::ComparatorRegistry;
use crate::compress::CodecFactory;
use crate::config::Config;
use crate::error::Result;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::writable::TypeRegistry;

/// Shared collaborators for readers and writers.
///
/// Cheap to clone; clones share the same registries.
#[derive(Clone)]
pub struct StorageContext {
    pub config: Config,
    pub fs: Arc<dyn FileSystem>,
    pub comparators: Arc<ComparatorRegistry>,
    pub codecs: Arc<CodecFactory>,
    pub types: Arc<TypeRegistry>,
}

impl StorageContext {
    /// Context over the local disk with default registries
    pub fn local(config: Config) -> Result<Self> {
        config.validate()?;
        let fs = Arc::new(LocalFileSystem::new(config.io_buffer_size));
        Ok(Self {
            config,
            fs,
            comparators: Arc::new(ComparatorRegistry::new()),
            codecs: Arc::new(CodecFactory::new()),
            types: Arc::new(TypeRegistry::new()),
        })
    }

    /// Same collaborators, different options
    pub fn with_config(&self, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..self.clone()
        })
    }

    /// Same options and registries over another file system
    pub fn with_fs(&self, fs: Arc<dyn FileSystem>) -> Self {
        Self { fs, ..self.clone() }
    }
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("config", &self.config)
            .field("codecs", &self.codecs.names())
            .field("types", &self.types.len())
            .finish_non_exhaustive()
    }
}
