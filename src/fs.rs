//! File-system collaborator
//!
//! All container I/O goes through [`FileSystem`], so the storage layer can run
//! over any path-addressed store that offers buffered streams. Writers track
//! their own byte position; readers seek.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use crate::error::Result;

/// Readable, seekable input stream
pub trait InputStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> InputStream for T {}

/// Writable output stream that can be made durable
pub trait OutputStream: Write + Send {
    /// Flush buffers and persist the written bytes
    fn sync(&mut self) -> io::Result<()>;
}

impl OutputStream for BufWriter<File> {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_ref().sync_all()
    }
}

/// Path-addressed storage used by every reader and writer
pub trait FileSystem: Send + Sync {
    /// Create a file for writing; fails if it exists and `overwrite` is false
    fn create(&self, path: &Path, overwrite: bool) -> Result<Box<dyn OutputStream>>;

    /// Open a file for reading
    fn open(&self, path: &Path) -> Result<Box<dyn InputStream>>;

    /// Length of a file in bytes
    fn len(&self, path: &Path) -> Result<u64>;

    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and any missing parents
    fn mkdirs(&self, path: &Path) -> Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file, or a directory (only when `recursive` unless empty).
    /// Returns false if nothing existed.
    fn delete(&self, path: &Path, recursive: bool) -> Result<bool>;
}

/// [`FileSystem`] over the local disk
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    /// Capacity of the buffered streams handed out
    buffer_size: usize,
}

impl LocalFileSystem {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl FileSystem for LocalFileSystem {
    fn create(&self, path: &Path, overwrite: bool) -> Result<Box<dyn OutputStream>> {
        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(path)?;
        Ok(Box::new(BufWriter::with_capacity(self.buffer_size, file)))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn InputStream>> {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::with_capacity(self.buffer_size, file)))
    }

    fn len(&self, path: &Path) -> Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn mkdirs(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to)?;
        Ok(())
    }

    fn delete(&self, path: &Path, recursive: bool) -> Result<bool> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if metadata.is_dir() {
            if recursive {
                fs::remove_dir_all(path)?;
            } else {
                fs::remove_dir(path)?;
            }
        } else {
            fs::remove_file(path)?;
        }
        Ok(true)
    }
}
