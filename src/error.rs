//! Error types for seqfile
//!
//! Provides a unified error type for all operations.
//!
//! Not-found lookups and end-of-stream are *not* errors: readers report them
//! through `Option`/`bool` results. Everything here is fatal for the call that
//! produced it.

use thiserror::Error;

/// Result type alias using SeqFileError
pub type Result<T> = std::result::Result<T, SeqFileError>;

/// Unified error type for seqfile operations
#[derive(Debug, Error)]
pub enum SeqFileError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing Errors (file presumed corrupt)
    // -------------------------------------------------------------------------
    /// An in-memory decode ran past its buffer or met an invalid encoding
    #[error("Malformed encoding: {0}")]
    Malformed(String),

    /// A container record or block could not be framed
    #[error("Corrupt container {path} at offset {offset}: {reason}")]
    Framing {
        path: String,
        offset: u64,
        reason: String,
    },

    /// A sync escape was followed by a token other than the header's
    #[error("Sync marker mismatch in {path} at offset {offset}")]
    SyncMismatch { path: String, offset: u64 },

    #[error("{path} is not a sequence file (bad magic)")]
    NotAContainer { path: String },

    #[error("Unsupported container version {found} in {path}")]
    VersionMismatch { path: String, found: u8 },

    // -------------------------------------------------------------------------
    // Type Errors
    // -------------------------------------------------------------------------
    /// Header key/value type differs from the type requested by the opener
    #[error("Type mismatch in {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// Polymorphic decode met a tag or type id with no registered decoder
    #[error("Unresolved type: {0}")]
    UnresolvedType(String),

    // -------------------------------------------------------------------------
    // Compression Errors
    // -------------------------------------------------------------------------
    #[error("Unknown compression codec: {0}")]
    UnknownCodec(String),

    #[error("Compression error: {0}")]
    Compression(String),

    // -------------------------------------------------------------------------
    // Configuration / Usage Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl SeqFileError {
    /// Shorthand for an in-memory decode failure
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        SeqFileError::Malformed(reason.into())
    }

    /// Attach file name and offset to a decode failure.
    ///
    /// Errors that already carry context pass through unchanged.
    pub(crate) fn at(self, path: &str, offset: u64) -> Self {
        match self {
            SeqFileError::Malformed(reason) | SeqFileError::Compression(reason) => {
                SeqFileError::Framing {
                    path: path.to_string(),
                    offset,
                    reason,
                }
            }
            other => other,
        }
    }

    /// True for errors that mean the bytes on disk are not a valid container
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            SeqFileError::Malformed(_)
                | SeqFileError::Framing { .. }
                | SeqFileError::SyncMismatch { .. }
                | SeqFileError::NotAContainer { .. }
                | SeqFileError::VersionMismatch { .. }
                | SeqFileError::Compression(_)
        )
    }
}
