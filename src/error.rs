//! Error types for PNG metadata extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for chunk reading and metadata extraction.
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Everything that can go wrong while reading metadata out of a PNG.
///
/// Parsing is all-or-nothing: any of these aborts the extraction and no
/// partial result is returned.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The path does not resolve to a readable file.
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The underlying byte source failed for a reason other than running dry.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad signature, or a structurally invalid value such as a zero dimension.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Truncated chunk, text chunk without separator, or missing header chunk.
    #[error("Malformed chunk: {0}")]
    MalformedChunk(String),

    /// A caller passed a value that can never be valid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl MetadataError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedChunk(message.into())
    }

    pub(crate) fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat(message.into())
    }
}
