//! Decoded PNG metadata: image size plus the key/value text annotations.
//!
//! - [`read_metadata`]: open a file and extract everything in one call
//! - [`extract`]: run the extraction over an already-open [`ChunkReader`](crate::png::ChunkReader)

mod extractor;

pub use extractor::{extract, read_metadata};

use serde::Serialize;
use std::fmt;

use crate::error::{MetadataError, Result};

/// One textual annotation, e.g. `parameters` → `a cat, 20 steps, ...`.
///
/// The keyword is trimmed on construction; the value is kept byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    keyword: String,
    value: String,
}

impl MetadataRecord {
    pub fn new(keyword: &str, value: impl Into<String>) -> Self {
        Self {
            keyword: keyword.trim().to_string(),
            value: value.into(),
        }
    }

    /// Build a record from a keyword that may be absent.
    ///
    /// An absent keyword is always a [`MetadataError::InvalidArgument`],
    /// whatever the value.
    pub fn try_new(keyword: Option<&str>, value: impl Into<String>) -> Result<Self> {
        match keyword {
            Some(keyword) => Ok(Self::new(keyword, value)),
            None => Err(MetadataError::InvalidArgument(
                "keyword must not be absent".to_string(),
            )),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for MetadataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.keyword, self.value)
    }
}

/// Image dimensions in pixels, both at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageSize {
    width: u32,
    height: u32,
}

impl ImageSize {
    /// Fails with [`MetadataError::InvalidFormat`] if either side is zero.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MetadataError::invalid_format(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Everything extracted from one PNG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PngMetadata {
    pub size: ImageSize,
    /// Text records in the order their chunks appear in the file.
    pub records: Vec<MetadataRecord>,
}

impl PngMetadata {
    /// Value of the first record whose keyword matches, ignoring ASCII case.
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.keyword.eq_ignore_ascii_case(keyword))
            .map(|r| r.value.as_str())
    }
}
