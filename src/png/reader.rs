use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::chunk::{Chunk, ChunkType};
use crate::error::{MetadataError, Result};

/// The first eight bytes of every PNG datastream.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Largest chunk length the PNG format allows (2^31 - 1).
pub const MAX_CHUNK_LENGTH: u32 = i32::MAX as u32;

// Cap on the up-front payload allocation; the rest grows as bytes arrive.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// Forward-only reader over a PNG byte stream.
///
/// Construction validates the signature, so a `ChunkReader` always sits on a
/// chunk boundary. Each [`next_chunk`](Self::next_chunk) call consumes one
/// complete chunk including its CRC footer, which is skipped without being
/// checked.
#[derive(Debug)]
pub struct ChunkReader<R> {
    source: R,
    position: u64,
}

impl ChunkReader<BufReader<File>> {
    /// Open a PNG file and validate its signature.
    pub fn open(path: &Path) -> Result<Self> {
        let not_found = || MetadataError::NotFound { path: path.to_path_buf() };

        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(not_found()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        }

        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => not_found(),
            _ => MetadataError::Io(e),
        })?;

        log::debug!("Opened {}", path.display());
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> ChunkReader<R> {
    /// Wrap any byte source. The signature is read and checked immediately.
    pub fn new(source: R) -> Result<Self> {
        let mut reader = Self { source, position: 0 };
        reader.check_signature()?;
        Ok(reader)
    }

    /// Number of bytes consumed from the source so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next chunk.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly on a chunk boundary.
    /// A stream that ends anywhere inside a chunk is a
    /// [`MetadataError::MalformedChunk`].
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let start = self.position;

        let mut length_bytes = [0u8; 4];
        match self.fill(&mut length_bytes)? {
            0 => return Ok(None),
            4 => {}
            n => {
                return Err(MetadataError::malformed(format!(
                    "truncated file: only {n} of 4 length bytes at offset {start}"
                )));
            }
        }

        let length = u32::from_be_bytes(length_bytes);
        if length > MAX_CHUNK_LENGTH {
            return Err(MetadataError::malformed(format!(
                "chunk at offset {start} declares length {length}, above the PNG limit"
            )));
        }

        let chunk_type = ChunkType(self.read_field("chunk type")?);

        let mut payload = Vec::with_capacity((length as usize).min(PREALLOC_LIMIT));
        let read = (&mut self.source).take(u64::from(length)).read_to_end(&mut payload)?;
        self.position += read as u64;
        if read < length as usize {
            return Err(MetadataError::malformed(format!(
                "truncated file: {chunk_type} chunk at offset {start} declares {length} bytes, only {read} present"
            )));
        }

        // CRC footer; skipped, not validated.
        self.read_field("CRC")?;

        log::trace!("{chunk_type} chunk at offset {start}, {length} bytes");
        Ok(Some(Chunk { chunk_type, payload }))
    }

    fn check_signature(&mut self) -> Result<()> {
        let mut signature = [0u8; 8];
        let n = self.fill(&mut signature)?;
        if n < signature.len() || signature != PNG_SIGNATURE {
            return Err(MetadataError::invalid_format("not a recognized PNG file"));
        }
        Ok(())
    }

    /// Read one fixed 4-byte field that must be present in full.
    fn read_field(&mut self, what: &str) -> Result<[u8; 4]> {
        let mut buf = [0u8; 4];
        let n = self.fill(&mut buf)?;
        if n < buf.len() {
            return Err(MetadataError::malformed(format!(
                "truncated file: {what} cut short at offset {}",
                self.position
            )));
        }
        Ok(buf)
    }

    /// Read until `buf` is full or the source runs dry, returning the count.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }
}
