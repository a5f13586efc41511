use std::fmt;

/// A raw 4-byte chunk type tag, e.g. `IHDR` or `tEXt`.
///
/// Tags are kept verbatim even when they are not valid ASCII; classifying
/// them is the extractor's job, see [`ChunkKind`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

#[allow(non_upper_case_globals)]
impl ChunkType {
    pub const IHDR: Self = Self(*b"IHDR");
    pub const IEND: Self = Self(*b"IEND");
    pub const tEXt: Self = Self(*b"tEXt");
    pub const iTXt: Self = Self(*b"iTXt");
    pub const zTXt: Self = Self(*b"zTXt");

    /// Raw tag bytes.
    pub fn bytes(&self) -> [u8; 4] {
        self.0
    }

    /// Resolve this tag against the table of chunk types we understand.
    pub fn kind(&self) -> ChunkKind {
        KNOWN_CHUNKS
            .iter()
            .find(|(ty, _)| ty == self)
            .map(|(_, kind)| *kind)
            .unwrap_or(ChunkKind::Unknown)
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({self})")
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

/// What a chunk means to the metadata walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// `IHDR`: carries width and height.
    Header,
    /// `tEXt`: Latin-1 `keyword NUL value`.
    Text,
    /// `iTXt`: UTF-8 text with language and translated keyword fields.
    InternationalText,
    /// `zTXt`: deflate-compressed text, never inflated here.
    CompressedText,
    /// `IEND`: logical end of the chunk stream.
    End,
    /// Anything else; skipped.
    Unknown,
}

const KNOWN_CHUNKS: &[(ChunkType, ChunkKind)] = &[
    (ChunkType::IHDR, ChunkKind::Header),
    (ChunkType::tEXt, ChunkKind::Text),
    (ChunkType::iTXt, ChunkKind::InternationalText),
    (ChunkType::zTXt, ChunkKind::CompressedText),
    (ChunkType::IEND, ChunkKind::End),
];

/// One chunk as read from the stream, minus its CRC footer.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_type: ChunkType,
    pub payload: Vec<u8>,
}

impl Chunk {
    /// Declared length of the payload.
    pub fn length(&self) -> u32 {
        // Reader rejects anything over the PNG limit, so this never truncates.
        self.payload.len() as u32
    }

    pub fn kind(&self) -> ChunkKind {
        self.chunk_type.kind()
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("chunk_type", &self.chunk_type)
            .field("payload", &(&self.payload[..self.payload.len().min(12)], self.payload.len()))
            .finish()
    }
}
