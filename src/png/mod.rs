//! Low-level PNG chunk access.
//!
//! A PNG is an 8-byte signature followed by chunks laid out as
//! `[u32 BE length][4-byte type][payload][u32 CRC]`. [`ChunkReader`] walks
//! them one at a time; [`ChunkType::kind`] tells the caller what a chunk is.

mod chunk;
mod reader;

pub use chunk::{Chunk, ChunkKind, ChunkType};
pub use reader::{ChunkReader, MAX_CHUNK_LENGTH, PNG_SIGNATURE};
