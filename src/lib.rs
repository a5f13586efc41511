//! # metadreams
//!
//! Read the text metadata that image generators (Stable Diffusion front-ends,
//! InvokeAI, ComfyUI, ...) embed in PNG files, together with the image size.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use metadreams::metadata::read_metadata;
//! use std::path::Path;
//!
//! fn main() -> Result<(), metadreams::MetadataError> {
//!     let meta = read_metadata(Path::new("dream.png"))?;
//!
//!     println!("DIMENSION: {}", meta.size);
//!     for record in &meta.records {
//!         println!("{}: {}", record.keyword(), record.value());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The chunk reader works on any [`std::io::Read`] source and can be driven
//! by hand:
//!
//! ```rust,no_run
//! use metadreams::png::{ChunkKind, ChunkReader};
//! use std::path::Path;
//!
//! # fn main() -> metadreams::Result<()> {
//! let mut reader = ChunkReader::open(Path::new("dream.png"))?;
//! while let Some(chunk) = reader.next_chunk()? {
//!     println!("{} ({} bytes)", chunk.chunk_type, chunk.length());
//!     if chunk.kind() == ChunkKind::End {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Folder Reports
//!
//! [`pipeline`] collects and reads many files without stopping on failures;
//! [`report`] turns the results into a `metadata.xml` document and a
//! `prompts.sdp` prompt list.
//!
//! ## Modules
//!
//! - [`png`]: Signature check and forward-only chunk reading
//! - [`metadata`]: Size and text record extraction
//! - [`config`]: Configuration types and loading/saving
//! - [`pipeline`]: Image collection and per-file processing
//! - [`report`]: XML folder report and prompt list

pub mod config;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod png;
pub mod report;

pub use error::{MetadataError, Result};
