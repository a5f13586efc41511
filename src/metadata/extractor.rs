use std::io::Read;
use std::path::Path;

use super::{ImageSize, MetadataRecord, PngMetadata};
use crate::error::{MetadataError, Result};
use crate::png::{ChunkKind, ChunkReader};

/// Read size and text metadata from a PNG file.
///
/// The file is closed before this returns, whether extraction succeeded or
/// not.
///
/// # Example
///
/// ```rust,no_run
/// use metadreams::metadata::read_metadata;
/// use std::path::Path;
///
/// let meta = read_metadata(Path::new("dream.png"))?;
/// println!("DIMENSION: {}", meta.size);
/// for record in &meta.records {
///     println!("{record}");
/// }
/// # Ok::<(), metadreams::MetadataError>(())
/// ```
pub fn read_metadata(path: &Path) -> Result<PngMetadata> {
    let mut reader = ChunkReader::open(path)?;
    extract(&mut reader)
}

/// Walk the remaining chunks of `reader` and collect size and text records.
///
/// Stops after `IEND` or at a clean end of stream. The first `IHDR` sets the
/// size; hitting the end without one is a
/// [`MetadataError::MalformedChunk`]. Unrecognised chunks are skipped.
pub fn extract<R: Read>(reader: &mut ChunkReader<R>) -> Result<PngMetadata> {
    let mut size: Option<ImageSize> = None;
    let mut records = Vec::new();

    while let Some(chunk) = reader.next_chunk()? {
        match chunk.kind() {
            ChunkKind::Header => {
                if size.is_some() {
                    log::debug!("Ignoring repeated IHDR chunk");
                    continue;
                }
                size = Some(decode_header(&chunk.payload)?);
            }
            ChunkKind::Text => records.push(decode_text(&chunk.payload)?),
            ChunkKind::InternationalText => {
                if let Some(record) = decode_international_text(&chunk.payload)? {
                    records.push(record);
                }
            }
            ChunkKind::CompressedText => {
                log::warn!(
                    "Skipping compressed zTXt chunk '{}'",
                    keyword_preview(&chunk.payload)
                );
            }
            ChunkKind::End => break,
            ChunkKind::Unknown => {
                log::trace!("Skipping {} chunk", chunk.chunk_type);
            }
        }
    }

    let size = size.ok_or_else(|| MetadataError::malformed("incomplete file: no dimension data"))?;
    log::debug!("Extracted {size} image with {} text record(s)", records.len());

    Ok(PngMetadata { size, records })
}

/// `IHDR`: width and height are the first two big-endian u32 values.
fn decode_header(payload: &[u8]) -> Result<ImageSize> {
    match payload {
        [w0, w1, w2, w3, h0, h1, h2, h3, ..] => {
            let width = u32::from_be_bytes([*w0, *w1, *w2, *w3]);
            let height = u32::from_be_bytes([*h0, *h1, *h2, *h3]);
            ImageSize::new(width, height)
        }
        _ => Err(MetadataError::malformed(format!(
            "IHDR payload is {} bytes, need at least 8",
            payload.len()
        ))),
    }
}

/// `tEXt`: Latin-1 `keyword NUL value`.
fn decode_text(payload: &[u8]) -> Result<MetadataRecord> {
    let (keyword, value) = split_nul(payload)
        .ok_or_else(|| MetadataError::malformed("tEXt chunk has no keyword separator"))?;
    Ok(MetadataRecord::new(&latin1(keyword), latin1(value)))
}

/// `iTXt`: `keyword NUL flag method language NUL translated NUL text`.
///
/// Compressed text is not inflated; such chunks yield `None`.
fn decode_international_text(payload: &[u8]) -> Result<Option<MetadataRecord>> {
    let (keyword, rest) = split_nul(payload)
        .ok_or_else(|| MetadataError::malformed("iTXt chunk has no keyword separator"))?;
    let keyword = latin1(keyword);

    let [flag, _method, rest @ ..] = rest else {
        return Err(MetadataError::malformed(format!(
            "iTXt chunk '{keyword}' is missing its compression fields"
        )));
    };
    let (_language, rest) = split_nul(rest).ok_or_else(|| {
        MetadataError::malformed(format!("iTXt chunk '{keyword}' has an unterminated language tag"))
    })?;
    let (_translated, text) = split_nul(rest).ok_or_else(|| {
        MetadataError::malformed(format!("iTXt chunk '{keyword}' has an unterminated translated keyword"))
    })?;

    if *flag != 0 {
        log::warn!("Skipping compressed iTXt chunk '{keyword}'");
        return Ok(None);
    }

    Ok(Some(MetadataRecord::new(
        &keyword,
        String::from_utf8_lossy(text).into_owned(),
    )))
}

fn split_nul(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = bytes.iter().position(|&b| b == 0)?;
    Some((&bytes[..pos], &bytes[pos + 1..]))
}

/// PNG text is ISO 8859-1, which maps one-to-one onto the first 256 code points.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn keyword_preview(payload: &[u8]) -> String {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len()).min(79);
    latin1(&payload[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png::test_util::*;
    use std::io::Cursor;

    fn run(bytes: Vec<u8>) -> Result<PngMetadata> {
        let mut reader = ChunkReader::new(Cursor::new(bytes))?;
        extract(&mut reader)
    }

    fn pairs(meta: &PngMetadata) -> Vec<(&str, &str)> {
        meta.records.iter().map(|r| (r.keyword(), r.value())).collect()
    }

    // ── Happy path ───────────────────────────────────────────────────

    #[test]
    fn header_text_end() {
        let meta = run(png(&[ihdr(100, 200), text("prompt", "a cat"), iend()])).unwrap();
        assert_eq!(meta.size, ImageSize::new(100, 200).unwrap());
        assert_eq!(pairs(&meta), vec![("prompt", "a cat")]);
    }

    #[test]
    fn records_keep_file_order() {
        let meta = run(png(&[
            ihdr(1, 1),
            text("zeta", "1"),
            text("alpha", "2"),
            text("mid", "3"),
            iend(),
        ]))
        .unwrap();
        assert_eq!(pairs(&meta), vec![("zeta", "1"), ("alpha", "2"), ("mid", "3")]);
    }

    #[test]
    fn text_before_header_is_kept() {
        let meta = run(png(&[text("early", "bird"), ihdr(5, 6), iend()])).unwrap();
        assert_eq!(meta.size.to_string(), "5x6");
        assert_eq!(pairs(&meta), vec![("early", "bird")]);
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let with_unknown = run(png(&[
            ihdr(10, 10),
            text("a", "1"),
            chunk(b"IDAT", &[1, 2, 3, 4, 5]),
            chunk(b"prVt", b"\0\0\0"),
            text("b", "2"),
            iend(),
        ]))
        .unwrap();
        let without = run(png(&[ihdr(10, 10), text("a", "1"), text("b", "2"), iend()])).unwrap();
        assert_eq!(with_unknown, without);
    }

    #[test]
    fn splits_on_first_nul_only() {
        let meta = run(png(&[ihdr(1, 1), chunk(b"tEXt", b"A\0B\0C"), iend()])).unwrap();
        assert_eq!(pairs(&meta), vec![("A", "B\0C")]);
    }

    #[test]
    fn minimal_text_payload() {
        let meta = run(png(&[ihdr(1, 1), chunk(b"tEXt", b"A\0B"), iend()])).unwrap();
        assert_eq!(pairs(&meta), vec![("A", "B")]);
    }

    #[test]
    fn keyword_is_trimmed() {
        let meta = run(png(&[ihdr(1, 1), text(" Dream ", "castle"), iend()])).unwrap();
        assert_eq!(pairs(&meta), vec![("Dream", "castle")]);
    }

    #[test]
    fn empty_keyword_and_value_are_allowed() {
        let meta = run(png(&[ihdr(1, 1), chunk(b"tEXt", b"\0"), iend()])).unwrap();
        assert_eq!(pairs(&meta), vec![("", "")]);
    }

    #[test]
    fn text_is_latin1() {
        let meta = run(png(&[ihdr(1, 1), chunk(b"tEXt", b"Caf\xe9\0na\xefve"), iend()])).unwrap();
        assert_eq!(pairs(&meta), vec![("Café", "naïve")]);
    }

    #[test]
    fn only_first_header_counts() {
        let meta = run(png(&[ihdr(7, 8), ihdr(1000, 1000), iend()])).unwrap();
        assert_eq!(meta.size.to_string(), "7x8");
    }

    #[test]
    fn stops_at_iend() {
        // Garbage after IEND is never read.
        let mut bytes = png(&[ihdr(2, 2), text("k", "v"), iend()]);
        bytes.extend_from_slice(b"\xff\xff\xff\xfftrailing junk");
        let meta = run(bytes).unwrap();
        assert_eq!(pairs(&meta), vec![("k", "v")]);
    }

    #[test]
    fn missing_iend_is_tolerated() {
        let meta = run(png(&[ihdr(3, 3), text("k", "v")])).unwrap();
        assert_eq!(meta.size.to_string(), "3x3");
        assert_eq!(meta.records.len(), 1);
    }

    #[test]
    fn short_header_with_extra_bytes_ok() {
        // Exactly 8 bytes is enough for the size.
        let mut payload = 4u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&9u32.to_be_bytes());
        let meta = run(png(&[chunk(b"IHDR", &payload), iend()])).unwrap();
        assert_eq!(meta.size.to_string(), "4x9");
    }

    // ── iTXt / zTXt ──────────────────────────────────────────────────

    #[test]
    fn uncompressed_itxt_is_decoded() {
        let meta = run(png(&[
            ihdr(1, 1),
            itext("parameters", false, "en", "Parameter", "猫, 20 steps"),
            iend(),
        ]))
        .unwrap();
        assert_eq!(pairs(&meta), vec![("parameters", "猫, 20 steps")]);
    }

    #[test]
    fn compressed_itxt_is_skipped() {
        let meta = run(png(&[ihdr(1, 1), itext("xmp", true, "", "", "xx"), text("k", "v"), iend()]))
            .unwrap();
        assert_eq!(pairs(&meta), vec![("k", "v")]);
    }

    #[test]
    fn ztxt_is_skipped() {
        let meta = run(png(&[ihdr(1, 1), chunk(b"zTXt", b"Comment\0\0\x78\x9c"), iend()])).unwrap();
        assert!(meta.records.is_empty());
    }

    #[test]
    fn itxt_without_separator_is_malformed() {
        let err = run(png(&[ihdr(1, 1), chunk(b"iTXt", b"no separator"), iend()])).unwrap_err();
        assert!(matches!(err, MetadataError::MalformedChunk(_)));
    }

    #[test]
    fn itxt_missing_fields_is_malformed() {
        let err = run(png(&[ihdr(1, 1), chunk(b"iTXt", b"key\0\0"), iend()])).unwrap_err();
        assert!(matches!(err, MetadataError::MalformedChunk(_)));

        let err = run(png(&[ihdr(1, 1), chunk(b"iTXt", b"key\0\0\0en"), iend()])).unwrap_err();
        assert!(matches!(err, MetadataError::MalformedChunk(_)));
    }

    // ── Failures ─────────────────────────────────────────────────────

    #[test]
    fn text_without_separator_is_malformed() {
        let err = run(png(&[ihdr(1, 1), chunk(b"tEXt", b"no separator here"), iend()])).unwrap_err();
        assert!(matches!(err, MetadataError::MalformedChunk(_)), "got {err:?}");
    }

    #[test]
    fn no_header_before_end_of_stream_is_malformed() {
        let err = run(png(&[text("prompt", "a cat")])).unwrap_err();
        match err {
            MetadataError::MalformedChunk(msg) => assert!(msg.contains("no dimension data")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn iend_before_header_is_malformed() {
        let err = run(png(&[iend(), ihdr(1, 1)])).unwrap_err();
        assert!(matches!(err, MetadataError::MalformedChunk(_)));
    }

    #[test]
    fn short_header_is_malformed() {
        let err = run(png(&[chunk(b"IHDR", &[0, 0, 0, 1, 0, 0, 0]), iend()])).unwrap_err();
        assert!(matches!(err, MetadataError::MalformedChunk(_)));
    }

    #[test]
    fn zero_dimension_is_invalid_format() {
        let err = run(png(&[ihdr(0, 10), iend()])).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidFormat(_)));
    }

    #[test]
    fn truncated_chunk_fails_whole_extraction() {
        let mut bytes = png(&[ihdr(1, 1), text("prompt", "a cat"), iend()]);
        bytes.truncate(bytes.len() - 14);
        let err = run(bytes).unwrap_err();
        assert!(matches!(err, MetadataError::MalformedChunk(_)));
    }

    #[test]
    fn bad_signature_reads_nothing() {
        let mut bytes = png(&[ihdr(1, 1), iend()]);
        bytes[0] = 0;
        let err = ChunkReader::new(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidFormat(_)));
    }

    // ── read_metadata ────────────────────────────────────────────────

    #[test]
    fn read_metadata_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dream.png");
        std::fs::write(&path, png(&[ihdr(512, 768), text("Dream", "a castle"), iend()])).unwrap();

        let meta = read_metadata(&path).unwrap();
        assert_eq!(meta.size.to_string(), "512x768");
        assert_eq!(meta.get("dream"), Some("a castle"));
    }

    #[test]
    fn read_metadata_missing_file() {
        let err = read_metadata(Path::new("/nonexistent/dream.png")).unwrap_err();
        assert!(matches!(err, MetadataError::NotFound { .. }));
    }
}
