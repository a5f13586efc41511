use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::metadata::{self, PngMetadata};

/// The outcome of reading one image.
///
/// Exactly one of `metadata` and `error` is set. Failures are captured here
/// rather than returned so one bad file never stops a batch.
///
/// # Example
///
/// ```rust,no_run
/// use metadreams::pipeline::process_image;
///
/// let result = process_image("dream.png".as_ref());
/// match (&result.metadata, &result.error) {
///     (Some(meta), _) => println!("DIMENSION: {}", meta.size),
///     (_, Some(err)) => println!("{err}"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub path: PathBuf,
    pub metadata: Option<PngMetadata>,
    pub error: Option<String>,
}

/// Collect PNG files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are listed
/// one level deep, or walked fully (following symlinks) when `recursive` is
/// set. Entries are sorted by file name within each directory. Only files with
/// a `.png` extension (any case) are included.
///
/// # Example
///
/// ```rust,no_run
/// use metadreams::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("dream.png"),      // single file
///     PathBuf::from("./outputs/"),     // entire directory
/// ], true);
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_png(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping non-PNG file: {}", path.display());
            }
        } else if path.is_dir() {
            let mut walker = WalkDir::new(path).follow_links(true).sort_by_file_name();
            if !recursive {
                walker = walker.max_depth(1);
            }
            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                let p = entry.path();
                if p.is_file() && is_png(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a `.png` extension.
fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}

/// Read one image's metadata, capturing any failure in the result.
pub fn process_image(path: &Path) -> ProcessResult {
    log::debug!("Processing file: {}", path.display());

    match metadata::read_metadata(path) {
        Ok(meta) => ProcessResult {
            path: path.to_path_buf(),
            metadata: Some(meta),
            error: None,
        },
        Err(e) => {
            log::debug!("Failed to read {}: {e}", path.display());
            ProcessResult {
                path: path.to_path_buf(),
                metadata: None,
                error: Some(e.to_string()),
            }
        }
    }
}
