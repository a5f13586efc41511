//! Folder reports: `metadata.xml` describing every PNG under a folder, and
//! `prompts.sdp` listing the prompts that produced them.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::ReportConfig;
use crate::metadata::{MetadataRecord, PngMetadata};
use crate::pipeline::ProcessResult;

/// Value of the `software` attribute on the report root.
pub const SOFTWARE: &str = concat!("MetaDreams v.", env!("CARGO_PKG_VERSION"));

/// Keyword of the JSON blob InvokeAI-style generators store.
const SD_METADATA: &str = "sd-metadata";
/// Key inside `sd-metadata` holding per-image generation parameters.
const SD_IMAGE: &str = "image";
/// Keyword holding the prompt itself.
const DREAM: &str = "dream";

/// Build the XML report for `root` from pipeline results.
///
/// Images are grouped into nested `<folder>` elements that mirror their
/// directories relative to `root`. Failed results are left out.
///
/// # Example
///
/// ```rust,no_run
/// use metadreams::pipeline::{collect_images, process_image};
/// use metadreams::report::build_report;
/// use std::path::Path;
///
/// let root = Path::new("./outputs");
/// let results: Vec<_> = collect_images(&[root.to_path_buf()], true)
///     .iter()
///     .map(|p| process_image(p))
///     .collect();
/// let xml = build_report(root, &results, Some("sd-v1-5"));
/// println!("{xml}");
/// ```
pub fn build_report(root: &Path, results: &[ProcessResult], checkpoint: Option<&str>) -> String {
    let mut tree = FolderNode::new(root.to_path_buf());

    for result in results {
        let Some(meta) = &result.metadata else {
            log::warn!(
                "Leaving {} out of the report: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("no metadata")
            );
            continue;
        };
        let parent = result.path.parent().unwrap_or(root);
        let relative = parent.strip_prefix(root).unwrap_or(Path::new(""));
        tree.folder_for(relative).images.push((result.path.as_path(), meta));
    }

    let mut xml = XmlWriter::default();
    xml.line(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    xml.open("metadata", &[("software", SOFTWARE)]);
    write_folder(&mut xml, &tree, checkpoint);
    xml.close("metadata");
    xml.finish()
}

/// Write the report into `folder`.
///
/// Returns `Ok(None)` without touching anything when the report file already
/// exists and `overwrite_existing` is off.
pub fn write_report(folder: &Path, config: &ReportConfig, xml: &str) -> Result<Option<PathBuf>> {
    let output_path = folder.join(&config.metadata_file);

    if output_path.exists() && !config.overwrite_existing {
        log::warn!(
            "{} already exists, not overwriting (set report.overwrite_existing or pass --overwrite)",
            output_path.display()
        );
        return Ok(None);
    }

    std::fs::write(&output_path, xml)
        .with_context(|| format!("Failed to write report {}", output_path.display()))?;
    log::info!("XML file created: {}", output_path.display());
    Ok(Some(output_path))
}

/// Collect the `Dream` prompt of every successfully read image, in order.
///
/// With `add_output`, each prompt gets ` -o <image folder>` appended so that
/// re-running it writes next to the original.
pub fn collect_prompts(results: &[ProcessResult], add_output: bool) -> Vec<String> {
    results
        .iter()
        .filter_map(|r| {
            let prompt = r.metadata.as_ref()?.get(DREAM)?;
            let prompt = if add_output {
                let dir = r.path.parent().unwrap_or(Path::new(""));
                format!("{prompt} -o {}", dir.display())
            } else {
                prompt.to_string()
            };
            log::debug!("Found dream: {prompt}");
            Some(prompt)
        })
        .collect()
}

/// Write one prompt per line to `folder/file_name`.
pub fn write_prompts(folder: &Path, file_name: &str, prompts: &[String]) -> Result<PathBuf> {
    let output_path = folder.join(file_name);
    let mut contents = String::new();
    for prompt in prompts {
        contents.push_str(prompt);
        contents.push('\n');
    }
    std::fs::write(&output_path, contents)
        .with_context(|| format!("Failed to write prompts {}", output_path.display()))?;
    log::info!("Prompts file created: {} ({} prompts)", output_path.display(), prompts.len());
    Ok(output_path)
}

// ── Folder tree ──────────────────────────────────────────────────────

struct FolderNode<'a> {
    path: PathBuf,
    images: Vec<(&'a Path, &'a PngMetadata)>,
    children: BTreeMap<String, FolderNode<'a>>,
}

impl<'a> FolderNode<'a> {
    fn new(path: PathBuf) -> Self {
        Self { path, images: Vec::new(), children: BTreeMap::new() }
    }

    fn folder_for(&mut self, relative: &Path) -> &mut Self {
        let mut node = self;
        for component in relative.components() {
            let name = component.as_os_str().to_string_lossy().into_owned();
            let child_path = node.path.join(&name);
            node = node
                .children
                .entry(name)
                .or_insert_with(|| FolderNode::new(child_path));
        }
        node
    }

    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

fn write_folder(xml: &mut XmlWriter, folder: &FolderNode<'_>, checkpoint: Option<&str>) {
    let name = folder.name();
    let path = folder.path.display().to_string();
    xml.open("folder", &[("name", name.as_str()), ("path", path.as_str())]);

    for child in folder.children.values() {
        write_folder(xml, child, checkpoint);
    }
    for (path, meta) in &folder.images {
        write_image(xml, path, meta, checkpoint);
    }

    xml.close("folder");
}

fn write_image(xml: &mut XmlWriter, path: &Path, meta: &PngMetadata, checkpoint: Option<&str>) {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    xml.open("image", &[("filename", filename.as_str())]);
    xml.element("path", &path.display().to_string());
    xml.element(
        "size",
        &format!("({}, {})", meta.size.width(), meta.size.height()),
    );

    for record in &meta.records {
        write_record(xml, record, checkpoint);
    }

    xml.close("image");
}

fn write_record(xml: &mut XmlWriter, record: &MetadataRecord, checkpoint: Option<&str>) {
    if record.keyword() == SD_METADATA {
        match serde_json::from_str::<Value>(record.value()) {
            Ok(Value::Object(sd)) => {
                write_sd_metadata(xml, &sd, checkpoint);
                return;
            }
            Ok(_) => log::warn!("{SD_METADATA} is not a JSON object, writing it verbatim"),
            Err(e) => log::warn!("{SD_METADATA} is not valid JSON ({e}), writing it verbatim"),
        }
    }
    xml.element(&element_name(record.keyword()), record.value());
}

fn write_sd_metadata(xml: &mut XmlWriter, sd: &Map<String, Value>, checkpoint: Option<&str>) {
    xml.open(SD_METADATA, &[]);

    if let Some(ckpt) = checkpoint {
        xml.element("ckpt", ckpt);
    }

    for (key, value) in sd {
        if key == SD_IMAGE {
            match parse_image_info(value) {
                Some(image) => {
                    for (img_key, img_value) in &image {
                        xml.element(&element_name(img_key), &value_text(img_value));
                    }
                }
                None => xml.element(SD_IMAGE, &value_text(value)),
            }
        } else {
            xml.element(&element_name(key), &value_text(value));
        }
    }

    xml.close(SD_METADATA);
}

/// Per-image generation parameters, either a JSON object or a Python-style
/// dict literal (`{'prompt': 'a cat', 'seed': None}`).
fn parse_image_info(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(raw) => {
            let json = raw
                .replace('\'', "\"")
                .replace("None", "null")
                .replace("True", "true")
                .replace("False", "false");
            match serde_json::from_str::<Value>(&json) {
                Ok(Value::Object(map)) => Some(map),
                _ => {
                    log::warn!("Could not parse {SD_METADATA} image info, writing it verbatim");
                    None
                }
            }
        }
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Lower-case a keyword and replace anything an XML name cannot hold.
fn element_name(keyword: &str) -> String {
    let mut name: String = keyword
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if !starts_ok {
        name.insert(0, '_');
    }
    name
}

// ── XML output ───────────────────────────────────────────────────────

#[derive(Default)]
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn line(&mut self, s: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        let line = format!("<{tag}{}>", attributes(attrs));
        self.line(&line);
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(&format!("</{tag}>"));
    }

    fn element(&mut self, tag: &str, text: &str) {
        if text.is_empty() {
            self.line(&format!("<{tag}/>"));
        } else {
            self.line(&format!("<{tag}>{}</{tag}>", escape_text(text)));
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

fn attributes(attrs: &[(&str, &str)]) -> String {
    attrs
        .iter()
        .map(|(k, v)| format!(" {k}=\"{}\"", escape_attr(v)))
        .collect()
}

/// Escape character data. Quotes are left as they are.
fn escape_text(s: &str) -> String {
    escape(s, false)
}

/// Escape a double-quoted attribute value.
fn escape_attr(s: &str) -> String {
    escape(s, true)
}

fn escape(s: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '\'' if in_attribute => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
