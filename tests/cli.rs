use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use metadreams::png::PNG_SIGNATURE;
use tempfile::TempDir;

fn chunk(ty: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = (payload.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(ty);
    out.extend_from_slice(payload);
    out.extend_from_slice(&[0x12, 0x34, 0x56, 0x78]);
    out
}

fn ihdr(width: u32, height: u32) -> Vec<u8> {
    let mut payload = width.to_be_bytes().to_vec();
    payload.extend_from_slice(&height.to_be_bytes());
    payload.extend_from_slice(&[8, 2, 0, 0, 0]);
    chunk(b"IHDR", &payload)
}

fn text(keyword: &str, value: &str) -> Vec<u8> {
    chunk(b"tEXt", format!("{keyword}\0{value}").as_bytes())
}

fn write_png(path: &Path, chunks: &[Vec<u8>]) {
    let mut bytes = PNG_SIGNATURE.to_vec();
    for c in chunks {
        bytes.extend_from_slice(c);
    }
    fs::write(path, bytes).unwrap();
}

/// A 100x200 image with a single `prompt` record, in a fresh folder.
fn cat_png() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_png(
        &dir.path().join("a.png"),
        &[ihdr(100, 200), text("prompt", "a cat"), chunk(b"IEND", &[])],
    );
    dir
}

/// Run the binary inside `dir` with a config path that does not exist.
fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_metadreams"))
        .current_dir(dir)
        .arg("--config")
        .arg(dir.join("absent.json"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    assert!(output.status.success(), "exit {:?}: {}", output.status, String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn prints_dimension_then_records() {
    let dir = cat_png();
    let out = stdout(&run(dir.path(), &["-f", "a.png"]));
    assert_eq!(out, "DIMENSION: 100x200\nprompt: a cat\n");
}

#[test]
fn bad_file_prints_error_and_later_files_still_run() {
    let dir = cat_png();
    fs::write(dir.path().join("b.png"), b"GIF89a").unwrap();

    let out = stdout(&run(dir.path(), &["-f", "a.png", "-f", "b.png", "-f", "a.png"]));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 5, "{out}");
    assert_eq!(&lines[..2], ["DIMENSION: 100x200", "prompt: a cat"]);
    assert!(lines[2].contains("not a recognized PNG file"), "{}", lines[2]);
    assert_eq!(&lines[3..], ["DIMENSION: 100x200", "prompt: a cat"]);
}

#[test]
fn missing_file_is_reported() {
    let dir = cat_png();
    let out = stdout(&run(dir.path(), &["-f", "gone.png", "-f", "a.png"]));
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].starts_with("File not found:") && lines[0].contains("gone.png"), "{out}");
    assert_eq!(&lines[1..], ["DIMENSION: 100x200", "prompt: a cat"]);
}

#[test]
fn unknown_flag_before_file_is_ignored() {
    let dir = cat_png();
    let out = stdout(&run(dir.path(), &["-x", "-f", "a.png"]));
    assert_eq!(out, "DIMENSION: 100x200\nprompt: a cat\n");
}

#[test]
fn stray_word_before_file_is_ignored() {
    let dir = cat_png();
    let out = stdout(&run(dir.path(), &["stray", "-f", "a.png"]));
    assert_eq!(out, "DIMENSION: 100x200\nprompt: a cat\n");
}

#[test]
fn unknown_flag_between_files_keeps_both() {
    let dir = cat_png();
    let out = stdout(&run(dir.path(), &["-f", "a.png", "--bogus", "-f", "a.png"]));
    assert_eq!(out, "DIMENSION: 100x200\nprompt: a cat\n".repeat(2));
}

#[test]
fn no_files_is_an_error() {
    let dir = cat_png();
    let output = run(dir.path(), &["--bogus"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_config_is_a_warning() {
    let dir = cat_png();
    let output = Command::new(env!("CARGO_BIN_EXE_metadreams"))
        .current_dir(dir.path())
        .args(["--config", "absent.json", "-f", "a.png"])
        .env("RUST_LOG", "warn")
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("WARN") && stderr.contains("Config file not found"), "{stderr}");
    assert_eq!(stdout(&output), "DIMENSION: 100x200\nprompt: a cat\n");
}
