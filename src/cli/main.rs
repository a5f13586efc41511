use anyhow::Result;
use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use metadreams::config::Config;
use metadreams::pipeline::{self, ProcessResult};
use metadreams::report;

#[derive(Parser, Debug)]
#[command(
    name = "metadreams",
    version,
    about = "Show the generation metadata embedded in PNG images, or build a metadata.xml report for a folder"
)]
struct Cli {
    /// PNG file to inspect, or folder to report on (repeatable)
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    files: Vec<PathBuf>,

    /// Include sub-folders when reporting on a folder
    #[arg(short, long)]
    recursive: bool,

    /// Also write the prompt list (prompts.sdp) for a folder
    #[arg(short, long)]
    dreams: bool,

    /// Append `-o <image folder>` to each prompt in the prompt list
    #[arg(short, long)]
    output: bool,

    /// Checkpoint (model) name to record in the report
    #[arg(short, long, value_name = "NAME")]
    ckpt: Option<String>,

    /// Replace an existing metadata.xml
    #[arg(long)]
    overwrite: bool,

    /// Path to config file (default: metadreams.json next to binary)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default metadreams.json and exit
    #[arg(long)]
    init: bool,

    /// Output file results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Flags followed by a value, with the `--long=` form clap gets them in.
const VALUE_FLAGS: &[(&str, &str)] = &[
    ("-f", "--file="),
    ("--file", "--file="),
    ("-c", "--ckpt="),
    ("--ckpt", "--ckpt="),
    ("--config", "--config="),
];

const SWITCHES: &[&str] = &[
    "--recursive",
    "--dreams",
    "--output",
    "--overwrite",
    "--init",
    "--json",
    "--verbose",
    "--help",
    "--version",
];

/// Short switches that may be bundled, as in `-rv`.
const SHORT_SWITCHES: &str = "rdovhV";

/// Keep the program name and every argument `Cli` understands, dropping the
/// rest so an unknown flag or stray word never hides a later `-f`.
///
/// Values are re-attached with `=` so one starting with `-` stays a value.
/// Returns the kept arguments and the dropped ones.
fn known_args(raw: impl IntoIterator<Item = OsString>) -> (Vec<OsString>, Vec<OsString>) {
    let mut raw = raw.into_iter();
    let mut kept: Vec<OsString> = raw.next().into_iter().collect();
    let mut dropped = Vec::new();

    while let Some(arg) = raw.next() {
        let Some(text) = arg.to_str() else {
            dropped.push(arg);
            continue;
        };

        if let Some((_, long)) = VALUE_FLAGS.iter().find(|(flag, _)| *flag == text) {
            match raw.next() {
                Some(value) => {
                    let mut joined = OsString::from(long);
                    joined.push(&value);
                    kept.push(joined);
                }
                None => dropped.push(arg),
            }
        } else if VALUE_FLAGS.iter().any(|(_, long)| text.starts_with(long))
            || SWITCHES.contains(&text)
            || is_short_switches(text)
        {
            kept.push(arg);
        } else {
            dropped.push(arg);
        }
    }

    (kept, dropped)
}

fn is_short_switches(arg: &str) -> bool {
    match arg.strip_prefix('-') {
        Some(rest) if !rest.is_empty() && !rest.starts_with('-') => {
            rest.chars().all(|c| SHORT_SWITCHES.contains(c))
        }
        _ => false,
    }
}

fn main() -> Result<()> {
    let (args, ignored) = known_args(std::env::args_os());
    let cli = Cli::parse_from(args);

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    for arg in &ignored {
        log::debug!("Ignoring unrecognized argument {}", arg.to_string_lossy());
    }

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.files.is_empty() {
        anyhow::bail!("No input files or folders specified. Use -f <PATH> or --help for usage.");
    }

    // Load config, then let flags override it
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.recursive {
        config.report.recursive = true;
    }
    if cli.overwrite {
        config.report.overwrite_existing = true;
    }
    if cli.ckpt.is_some() {
        config.checkpoint = cli.ckpt.clone();
    }

    let mut file_results = Vec::new();

    for path in &cli.files {
        if path.is_dir() {
            // A failing folder is reported and the remaining paths still run.
            if let Err(e) = report_folder(path, &config, &cli) {
                println!("{e:#}");
            }
            continue;
        }

        if cli.dreams {
            log::warn!("--dreams only applies to folders, ignored for {}", path.display());
        }

        let result = pipeline::process_image(path);
        if cli.json {
            file_results.push(result);
        } else {
            print_result(&result);
        }
    }

    // JSON output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&file_results)?);
    }

    Ok(())
}

/// Print the size and records of one file, or its error message.
fn print_result(result: &ProcessResult) {
    match (&result.metadata, &result.error) {
        (Some(meta), _) => {
            println!("DIMENSION: {}", meta.size);
            for record in &meta.records {
                println!("{record}");
            }
        }
        (None, Some(err)) => println!("{err}"),
        (None, None) => {}
    }
}

/// Read every PNG in `folder` and write the report (and prompt list).
fn report_folder(folder: &Path, config: &Config, cli: &Cli) -> Result<()> {
    log::info!(
        "Folder: {} (recursive: {})",
        folder.display(),
        config.report.recursive
    );

    let images = pipeline::collect_images(&[folder.to_path_buf()], config.report.recursive);
    if images.is_empty() {
        log::warn!("No PNG files found in {}", folder.display());
    }

    let total = images.len();
    let mut results = Vec::with_capacity(total);
    for (i, image_path) in images.iter().enumerate() {
        log::debug!("[{}/{}] Processing: {}", i + 1, total, image_path.display());
        let result = pipeline::process_image(image_path);
        if let Some(ref err) = result.error {
            log::error!("  {}: {err}", image_path.display());
        }
        results.push(result);
    }

    let xml = report::build_report(folder, &results, config.checkpoint.as_deref());
    report::write_report(folder, &config.report, &xml)?;

    if cli.dreams {
        let prompts = report::collect_prompts(&results, cli.output);
        report::write_prompts(folder, &config.report.prompts_file, &prompts)?;
    }

    // Summary
    let success = results.iter().filter(|r| r.error.is_none()).count();
    log::info!("Done: {success} of {total} images read");

    Ok(())
}
