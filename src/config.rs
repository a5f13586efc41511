use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for metadreams.
///
/// Controls where folder reports are written and how folders are scanned.
/// Every field has a default, so a missing or partial file is fine.
///
/// # Loading
///
/// ```rust,no_run
/// use metadreams::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("metadreams.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.report.recursive = true;
/// config.checkpoint = Some("sd-v1-5".into());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder report output settings.
    pub report: ReportConfig,
    /// Checkpoint (model) name recorded in each `sd-metadata` report entry.
    pub checkpoint: Option<String>,
}

/// Controls the folder report (`metadata.xml`) and prompt list (`prompts.sdp`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// File name of the XML report written into the scanned folder.
    pub metadata_file: String,
    /// File name of the prompt list written into the scanned folder.
    pub prompts_file: String,
    /// Descend into sub-folders.
    pub recursive: bool,
    /// If `false`, an existing report file is left untouched.
    pub overwrite_existing: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            metadata_file: "metadata.xml".to_string(),
            prompts_file: "prompts.sdp".to_string(),
            recursive: false,
            overwrite_existing: false,
        }
    }
}

impl Config {
    /// Resolve the config file path, next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("metadreams.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
