//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.readerlens.toml` files.

use crate::engine::BackendKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".readerlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Input picker settings.
    #[serde(default)]
    pub picker: PickerConfig,

    /// Chart rendering settings.
    #[serde(default)]
    pub charts: ChartConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory receiving charts, data dumps and reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            verbose: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reader_reports")
}

/// Analysis engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine transport, chosen once per session.
    #[serde(default)]
    pub backend: BackendKind,

    /// Base URL of the HTTP engine.
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Program started by the process backend.
    #[serde(default)]
    pub command: Option<String>,

    /// Arguments passed to the engine program.
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            url: default_engine_url(),
            command: None,
            args: Vec::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_engine_url() -> String {
    "http://localhost:8765".to_string()
}

fn default_timeout() -> u64 {
    600 // large workbook sets take minutes to load
}

/// Input picker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickerConfig {
    /// Directory scanned for borrow-record files when none are given.
    #[serde(default)]
    pub input_dir: Option<PathBuf>,

    /// Accepted workbook extensions.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    crate::models::SPREADSHEET_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Chart rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Surface width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Surface height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// TrueType font for chart text. Searched in the system font
    /// directories when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            font_path: None,
        }
    }
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    400
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.output_dir {
            self.general.output_dir = dir.clone();
        }

        if let Some(backend) = args.engine {
            self.engine.backend = backend;
        }
        if let Some(ref url) = args.engine_url {
            self.engine.url = url.clone();
        }
        if let Some(ref command) = args.engine_command {
            self.engine.command = Some(command.clone());
        }
        if !args.engine_args.is_empty() {
            self.engine.args = args.engine_args.clone();
        }
        if let Some(timeout) = args.timeout {
            self.engine.timeout_seconds = timeout;
        }

        if let Some(ref dir) = args.input_dir {
            self.picker.input_dir = Some(dir.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
