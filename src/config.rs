//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.batch-trends.toml` files.

use crate::cli::{Args, SummaryFormat, TopRightPanel};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".batch-trends.toml";

/// Smallest accepted figure edge in pixels.
pub const MIN_FIGURE_SIZE: u32 = 200;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Figure settings.
    #[serde(default)]
    pub plot: PlotConfig,

    /// Summary document settings.
    #[serde(default)]
    pub summary: SummaryConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output image path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Total prey population, used as the die-out threshold.
    #[serde(default = "default_prey_count")]
    pub prey_count: u64,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            prey_count: default_prey_count(),
            verbose: false,
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("batch_trends.png")
}

fn default_prey_count() -> u64 {
    40
}

/// Figure settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Image width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Shared figure title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Panel in the top-right quadrant.
    #[serde(default)]
    pub panel: TopRightPanel,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            panel: TopRightPanel::default(),
        }
    }
}

fn default_width() -> u32 {
    2520 // 14in at 180dpi
}

fn default_height() -> u32 {
    1800 // 10in at 180dpi
}

fn default_title() -> String {
    "Shorelark Batch Simulation Trends".to_string()
}

/// Summary document settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Format used when `--summary` is given without `--summary-format`.
    #[serde(default)]
    pub format: SummaryFormat,
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
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref out) = args.out {
            self.general.output = out.clone();
        }
        if let Some(prey_count) = args.prey_count {
            self.general.prey_count = prey_count;
        }

        if let Some(panel) = args.panel {
            self.plot.panel = panel;
        }
        if let Some(ref title) = args.title {
            self.plot.title = title.clone();
        }
        if let Some(width) = args.width {
            self.plot.width = width;
        }
        if let Some(height) = args.height {
            self.plot.height = height;
        }

        if let Some(format) = args.summary_format {
            self.summary.format = format;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check the merged settings.
    ///
    /// Runs after `merge_with_args` so values from the file get the same
    /// checks as command-line flags.
    pub fn validate(&self) -> Result<()> {
        if self.general.prey_count == 0 {
            bail!("Prey count must be at least 1");
        }

        if self.general.output.as_os_str().is_empty() {
            bail!("Output path must not be empty");
        }

        if self.plot.width < MIN_FIGURE_SIZE || self.plot.height < MIN_FIGURE_SIZE {
            bail!(
                "Figure width and height must be at least {} pixels",
                MIN_FIGURE_SIZE
            );
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
