//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::MIN_FIGURE_SIZE;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// batch-trends - plot evolutionary trends from batch simulation logs
///
/// Reads the CSV written by the batch predator/prey simulation and renders
/// mean fitness, percentile bands, improvement and phase panels into one
/// PNG, then prints how many runs saw a full prey die-out.
///
/// Examples:
///   batch-trends results.csv
///   batch-trends results.csv --out plots/trends.png --prey-count 60
///   batch-trends results.csv --panel boxplot --summary trends.md
///   batch-trends --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Input CSV from the batch simulation runner
    #[arg(value_name = "CSV", required_unless_present = "init_config")]
    pub csv: Option<PathBuf>,

    /// Output PNG path
    ///
    /// Parent directories are created as needed. Default: from config or
    /// batch_trends.png.
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Total prey population used in the simulation
    ///
    /// A run counts as a die-out when its peak dead-prey count reaches this
    /// value. Default: from config or 40.
    #[arg(long, value_name = "COUNT", env = "BATCH_TRENDS_PREY_COUNT")]
    pub prey_count: Option<u64>,

    /// Panel drawn in the top-right quadrant (bands, boxplot)
    #[arg(long, value_name = "PANEL")]
    pub panel: Option<TopRightPanel>,

    /// Figure title
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Figure width in pixels
    #[arg(long, value_name = "PX")]
    pub width: Option<u32>,

    /// Figure height in pixels
    #[arg(long, value_name = "PX")]
    pub height: Option<u32>,

    /// Also write a summary of the computed aggregates to this file
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Summary format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub summary_format: Option<SummaryFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .batch-trends.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .batch-trends.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Which panel occupies the top-right quadrant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TopRightPanel {
    /// Prey fitness decile bands with a P99 line (default)
    #[default]
    Bands,
    /// Final-generation box plot of both populations
    Boxplot,
}

/// Output format for the summary document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.csv {
            Some(ref csv) if !csv.exists() => {
                return Err(format!("Input CSV does not exist: {}", csv.display()));
            }
            Some(ref csv) if !csv.is_file() => {
                return Err(format!("Input CSV is not a file: {}", csv.display()));
            }
            None => return Err("An input CSV path is required".to_string()),
            _ => {}
        }

        if let Some(0) = self.prey_count {
            return Err("Prey count must be at least 1".to_string());
        }

        if let Some(ref out) = self.out {
            if out.as_os_str().is_empty() {
                return Err("Output path must not be empty".to_string());
            }
        }

        if matches!(self.width, Some(w) if w < MIN_FIGURE_SIZE)
            || matches!(self.height, Some(h) if h < MIN_FIGURE_SIZE)
        {
            return Err(format!(
                "Figure width and height must be at least {} pixels",
                MIN_FIGURE_SIZE
            ));
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose` is the merged config value; `--quiet` wins over it.
    pub fn log_level(&self, verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if verbose || self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
