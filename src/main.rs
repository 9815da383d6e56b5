//! batch-trends - evolutionary trend plots for batch simulation logs
//!
//! A CLI tool that reads the per-run, per-generation CSV written by the
//! batch predator/prey simulation, aggregates fitness across runs and
//! renders a four-panel PNG summary.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (missing columns, unreadable input, render failure, etc.)

mod analysis;
mod cli;
mod config;
mod loader;
mod models;
mod render;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, SummaryFormat};
use config::{Config, CONFIG_FILE};
use models::{SummaryMetadata, TrendSummary};
use render::FigureOptions;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config comes first so its verbosity setting reaches the logger
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("batch-trends v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    if let Err(e) = run(&args, &config) {
        error!("Plotting failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .batch-trends.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging at the given level.
///
/// Logs go to stderr so stdout only carries the result lines.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load, aggregate, render and report.
fn run(args: &Args, config: &Config) -> Result<()> {
    let start_time = Instant::now();

    config.validate()?;

    let csv_path = args
        .csv
        .as_deref()
        .context("An input CSV path is required")?;

    // Step 1: Load and validate the batch table
    info!("Loading batch results from {}", csv_path.display());
    let records = loader::load_records(csv_path)?;
    let runs = analysis::run_count(&records);
    let generations = analysis::generation_count(&records);
    info!(
        "Loaded {} records ({} runs, {} generations)",
        records.len(),
        runs,
        generations
    );

    // Step 2: Aggregate
    let trends = analysis::compute_trends(&records, config.general.prey_count)?;

    // Step 3: Render
    let out_path = config.general.output.clone();
    let options = FigureOptions {
        width: config.plot.width,
        height: config.plot.height,
        title: config.plot.title.clone(),
        panel: config.plot.panel,
    };
    render::render_figure(&out_path, &trends, &options)?;

    // Step 4: Optional summary document
    if let Some(ref summary_path) = args.summary {
        let summary = TrendSummary {
            metadata: SummaryMetadata {
                input: csv_path.to_path_buf(),
                plot: out_path.clone(),
                generated_at: Utc::now(),
                records: records.len(),
                runs,
                generations,
            },
            trends: trends.clone(),
        };

        let content = match config.summary.format {
            SummaryFormat::Json => report::generate_json_summary(&summary)?,
            SummaryFormat::Markdown => report::generate_markdown_summary(&summary),
        };
        report::write_summary(summary_path, &content)?;
        info!("Summary written to {}", summary_path.display());
    }

    println!("{}", report::plot_written_line(&out_path));
    println!("{}", report::dieout_line(&trends.dieout));

    debug!("Finished in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Where the active configuration came from.
#[derive(Debug)]
enum ConfigSource {
    Explicit(PathBuf),
    Default,
    Builtin,
    Unreadable(String),
}

impl ConfigSource {
    /// Report the source once the logger is installed.
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::Default => info!("Loaded default config from {}", CONFIG_FILE),
            ConfigSource::Builtin => debug!("No config file found, using defaults"),
            ConfigSource::Unreadable(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::Default)),
        Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
        Err(e) => Ok((Config::default(), ConfigSource::Unreadable(format!("{:#}", e)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
    }

    fn merged(args: &Args) -> Config {
        let mut config = Config::default();
        config.merge_with_args(args);
        config
    }

    #[test]
    fn test_run_writes_plot_and_summary() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("plots").join("trends.png");
        let summary = temp_dir.path().join("trends.json");
        let args = Args::try_parse_from([
            "batch-trends".into(),
            fixture("two_runs.csv").into_os_string(),
            "--out".into(),
            out.clone().into_os_string(),
            "--summary".into(),
            summary.clone().into_os_string(),
            "--summary-format".into(),
            "json".into(),
        ])
        .unwrap();

        run(&args, &merged(&args)).unwrap();

        assert!(out.is_file());
        let parsed: TrendSummary =
            serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
        assert_eq!(parsed.metadata.runs, 2);
        assert_eq!(parsed.trends.dieout.dieout_runs, 1);
    }

    #[test]
    fn test_run_missing_columns_writes_no_image() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("nested").join("out.png");
        let args = Args::try_parse_from([
            "batch-trends".into(),
            fixture("missing_columns.csv").into_os_string(),
            "--out".into(),
            out.clone().into_os_string(),
        ])
        .unwrap();

        let err = run(&args, &merged(&args)).unwrap_err();

        assert!(format!("{:#}", err).contains("Missing required columns"));
        assert!(!out.exists());
        assert!(!out.parent().unwrap().exists());
    }

    #[test]
    fn test_run_rejects_zero_prey_count_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out.png");
        let args = Args::try_parse_from([
            "batch-trends".into(),
            fixture("two_runs.csv").into_os_string(),
            "--out".into(),
            out.clone().into_os_string(),
        ])
        .unwrap();
        let mut config = merged(&args);
        config.general.prey_count = 0;

        let err = run(&args, &config).unwrap_err();

        assert!(err.to_string().contains("Prey count must be at least 1"));
        assert!(!out.exists());
    }

    #[test]
    fn test_load_config_explicit_verbose() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("v.toml");
        std::fs::write(&path, "[general]\nverbose = true\n").unwrap();
        let args = Args::try_parse_from([
            "batch-trends".into(),
            "results.csv".into(),
            "-c".into(),
            path.clone().into_os_string(),
        ])
        .unwrap();

        let (mut config, source) = load_config(&args).unwrap();
        config.merge_with_args(&args);

        assert!(matches!(source, ConfigSource::Explicit(p) if p == path));
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);
    }
}
