//! Data models for batch trend analysis.
//!
//! This module contains the input record read from the batch CSV and the
//! aggregate structures produced by the analysis pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Columns that every batch CSV must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "run",
    "generation",
    "prey_avg_fitness",
    "predator_avg_fitness",
    "prey_dead",
];

/// One row of the batch log: a single generation of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Run identifier.
    pub run: u64,
    /// Generation index within the run.
    pub generation: u64,
    /// Average prey fitness at this generation.
    pub prey_avg_fitness: f64,
    /// Average predator fitness at this generation.
    pub predator_avg_fitness: f64,
    /// Number of prey that died during this generation.
    pub prey_dead: u64,
}

impl Record {
    /// Returns the value of the given fitness metric.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::PreyFitness => self.prey_avg_fitness,
            Metric::PredatorFitness => self.predator_avg_fitness,
        }
    }
}

/// A numeric fitness column that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PreyFitness,
    PredatorFitness,
}

impl Metric {
    /// Name of the CSV column backing this metric.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::PreyFitness => "prey_avg_fitness",
            Metric::PredatorFitness => "predator_avg_fitness",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// Mean and 95% confidence half-width of a metric at one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStat {
    pub generation: u64,
    pub mean: f64,
    /// Half-width of the 95% confidence interval.
    pub ci95: f64,
    /// Number of observations in the group.
    pub count: usize,
}

impl GenerationStat {
    /// Lower edge of the confidence band.
    pub fn lower(&self) -> f64 {
        self.mean - self.ci95
    }

    /// Upper edge of the confidence band.
    pub fn upper(&self) -> f64 {
        self.mean + self.ci95
    }
}

/// Decile curve values at one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileRow {
    pub generation: u64,
    /// Quantiles at 0%, 10%, ..., 100%.
    pub deciles: [f64; 11],
    /// 99th percentile.
    pub p99: f64,
}

impl PercentileRow {
    /// Lower and upper edge of band `index` (0 = P0-10, 9 = P90-100).
    pub fn band(&self, index: usize) -> (f64, f64) {
        (self.deciles[index], self.deciles[index + 1])
    }
}

/// Box-and-whisker summary of one distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Lowest observation within 1.5 IQR below `q1`.
    pub whisker_low: f64,
    /// Highest observation within 1.5 IQR above `q3`.
    pub whisker_high: f64,
    /// Observations outside the whiskers.
    pub outliers: Vec<f64>,
}

/// Final-generation distributions for both populations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDistribution {
    pub generation: u64,
    pub prey: BoxSummary,
    pub predator: BoxSummary,
}

/// Across-run mean of both populations at one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhasePoint {
    pub generation: u64,
    pub prey_mean: f64,
    pub predator_mean: f64,
}

/// How many runs saw the whole prey population die.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DieoutSummary {
    pub dieout_runs: usize,
    pub total_runs: usize,
    pub percentage: f64,
    /// Prey population used as the die-out threshold.
    pub prey_count: u64,
}

impl fmt::Display for DieoutSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.2}%)",
            self.dieout_runs, self.total_runs, self.percentage
        )
    }
}

/// Everything derived from one batch log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trends {
    /// Prey mean fitness per generation.
    pub prey_mean: Vec<GenerationStat>,
    /// Predator mean fitness per generation.
    pub predator_mean: Vec<GenerationStat>,
    /// Prey generation-to-generation improvement.
    pub prey_improvement: Vec<GenerationStat>,
    /// Predator generation-to-generation improvement.
    pub predator_improvement: Vec<GenerationStat>,
    /// Prey fitness deciles per generation.
    pub prey_percentiles: Vec<PercentileRow>,
    pub final_distribution: FinalDistribution,
    pub phase: Vec<PhasePoint>,
    pub dieout: DieoutSummary,
}

/// Metadata about a summary document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetadata {
    /// Path of the CSV that was analyzed.
    pub input: PathBuf,
    /// Path of the rendered image.
    pub plot: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub records: usize,
    pub runs: usize,
    pub generations: usize,
}

/// Summary document written by `--summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    pub metadata: SummaryMetadata,
    pub trends: Trends,
}
