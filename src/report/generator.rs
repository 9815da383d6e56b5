//! Summary generation.
//!
//! This module renders the console lines printed after a run and the
//! optional Markdown/JSON summary documents.

use crate::models::{BoxSummary, DieoutSummary, GenerationStat, SummaryMetadata, TrendSummary};
use anyhow::{Context, Result};
use std::path::Path;

/// Console line announcing the written plot.
pub fn plot_written_line(path: &Path) -> String {
    format!("Wrote plot: {}", path.display())
}

/// Console line with the die-out count and percentage.
pub fn dieout_line(dieout: &DieoutSummary) -> String {
    format!("Runs with at least one full prey die-out: {}", dieout)
}

/// Generate a complete Markdown summary.
pub fn generate_markdown_summary(summary: &TrendSummary) -> String {
    let mut output = String::new();

    output.push_str("# Batch Simulation Trends\n\n");
    output.push_str(&generate_metadata_section(&summary.metadata));
    output.push_str(&generate_dieout_section(&summary.trends.dieout));
    output.push_str(&generate_fitness_section(
        "Mean Fitness per Generation",
        &summary.trends.prey_mean,
        &summary.trends.predator_mean,
    ));
    output.push_str(&generate_fitness_section(
        "Improvement per Generation",
        &summary.trends.prey_improvement,
        &summary.trends.predator_improvement,
    ));

    let final_dist = &summary.trends.final_distribution;
    output.push_str(&format!(
        "## Final Generation ({})\n\n",
        final_dist.generation
    ));
    output.push_str("| Population | Q1 | Median | Q3 | Whiskers | Outliers |\n");
    output.push_str("|:---|---:|---:|---:|:---:|---:|\n");
    output.push_str(&box_row("Prey", &final_dist.prey));
    output.push_str(&box_row("Predator", &final_dist.predator));
    output.push('\n');

    if let Some(last) = summary.trends.phase.last() {
        output.push_str("## Phase Endpoint\n\n");
        output.push_str(&format!(
            "At generation {} mean prey fitness is {:.4} and mean predator fitness is {:.4}.\n\n",
            last.generation, last.prey_mean, last.predator_mean
        ));
    }

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &SummaryMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** `{}`\n", metadata.input.display()));
    section.push_str(&format!("- **Plot:** `{}`\n", metadata.plot.display()));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Records:** {}\n", metadata.records));
    section.push_str(&format!("- **Runs:** {}\n", metadata.runs));
    section.push_str(&format!("- **Generations:** {}\n", metadata.generations));
    section.push('\n');

    section
}

/// Generate the die-out section.
fn generate_dieout_section(dieout: &DieoutSummary) -> String {
    let mut section = String::new();

    section.push_str("## Prey Die-out\n\n");
    section.push_str(&format!(
        "Runs where dead prey reached the full population of {}: **{}**\n\n",
        dieout.prey_count, dieout
    ));

    section
}

/// Side-by-side mean/CI table for both populations.
fn generate_fitness_section(
    title: &str,
    prey: &[GenerationStat],
    predator: &[GenerationStat],
) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));
    if prey.is_empty() {
        section.push_str("No data.\n\n");
        return section;
    }

    section.push_str("| Generation | Prey mean | Prey CI95 | Predator mean | Predator CI95 | Runs |\n");
    section.push_str("|---:|---:|---:|---:|---:|---:|\n");
    for (p, q) in prey.iter().zip(predator.iter()) {
        section.push_str(&format!(
            "| {} | {:.4} | {:.4} | {:.4} | {:.4} | {} |\n",
            p.generation, p.mean, p.ci95, q.mean, q.ci95, p.count
        ));
    }
    section.push('\n');

    section
}

fn box_row(label: &str, summary: &BoxSummary) -> String {
    format!(
        "| {} | {:.4} | {:.4} | {:.4} | {:.4} - {:.4} | {} |\n",
        label,
        summary.q1,
        summary.median,
        summary.q3,
        summary.whisker_low,
        summary.whisker_high,
        summary.outliers.len()
    )
}

/// Generate a JSON summary.
pub fn generate_json_summary(summary: &TrendSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).map_err(Into::into)
}

/// Write summary content, creating parent directories.
pub fn write_summary(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write summary to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::compute_trends;
    use crate::models::Record;
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_summary() -> TrendSummary {
        let records = vec![
            Record {
                run: 1,
                generation: 0,
                prey_avg_fitness: 1.0,
                predator_avg_fitness: 0.5,
                prey_dead: 12,
            },
            Record {
                run: 1,
                generation: 1,
                prey_avg_fitness: 3.0,
                predator_avg_fitness: 1.0,
                prey_dead: 40,
            },
            Record {
                run: 2,
                generation: 0,
                prey_avg_fitness: 2.0,
                predator_avg_fitness: 0.25,
                prey_dead: 20,
            },
            Record {
                run: 2,
                generation: 1,
                prey_avg_fitness: 4.0,
                predator_avg_fitness: 1.5,
                prey_dead: 39,
            },
        ];

        TrendSummary {
            metadata: SummaryMetadata {
                input: PathBuf::from("results.csv"),
                plot: PathBuf::from("batch_trends.png"),
                generated_at: Utc::now(),
                records: records.len(),
                runs: 2,
                generations: 2,
            },
            trends: compute_trends(&records, 40).unwrap(),
        }
    }

    #[test]
    fn test_console_lines() {
        let summary = create_test_summary();

        assert_eq!(
            plot_written_line(Path::new("out/batch_trends.png")),
            "Wrote plot: out/batch_trends.png"
        );
        assert_eq!(
            dieout_line(&summary.trends.dieout),
            "Runs with at least one full prey die-out: 1/2 (50.00%)"
        );
    }

    #[test]
    fn test_generate_markdown_summary() {
        let summary = create_test_summary();
        let markdown = generate_markdown_summary(&summary);

        assert!(markdown.contains("# Batch Simulation Trends"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("results.csv"));
        assert!(markdown.contains("1/2 (50.00%)"));
        assert!(markdown.contains("| 0 | 1.5000 |"));
        assert!(markdown.contains("## Final Generation (1)"));
        assert!(markdown.contains("## Phase Endpoint"));
    }

    #[test]
    fn test_fitness_section_empty() {
        let section = generate_fitness_section("Improvement per Generation", &[], &[]);
        assert!(section.contains("No data."));
    }

    #[test]
    fn test_generate_json_summary() {
        let summary = create_test_summary();
        let json = generate_json_summary(&summary).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"prey_percentiles\""));
        assert!(json.contains("\"dieout_runs\": 1"));

        let parsed: TrendSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.trends.prey_mean.len(), 2);
    }

    #[test]
    fn test_write_summary_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/summary.md");

        write_summary(&path, "hello").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }
}
