//! Per-generation aggregation across runs.
//!
//! This module turns the flat list of records into the aggregates drawn by
//! the renderer: mean with confidence interval, per-run improvement,
//! decile bands, final-generation distributions, the phase trajectory and
//! the die-out count.

use super::stats::{box_summary, ci95, mean, quantile_sorted, sorted};
use crate::loader::LoadError;
use crate::models::{
    DieoutSummary, FinalDistribution, GenerationStat, Metric, PercentileRow, PhasePoint, Record,
    Trends,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Number of percentile bands between the 11 decile curves.
pub const BAND_COUNT: usize = 10;

/// Group a metric by generation, in generation order.
pub fn group_by_generation(records: &[Record], metric: Metric) -> BTreeMap<u64, Vec<f64>> {
    let mut grouped: BTreeMap<u64, Vec<f64>> = BTreeMap::new();

    for record in records {
        grouped
            .entry(record.generation)
            .or_default()
            .push(record.value(metric));
    }

    grouped
}

/// Group records by run, each run ordered by generation.
pub fn group_by_run(records: &[Record]) -> BTreeMap<u64, Vec<&Record>> {
    let mut grouped: BTreeMap<u64, Vec<&Record>> = BTreeMap::new();

    for record in records {
        grouped.entry(record.run).or_default().push(record);
    }

    for run in grouped.values_mut() {
        run.sort_by_key(|r| r.generation);
    }

    grouped
}

/// Mean and 95% CI for every group.
pub fn mean_and_ci(groups: &BTreeMap<u64, Vec<f64>>) -> Vec<GenerationStat> {
    groups
        .iter()
        .map(|(&generation, values)| GenerationStat {
            generation,
            mean: mean(values),
            ci95: ci95(values),
            count: values.len(),
        })
        .collect()
}

/// Across-run mean of a metric per generation.
pub fn generation_means(records: &[Record], metric: Metric) -> Vec<GenerationStat> {
    mean_and_ci(&group_by_generation(records, metric))
}

/// First differences of a metric within one run.
///
/// Returns `(generation, value - previous value)` for every row after the
/// first, so a run of `k` rows yields `k - 1` entries.
pub fn run_improvement(run: &[&Record], metric: Metric) -> Vec<(u64, f64)> {
    run.windows(2)
        .map(|pair| (pair[1].generation, pair[1].value(metric) - pair[0].value(metric)))
        .collect()
}

/// Improvement per generation, aggregated across runs.
pub fn improvement_stats(records: &[Record], metric: Metric) -> Vec<GenerationStat> {
    let mut grouped: BTreeMap<u64, Vec<f64>> = BTreeMap::new();

    for run in group_by_run(records).values() {
        for (generation, delta) in run_improvement(run, metric) {
            grouped.entry(generation).or_default().push(delta);
        }
    }

    mean_and_ci(&grouped)
}

/// Decile curves and the 99th percentile per generation.
pub fn percentile_rows(records: &[Record], metric: Metric) -> Vec<PercentileRow> {
    group_by_generation(records, metric)
        .into_iter()
        .map(|(generation, values)| {
            let values = sorted(&values);
            let mut deciles = [0.0; 11];
            for (i, slot) in deciles.iter_mut().enumerate() {
                *slot = quantile_sorted(&values, i as f64 / BAND_COUNT as f64);
            }
            PercentileRow {
                generation,
                deciles,
                p99: quantile_sorted(&values, 0.99),
            }
        })
        .collect()
}

/// Distributions of both populations at the last generation present.
pub fn final_distribution(records: &[Record]) -> Option<FinalDistribution> {
    let last = records.iter().map(|r| r.generation).max()?;
    let at_last: Vec<&Record> = records.iter().filter(|r| r.generation == last).collect();

    let prey: Vec<f64> = at_last
        .iter()
        .map(|r| r.value(Metric::PreyFitness))
        .collect();
    let predator: Vec<f64> = at_last
        .iter()
        .map(|r| r.value(Metric::PredatorFitness))
        .collect();

    Some(FinalDistribution {
        generation: last,
        prey: box_summary(&prey),
        predator: box_summary(&predator),
    })
}

/// Mean prey and predator fitness per generation, in generation order.
pub fn phase_trajectory(records: &[Record]) -> Vec<PhasePoint> {
    let prey = generation_means(records, Metric::PreyFitness);
    let predator = generation_means(records, Metric::PredatorFitness);

    // Both come from the same generation keys, so they line up.
    prey.iter()
        .zip(predator.iter())
        .map(|(p, q)| PhasePoint {
            generation: p.generation,
            prey_mean: p.mean,
            predator_mean: q.mean,
        })
        .collect()
}

/// Count runs whose peak dead-prey count reached the whole population.
pub fn dieout_summary(records: &[Record], prey_count: u64) -> DieoutSummary {
    let mut max_dead: BTreeMap<u64, u64> = BTreeMap::new();

    for record in records {
        let entry = max_dead.entry(record.run).or_insert(0);
        *entry = (*entry).max(record.prey_dead);
    }

    let total_runs = max_dead.len();
    let dieout_runs = max_dead.values().filter(|&&dead| dead >= prey_count).count();
    let percentage = if total_runs > 0 {
        100.0 * dieout_runs as f64 / total_runs as f64
    } else {
        0.0
    };

    DieoutSummary {
        dieout_runs,
        total_runs,
        percentage,
        prey_count,
    }
}

/// Number of distinct runs.
pub fn run_count(records: &[Record]) -> usize {
    group_by_run(records).len()
}

/// Number of distinct generations.
pub fn generation_count(records: &[Record]) -> usize {
    group_by_generation(records, Metric::PreyFitness).len()
}

/// Compute every aggregate needed for the figure and summary.
pub fn compute_trends(records: &[Record], prey_count: u64) -> Result<Trends, LoadError> {
    let final_distribution = final_distribution(records).ok_or(LoadError::Empty)?;

    let trends = Trends {
        prey_mean: generation_means(records, Metric::PreyFitness),
        predator_mean: generation_means(records, Metric::PredatorFitness),
        prey_improvement: improvement_stats(records, Metric::PreyFitness),
        predator_improvement: improvement_stats(records, Metric::PredatorFitness),
        prey_percentiles: percentile_rows(records, Metric::PreyFitness),
        final_distribution,
        phase: phase_trajectory(records),
        dieout: dieout_summary(records, prey_count),
    };

    debug!(
        "Aggregated {} generations, {} improvement steps",
        trends.prey_mean.len(),
        trends.prey_improvement.len()
    );

    Ok(trends)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(run: u64, generation: u64, prey: f64, predator: f64, dead: u64) -> Record {
        Record {
            run,
            generation,
            prey_avg_fitness: prey,
            predator_avg_fitness: predator,
            prey_dead: dead,
        }
    }

    fn two_runs() -> Vec<Record> {
        vec![
            rec(1, 0, 1.0, 0.5, 12),
            rec(1, 1, 3.0, 1.0, 40),
            rec(2, 0, 2.0, 0.25, 20),
            rec(2, 1, 4.0, 1.5, 39),
        ]
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_generation_means() {
        let stats = generation_means(&two_runs(), Metric::PreyFitness);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].generation, 0);
        assert!(approx(stats[0].mean, 1.5));
        assert!(approx(stats[1].mean, 3.5));
        assert_eq!(stats[0].count, 2);
        assert!(stats[0].ci95 > 0.0);
    }

    #[test]
    fn test_single_sample_group_has_zero_ci() {
        let records = vec![rec(1, 0, 1.0, 1.0, 0), rec(1, 1, 2.0, 1.0, 0)];
        let stats = generation_means(&records, Metric::PreyFitness);

        assert!(stats.iter().all(|s| s.count == 1 && s.ci95 == 0.0));
    }

    #[test]
    fn test_improvement_mean_and_zero_ci() {
        let stats = improvement_stats(&two_runs(), Metric::PreyFitness);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].generation, 1);
        assert!(approx(stats[0].mean, 2.0));
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].ci95, 0.0);
    }

    #[test]
    fn test_run_improvement_length_and_values() {
        let records = vec![
            rec(7, 0, 1.0, 0.0, 0),
            rec(7, 1, 4.0, 0.0, 0),
            rec(7, 2, 3.5, 0.0, 0),
            rec(7, 3, 6.0, 0.0, 0),
        ];
        let runs = group_by_run(&records);
        let deltas = run_improvement(&runs[&7], Metric::PreyFitness);

        assert_eq!(deltas.len(), records.len() - 1);
        assert_eq!(deltas, vec![(1, 3.0), (2, -0.5), (3, 2.5)]);
    }

    #[test]
    fn test_group_by_run_orders_generations() {
        let records = vec![rec(1, 2, 3.0, 0.0, 0), rec(1, 0, 1.0, 0.0, 0), rec(1, 1, 2.0, 0.0, 0)];
        let runs = group_by_run(&records);
        let generations: Vec<u64> = runs[&1].iter().map(|r| r.generation).collect();
        assert_eq!(generations, vec![0, 1, 2]);
    }

    #[test]
    fn test_percentile_bands_are_monotonic() {
        let mut records = Vec::new();
        for run in 0..25u64 {
            for generation in 0..4u64 {
                let prey = ((run * 37 + generation * 11) % 19) as f64 * 0.7 + generation as f64;
                records.push(rec(run, generation, prey, 0.0, 0));
            }
        }

        let rows = percentile_rows(&records, Metric::PreyFitness);
        assert_eq!(rows.len(), 4);

        for row in &rows {
            for i in 0..BAND_COUNT {
                let (low, high) = row.band(i);
                assert!(low <= high);
            }
            let (top_low, top_high) = row.band(BAND_COUNT - 1);
            assert!(row.p99 >= top_low);
            assert!(row.p99 <= top_high);
        }
    }

    #[test]
    fn test_final_distribution_uses_last_generation() {
        let final_dist = final_distribution(&two_runs()).unwrap();

        assert_eq!(final_dist.generation, 1);
        assert!(approx(final_dist.prey.median, 3.5));
        assert!(approx(final_dist.predator.median, 1.25));
    }

    #[test]
    fn test_final_distribution_empty() {
        assert!(final_distribution(&[]).is_none());
    }

    #[test]
    fn test_phase_trajectory() {
        let phase = phase_trajectory(&two_runs());

        assert_eq!(phase.len(), 2);
        assert_eq!(phase[0].generation, 0);
        assert!(approx(phase[0].prey_mean, 1.5));
        assert!(approx(phase[0].predator_mean, 0.375));
        assert!(approx(phase[1].prey_mean, 3.5));
        assert!(approx(phase[1].predator_mean, 1.25));
    }

    #[test]
    fn test_dieout_half_of_runs() {
        let summary = dieout_summary(&two_runs(), 40);

        assert_eq!(summary.dieout_runs, 1);
        assert_eq!(summary.total_runs, 2);
        assert!(approx(summary.percentage, 50.0));
        assert_eq!(summary.to_string(), "1/2 (50.00%)");
    }

    #[test]
    fn test_dieout_uses_run_maximum() {
        let records = vec![rec(1, 0, 0.0, 0.0, 40), rec(1, 1, 0.0, 0.0, 3)];
        assert_eq!(dieout_summary(&records, 40).dieout_runs, 1);
    }

    #[test]
    fn test_dieout_no_runs() {
        let summary = dieout_summary(&[], 40);
        assert_eq!(summary.total_runs, 0);
        assert_eq!(summary.percentage, 0.0);
    }

    #[test]
    fn test_compute_trends() {
        let trends = compute_trends(&two_runs(), 40).unwrap();

        assert_eq!(trends.prey_mean.len(), 2);
        assert_eq!(trends.predator_improvement.len(), 1);
        assert_eq!(trends.prey_percentiles.len(), 2);
        assert_eq!(trends.phase.len(), 2);
        assert_eq!(trends.dieout.dieout_runs, 1);
        assert_eq!(run_count(&two_runs()), 2);
        assert_eq!(generation_count(&two_runs()), 2);
    }

    #[test]
    fn test_compute_trends_empty() {
        assert_eq!(compute_trends(&[], 40).unwrap_err(), LoadError::Empty);
    }
}
