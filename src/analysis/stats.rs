//! Descriptive statistics over slices of samples.

use crate::models::BoxSummary;
use std::cmp::Ordering;

/// z-score for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator), 0 below two samples.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() as f64 - 1.0);
    var.max(0.0).sqrt()
}

/// Half-width of the 95% Wald interval for the mean.
///
/// Defined as 0 when there is at most one observation.
pub fn ci95(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    Z_95 * sample_std(values) / (n as f64).sqrt()
}

/// Sort a copy of the samples ascending.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Quantile of already-sorted samples, linearly interpolated between
/// closest ranks at position `q * (n - 1)`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let t = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * t
    }
}

/// Quantile of unsorted samples.
#[cfg(test)]
pub fn quantile(values: &[f64], q: f64) -> f64 {
    quantile_sorted(&sorted(values), q)
}

/// Box-and-whisker summary with whiskers at 1.5 IQR.
pub fn box_summary(values: &[f64]) -> BoxSummary {
    let sorted = sorted(values);
    let q1 = quantile_sorted(&sorted, 0.25);
    let median = quantile_sorted(&sorted, 0.5);
    let q3 = quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    let low_fence = q1 - 1.5 * iqr;
    let high_fence = q3 + 1.5 * iqr;

    let inside: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v >= low_fence && *v <= high_fence)
        .collect();
    let whisker_low = inside.first().copied().unwrap_or(q1);
    let whisker_high = inside.last().copied().unwrap_or(q3);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| *v < low_fence || *v > high_fence)
        .collect();

    BoxSummary {
        q1,
        median,
        q3,
        whisker_low,
        whisker_high,
        outliers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx(mean(&values), 5.0));
        // Sample variance is 32 / 7.
        assert!(approx(sample_std(&values), (32.0f64 / 7.0).sqrt()));
    }

    #[test]
    fn test_ci95_single_sample_is_zero() {
        assert_eq!(ci95(&[3.5]), 0.0);
        assert_eq!(ci95(&[]), 0.0);
    }

    #[test]
    fn test_ci95_two_samples() {
        // std of [1, 3] is sqrt(2).
        let expected = 1.96 * 2.0f64.sqrt() / 2.0f64.sqrt();
        assert!(approx(ci95(&[1.0, 3.0]), expected));
        assert!(ci95(&[1.0, 3.0]) > 0.0);
    }

    #[test]
    fn test_ci95_constant_samples_is_zero() {
        assert_eq!(ci95(&[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert!(approx(quantile(&values, 0.0), 1.0));
        assert!(approx(quantile(&values, 1.0), 4.0));
        assert!(approx(quantile(&values, 0.5), 2.5));
        // position 0.1 * 3 = 0.3 between 1 and 2
        assert!(approx(quantile(&values, 0.1), 1.3));
        assert!(approx(quantile(&values, 0.99), 3.97));
    }

    #[test]
    fn test_quantile_single_value() {
        assert_eq!(quantile(&[7.0], 0.37), 7.0);
    }

    #[test]
    fn test_box_summary_with_outlier() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let summary = box_summary(&values);

        assert!(approx(summary.q1, 2.25));
        assert!(approx(summary.median, 3.5));
        assert!(approx(summary.q3, 4.75));
        assert_eq!(summary.whisker_low, 1.0);
        assert_eq!(summary.whisker_high, 5.0);
        assert_eq!(summary.outliers, vec![100.0]);
    }

    #[test]
    fn test_box_summary_single_value() {
        let summary = box_summary(&[2.5]);
        assert_eq!(summary.q1, 2.5);
        assert_eq!(summary.q3, 2.5);
        assert_eq!(summary.whisker_low, 2.5);
        assert_eq!(summary.whisker_high, 2.5);
        assert!(summary.outliers.is_empty());
    }
}
