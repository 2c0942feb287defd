//! Statistics over raw samples.
//!
//! All functions accept unsorted input and are total: empty or tiny inputs
//! produce zeros or empty sets rather than errors.

use serde::Serialize;

/// z-score for a 95% confidence level (normal approximation, n >= 30).
const Z_95: f64 = 1.96;

/// Sample count at which the normal approximation is used.
const LARGE_SAMPLE: usize = 30;

/// Minimum samples for IQR outlier detection.
const MIN_OUTLIER_SAMPLES: usize = 4;

fn sorted(data: &[f64]) -> Vec<f64> {
    let mut v = data.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let p = p.clamp(0.0, 100.0);
    let k = (sorted.len() - 1) as f64 * p / 100.0;
    let f = k.floor() as usize;
    let c = k.ceil() as usize;
    if f == c {
        return sorted[f];
    }
    sorted[f] * (c as f64 - k) + sorted[c] * (k - f as f64)
}

/// Percentile with linear interpolation between closest ranks.
///
/// `percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 50.0) == 3.0`; empty input is 0.
pub fn percentile(data: &[f64], p: f64) -> f64 {
    percentile_sorted(&sorted(data), p)
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        0.0
    } else {
        data.iter().sum::<f64>() / data.len() as f64
    }
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than 2 samples.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let var = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    var.sqrt()
}

/// Values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`, in input order.
///
/// Fewer than four samples never report outliers.
pub fn detect_outliers(data: &[f64]) -> Vec<f64> {
    if data.len() < MIN_OUTLIER_SAMPLES {
        return Vec::new();
    }
    let s = sorted(data);
    let q1 = percentile_sorted(&s, 25.0);
    let q3 = percentile_sorted(&s, 75.0);
    let iqr = q3 - q1;
    let (lower, upper) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    data.iter()
        .copied()
        .filter(|&x| x < lower || x > upper)
        .collect()
}

/// 95% confidence interval for a sample mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub margin: f64,
}

/// Confidence interval for the mean of `data`.
///
/// Uses z = 1.96 from 30 samples up, and the small-sample approximation
/// `t = 2.0 + 0.3 / n` below that. Fewer than two samples give a zero-width
/// interval at zero.
pub fn confidence_interval(data: &[f64]) -> ConfidenceInterval {
    let n = data.len();
    if n < 2 {
        return ConfidenceInterval::default();
    }
    let critical = if n >= LARGE_SAMPLE {
        Z_95
    } else {
        2.0 + 0.3 / n as f64
    };
    let m = mean(data);
    let margin = critical * std_dev(data) / (n as f64).sqrt();
    ConfidenceInterval {
        lower: m - margin,
        upper: m + margin,
        margin,
    }
}

/// Distribution summary of a set of durations, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DurationSummary {
    pub count: usize,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub std_dev_ms: f64,
    pub confidence_interval: ConfidenceInterval,
    pub outliers_ms: Vec<f64>,
    /// Samples strictly above the slow threshold.
    pub slow_count: usize,
}

impl DurationSummary {
    pub fn from_millis(samples: &[f64], slow_threshold_ms: f64) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let s = sorted(samples);
        Self {
            count: samples.len(),
            avg_ms: mean(samples),
            min_ms: s[0],
            max_ms: s[s.len() - 1],
            median_ms: percentile_sorted(&s, 50.0),
            p95_ms: percentile_sorted(&s, 95.0),
            p99_ms: percentile_sorted(&s, 99.0),
            std_dev_ms: std_dev(samples),
            confidence_interval: confidence_interval(samples),
            outliers_ms: detect_outliers(samples),
            slow_count: samples.iter().filter(|&&x| x > slow_threshold_ms).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), 2.5);
        assert_eq!(percentile(&[10.0], 99.0), 10.0);
        assert_eq!(percentile(&[5.0, 1.0, 3.0], 0.0), 1.0);
        assert_eq!(percentile(&[5.0, 1.0, 3.0], 100.0), 5.0);
    }

    #[test]
    fn std_dev_of_constant_is_zero() {
        assert_eq!(std_dev(&[4.0, 4.0, 4.0]), 0.0);
        assert_eq!(std_dev(&[4.0]), 0.0);
    }

    #[test]
    fn summary_of_empty_is_default() {
        assert_eq!(
            DurationSummary::from_millis(&[], 10.0),
            DurationSummary::default()
        );
    }

    #[test]
    fn summary_counts_slow_samples() {
        let s = DurationSummary::from_millis(&[1.0, 5.0, 60.0, 70.0], 50.0);
        assert_eq!(s.count, 4);
        assert_eq!(s.slow_count, 2);
        assert_eq!(s.min_ms, 1.0);
        assert_eq!(s.max_ms, 70.0);
    }
}
