//! # Outlier Detection
//! One shared statistic, two thresholds: the daily series flags spikes
//! at `mean + sigma × population stddev`, category totals flag
//! above-average rows at `mean × factor`. Each metric column gets its
//! own threshold; comparisons are strict.

/// Spike threshold for a time-series column, or `None` when fewer than
/// two points exist (a single point has no meaningful deviation).
pub fn spike_threshold(values: &[f64], sigma: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(mean + variance.sqrt() * sigma)
}

/// Above-average threshold for a totals column, or `None` when empty.
pub fn above_average_threshold(values: &[f64], factor: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(mean(values) * factor)
}

/// Per-row flags: true where the value strictly exceeds the threshold.
/// A `None` threshold (degenerate statistics) flags nothing.
pub fn flag_over(values: &[f64], threshold: Option<f64>) -> Vec<bool> {
    match threshold {
        Some(t) => values.iter().map(|&v| v > t).collect(),
        None => vec![false; values.len()],
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
