//! Degenerate-sample filtering on per-sample codon totals.
//!
//! Two rules are applied together:
//!
//! - samples with a total of zero (or less) are dropped;
//! - samples whose total is at or below a low quantile of the totals of the
//!   whole uploaded batch are dropped.
//!
//! The quantile threshold is recomputed for every batch, so whether a sample
//! survives depends on the other samples it was uploaded with.

use crate::error::{CodonError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Quantile used for the low-total filter when none is configured.
pub const DEFAULT_LOW_TOTAL_QUANTILE: f64 = 0.05;

/// Quantile with linear interpolation between order statistics.
///
/// `sorted` must be sorted ascending and non-empty.
pub fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Outcome of the low-total filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalFilterResult {
    /// Indices of retained samples, in input order.
    pub kept: Vec<usize>,
    /// Indices dropped because their total was not positive.
    pub dropped_zero: Vec<usize>,
    /// Indices dropped by the quantile threshold.
    pub dropped_low: Vec<usize>,
    /// Threshold computed for this batch.
    pub threshold: f64,
}

impl TotalFilterResult {
    /// Number of samples removed.
    pub fn n_dropped(&self) -> usize {
        self.dropped_zero.len() + self.dropped_low.len()
    }
}

/// Filter samples by their totals.
///
/// # Arguments
/// * `totals` - Total count per sample
/// * `quantile` - Samples at or below this quantile of all totals are dropped
pub fn filter_low_totals(totals: &[f64], quantile: f64) -> Result<TotalFilterResult> {
    if !(0.0..=1.0).contains(&quantile) {
        return Err(CodonError::InvalidParameter(
            "Quantile must be between 0 and 1".to_string(),
        ));
    }
    if totals.is_empty() {
        return Err(CodonError::EmptyData("No samples to filter".to_string()));
    }

    let mut sorted = totals.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let threshold = quantile_linear(&sorted, quantile);

    let mut kept = Vec::new();
    let mut dropped_zero = Vec::new();
    let mut dropped_low = Vec::new();
    for (i, &total) in totals.iter().enumerate() {
        if total <= 0.0 {
            dropped_zero.push(i);
        } else if total <= threshold {
            dropped_low.push(i);
        } else {
            kept.push(i);
        }
    }

    debug!(
        "Low-total threshold {:.4} at quantile {}",
        threshold, quantile
    );
    if !dropped_zero.is_empty() || !dropped_low.is_empty() {
        info!(
            "Dropped {} zero-total and {} low-total samples of {}",
            dropped_zero.len(),
            dropped_low.len(),
            totals.len()
        );
    }

    Ok(TotalFilterResult {
        kept,
        dropped_zero,
        dropped_low,
        threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantile_linear() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(quantile_linear(&sorted, 0.0), 1.0);
        assert_relative_eq!(quantile_linear(&sorted, 0.5), 3.0);
        assert_relative_eq!(quantile_linear(&sorted, 1.0), 5.0);
        assert_relative_eq!(quantile_linear(&sorted, 0.05), 1.2);
        assert_relative_eq!(quantile_linear(&[7.0], 0.05), 7.0);
    }

    #[test]
    fn test_zero_rows_absorb_low_tail() {
        // 2 of 10 samples are empty: the 5th percentile is 0, so only they go
        let totals = vec![0.0, 8.0, 8.0, 0.0, 6.0, 6.0, 9.0, 7.0, 8.0, 6.0];
        let result = filter_low_totals(&totals, 0.05).unwrap();
        assert_eq!(result.dropped_zero, vec![0, 3]);
        assert!(result.dropped_low.is_empty());
        assert_eq!(result.kept.len(), 8);
    }

    #[test]
    fn test_outlier_dropped_independent_of_scale() {
        for scale in [1.0, 1e3, 1e6] {
            let mut totals: Vec<f64> = (0..10).map(|i| (100.0 + i as f64) * scale).collect();
            totals[4] = 1.0 * scale;
            let result = filter_low_totals(&totals, 0.05).unwrap();
            assert_eq!(result.dropped_low, vec![4]);
            assert_eq!(result.kept.len(), 9);
        }
    }

    #[test]
    fn test_invalid_quantile() {
        assert!(filter_low_totals(&[1.0, 2.0], 1.5).is_err());
        assert!(filter_low_totals(&[], 0.05).is_err());
    }
}
