//! Reconcile engineered features with the canonical training schema.

use crate::data::FeatureMatrix;
use crate::error::{CodonError, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Differences between the computed and the canonical feature names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// Canonical features that were not computed (filled with zeros), sorted.
    pub missing: Vec<String>,
    /// Computed features absent from the canonical list (dropped), sorted.
    pub extra: Vec<String>,
}

impl AlignmentReport {
    /// Whether the computed features matched the canonical list as a set.
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Reorder, zero-fill and drop columns so the matrix follows `canonical`.
///
/// The output columns equal `canonical` element by element. A violation of
/// that postcondition is a defect and is reported as `InvariantViolation`.
pub fn align_features(
    matrix: &FeatureMatrix,
    canonical: &[String],
) -> Result<(FeatureMatrix, AlignmentReport)> {
    let computed: HashSet<&str> = matrix.column_names().iter().map(String::as_str).collect();
    let expected: HashSet<&str> = canonical.iter().map(String::as_str).collect();

    let mut missing: Vec<String> = expected
        .difference(&computed)
        .map(|s| s.to_string())
        .collect();
    let mut extra: Vec<String> = computed
        .difference(&expected)
        .map(|s| s.to_string())
        .collect();
    missing.sort();
    extra.sort();

    if !missing.is_empty() {
        warn!("Adding missing features with zeros: {:?}", missing);
    }
    if !extra.is_empty() {
        warn!("Removing extra features: {:?}", extra);
    }

    let aligned = matrix.select_columns(canonical)?;
    if aligned.column_names() != canonical {
        return Err(CodonError::InvariantViolation(
            "Feature column order mismatch after reordering".to_string(),
        ));
    }

    Ok((aligned, AlignmentReport { missing, extra }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn matrix() -> FeatureMatrix {
        FeatureMatrix::new(
            DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            names(&["A", "R", "gini"]),
            vec![0, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_exact_reorder() {
        let canonical = names(&["gini", "A", "R"]);
        let (aligned, report) = align_features(&matrix(), &canonical).unwrap();
        assert!(report.is_exact());
        assert_eq!(aligned.column_names(), canonical.as_slice());
        assert_eq!(aligned.row(0), vec![3.0, 1.0, 2.0]);
        assert_eq!(aligned.source_rows(), &[0, 1]);
    }

    #[test]
    fn test_missing_and_extra() {
        let canonical = names(&["W", "A", "C"]);
        let (aligned, report) = align_features(&matrix(), &canonical).unwrap();
        assert_eq!(report.missing, names(&["C", "W"]));
        assert_eq!(report.extra, names(&["R", "gini"]));
        assert_eq!(aligned.column_names(), canonical.as_slice());
        assert_eq!(aligned.row(1), vec![0.0, 4.0, 0.0]);
    }
}
