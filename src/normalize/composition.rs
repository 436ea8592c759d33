//! Amino-acid composition normalization with pseudocount smoothing.
//!
//! For sample j with amino-acid counts x_j and total T_j over k columns:
//!
//! composition(x_ij) = (x_ij + ε) / (T_j + ε·k)
//!
//! so every value is strictly positive and each row sums to 1.

use super::aggregate::AminoAcidCounts;
use crate::data::FeatureMatrix;
use crate::error::{CodonError, Result};
use crate::filter::{filter_low_totals, TotalFilterResult};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Pseudocount applied when none is configured.
pub const DEFAULT_PSEUDOCOUNT: f64 = 1e-8;

/// Per-sample amino-acid composition of the retained samples.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Normalized values (retained samples × amino acids).
    pub data: DMatrix<f64>,
    /// Amino-acid column names.
    pub amino_acids: Vec<String>,
    /// Total count per retained sample before normalization.
    pub totals: Vec<f64>,
    /// Index of each retained sample in the uploaded table.
    pub source_rows: Vec<usize>,
    /// Pseudocount applied.
    pub pseudocount: f64,
}

impl Composition {
    /// Number of retained samples.
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of amino-acid columns.
    pub fn n_amino_acids(&self) -> usize {
        self.data.ncols()
    }

    /// Composition of one sample.
    pub fn row(&self, sample: usize) -> Vec<f64> {
        self.data.row(sample).iter().copied().collect()
    }

    /// View as a named feature matrix.
    pub fn to_feature_matrix(&self) -> Result<FeatureMatrix> {
        FeatureMatrix::new(
            self.data.clone(),
            self.amino_acids.clone(),
            self.source_rows.clone(),
        )
    }
}

/// Normalize the given rows of an amino-acid count table.
///
/// # Arguments
/// * `counts` - Aggregated amino-acid counts for all uploaded rows
/// * `rows` - Rows to keep, in output order
/// * `pseudocount` - Smoothing value added to every cell
pub fn normalize_composition(
    counts: &AminoAcidCounts,
    rows: &[usize],
    pseudocount: f64,
) -> Result<Composition> {
    if pseudocount < 0.0 {
        return Err(CodonError::InvalidParameter(
            "Pseudocount must be non-negative".to_string(),
        ));
    }
    if rows.is_empty() {
        return Err(CodonError::EmptyData(
            "No samples with positive codon totals survived filtering".to_string(),
        ));
    }

    let k = counts.n_amino_acids();
    if k == 0 {
        return Err(CodonError::EmptyData(
            "No codon columns recognized in the table".to_string(),
        ));
    }

    let normalized_rows: Vec<(f64, Vec<f64>)> = rows
        .par_iter()
        .map(|&row| {
            let values: Vec<f64> = counts.data.row(row).iter().copied().collect();
            let total: f64 = values.iter().sum();
            let denom = total + pseudocount * k as f64;
            let normalized = values.iter().map(|&v| (v + pseudocount) / denom).collect();
            (total, normalized)
        })
        .collect();

    let mut data = DMatrix::zeros(rows.len(), k);
    let mut totals = Vec::with_capacity(rows.len());
    for (i, (total, values)) in normalized_rows.into_iter().enumerate() {
        totals.push(total);
        for (j, v) in values.into_iter().enumerate() {
            data[(i, j)] = v;
        }
    }

    Ok(Composition {
        data,
        amino_acids: counts.column_names(),
        totals,
        source_rows: rows.to_vec(),
        pseudocount,
    })
}

/// Drop degenerate samples, then normalize the survivors.
pub fn filter_and_normalize(
    counts: &AminoAcidCounts,
    low_total_quantile: f64,
    pseudocount: f64,
) -> Result<(Composition, TotalFilterResult)> {
    let filter = filter_low_totals(&counts.row_totals(), low_total_quantile)?;
    let composition = normalize_composition(counts, &filter.kept, pseudocount)?;
    Ok((composition, filter))
}
