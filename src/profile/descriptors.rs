//! Per-sample statistical descriptors of an amino-acid composition.
//!
//! Each sample's composition is treated as an unordered sequence of values
//! and summarized by central tendency, dispersion, shape, diversity and
//! inequality, plus its cosine similarity to the batch mean and median
//! compositions. The estimators match the ones the shipped artifacts were
//! trained on (sample standard deviation, adjusted skewness, bias-corrected
//! excess kurtosis).

use crate::data::FeatureMatrix;
use crate::error::Result;
use crate::normalize::Composition;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Offset added to composition values before the entropy computation.
pub const DEFAULT_ENTROPY_OFFSET: f64 = 1e-10;

/// Descriptor column names, in output order.
pub const DESCRIPTOR_NAMES: [&str; 9] = [
    "mean",
    "median",
    "std",
    "skewness",
    "kurtosis",
    "entropy",
    "gini",
    "cosine_similarity_to_mean",
    "cosine_similarity_to_median",
];

/// Descriptors of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleDescriptors {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub entropy: f64,
    pub gini: f64,
    pub cosine_similarity_to_mean: f64,
    pub cosine_similarity_to_median: f64,
}

impl SampleDescriptors {
    /// Values in [`DESCRIPTOR_NAMES`] order, NaN replaced by 0.
    pub fn to_array(&self) -> [f64; 9] {
        [
            self.mean,
            self.median,
            self.std,
            self.skewness,
            self.kurtosis,
            self.entropy,
            self.gini,
            self.cosine_similarity_to_mean,
            self.cosine_similarity_to_median,
        ]
        .map(|v| if v.is_nan() { 0.0 } else { v })
    }
}

/// Median of a sequence (NaN when empty).
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    Data::new(values.to_vec()).median()
}

/// Standard deviation with one delta degree of freedom; 0 for fewer than 2 values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let sd = values.iter().std_dev();
    if sd.is_nan() {
        0.0
    } else {
        sd
    }
}

/// Sums of squared and cubed/quartic deviations from the mean.
fn central_sums(values: &[f64]) -> (f64, f64, f64) {
    let mean = values.iter().mean();
    values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), &v| {
        let d = v - mean;
        let d2 = d * d;
        (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
    })
}

/// Adjusted Fisher-Pearson skewness; 0 when undefined.
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 3 {
        return 0.0;
    }
    let (m2, m3, _) = central_sums(values);
    if m2 == 0.0 {
        return 0.0;
    }
    (n * (n - 1.0).sqrt() / (n - 2.0)) * (m3 / m2.powf(1.5))
}

/// Bias-corrected excess kurtosis; 0 when undefined.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 4 {
        return 0.0;
    }
    let (m2, _, m4) = central_sums(values);
    let denominator = (n - 2.0) * (n - 3.0) * m2 * m2;
    if denominator == 0.0 {
        return 0.0;
    }
    let numerator = n * (n + 1.0) * (n - 1.0) * m4;
    let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    numerator / denominator - adj
}

/// Base-2 Shannon entropy of `values + offset`, renormalized to sum 1.
pub fn shannon_entropy_base2(values: &[f64], offset: f64) -> f64 {
    let shifted: Vec<f64> = values.iter().map(|&v| v + offset).collect();
    let total: f64 = shifted.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    shifted
        .iter()
        .map(|&v| v / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}

/// Gini coefficient over ascending ranks.
///
/// Gini = (2·Σ rank·value)/(n·Σvalue) − (n+1)/n; 0 for an empty or zero-sum sequence.
pub fn gini_coefficient(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = sorted.len();
    let total: f64 = sorted.iter().sum();
    if n == 0 || total == 0.0 {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &v)| (i + 1) as f64 * v)
        .sum();

    let n = n as f64;
    (2.0 * weighted) / (n * total) - (n + 1.0) / n
}

/// Cosine similarity; 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Column-wise mean and median of a matrix.
pub fn population_profiles(data: &DMatrix<f64>) -> (Vec<f64>, Vec<f64>) {
    let means = data.column_iter().map(|c| c.iter().mean()).collect();
    let medians = data
        .column_iter()
        .map(|c| median(&c.iter().copied().collect::<Vec<_>>()))
        .collect();
    (means, medians)
}

/// Descriptors of a single composition given the batch profiles.
pub fn describe_sample(
    values: &[f64],
    mean_profile: &[f64],
    median_profile: &[f64],
    entropy_offset: f64,
) -> SampleDescriptors {
    SampleDescriptors {
        mean: values.iter().mean(),
        median: median(values),
        std: sample_std(values),
        skewness: skewness(values),
        kurtosis: excess_kurtosis(values),
        entropy: shannon_entropy_base2(values, entropy_offset),
        gini: gini_coefficient(values),
        cosine_similarity_to_mean: cosine_similarity(values, mean_profile),
        cosine_similarity_to_median: cosine_similarity(values, median_profile),
    }
}

/// Compute the descriptor columns for every sample of a composition.
pub fn compute_descriptors(composition: &Composition, entropy_offset: f64) -> Result<FeatureMatrix> {
    let (mean_profile, median_profile) = population_profiles(&composition.data);

    let rows: Vec<[f64; 9]> = (0..composition.n_samples())
        .into_par_iter()
        .map(|i| {
            describe_sample(
                &composition.row(i),
                &mean_profile,
                &median_profile,
                entropy_offset,
            )
            .to_array()
        })
        .collect();

    let mut data = DMatrix::zeros(rows.len(), DESCRIPTOR_NAMES.len());
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            data[(i, j)] = v;
        }
    }

    FeatureMatrix::new(
        data,
        DESCRIPTOR_NAMES.iter().map(|s| s.to_string()).collect(),
        composition.source_rows.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gini_uniform_and_skewed() {
        let uniform = vec![0.05; 20];
        assert_relative_eq!(gini_coefficient(&uniform), 0.0, epsilon = 1e-12);

        let mut skewed = vec![0.0; 20];
        skewed[7] = 1.0;
        assert_relative_eq!(gini_coefficient(&skewed), 19.0 / 20.0, epsilon = 1e-12);

        assert_eq!(gini_coefficient(&[]), 0.0);
        assert_eq!(gini_coefficient(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_entropy_bounds() {
        let uniform = vec![0.05; 20];
        assert_relative_eq!(
            shannon_entropy_base2(&uniform, DEFAULT_ENTROPY_OFFSET),
            20f64.log2(),
            epsilon = 1e-9
        );

        let mut skewed = vec![0.0; 20];
        skewed[0] = 1.0;
        assert!(shannon_entropy_base2(&skewed, DEFAULT_ENTROPY_OFFSET) < 1e-6);
    }

    #[test]
    fn test_moments() {
        let values = [1.0, 2.0, 3.0, 4.0, 10.0];
        assert_relative_eq!(sample_std(&values), 3.5355339059327378, epsilon = 1e-12);
        // Reference values from the adjusted estimators
        assert_relative_eq!(skewness(&values), 1.2 * 2f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(excess_kurtosis(&values), 3.152, epsilon = 1e-9);

        assert_eq!(sample_std(&[0.3]), 0.0);
        assert_eq!(skewness(&[0.5, 0.5]), 0.0);
        assert_eq!(excess_kurtosis(&[0.2, 0.3, 0.5]), 0.0);
        assert_eq!(skewness(&[0.25; 4]), 0.0);
        assert_eq!(excess_kurtosis(&[0.25; 4]), 0.0);
    }

    #[test]
    fn test_median() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_relative_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_cosine_similarity() {
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]), 1.0);
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_compute_descriptors() {
        let data = DMatrix::from_row_slice(2, 3, &[0.5, 0.25, 0.25, 0.2, 0.2, 0.6]);
        let comp = Composition {
            data,
            amino_acids: vec!["A".into(), "R".into(), "K".into()],
            totals: vec![8.0, 5.0],
            source_rows: vec![0, 3],
            pseudocount: 0.0,
        };
        let desc = compute_descriptors(&comp, DEFAULT_ENTROPY_OFFSET).unwrap();
        assert_eq!(desc.shape(), (2, 9));
        assert_eq!(desc.source_rows(), &[0, 3]);
        assert_relative_eq!(desc.get(0, 0), 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(desc.get(0, 1), 0.25, epsilon = 1e-12);
        assert_relative_eq!(desc.get(0, 5), 1.5, epsilon = 1e-9);
        // kurtosis undefined for 3 values
        assert_eq!(desc.get(0, 4), 0.0);
        let sim = desc.column("cosine_similarity_to_mean").unwrap();
        assert!(sim.iter().all(|&s| s > 0.0 && s <= 1.0 + 1e-12));
    }
}
