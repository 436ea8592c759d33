//! Scale, reduce, cluster and classify an aligned feature matrix.
//!
//! Scaling, reduction and clustering are fatal on failure. Classification is
//! best effort: its errors are returned as [`ClassificationError`] so the
//! caller can keep the clustering output.

use crate::error::{ClassificationError, CodonError, Result};
use crate::model::{ArtifactSet, ClassProbabilities, Classifier};
use log::{info, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Intermediate matrices of the unsupervised stages.
#[derive(Debug, Clone)]
pub struct Embedding {
    /// Output of the scaler.
    pub scaled: DMatrix<f64>,
    /// Output of the reducer.
    pub reduced: DMatrix<f64>,
}

/// Apply the scaler.
pub fn scale(artifacts: &ArtifactSet, aligned: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let scaled = artifacts.scaler().transform(aligned)?;
    info!("Scaled features: {} x {}", scaled.nrows(), scaled.ncols());
    Ok(scaled)
}

/// Apply the dimensionality reducer.
pub fn reduce(artifacts: &ArtifactSet, scaled: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let reduced = artifacts.reducer().transform(scaled)?;
    info!("Reduced features: {} x {}", reduced.nrows(), reduced.ncols());
    Ok(reduced)
}

/// Assign clusters.
pub fn cluster(artifacts: &ArtifactSet, reduced: &DMatrix<f64>) -> Result<Vec<usize>> {
    let labels = artifacts.clusterer().predict(reduced)?;
    if labels.len() != reduced.nrows() {
        return Err(CodonError::DimensionMismatch {
            stage: "clusterer",
            expected: reduced.nrows(),
            actual: labels.len(),
        });
    }
    let mut distinct = labels.clone();
    distinct.sort_unstable();
    distinct.dedup();
    info!("Clustering completed. Found {} clusters", distinct.len());
    Ok(labels)
}

/// Run the scaler and reducer, then cluster.
pub fn embed_and_cluster(
    artifacts: &ArtifactSet,
    aligned: &DMatrix<f64>,
) -> Result<(Embedding, Vec<usize>)> {
    let scaled = scale(artifacts, aligned)?;
    let reduced = reduce(artifacts, &scaled)?;
    let labels = cluster(artifacts, &reduced)?;
    Ok((Embedding { scaled, reduced }, labels))
}

/// How the classifier input width was changed to match the expected dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Widths already agreed.
    None,
    /// Trailing columns were dropped.
    Truncated,
    /// Zero columns were appended.
    Padded,
}

/// Record of how the classifier input was assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputReconciliation {
    /// Input width the classifier expects.
    pub expected: usize,
    /// Width of the candidate input before adjustment.
    pub provided: usize,
    /// Whether the cluster label was appended as the last column.
    pub includes_cluster: bool,
    /// Adjustment applied to reach `expected`.
    pub adjustment: Adjustment,
}

/// Truncate or zero-pad trailing columns to reach `expected` columns.
pub fn reconcile_dimensions(x: &DMatrix<f64>, expected: usize) -> (DMatrix<f64>, Adjustment) {
    let actual = x.ncols();
    if actual == expected {
        (x.clone(), Adjustment::None)
    } else if actual > expected {
        (x.columns(0, expected).into_owned(), Adjustment::Truncated)
    } else {
        (x.clone().resize_horizontally(expected, 0.0), Adjustment::Padded)
    }
}

/// Append the cluster labels as a last column.
pub fn append_cluster_column(scaled: &DMatrix<f64>, clusters: &[usize]) -> DMatrix<f64> {
    let n_cols = scaled.ncols();
    DMatrix::from_fn(scaled.nrows(), n_cols + 1, |i, j| {
        if j < n_cols {
            scaled[(i, j)]
        } else {
            clusters[i] as f64
        }
    })
}

/// Assemble the classifier input from the scaled features and cluster labels.
///
/// The cluster column is included when the training configuration says so,
/// or otherwise when the expected width differs from the scaled width. The
/// expected width is taken from the training configuration, then from the
/// classifier, then from the candidate itself.
pub fn prepare_classifier_input(
    artifacts: &ArtifactSet,
    scaled: &DMatrix<f64>,
    clusters: &[usize],
) -> (DMatrix<f64>, InputReconciliation) {
    let config = artifacts.training_config();
    let configured_dimension = config
        .and_then(|c| c.n_features)
        .or_else(|| artifacts.classifier().expected_input_dimension());

    let includes_cluster = if config.map_or(false, |c| c.includes_cluster) {
        info!("Using scaled features + cluster for classification");
        true
    } else {
        configured_dimension.map_or(false, |expected| expected != scaled.ncols())
    };

    let candidate = if includes_cluster {
        append_cluster_column(scaled, clusters)
    } else {
        scaled.clone()
    };
    let provided = candidate.ncols();
    let expected = configured_dimension.unwrap_or(provided);
    info!(
        "Classification input - Expected: {}, Actual: {}",
        expected, provided
    );

    let (input, adjustment) = reconcile_dimensions(&candidate, expected);
    match adjustment {
        Adjustment::Truncated => warn!("Truncated classifier input from {} to {} features", provided, expected),
        Adjustment::Padded => warn!("Padded classifier input from {} to {} features", provided, expected),
        Adjustment::None => {}
    }

    (
        input,
        InputReconciliation {
            expected,
            provided,
            includes_cluster,
            adjustment,
        },
    )
}

/// Successful classifier output.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutput {
    /// One label per row.
    pub labels: Vec<String>,
    /// Per-class probabilities, when supported.
    pub probabilities: ClassProbabilities,
}

/// Predict labels and probabilities for a prepared input.
pub fn classify(
    classifier: &dyn Classifier,
    input: &DMatrix<f64>,
) -> std::result::Result<ClassificationOutput, ClassificationError> {
    let labels = classifier
        .predict(input)
        .map_err(|e| ClassificationError::Predict(e.to_string()))?;
    if labels.len() != input.nrows() {
        return Err(ClassificationError::RowCountMismatch {
            expected: input.nrows(),
            actual: labels.len(),
        });
    }

    let probabilities = classifier
        .predict_probabilities(input)
        .map_err(|e| ClassificationError::Probabilities(e.to_string()))?;
    if let ClassProbabilities::Available { labels: classes, matrix } = &probabilities {
        if matrix.nrows() != input.nrows() || matrix.ncols() != classes.len() {
            return Err(ClassificationError::Probabilities(format!(
                "probability matrix is {}x{} for {} rows and {} classes",
                matrix.nrows(),
                matrix.ncols(),
                input.nrows(),
                classes.len()
            )));
        }
    }

    Ok(ClassificationOutput {
        labels,
        probabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Clusterer, ClassifierModel, KMeans, NearestCentroidClassifier, Pca, StandardScaler,
        TrainingConfig,
    };

    fn artifacts(classifier_width: usize, config: Option<TrainingConfig>) -> ArtifactSet {
        let classifier = ClassifierModel::NearestCentroid(NearestCentroidClassifier {
            classes: vec!["bct".into(), "vrl".into()],
            centroids: vec![vec![0.0; classifier_width], vec![1.0; classifier_width]],
        });
        let set = ArtifactSet::new(
            Box::new(StandardScaler::new(vec![0.0; 3], vec![1.0; 3]).unwrap()),
            Box::new(Pca::new(vec![0.0; 3], vec![vec![1.0, 0.0, 0.0]]).unwrap()),
            Box::new(KMeans::new(vec![vec![0.0], vec![10.0]]).unwrap()),
            Box::new(classifier),
            vec!["A".into(), "R".into(), "K".into()],
        )
        .unwrap();
        match config {
            Some(c) => set.with_training_config(c),
            None => set,
        }
    }

    #[test]
    fn test_reconcile_truncate_and_pad() {
        let k = 5;
        let wide = DMatrix::from_fn(2, k + 3, |i, j| (i * 10 + j) as f64);
        let (out, adj) = reconcile_dimensions(&wide, k);
        assert_eq!(out.shape(), (2, k));
        assert_eq!(adj, Adjustment::Truncated);
        assert_eq!(out[(1, 4)], 14.0);

        let narrow = DMatrix::from_element(2, k - 3, 7.0);
        let (out, adj) = reconcile_dimensions(&narrow, k);
        assert_eq!(out.shape(), (2, k));
        assert_eq!(adj, Adjustment::Padded);
        assert_eq!(out[(0, 1)], 7.0);
        assert_eq!(out[(0, 2)], 0.0);
        assert_eq!(out[(1, 4)], 0.0);

        let (_, adj) = reconcile_dimensions(&narrow, k - 3);
        assert_eq!(adj, Adjustment::None);
    }

    #[test]
    fn test_cluster_included_by_dimension() {
        let set = artifacts(4, None);
        let scaled = DMatrix::from_element(2, 3, 0.5);
        let (input, rec) = prepare_classifier_input(&set, &scaled, &[0, 1]);
        assert!(rec.includes_cluster);
        assert_eq!(rec.adjustment, Adjustment::None);
        assert_eq!(input.shape(), (2, 4));
        assert_eq!(input[(1, 3)], 1.0);
    }

    #[test]
    fn test_cluster_excluded_when_widths_agree() {
        let set = artifacts(3, None);
        let scaled = DMatrix::from_element(2, 3, 0.5);
        let (input, rec) = prepare_classifier_input(&set, &scaled, &[0, 1]);
        assert!(!rec.includes_cluster);
        assert_eq!(input.shape(), (2, 3));
    }

    #[test]
    fn test_training_config_takes_precedence() {
        let config = TrainingConfig {
            includes_cluster: true,
            n_features: Some(6),
        };
        let set = artifacts(3, Some(config));
        let scaled = DMatrix::from_element(1, 3, 0.5);
        let (input, rec) = prepare_classifier_input(&set, &scaled, &[1]);
        assert!(rec.includes_cluster);
        assert_eq!(rec.expected, 6);
        assert_eq!(rec.provided, 4);
        assert_eq!(rec.adjustment, Adjustment::Padded);
        assert_eq!(input[(0, 3)], 1.0);
        assert_eq!(input[(0, 5)], 0.0);
    }

    struct Broken;

    impl Classifier for Broken {
        fn predict(&self, _x: &DMatrix<f64>) -> Result<Vec<String>> {
            Err(CodonError::Model("model file is corrupt".to_string()))
        }
    }

    struct OneLabel;

    impl Clusterer for OneLabel {
        fn predict(&self, _x: &DMatrix<f64>) -> Result<Vec<usize>> {
            Ok(vec![0])
        }
    }

    #[test]
    fn test_cluster_label_count_checked() {
        let set = ArtifactSet::new(
            Box::new(StandardScaler::new(vec![0.0; 3], vec![1.0; 3]).unwrap()),
            Box::new(Pca::new(vec![0.0; 3], vec![vec![1.0, 0.0, 0.0]]).unwrap()),
            Box::new(OneLabel),
            Box::new(ClassifierModel::NearestCentroid(NearestCentroidClassifier {
                classes: vec!["bct".into()],
                centroids: vec![vec![0.0; 3]],
            })),
            vec!["A".into(), "R".into(), "K".into()],
        )
        .unwrap();
        let err = cluster(&set, &DMatrix::zeros(3, 1)).unwrap_err();
        match err {
            CodonError::DimensionMismatch {
                stage,
                expected,
                actual,
            } => {
                assert_eq!(stage, "clusterer");
                assert_eq!(expected, 3);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_classify_error_is_recoverable() {
        let err = classify(&Broken, &DMatrix::zeros(2, 2)).unwrap_err();
        assert!(matches!(err, ClassificationError::Predict(_)));
        assert!(err.to_string().contains("corrupt"));
    }
}
