//! Capability interfaces for trained, fit-free model artifacts.
//!
//! Every artifact is immutable after loading and shared across requests, so
//! all methods take `&self` and implementors must be `Send + Sync`.

use crate::error::Result;
use nalgebra::DMatrix;

/// A fitted transform (scaler, dimensionality reducer).
pub trait Transformer: Send + Sync {
    /// Transform a samples × features matrix.
    fn transform(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// Number of input columns the transform was fitted on, if declared.
    fn expected_input_dimension(&self) -> Option<usize> {
        None
    }

    /// Number of output columns, if known.
    fn output_dimension(&self) -> Option<usize> {
        None
    }
}

/// A fitted clustering model.
pub trait Clusterer: Send + Sync {
    /// Assign each row to a cluster.
    fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<usize>>;

    /// Number of input columns, if declared.
    fn expected_input_dimension(&self) -> Option<usize> {
        None
    }

    /// Number of clusters, if known.
    fn n_clusters(&self) -> Option<usize> {
        None
    }
}

/// Per-class probabilities, when the classifier supports them.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassProbabilities {
    /// Probabilities (rows × classes) with class labels in the classifier's order.
    Available {
        labels: Vec<String>,
        matrix: DMatrix<f64>,
    },
    /// The classifier only produces hard labels.
    Unsupported,
}

impl ClassProbabilities {
    /// Whether probability output is present.
    pub fn is_available(&self) -> bool {
        matches!(self, ClassProbabilities::Available { .. })
    }
}

/// A fitted classifier.
pub trait Classifier: Send + Sync {
    /// Predict a class label per row.
    fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<String>>;

    /// Per-class probabilities per row.
    fn predict_probabilities(&self, _x: &DMatrix<f64>) -> Result<ClassProbabilities> {
        Ok(ClassProbabilities::Unsupported)
    }

    /// Class labels in the classifier's native order, if declared.
    fn class_labels(&self) -> Option<&[String]> {
        None
    }

    /// Number of input columns the classifier was fitted on, if declared.
    fn expected_input_dimension(&self) -> Option<usize> {
        None
    }
}

/// Check the column count of an input matrix.
pub(crate) fn check_columns(stage: &'static str, x: &DMatrix<f64>, expected: usize) -> Result<()> {
    if x.ncols() != expected {
        return Err(crate::error::CodonError::DimensionMismatch {
            stage,
            expected,
            actual: x.ncols(),
        });
    }
    Ok(())
}
