//! Serialized classifier artifacts.
//!
//! Two families are supported, selected by the `kind` tag of the artifact:
//!
//! - `logistic`: (multinomial) logistic regression with probability output
//! - `nearest_centroid`: hard labels only

use super::traits::{check_columns, ClassProbabilities, Classifier};
use crate::error::{CodonError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Deserializer, Serialize};

/// Class labels may be stored as strings or numbers.
fn deserialize_labels<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Integer(i64),
        Number(f64),
        Text(String),
    }

    let labels = Vec::<Label>::deserialize(deserializer)?;
    Ok(labels
        .into_iter()
        .map(|label| match label {
            Label::Integer(i) => i.to_string(),
            Label::Number(v) => v.to_string(),
            Label::Text(s) => s,
        })
        .collect())
}

/// Linear classifier with softmax (or sigmoid, for two classes) output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    /// Class labels in output order.
    #[serde(deserialize_with = "deserialize_labels")]
    pub classes: Vec<String>,
    /// Coefficients, one row per class (a single row for two classes).
    pub coefficients: Vec<Vec<f64>>,
    /// Intercepts, one per coefficient row.
    pub intercepts: Vec<f64>,
}

impl LogisticClassifier {
    /// Check that the parameter shapes are consistent.
    pub fn validate(&self) -> Result<()> {
        if self.classes.len() < 2 {
            return Err(CodonError::artifact("classifier", "need at least two classes"));
        }
        let binary = self.classes.len() == 2 && self.coefficients.len() == 1;
        if !binary && self.coefficients.len() != self.classes.len() {
            return Err(CodonError::artifact(
                "classifier",
                format!(
                    "{} coefficient rows for {} classes",
                    self.coefficients.len(),
                    self.classes.len()
                ),
            ));
        }
        if self.intercepts.len() != self.coefficients.len() {
            return Err(CodonError::artifact(
                "classifier",
                "one intercept per coefficient row required",
            ));
        }
        let width = self.n_features();
        if width == 0 || self.coefficients.iter().any(|c| c.len() != width) {
            return Err(CodonError::artifact("classifier", "ragged or empty coefficients"));
        }
        Ok(())
    }

    fn n_features(&self) -> usize {
        self.coefficients.first().map_or(0, Vec::len)
    }

    fn probabilities(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        check_columns("classifier", x, self.n_features())?;
        let n_classes = self.classes.len();
        let mut probs = DMatrix::zeros(x.nrows(), n_classes);

        for i in 0..x.nrows() {
            let scores: Vec<f64> = self
                .coefficients
                .iter()
                .zip(&self.intercepts)
                .map(|(coef, b)| coef.iter().zip(x.row(i).iter()).map(|(w, v)| w * v).sum::<f64>() + b)
                .collect();

            if scores.len() == 1 {
                let p = 1.0 / (1.0 + (-scores[0]).exp());
                probs[(i, 0)] = 1.0 - p;
                probs[(i, 1)] = p;
            } else {
                let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
                let total: f64 = exps.iter().sum();
                for (k, e) in exps.iter().enumerate() {
                    probs[(i, k)] = e / total;
                }
            }
        }
        Ok(probs)
    }
}

/// Assigns each row the label of its nearest class centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroidClassifier {
    /// Class labels.
    #[serde(deserialize_with = "deserialize_labels")]
    pub classes: Vec<String>,
    /// One centroid per class.
    pub centroids: Vec<Vec<f64>>,
}

impl NearestCentroidClassifier {
    /// Check that the parameter shapes are consistent.
    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() || self.classes.len() != self.centroids.len() {
            return Err(CodonError::artifact(
                "classifier",
                "one centroid per class required",
            ));
        }
        let width = self.n_features();
        if width == 0 || self.centroids.iter().any(|c| c.len() != width) {
            return Err(CodonError::artifact("classifier", "ragged or empty centroids"));
        }
        Ok(())
    }

    fn n_features(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }
}

/// Position of the largest value; the first one wins ties.
fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

/// A classifier artifact as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    Logistic(LogisticClassifier),
    NearestCentroid(NearestCentroidClassifier),
}

impl ClassifierModel {
    /// Check the wrapped model.
    pub fn validate(&self) -> Result<()> {
        match self {
            ClassifierModel::Logistic(m) => m.validate(),
            ClassifierModel::NearestCentroid(m) => m.validate(),
        }
    }
}

impl Classifier for ClassifierModel {
    fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<String>> {
        match self {
            ClassifierModel::Logistic(m) => {
                let probs = m.probabilities(x)?;
                Ok(probs
                    .row_iter()
                    .map(|row| m.classes[argmax(row.iter().copied())].clone())
                    .collect())
            }
            ClassifierModel::NearestCentroid(m) => {
                check_columns("classifier", x, m.n_features())?;
                Ok(x
                    .row_iter()
                    .map(|row| {
                        let mut best = 0;
                        let mut best_dist = f64::INFINITY;
                        for (k, c) in m.centroids.iter().enumerate() {
                            let dist: f64 =
                                c.iter().zip(row.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
                            if dist < best_dist {
                                best = k;
                                best_dist = dist;
                            }
                        }
                        m.classes[best].clone()
                    })
                    .collect())
            }
        }
    }

    fn predict_probabilities(&self, x: &DMatrix<f64>) -> Result<ClassProbabilities> {
        match self {
            ClassifierModel::Logistic(m) => Ok(ClassProbabilities::Available {
                labels: m.classes.clone(),
                matrix: m.probabilities(x)?,
            }),
            ClassifierModel::NearestCentroid(_) => Ok(ClassProbabilities::Unsupported),
        }
    }

    fn class_labels(&self) -> Option<&[String]> {
        match self {
            ClassifierModel::Logistic(m) => Some(&m.classes),
            ClassifierModel::NearestCentroid(m) => Some(&m.classes),
        }
    }

    fn expected_input_dimension(&self) -> Option<usize> {
        match self {
            ClassifierModel::Logistic(m) => Some(m.n_features()),
            ClassifierModel::NearestCentroid(m) => Some(m.n_features()),
        }
    }
}
