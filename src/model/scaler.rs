//! Standardization transform: (x - mean) / scale per column.

use super::traits::{check_columns, Transformer};
use crate::error::{CodonError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// A fitted standard scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-column means.
    pub mean: Vec<f64>,
    /// Per-column scales (standard deviations).
    pub scale: Vec<f64>,
    /// Whether to center.
    #[serde(default = "default_true")]
    pub with_mean: bool,
    /// Whether to scale.
    #[serde(default = "default_true")]
    pub with_std: bool,
}

fn default_true() -> bool {
    true
}

impl StandardScaler {
    /// Create a scaler, validating its parameters.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        let scaler = Self {
            mean,
            scale,
            with_mean: true,
            with_std: true,
        };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Check that the parameter vectors are consistent.
    pub fn validate(&self) -> Result<()> {
        if self.mean.is_empty() {
            return Err(CodonError::artifact("scaler", "no columns"));
        }
        if self.mean.len() != self.scale.len() {
            return Err(CodonError::artifact(
                "scaler",
                format!("{} means but {} scales", self.mean.len(), self.scale.len()),
            ));
        }
        Ok(())
    }
}

impl Transformer for StandardScaler {
    fn transform(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        check_columns("scaler", x, self.mean.len())?;
        Ok(DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| {
            let mut v = x[(i, j)];
            if self.with_mean {
                v -= self.mean[j];
            }
            // zero-variance columns are left unscaled
            if self.with_std && self.scale[j] != 0.0 {
                v /= self.scale[j];
            }
            v
        }))
    }

    fn expected_input_dimension(&self) -> Option<usize> {
        Some(self.mean.len())
    }

    fn output_dimension(&self) -> Option<usize> {
        Some(self.mean.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform() {
        let scaler = StandardScaler::new(vec![1.0, 2.0], vec![2.0, 0.0]).unwrap();
        let x = DMatrix::from_row_slice(2, 2, &[3.0, 2.0, 1.0, 5.0]);
        let out = scaler.transform(&x).unwrap();
        assert_relative_eq!(out[(0, 0)], 1.0);
        assert_relative_eq!(out[(1, 0)], 0.0);
        assert_relative_eq!(out[(1, 1)], 3.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3]).unwrap();
        let x = DMatrix::zeros(1, 2);
        assert!(scaler.transform(&x).is_err());
    }

    #[test]
    fn test_from_json() {
        let scaler: StandardScaler =
            serde_json::from_str(r#"{"mean": [0.5], "scale": [0.25]}"#).unwrap();
        assert!(scaler.with_mean && scaler.with_std);
        assert!(StandardScaler::new(vec![0.0], vec![]).is_err());
    }
}
