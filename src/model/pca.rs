//! Principal-component projection.

use super::traits::{check_columns, Transformer};
use crate::error::{CodonError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// A fitted PCA projection: (x - mean) · componentsᵀ, optionally whitened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    /// Per-feature means subtracted before projecting.
    pub mean: Vec<f64>,
    /// Principal axes, one row per component.
    pub components: Vec<Vec<f64>>,
    /// Variance explained by each component (needed for whitening).
    #[serde(default)]
    pub explained_variance: Vec<f64>,
    /// Divide projections by the square root of the explained variance.
    #[serde(default)]
    pub whiten: bool,
}

impl Pca {
    /// Create a projection, validating its parameters.
    pub fn new(mean: Vec<f64>, components: Vec<Vec<f64>>) -> Result<Self> {
        let pca = Self {
            mean,
            components,
            explained_variance: Vec::new(),
            whiten: false,
        };
        pca.validate()?;
        Ok(pca)
    }

    /// Number of components.
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Check that the parameter shapes are consistent.
    pub fn validate(&self) -> Result<()> {
        if self.components.is_empty() || self.mean.is_empty() {
            return Err(CodonError::artifact("pca", "no components"));
        }
        if let Some((i, c)) = self
            .components
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != self.mean.len())
        {
            return Err(CodonError::artifact(
                "pca",
                format!(
                    "component {} has {} loadings, expected {}",
                    i,
                    c.len(),
                    self.mean.len()
                ),
            ));
        }
        if self.whiten && self.explained_variance.len() != self.components.len() {
            return Err(CodonError::artifact(
                "pca",
                "whitening requires one explained variance per component",
            ));
        }
        Ok(())
    }

    fn component_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.mean.len(), self.n_components(), |i, k| {
            self.components[k][i]
        })
    }
}

impl Transformer for Pca {
    fn transform(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        check_columns("pca", x, self.mean.len())?;
        let centered = DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| x[(i, j)] - self.mean[j]);
        let mut projected = centered * self.component_matrix();
        if self.whiten {
            for (k, mut col) in projected.column_iter_mut().enumerate() {
                let sd = self.explained_variance[k].sqrt();
                if sd > 0.0 {
                    col /= sd;
                }
            }
        }
        Ok(projected)
    }

    fn expected_input_dimension(&self) -> Option<usize> {
        Some(self.mean.len())
    }

    fn output_dimension(&self) -> Option<usize> {
        Some(self.n_components())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_projection() {
        let pca = Pca::new(vec![1.0, 1.0], vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let x = DMatrix::from_row_slice(1, 2, &[3.0, -1.0]);
        let out = pca.transform(&x).unwrap();
        assert_eq!(out.shape(), (1, 2));
        assert_relative_eq!(out[(0, 0)], 2.0);
        assert_relative_eq!(out[(0, 1)], -2.0);
    }

    #[test]
    fn test_reduces_dimension_and_whitens() {
        let pca = Pca {
            mean: vec![0.0, 0.0, 0.0],
            components: vec![vec![1.0, 1.0, 0.0]],
            explained_variance: vec![4.0],
            whiten: true,
        };
        pca.validate().unwrap();
        let x = DMatrix::from_row_slice(1, 3, &[1.0, 3.0, 9.0]);
        let out = pca.transform(&x).unwrap();
        assert_eq!(out.shape(), (1, 1));
        assert_relative_eq!(out[(0, 0)], 2.0);
    }

    #[test]
    fn test_ragged_components_rejected() {
        assert!(Pca::new(vec![0.0, 0.0], vec![vec![1.0]]).is_err());
    }
}
