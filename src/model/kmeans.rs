//! K-means cluster assignment by nearest centroid.

use super::traits::{check_columns, Clusterer};
use crate::error::{CodonError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Fitted k-means centroids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    /// Cluster centroids `[n_clusters][n_features]`.
    pub centroids: Vec<Vec<f64>>,
}

impl KMeans {
    /// Create from centroids, validating their shape.
    pub fn new(centroids: Vec<Vec<f64>>) -> Result<Self> {
        let model = Self { centroids };
        model.validate()?;
        Ok(model)
    }

    /// Check that centroids are non-empty and of equal length.
    pub fn validate(&self) -> Result<()> {
        let first_len = self
            .centroids
            .first()
            .map(Vec::len)
            .ok_or_else(|| CodonError::artifact("kmeans", "no centroids"))?;
        if first_len == 0 {
            return Err(CodonError::artifact("kmeans", "empty centroid"));
        }
        for (i, c) in self.centroids.iter().enumerate() {
            if c.len() != first_len {
                return Err(CodonError::artifact(
                    "kmeans",
                    format!("centroid {} has {} features, expected {}", i, c.len(), first_len),
                ));
            }
        }
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    /// Index of the nearest centroid; ties go to the lowest index.
    fn nearest(&self, row: &[f64]) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (idx, centroid) in self.centroids.iter().enumerate() {
            let dist: f64 = centroid
                .iter()
                .zip(row)
                .map(|(c, x)| (c - x) * (c - x))
                .sum();
            if dist < best_dist {
                best = idx;
                best_dist = dist;
            }
        }
        best
    }
}

impl Clusterer for KMeans {
    fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<usize>> {
        check_columns("kmeans", x, self.dimension())?;
        Ok((0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row: Vec<f64> = x.row(i).iter().copied().collect();
                self.nearest(&row)
            })
            .collect())
    }

    fn expected_input_dimension(&self) -> Option<usize> {
        Some(self.dimension())
    }

    fn n_clusters(&self) -> Option<usize> {
        Some(self.centroids.len())
    }
}
