//! Dense sample × feature matrix with named columns.

use crate::error::{CodonError, Result};
use nalgebra::DMatrix;
use std::collections::HashMap;

/// Engineered features for a batch of samples.
///
/// Rows are samples, columns are named features. `source_rows` maps each row
/// back to its index in the uploaded table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: DMatrix<f64>,
    column_names: Vec<String>,
    source_rows: Vec<usize>,
}

impl FeatureMatrix {
    /// Create a feature matrix, checking that the dimensions agree.
    pub fn new(data: DMatrix<f64>, column_names: Vec<String>, source_rows: Vec<usize>) -> Result<Self> {
        if data.ncols() != column_names.len() {
            return Err(CodonError::DimensionMismatch {
                stage: "feature matrix columns",
                expected: data.ncols(),
                actual: column_names.len(),
            });
        }
        if data.nrows() != source_rows.len() {
            return Err(CodonError::DimensionMismatch {
                stage: "feature matrix rows",
                expected: data.nrows(),
                actual: source_rows.len(),
            });
        }
        Ok(Self {
            data,
            column_names,
            source_rows,
        })
    }

    /// Number of samples.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of features.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.data.ncols()
    }

    /// (rows, columns).
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    /// Feature names in column order.
    #[inline]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Index of each row in the uploaded table.
    #[inline]
    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }

    /// Underlying matrix.
    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Value at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Position of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == name)
    }

    /// Values of a named column.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.column_index(name)
            .map(|j| self.data.column(j).iter().copied().collect())
    }

    /// Values of a row.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.data.row(row).iter().copied().collect()
    }

    /// Append the columns of another matrix with the same rows.
    pub fn hstack(&self, other: &FeatureMatrix) -> Result<Self> {
        if self.source_rows != other.source_rows {
            return Err(CodonError::InvariantViolation(
                "cannot join feature matrices over different rows".to_string(),
            ));
        }
        let n_rows = self.n_rows();
        let n_cols = self.n_cols() + other.n_cols();
        let data = DMatrix::from_fn(n_rows, n_cols, |i, j| {
            if j < self.n_cols() {
                self.data[(i, j)]
            } else {
                other.data[(i, j - self.n_cols())]
            }
        });
        let mut names = self.column_names.clone();
        names.extend(other.column_names.iter().cloned());
        Self::new(data, names, self.source_rows.clone())
    }

    /// Build a matrix with the given columns in order.
    ///
    /// Names not present become zero-filled columns.
    pub fn select_columns(&self, names: &[String]) -> Result<Self> {
        let lookup: HashMap<&str, usize> = self
            .column_names
            .iter()
            .enumerate()
            .map(|(j, name)| (name.as_str(), j))
            .collect();

        let mut data = DMatrix::zeros(self.n_rows(), names.len());
        for (new_col, name) in names.iter().enumerate() {
            if let Some(&old_col) = lookup.get(name.as_str()) {
                data.set_column(new_col, &self.data.column(old_col));
            }
        }
        Self::new(data, names.to_vec(), self.source_rows.clone())
    }

    /// Replace NaN entries with zero.
    pub fn fill_nan(mut self, value: f64) -> Self {
        self.data.apply(|v| {
            if v.is_nan() {
                *v = value;
            }
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_matrix() -> FeatureMatrix {
        let data = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        FeatureMatrix::new(
            data,
            vec!["A".into(), "R".into(), "K".into()],
            vec![0, 2],
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions() {
        let mat = create_test_matrix();
        assert_eq!(mat.shape(), (2, 3));
        assert_eq!(mat.source_rows(), &[0, 2]);
        assert_eq!(mat.column("R").unwrap(), vec![2.0, 5.0]);
        assert_eq!(mat.row(1), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_name_count_mismatch() {
        let data = DMatrix::zeros(2, 3);
        assert!(FeatureMatrix::new(data, vec!["A".into()], vec![0, 1]).is_err());
    }

    #[test]
    fn test_select_columns() {
        let mat = create_test_matrix();
        let selected = mat
            .select_columns(&["K".to_string(), "W".to_string(), "A".to_string()])
            .unwrap();
        assert_eq!(selected.column_names(), &["K", "W", "A"]);
        assert_eq!(selected.row(0), vec![3.0, 0.0, 1.0]);
        assert_eq!(selected.row(1), vec![6.0, 0.0, 4.0]);
    }

    #[test]
    fn test_hstack_and_fill_nan() {
        let mat = create_test_matrix();
        let extra = FeatureMatrix::new(
            DMatrix::from_row_slice(2, 1, &[f64::NAN, 9.0]),
            vec!["mean".into()],
            vec![0, 2],
        )
        .unwrap();
        let joined = mat.hstack(&extra).unwrap().fill_nan(0.0);
        assert_eq!(joined.column_names(), &["A", "R", "K", "mean"]);
        assert_eq!(joined.column("mean").unwrap(), vec![0.0, 9.0]);
    }
}
