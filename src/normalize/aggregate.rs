//! Codon to amino-acid aggregation.
//!
//! Raw codon counts are summed into one column per amino acid following the
//! standard genetic code. Columns that are not sense codons are ignored.

use crate::data::{codon_index, RawTable, CODON_TABLE};
use log::debug;
use nalgebra::DMatrix;

/// Raw amino-acid counts for every row of an uploaded table.
#[derive(Debug, Clone)]
pub struct AminoAcidCounts {
    /// Amino-acid symbols in column order.
    pub amino_acids: Vec<char>,
    /// Summed counts (rows × amino acids).
    pub data: DMatrix<f64>,
    /// Number of table columns recognized as codons.
    pub codon_columns: usize,
    /// Table columns that were not recognized as codons.
    pub ignored_columns: Vec<String>,
}

impl AminoAcidCounts {
    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of amino-acid columns.
    pub fn n_amino_acids(&self) -> usize {
        self.data.ncols()
    }

    /// Column names as strings.
    pub fn column_names(&self) -> Vec<String> {
        self.amino_acids.iter().map(|aa| aa.to_string()).collect()
    }

    /// Total count per row.
    pub fn row_totals(&self) -> Vec<f64> {
        self.data.row_iter().map(|row| row.sum()).collect()
    }
}

/// Sum codon columns into amino-acid columns.
///
/// Amino-acid columns appear in the order of their first codon in the table,
/// restricted to amino acids with at least one codon column present.
pub fn aggregate_codons(table: &RawTable) -> AminoAcidCounts {
    let mapping: Vec<Option<usize>> = table
        .feature_names()
        .iter()
        .map(|name| codon_index(name))
        .collect();

    let mut amino_acids: Vec<char> = Vec::new();
    for (codon_idx, &(_, aa)) in CODON_TABLE.iter().enumerate() {
        if !amino_acids.contains(&aa) && mapping.contains(&Some(codon_idx)) {
            amino_acids.push(aa);
        }
    }

    let mut data = DMatrix::zeros(table.n_rows(), amino_acids.len());
    let mut ignored_columns = Vec::new();
    let mut codon_columns = 0;

    for (col, codon) in mapping.iter().enumerate() {
        let Some(codon_idx) = codon else {
            ignored_columns.push(table.feature_names()[col].clone());
            continue;
        };
        codon_columns += 1;
        let aa = CODON_TABLE[*codon_idx].1;
        // present by construction
        let target = amino_acids.iter().position(|&a| a == aa).unwrap_or_default();
        for row in 0..table.n_rows() {
            data[(row, target)] += table.get(row, col);
        }
    }

    debug!(
        "Aggregated {} codon columns into {} amino acids ({} columns ignored)",
        codon_columns,
        amino_acids.len(),
        ignored_columns.len()
    );

    AminoAcidCounts {
        amino_acids,
        data,
        codon_columns,
        ignored_columns,
    }
}
