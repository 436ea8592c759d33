//! Uploaded codon-usage tables: metadata columns followed by raw codon counts.

use crate::error::{CodonError, Result};
use log::{debug, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Cell values treated as missing, in addition to the empty string.
const MISSING_MARKERS: [&str; 7] = ["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// A metadata cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Number(f64),
    /// Free text.
    Text(String),
    /// Missing value.
    Missing,
}

impl Field {
    /// Infer the type of a raw cell.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() || MISSING_MARKERS.contains(&s) {
            Field::Missing
        } else if let Ok(i) = s.parse::<i64>() {
            Field::Integer(i)
        } else if let Ok(v) = s.parse::<f64>() {
            Field::Number(v)
        } else {
            Field::Text(s.to_string())
        }
    }

    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }

    /// Try to get as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Parse a numeric feature cell; anything unparsable is `None`.
fn parse_count(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || MISSING_MARKERS.contains(&s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Pick the delimiter from the header line: tab when it has tabs and no commas.
pub fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header_end = bytes.iter().position(|&b| b == b'\n').unwrap_or(bytes.len());
    let header = &bytes[..header_end];
    let has_tab = header.contains(&b'\t');
    let has_comma = header.contains(&b',');
    if has_tab && !has_comma {
        b'\t'
    } else {
        b','
    }
}

/// An uploaded table with metadata fields and coerced numeric feature cells.
///
/// Rows are samples. Feature cells that fail to parse are replaced with the
/// median of the parsable cells of the same column (0 when a column has none).
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Metadata column names.
    metadata_names: Vec<String>,
    /// Feature column names, as they appear in the header.
    feature_names: Vec<String>,
    /// Metadata fields per row.
    metadata: Vec<Vec<Field>>,
    /// Feature values (rows × feature columns).
    features: DMatrix<f64>,
    /// Number of feature cells replaced by a column median.
    coerced_cells: usize,
}

impl RawTable {
    /// Create a table from parsed parts, coercing missing feature cells.
    pub fn new(
        metadata_names: Vec<String>,
        feature_names: Vec<String>,
        metadata: Vec<Vec<Field>>,
        cells: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        let n_rows = cells.len();
        let n_features = feature_names.len();
        if metadata.len() != n_rows {
            return Err(CodonError::InvalidInput(format!(
                "{} metadata rows for {} feature rows",
                metadata.len(),
                n_rows
            )));
        }
        for (i, row) in cells.iter().enumerate() {
            if row.len() != n_features {
                return Err(CodonError::InvalidInput(format!(
                    "Row {} has {} feature cells, expected {}",
                    i + 1,
                    row.len(),
                    n_features
                )));
            }
        }

        let mut features = DMatrix::zeros(n_rows, n_features);
        let mut coerced_cells = 0;
        for col in 0..n_features {
            let parsed: Vec<f64> = cells.iter().filter_map(|row| row[col]).collect();
            let fill = if parsed.is_empty() {
                0.0
            } else {
                Data::new(parsed).median()
            };
            for (row, values) in cells.iter().enumerate() {
                features[(row, col)] = match values[col] {
                    Some(v) => v,
                    None => {
                        coerced_cells += 1;
                        fill
                    }
                };
            }
        }

        if coerced_cells > 0 {
            warn!(
                "Replaced {} non-numeric feature cells with column medians",
                coerced_cells
            );
        }

        Ok(Self {
            metadata_names,
            feature_names,
            metadata,
            features,
            coerced_cells,
        })
    }

    /// Parse a delimited table from raw bytes, sniffing the delimiter.
    pub fn from_bytes(bytes: &[u8], metadata_columns: usize) -> Result<Self> {
        let delimiter = sniff_delimiter(bytes);
        Self::from_reader(bytes, delimiter, metadata_columns)
    }

    /// Load a delimited table from a file.
    pub fn from_path<P: AsRef<Path>>(path: P, metadata_columns: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes, metadata_columns)
    }

    /// Parse a delimited table.
    ///
    /// Expected format:
    /// - First row: header; the first `metadata_columns` names are metadata
    /// - Remaining columns: raw codon counts (unknown columns are kept and
    ///   ignored by aggregation)
    pub fn from_reader<R: Read>(reader: R, delimiter: u8, metadata_columns: usize) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let header: Vec<String> = csv_reader.headers()?.iter().map(String::from).collect();
        let required = metadata_columns + 1;
        if header.len() < required {
            return Err(CodonError::TooFewColumns {
                found: header.len(),
                required,
                metadata: metadata_columns,
            });
        }

        let metadata_names = header[..metadata_columns].to_vec();
        let feature_names = header[metadata_columns..].to_vec();

        let mut metadata = Vec::new();
        let mut cells = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            metadata.push(
                record
                    .iter()
                    .take(metadata_columns)
                    .map(Field::parse)
                    .collect::<Vec<_>>(),
            );
            cells.push(
                record
                    .iter()
                    .skip(metadata_columns)
                    .map(parse_count)
                    .collect::<Vec<_>>(),
            );
        }

        if cells.is_empty() {
            return Err(CodonError::EmptyData("Table has no data rows".to_string()));
        }

        debug!(
            "Parsed table: {} rows, {} metadata + {} feature columns",
            cells.len(),
            metadata_columns,
            feature_names.len()
        );

        Self::new(metadata_names, feature_names, metadata, cells)
    }

    /// Number of rows (samples).
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    /// Total number of columns, metadata included.
    #[inline]
    pub fn n_columns(&self) -> usize {
        self.metadata_names.len() + self.feature_names.len()
    }

    /// Metadata column names.
    #[inline]
    pub fn metadata_names(&self) -> &[String] {
        &self.metadata_names
    }

    /// Feature column names.
    #[inline]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// All column names in header order.
    pub fn column_names(&self) -> Vec<String> {
        self.metadata_names
            .iter()
            .chain(self.feature_names.iter())
            .cloned()
            .collect()
    }

    /// Metadata fields of a row.
    #[inline]
    pub fn metadata_row(&self, row: usize) -> &[Field] {
        &self.metadata[row]
    }

    /// Coerced feature matrix (rows × feature columns).
    #[inline]
    pub fn features(&self) -> &DMatrix<f64> {
        &self.features
    }

    /// Value at (row, feature column).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.features[(row, col)]
    }

    /// Number of feature cells replaced by a column median.
    #[inline]
    pub fn coerced_cells(&self) -> usize {
        self.coerced_cells
    }
}
