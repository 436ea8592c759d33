//! Error types for the codon-analysis library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum CodonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error reading CSV file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("CSV file must have at least {required} columns ({metadata} metadata + features). Found {found} columns.")]
    TooFewColumns {
        found: usize,
        required: usize,
        metadata: usize,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Models not loaded: {0}")]
    Unavailable(String),

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Dimension mismatch in {stage}: expected {expected}, got {actual}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid artifact '{name}': {reason}")]
    Artifact { name: String, reason: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse error taxonomy used by the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required artifacts are not loaded.
    Unavailable,
    /// The uploaded table was rejected.
    InvalidInput,
    /// A defect or inconsistent artifact set.
    Internal,
}

impl CodonError {
    /// Create an artifact error.
    pub fn artifact(name: impl Into<String>, reason: impl Into<String>) -> Self {
        CodonError::Artifact {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error for propagation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodonError::Unavailable(_) => ErrorKind::Unavailable,
            CodonError::Csv(_)
            | CodonError::InvalidInput(_)
            | CodonError::TooFewColumns { .. }
            | CodonError::EmptyData(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::Internal,
        }
    }

    /// HTTP-style status code for the error kind.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }

    /// Human-readable reason shown to callers.
    ///
    /// Internal errors are reported as a summary only.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => format!("Internal server error: {}", self),
            _ => self.to_string(),
        }
    }
}

/// Failure of the best-effort classification stage.
///
/// Never aborts a request; the pipeline records it and keeps the clustering output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("classifier predict failed: {0}")]
    Predict(String),

    #[error("classifier probability output failed: {0}")]
    Probabilities(String),

    #[error("classifier returned {actual} predictions for {expected} rows")]
    RowCountMismatch { expected: usize, actual: usize },
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, CodonError>;
