//! Data structures for codon-usage analysis.

mod codon_table;
mod feature_matrix;
mod raw_table;
mod result;

pub use codon_table::{amino_acid_for, amino_acids, canonical_codon, codon_index, CODON_TABLE};
pub use feature_matrix::FeatureMatrix;
pub use raw_table::{sniff_delimiter, Field, RawTable};
pub use result::{
    AnalysisMetadata, AnalysisResult, EnrichmentRecord, GroupCount, SampleResult,
    CLASSIFICATION_FAILED, CLASSIFICATION_WARNING,
};
