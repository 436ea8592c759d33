//! Codon aggregation and composition normalization.
//!
//! - **aggregate**: sum codon counts into amino-acid counts
//! - **composition**: per-sample relative frequencies with pseudocount smoothing

pub mod aggregate;
pub mod composition;

pub use aggregate::{aggregate_codons, AminoAcidCounts};
pub use composition::{filter_and_normalize, normalize_composition, Composition, DEFAULT_PSEUDOCOUNT};
