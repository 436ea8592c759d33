//! Codon Usage Analysis Library
//!
//! Turns tables of raw codon-usage counts into per-sample cluster assignments
//! and kingdom classifications using a set of pre-trained artifacts.
//!
//! # Overview
//!
//! The library is organized into modules that follow the flow of data:
//!
//! - **data**: Core data structures (RawTable, FeatureMatrix, AnalysisResult)
//! - **normalize**: Codon to amino-acid aggregation and composition normalization
//! - **filter**: Removal of degenerate samples by total count
//! - **profile**: Per-sample statistical descriptors
//! - **model**: Trained artifacts (scaler, PCA, k-means, classifier)
//! - **pipeline**: Schema alignment and staged inference
//! - **report**: Result aggregation and feature-importance enrichment
//! - **service**: Analyze, debug and health endpoints
//!
//! # Example
//!
//! ```no_run
//! use codon_analysis::prelude::*;
//!
//! let config = AnalysisConfig::default();
//! let service = AnalysisService::load(config);
//!
//! let upload = std::fs::read("codon_usage.csv").unwrap();
//! let result = service.analyze(&upload).unwrap();
//! println!("{}", result.to_json().unwrap());
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod service;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::config::AnalysisConfig;
    pub use crate::data::{
        AnalysisResult, EnrichmentRecord, FeatureMatrix, Field, GroupCount, RawTable,
        SampleResult, CLASSIFICATION_FAILED,
    };
    pub use crate::error::{ClassificationError, CodonError, ErrorKind, Result};
    pub use crate::filter::{filter_low_totals, TotalFilterResult};
    pub use crate::model::{
        ArtifactSet, ClassProbabilities, Classifier, ClassifierModel, Clusterer,
        FeatureDescriptions, FeatureImportanceTable, KMeans, Pca, StandardScaler,
        TrainingConfig, Transformer,
    };
    pub use crate::normalize::{aggregate_codons, filter_and_normalize, AminoAcidCounts, Composition};
    pub use crate::pipeline::debug::{DebugReport, DebugStep};
    pub use crate::pipeline::{
        align_features, engineer_features, reconcile_dimensions, Adjustment, AlignmentReport,
        AnalysisPipeline, InputReconciliation, PipelineStage,
    };
    pub use crate::profile::{compute_descriptors, DESCRIPTOR_NAMES};
    pub use crate::service::{AnalysisService, HealthStatus};
}
