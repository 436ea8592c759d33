//! The analysis pipeline: feature engineering, schema alignment and inference.

mod align;
pub mod debug;
mod features;
mod inference;
mod runner;

pub use align::{align_features, AlignmentReport};
pub use features::{engineer_features, EngineeredFeatures};
pub use inference::{
    append_cluster_column, classify, cluster, embed_and_cluster, prepare_classifier_input,
    reconcile_dimensions, reduce, scale, Adjustment, ClassificationOutput, Embedding,
    InputReconciliation,
};
pub use runner::{AnalysisPipeline, PipelineStage};
