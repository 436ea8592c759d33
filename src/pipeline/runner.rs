//! Request-level pipeline execution.
//!
//! A request moves through the stages
//! `Received → FeatureEngineered → Aligned → Scaled → Reduced → Clustered →
//! {Classified | ClassificationFailed} → Aggregated`, one transition per
//! call to the internal request state machine.

use super::align::{align_features, AlignmentReport};
use super::features::{engineer_features, EngineeredFeatures};
use super::inference::{
    classify, cluster, prepare_classifier_input, reduce, scale, ClassificationOutput,
    InputReconciliation,
};
use crate::config::AnalysisConfig;
use crate::data::{AnalysisResult, FeatureMatrix, RawTable};
use crate::error::{ClassificationError, CodonError, Result};
use crate::model::ArtifactSet;
use crate::report::{BatchSummary, ReportBuilder};
use log::{error, info};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stage of a single analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    FeatureEngineered,
    Aligned,
    Scaled,
    Reduced,
    Clustered,
    Classified,
    ClassificationFailed,
    Aggregated,
}

impl PipelineStage {
    /// Processing steps reported for reaching this stage.
    pub fn step_names(&self) -> &'static [&'static str] {
        match self {
            PipelineStage::Received | PipelineStage::Aggregated => &[],
            PipelineStage::FeatureEngineered => &[
                "codon_to_amino_acid_aggregation",
                "statistical_features_calculation",
            ],
            PipelineStage::Aligned => &["feature_alignment"],
            PipelineStage::Scaled => &["scaling"],
            PipelineStage::Reduced => &["pca_transformation"],
            PipelineStage::Clustered => &["clustering"],
            PipelineStage::Classified => &["classification"],
            PipelineStage::ClassificationFailed => &["classification_failed"],
        }
    }

    /// Whether the classification stage has run.
    pub fn is_classification_done(&self) -> bool {
        matches!(
            self,
            PipelineStage::Classified | PipelineStage::ClassificationFailed
        )
    }
}

/// Intermediate products of one request.
struct RequestState<'a> {
    table: &'a RawTable,
    stage: PipelineStage,
    trail: Vec<PipelineStage>,
    engineered: Option<EngineeredFeatures>,
    aligned: Option<FeatureMatrix>,
    alignment: AlignmentReport,
    scaled: Option<DMatrix<f64>>,
    reduced: Option<DMatrix<f64>>,
    clusters: Option<Vec<usize>>,
    reconciliation: Option<InputReconciliation>,
    classification: Option<std::result::Result<ClassificationOutput, ClassificationError>>,
    result: Option<AnalysisResult>,
}

fn require<'s, T>(value: &'s Option<T>, what: &str) -> Result<&'s T> {
    value
        .as_ref()
        .ok_or_else(|| CodonError::InvariantViolation(format!("{} not available", what)))
}

impl<'a> RequestState<'a> {
    fn new(table: &'a RawTable) -> Self {
        Self {
            table,
            stage: PipelineStage::Received,
            trail: vec![PipelineStage::Received],
            engineered: None,
            aligned: None,
            alignment: AlignmentReport::default(),
            scaled: None,
            reduced: None,
            clusters: None,
            reconciliation: None,
            classification: None,
            result: None,
        }
    }

    /// Perform the transition out of the current stage.
    fn advance(mut self, artifacts: &ArtifactSet, config: &AnalysisConfig) -> Result<Self> {
        let next = match self.stage {
            PipelineStage::Received => {
                self.engineered = Some(engineer_features(self.table, config)?);
                PipelineStage::FeatureEngineered
            }
            PipelineStage::FeatureEngineered => {
                let engineered = require(&self.engineered, "engineered features")?;
                let (aligned, report) =
                    align_features(&engineered.matrix, artifacts.feature_names())?;
                info!("Final processed features shape: {:?}", aligned.shape());
                self.aligned = Some(aligned);
                self.alignment = report;
                PipelineStage::Aligned
            }
            PipelineStage::Aligned => {
                let aligned = require(&self.aligned, "aligned features")?;
                self.scaled = Some(scale(artifacts, aligned.matrix())?);
                PipelineStage::Scaled
            }
            PipelineStage::Scaled => {
                let scaled = require(&self.scaled, "scaled features")?;
                self.reduced = Some(reduce(artifacts, scaled)?);
                PipelineStage::Reduced
            }
            PipelineStage::Reduced => {
                let reduced = require(&self.reduced, "reduced features")?;
                self.clusters = Some(cluster(artifacts, reduced)?);
                PipelineStage::Clustered
            }
            PipelineStage::Clustered => {
                let scaled = require(&self.scaled, "scaled features")?;
                let clusters = require(&self.clusters, "cluster labels")?;
                let (input, reconciliation) = prepare_classifier_input(artifacts, scaled, clusters);
                let outcome = classify(artifacts.classifier(), &input);
                let next = match &outcome {
                    Ok(_) => {
                        info!("Classification completed successfully");
                        PipelineStage::Classified
                    }
                    Err(e) => {
                        error!("Classification failed: {}", e);
                        PipelineStage::ClassificationFailed
                    }
                };
                self.reconciliation = Some(reconciliation);
                self.classification = Some(outcome);
                next
            }
            PipelineStage::Classified | PipelineStage::ClassificationFailed => {
                self.result = Some(self.aggregate(artifacts, config)?);
                PipelineStage::Aggregated
            }
            stage => {
                return Err(CodonError::InvariantViolation(format!(
                    "no transition out of {:?}",
                    stage
                )))
            }
        };
        self.stage = next;
        self.trail.push(next);
        Ok(self)
    }

    fn aggregate(&self, artifacts: &ArtifactSet, config: &AnalysisConfig) -> Result<AnalysisResult> {
        let engineered = require(&self.engineered, "engineered features")?;
        let clusters = require(&self.clusters, "cluster labels")?;
        let classification = require(&self.classification, "classification outcome")?;

        let summary = BatchSummary {
            samples_dropped: engineered.filter.n_dropped(),
            preprocessing_steps: self
                .trail
                .iter()
                .flat_map(|stage| stage.step_names().iter().map(|s| s.to_string()))
                .collect(),
            alignment: self.alignment.clone(),
            reconciliation: self.reconciliation.clone(),
        };

        ReportBuilder::new(self.table, artifacts, config.top_features).build(
            engineered.matrix.source_rows(),
            clusters,
            classification,
            summary,
        )
    }
}

/// The full analysis pipeline over a shared artifact set.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    artifacts: Arc<ArtifactSet>,
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    /// Create a pipeline.
    pub fn new(artifacts: Arc<ArtifactSet>, config: AnalysisConfig) -> Self {
        Self { artifacts, config }
    }

    /// The shared artifacts.
    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// The configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run every stage on an uploaded table.
    ///
    /// Only a classification failure is absorbed; it yields a result with
    /// `classification_completed = false`.
    pub fn run(&self, table: &RawTable) -> Result<AnalysisResult> {
        info!(
            "Analyzing {} samples with {} feature columns",
            table.n_rows(),
            table.feature_names().len()
        );
        let mut state = RequestState::new(table);
        while state.stage != PipelineStage::Aggregated {
            let stage = state.stage;
            state = state.advance(&self.artifacts, &self.config).map_err(|e| {
                error!("Error in analysis at stage {:?}: {}", stage, e);
                e
            })?;
        }
        state
            .result
            .ok_or_else(|| CodonError::InvariantViolation("result not assembled".to_string()))
    }
}
