//! Step-by-step trace of the pipeline for diagnosing artifact mismatches.
//!
//! Unlike [`AnalysisPipeline::run`](super::AnalysisPipeline::run), tracing
//! never fails once the upload has been read: every failure becomes a step
//! record and the trace stops there.

use super::align::align_features;
use super::features::engineer_features;
use super::inference::{append_cluster_column, cluster, reduce, scale};
use crate::config::AnalysisConfig;
use crate::data::RawTable;
use crate::model::{ArtifactSet, TrainingConfig};
use crate::report::cluster_distribution;
use log::warn;
use nalgebra::DMatrix;
use serde::Serialize;
use std::collections::BTreeMap;

const SUCCESS: &str = "success";

fn failed(reason: impl std::fmt::Display) -> String {
    format!("failed: {}", reason)
}

/// One classifier input layout tried while tracing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationTrial {
    pub config: String,
    pub input_shape: (usize, usize),
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kingdom_distribution: Option<BTreeMap<String, usize>>,
}

/// A traced pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum DebugStep {
    FileReading {
        status: String,
        data_shape: (usize, usize),
        columns: Vec<String>,
    },
    FeatureExtraction {
        status: String,
        feature_columns: usize,
        sample_features: Vec<String>,
    },
    Preprocessing {
        status: String,
        processed_shape: (usize, usize),
        processed_columns: Vec<String>,
        samples_dropped: usize,
    },
    FeatureAlignment {
        status: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        missing_features: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        extra_features: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        final_shape: Option<(usize, usize)>,
    },
    ScalingPca {
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        scaled_shape: Option<(usize, usize)>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pca_shape: Option<(usize, usize)>,
    },
    Clustering {
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        n_clusters: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cluster_distribution: Option<BTreeMap<usize, usize>>,
    },
    Classification {
        status: String,
        configurations_tested: Vec<ClassificationTrial>,
    },
    Error {
        status: String,
    },
}

impl DebugStep {
    /// Status string of the step.
    pub fn status(&self) -> &str {
        match self {
            DebugStep::FileReading { status, .. }
            | DebugStep::FeatureExtraction { status, .. }
            | DebugStep::Preprocessing { status, .. }
            | DebugStep::FeatureAlignment { status, .. }
            | DebugStep::ScalingPca { status, .. }
            | DebugStep::Clustering { status, .. }
            | DebugStep::Classification { status, .. }
            | DebugStep::Error { status } => status,
        }
    }
}

/// What the service has loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelInfo {
    pub models_loaded: bool,
    pub feature_names_loaded: bool,
    pub n_feature_names: Option<usize>,
    pub n_clusters: Option<usize>,
    pub classifier_expected_features: Option<usize>,
    pub class_labels: Option<Vec<String>>,
    pub training_config: Option<TrainingConfig>,
    pub importance_loaded: bool,
    pub descriptions_loaded: bool,
}

impl ModelInfo {
    /// Describe an artifact set, or its absence.
    pub fn describe(artifacts: Option<&ArtifactSet>) -> Self {
        match artifacts {
            None => Self::default(),
            Some(set) => Self {
                models_loaded: true,
                feature_names_loaded: true,
                n_feature_names: Some(set.feature_names().len()),
                n_clusters: set.clusterer().n_clusters(),
                classifier_expected_features: set.classifier().expected_input_dimension(),
                class_labels: set.classifier().class_labels().map(<[String]>::to_vec),
                training_config: set.training_config().cloned(),
                importance_loaded: set.importance().is_some(),
                descriptions_loaded: set.descriptions().is_some(),
            },
        }
    }
}

/// Trace of one upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugReport {
    pub steps: Vec<DebugStep>,
    pub model_info: ModelInfo,
}

impl DebugReport {
    /// Whether any step recorded a failure.
    pub fn has_failure(&self) -> bool {
        self.steps.iter().any(|s| s.status().starts_with("failed"))
            || self.steps.iter().any(|s| {
                matches!(s, DebugStep::Classification { configurations_tested, .. }
                    if configurations_tested.iter().all(|t| t.status != SUCCESS))
            })
    }
}

fn label_counts(labels: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label.clone()).or_insert(0) += 1;
    }
    counts
}

fn try_classifier(artifacts: &ArtifactSet, name: &str, input: &DMatrix<f64>) -> ClassificationTrial {
    let (status, kingdom_distribution) = match artifacts.classifier().predict(input) {
        Ok(labels) => (SUCCESS.to_string(), Some(label_counts(&labels))),
        Err(e) => (failed(e), None),
    };
    ClassificationTrial {
        config: name.to_string(),
        input_shape: input.shape(),
        status,
        kingdom_distribution,
    }
}

/// Trace the pipeline on raw upload bytes.
pub fn trace(bytes: &[u8], config: &AnalysisConfig, artifacts: Option<&ArtifactSet>) -> DebugReport {
    let mut report = DebugReport {
        steps: Vec::new(),
        model_info: ModelInfo::describe(artifacts),
    };
    trace_steps(bytes, config, artifacts, &mut report.steps);
    report
}

fn trace_steps(
    bytes: &[u8],
    config: &AnalysisConfig,
    artifacts: Option<&ArtifactSet>,
    steps: &mut Vec<DebugStep>,
) {
    let table = match RawTable::from_bytes(bytes, config.metadata_columns) {
        Ok(table) => table,
        Err(e) => {
            steps.push(DebugStep::Error { status: failed(e) });
            return;
        }
    };
    steps.push(DebugStep::FileReading {
        status: SUCCESS.to_string(),
        data_shape: (table.n_rows(), table.n_columns()),
        columns: table.column_names(),
    });
    steps.push(DebugStep::FeatureExtraction {
        status: SUCCESS.to_string(),
        feature_columns: table.feature_names().len(),
        sample_features: table.feature_names().iter().take(5).cloned().collect(),
    });

    let engineered = match engineer_features(&table, config) {
        Ok(engineered) => engineered,
        Err(e) => {
            steps.push(DebugStep::Error { status: failed(e) });
            return;
        }
    };
    steps.push(DebugStep::Preprocessing {
        status: SUCCESS.to_string(),
        processed_shape: engineered.matrix.shape(),
        processed_columns: engineered.matrix.column_names().to_vec(),
        samples_dropped: engineered.filter.n_dropped(),
    });

    let Some(artifacts) = artifacts else {
        steps.push(DebugStep::FeatureAlignment {
            status: "skipped - no feature_names available".to_string(),
            missing_features: Vec::new(),
            extra_features: Vec::new(),
            final_shape: None,
        });
        steps.push(DebugStep::ScalingPca {
            status: "failed - models not loaded".to_string(),
            scaled_shape: None,
            pca_shape: None,
        });
        return;
    };

    let aligned = match align_features(&engineered.matrix, artifacts.feature_names()) {
        Ok((aligned, alignment)) => {
            steps.push(DebugStep::FeatureAlignment {
                status: SUCCESS.to_string(),
                missing_features: alignment.missing,
                extra_features: alignment.extra,
                final_shape: Some(aligned.shape()),
            });
            aligned
        }
        Err(e) => {
            steps.push(DebugStep::Error { status: failed(e) });
            return;
        }
    };

    let scaled_and_reduced = scale(artifacts, aligned.matrix())
        .and_then(|scaled| reduce(artifacts, &scaled).map(|reduced| (scaled, reduced)));
    let (scaled, reduced) = match scaled_and_reduced {
        Ok(pair) => pair,
        Err(e) => {
            warn!("Debug trace stopped at scaling: {}", e);
            steps.push(DebugStep::ScalingPca {
                status: failed(e),
                scaled_shape: None,
                pca_shape: None,
            });
            return;
        }
    };
    steps.push(DebugStep::ScalingPca {
        status: SUCCESS.to_string(),
        scaled_shape: Some(scaled.shape()),
        pca_shape: Some(reduced.shape()),
    });

    let clusters = match cluster(artifacts, &reduced) {
        Ok(clusters) => clusters,
        Err(e) => {
            steps.push(DebugStep::Clustering {
                status: failed(e),
                n_clusters: None,
                cluster_distribution: None,
            });
            return;
        }
    };
    let distribution = cluster_distribution(&clusters);
    steps.push(DebugStep::Clustering {
        status: SUCCESS.to_string(),
        n_clusters: Some(distribution.len()),
        cluster_distribution: Some(distribution),
    });

    let with_cluster = append_cluster_column(&scaled, &clusters);
    let trials = vec![
        try_classifier(artifacts, "scaled_features_only", &scaled),
        try_classifier(artifacts, "scaled_features_plus_cluster", &with_cluster),
    ];
    steps.push(DebugStep::Classification {
        status: SUCCESS.to_string(),
        configurations_tested: trials,
    });
}
