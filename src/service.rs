//! Transport-independent endpoints: analyze, debug and health.

use crate::config::AnalysisConfig;
use crate::data::{AnalysisResult, RawTable};
use crate::error::{CodonError, Result};
use crate::model::ArtifactSet;
use crate::pipeline::debug::{trace, DebugReport};
use crate::pipeline::AnalysisPipeline;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Readiness of the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `"healthy"` or `"partial"`.
    pub status: String,
    pub models_loaded: bool,
    pub message: String,
}

/// Analysis service over an optional artifact set.
///
/// Without artifacts the service runs in demo mode: `health` and `debug`
/// work, `analyze` is rejected as unavailable.
#[derive(Debug, Clone)]
pub struct AnalysisService {
    config: AnalysisConfig,
    pipeline: Option<AnalysisPipeline>,
    load_error: Option<String>,
}

impl AnalysisService {
    /// Create a service from already loaded artifacts.
    pub fn new(config: AnalysisConfig, artifacts: Arc<ArtifactSet>) -> Self {
        Self {
            pipeline: Some(AnalysisPipeline::new(artifacts, config.clone())),
            config,
            load_error: None,
        }
    }

    /// Create a service without artifacts.
    pub fn demo(config: AnalysisConfig) -> Self {
        Self {
            config,
            pipeline: None,
            load_error: None,
        }
    }

    /// Load artifacts from `config.artifact_dir`, falling back to demo mode.
    pub fn load(config: AnalysisConfig) -> Self {
        match ArtifactSet::load_dir(&config.artifact_dir) {
            Ok(artifacts) => Self::new(config, Arc::new(artifacts)),
            Err(e) => {
                warn!("Error loading models: {}", e);
                warn!("Some models failed to load - running in demo mode");
                Self {
                    config,
                    pipeline: None,
                    load_error: Some(e.to_string()),
                }
            }
        }
    }

    /// The configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// The loaded artifacts, if any.
    pub fn artifacts(&self) -> Option<&ArtifactSet> {
        self.pipeline.as_ref().map(AnalysisPipeline::artifacts)
    }

    /// Why loading failed, when it did.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Analyze an uploaded delimited table.
    pub fn analyze(&self, bytes: &[u8]) -> Result<AnalysisResult> {
        let pipeline = self.pipeline.as_ref().ok_or_else(|| {
            CodonError::Unavailable("Please ensure all model files are available.".to_string())
        })?;
        let table = RawTable::from_bytes(bytes, self.config.metadata_columns)?;
        info!(
            "Received table with {} rows and {} columns",
            table.n_rows(),
            table.n_columns()
        );
        pipeline.run(&table)
    }

    /// Trace the pipeline stage by stage.
    pub fn debug(&self, bytes: &[u8]) -> DebugReport {
        trace(bytes, &self.config, self.artifacts())
    }

    /// Readiness report.
    pub fn health(&self) -> HealthStatus {
        let models_loaded = self.pipeline.is_some();
        HealthStatus {
            status: if models_loaded { "healthy" } else { "partial" }.to_string(),
            models_loaded,
            message: if models_loaded {
                "All models loaded"
            } else {
                "Running in demo mode"
            }
            .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn test_demo_mode() {
        let dir = tempdir().unwrap();
        let config = AnalysisConfig {
            artifact_dir: dir.path().to_path_buf(),
            ..AnalysisConfig::default()
        };
        let service = AnalysisService::load(config);
        assert!(service.load_error().unwrap().contains("scaler.json"));

        let health = service.health();
        assert_eq!(health.status, "partial");
        assert!(!health.models_loaded);
        assert_eq!(health.message, "Running in demo mode");

        let err = service.analyze(b"a,b,c,d,e,GCU\n1,1,1,1,1,5\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(err.status_code(), 503);
    }
}
