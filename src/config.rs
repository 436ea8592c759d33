//! Analysis configuration, serialized as YAML.

use crate::error::{CodonError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunable parameters of the feature-engineering and reporting stages.
///
/// The defaults reproduce the values the shipped artifacts were trained with;
/// changing `pseudocount`, `entropy_offset` or `low_total_quantile` changes the
/// engineered features and should only be done together with retrained artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of leading metadata columns in an uploaded table.
    pub metadata_columns: usize,
    /// Pseudocount added before composition normalization.
    pub pseudocount: f64,
    /// Offset added to composition values before the entropy computation.
    pub entropy_offset: f64,
    /// Samples with totals at or below this batch quantile are dropped.
    pub low_total_quantile: f64,
    /// Number of top-importance features reported per group.
    pub top_features: usize,
    /// Directory holding the trained artifacts.
    pub artifact_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            metadata_columns: 5,
            pseudocount: 1e-8,
            entropy_offset: 1e-10,
            low_total_quantile: 0.05,
            top_features: 5,
            artifact_dir: PathBuf::from("models"),
        }
    }
}

impl AnalysisConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(CodonError::from)
    }

    /// Load from a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.pseudocount < 0.0 || !self.pseudocount.is_finite() {
            return Err(CodonError::InvalidParameter(
                "pseudocount must be a non-negative finite number".to_string(),
            ));
        }
        if self.entropy_offset < 0.0 || !self.entropy_offset.is_finite() {
            return Err(CodonError::InvalidParameter(
                "entropy_offset must be a non-negative finite number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.low_total_quantile) {
            return Err(CodonError::InvalidParameter(
                "low_total_quantile must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Minimum number of columns an uploaded table must have.
    pub fn required_columns(&self) -> usize {
        self.metadata_columns + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.metadata_columns, 5);
        assert_eq!(config.required_columns(), 6);
        assert_eq!(config.top_features, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial() {
        let config = AnalysisConfig::from_yaml("top_features: 3\nartifact_dir: /srv/models\n").unwrap();
        assert_eq!(config.top_features, 3);
        assert_eq!(config.artifact_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.metadata_columns, 5);

        let yaml = config.to_yaml().unwrap();
        let parsed = AnalysisConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_quantile() {
        assert!(AnalysisConfig::from_yaml("low_total_quantile: 1.5\n").is_err());
        assert!(AnalysisConfig::from_yaml("pseudocount: -1.0\n").is_err());
    }
}
