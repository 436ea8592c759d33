//! The immutable bundle of trained artifacts shared by all requests.
//!
//! An [`ArtifactSet`] is built once at startup, either from a directory of
//! serialized artifacts or programmatically, and never mutated afterwards.
//! Rebuilding it means restarting the service.

use super::classifier::ClassifierModel;
use super::kmeans::KMeans;
use super::pca::Pca;
use super::scaler::StandardScaler;
use super::traits::{Classifier, Clusterer, Transformer};
use crate::error::{CodonError, Result};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// File names inside an artifact directory.
pub mod files {
    pub const SCALER: &str = "scaler.json";
    pub const REDUCER: &str = "pca.json";
    pub const CLUSTERER: &str = "kmeans.json";
    pub const CLASSIFIER: &str = "classifier.json";
    pub const FEATURE_COLUMNS: &str = "feature_columns.json";
    pub const TRAINING_CONFIG: &str = "training_config.json";
    pub const FEATURE_IMPORTANCE: &str = "feature_importance.csv";
    pub const FEATURE_DESCRIPTIONS: &str = "feature_descriptions.json";
    pub const AMINO_ACID_DESCRIPTIONS: &str = "amino_acid_descriptions.json";

    /// Files that must be present for the service to be operational.
    pub const REQUIRED: [&str; 5] = [SCALER, REDUCER, CLUSTERER, CLASSIFIER, FEATURE_COLUMNS];
}

/// How the classifier was trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// The cluster label was appended as the last classifier input column.
    #[serde(default)]
    pub includes_cluster: bool,
    /// Number of classifier input columns.
    #[serde(default)]
    pub n_features: Option<usize>,
}

/// One row of a feature-importance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    #[serde(rename = "Feature")]
    pub feature: String,
    #[serde(rename = "Importance")]
    pub importance: f64,
}

/// Feature importances as exported after training; a feature may appear more than once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureImportanceTable {
    rows: Vec<FeatureImportance>,
}

impl FeatureImportanceTable {
    /// Create from rows.
    pub fn new(rows: Vec<FeatureImportance>) -> Self {
        Self { rows }
    }

    /// Read a CSV with `Feature` and `Importance` columns (others are ignored).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let rows = csv_reader
            .deserialize()
            .collect::<std::result::Result<Vec<FeatureImportance>, csv::Error>>()?;
        Ok(Self { rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The `n` most important distinct features.
    ///
    /// Rows are stably sorted by descending importance, then deduplicated
    /// keeping first occurrences.
    pub fn top_features(&self, n: usize) -> Vec<String> {
        let mut sorted: Vec<&FeatureImportance> = self.rows.iter().collect();
        sorted.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        let mut seen = HashSet::new();
        sorted
            .into_iter()
            .filter(|r| seen.insert(r.feature.as_str()))
            .take(n)
            .map(|r| r.feature.clone())
            .collect()
    }

    /// Mean importance of a feature over all its rows.
    pub fn mean_importance(&self, feature: &str) -> Option<f64> {
        let values: Vec<f64> = self
            .rows
            .iter()
            .filter(|r| r.feature == feature)
            .map(|r| r.importance)
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

/// Human-readable description of a feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescription {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Lookup of feature descriptions by feature name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureDescriptions {
    entries: HashMap<String, FeatureDescription>,
}

impl FeatureDescriptions {
    /// Create from entries.
    pub fn new(entries: HashMap<String, FeatureDescription>) -> Self {
        Self { entries }
    }

    /// Add entries, overriding existing ones.
    pub fn merge(&mut self, other: FeatureDescriptions) {
        self.entries.extend(other.entries);
    }

    /// Description, falling back to the feature name.
    pub fn description(&self, feature: &str) -> String {
        self.entries
            .get(feature)
            .and_then(|d| d.description.clone())
            .unwrap_or_else(|| feature.to_string())
    }

    /// Detail text, empty when unknown.
    pub fn detail(&self, feature: &str) -> String {
        self.entries
            .get(feature)
            .and_then(|d| d.detail.clone())
            .unwrap_or_default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the lookup is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trained artifacts needed by the inference pipeline.
pub struct ArtifactSet {
    scaler: Box<dyn Transformer>,
    reducer: Box<dyn Transformer>,
    clusterer: Box<dyn Clusterer>,
    classifier: Box<dyn Classifier>,
    feature_names: Vec<String>,
    training_config: Option<TrainingConfig>,
    importance: Option<FeatureImportanceTable>,
    descriptions: Option<FeatureDescriptions>,
}

impl std::fmt::Debug for ArtifactSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactSet")
            .field("feature_names", &self.feature_names)
            .field("training_config", &self.training_config)
            .field("importance_rows", &self.importance.as_ref().map(|t| t.len()))
            .field("descriptions", &self.descriptions.as_ref().map(|d| d.len()))
            .finish_non_exhaustive()
    }
}

impl ArtifactSet {
    /// Create a bundle from the required artifacts.
    ///
    /// The canonical feature list must be non-empty and free of duplicates.
    pub fn new(
        scaler: Box<dyn Transformer>,
        reducer: Box<dyn Transformer>,
        clusterer: Box<dyn Clusterer>,
        classifier: Box<dyn Classifier>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if feature_names.is_empty() {
            return Err(CodonError::artifact(files::FEATURE_COLUMNS, "empty feature list"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = feature_names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(CodonError::artifact(
                files::FEATURE_COLUMNS,
                format!("duplicate feature name '{}'", dup),
            ));
        }
        if let Some(dim) = scaler.expected_input_dimension() {
            if dim != feature_names.len() {
                return Err(CodonError::artifact(
                    files::SCALER,
                    format!(
                        "fitted on {} features but the feature list has {}",
                        dim,
                        feature_names.len()
                    ),
                ));
            }
        }
        Ok(Self {
            scaler,
            reducer,
            clusterer,
            classifier,
            feature_names,
            training_config: None,
            importance: None,
            descriptions: None,
        })
    }

    /// Attach the training configuration.
    pub fn with_training_config(mut self, config: TrainingConfig) -> Self {
        self.training_config = Some(config);
        self
    }

    /// Attach a feature-importance table.
    pub fn with_importance(mut self, table: FeatureImportanceTable) -> Self {
        self.importance = Some(table);
        self
    }

    /// Attach feature descriptions.
    pub fn with_descriptions(mut self, descriptions: FeatureDescriptions) -> Self {
        self.descriptions = Some(descriptions);
        self
    }

    /// Load all artifacts from a directory.
    ///
    /// Fails with [`CodonError::Unavailable`] when a required file is missing.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let missing: Vec<&str> = files::REQUIRED
            .iter()
            .copied()
            .filter(|f| !dir.join(f).exists())
            .collect();
        if !missing.is_empty() {
            return Err(CodonError::Unavailable(format!(
                "Missing required files in {}: {:?}",
                dir.display(),
                missing
            )));
        }

        let scaler: StandardScaler = read_json(dir, files::SCALER)?;
        scaler.validate()?;
        let reducer: Pca = read_json(dir, files::REDUCER)?;
        reducer.validate()?;
        let clusterer: KMeans = read_json(dir, files::CLUSTERER)?;
        clusterer.validate()?;
        let classifier: ClassifierModel = read_json(dir, files::CLASSIFIER)?;
        classifier.validate()?;
        let feature_names: Vec<String> = read_json(dir, files::FEATURE_COLUMNS)?;

        let mut set = Self::new(
            Box::new(scaler),
            Box::new(reducer),
            Box::new(clusterer),
            Box::new(classifier),
            feature_names,
        )?;

        if dir.join(files::TRAINING_CONFIG).exists() {
            match read_json::<TrainingConfig>(dir, files::TRAINING_CONFIG) {
                Ok(config) => {
                    info!("Loaded training config: {:?}", config);
                    set = set.with_training_config(config);
                }
                Err(e) => warn!("Ignoring {}: {}", files::TRAINING_CONFIG, e),
            }
        }

        let importance_path = dir.join(files::FEATURE_IMPORTANCE);
        if importance_path.exists() {
            let loaded = File::open(&importance_path)
                .map_err(CodonError::from)
                .and_then(|file| FeatureImportanceTable::from_reader(BufReader::new(file)));
            match loaded {
                Ok(table) => {
                    debug!("Loaded {} feature importance rows", table.len());
                    set = set.with_importance(table);
                }
                Err(e) => warn!("Could not process feature importance: {}", e),
            }
        }

        let mut descriptions: Option<FeatureDescriptions> = None;
        for name in [files::FEATURE_DESCRIPTIONS, files::AMINO_ACID_DESCRIPTIONS] {
            if !dir.join(name).exists() {
                continue;
            }
            match read_json::<FeatureDescriptions>(dir, name) {
                Ok(loaded) => descriptions
                    .get_or_insert_with(FeatureDescriptions::default)
                    .merge(loaded),
                Err(e) => warn!("Ignoring {}: {}", name, e),
            }
        }
        if let Some(descriptions) = descriptions {
            set = set.with_descriptions(descriptions);
        }

        info!(
            "All models loaded successfully from {} ({} features)",
            dir.display(),
            set.feature_names.len()
        );
        Ok(set)
    }

    pub fn scaler(&self) -> &dyn Transformer {
        self.scaler.as_ref()
    }

    pub fn reducer(&self) -> &dyn Transformer {
        self.reducer.as_ref()
    }

    pub fn clusterer(&self) -> &dyn Clusterer {
        self.clusterer.as_ref()
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Canonical feature names, in training order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn training_config(&self) -> Option<&TrainingConfig> {
        self.training_config.as_ref()
    }

    pub fn importance(&self) -> Option<&FeatureImportanceTable> {
        self.importance.as_ref()
    }

    pub fn descriptions(&self) -> Option<&FeatureDescriptions> {
        self.descriptions.as_ref()
    }
}

fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let file = File::open(dir.join(name))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| CodonError::artifact(name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_required(dir: &Path) {
        fs::write(dir.join(files::SCALER), r#"{"mean": [0, 0], "scale": [1, 1]}"#).unwrap();
        fs::write(
            dir.join(files::REDUCER),
            r#"{"mean": [0, 0], "components": [[1, 0]]}"#,
        )
        .unwrap();
        fs::write(dir.join(files::CLUSTERER), r#"{"centroids": [[0], [1]]}"#).unwrap();
        fs::write(
            dir.join(files::CLASSIFIER),
            r#"{"kind": "nearest_centroid", "classes": ["a", "b"], "centroids": [[0, 0], [1, 1]]}"#,
        )
        .unwrap();
        fs::write(dir.join(files::FEATURE_COLUMNS), r#"["A", "mean"]"#).unwrap();
    }

    #[test]
    fn test_load_required_only() {
        let dir = tempdir().unwrap();
        write_required(dir.path());
        let set = ArtifactSet::load_dir(dir.path()).unwrap();
        assert_eq!(set.feature_names(), &["A", "mean"]);
        assert!(set.training_config().is_none());
        assert!(set.importance().is_none());
        assert!(set.descriptions().is_none());
        assert_eq!(set.classifier().expected_input_dimension(), Some(2));
    }

    #[test]
    fn test_missing_files_unavailable() {
        let dir = tempdir().unwrap();
        let err = ArtifactSet::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CodonError::Unavailable(_)));
        assert!(err.to_string().contains("scaler.json"));
    }

    #[test]
    fn test_load_optional_files() {
        let dir = tempdir().unwrap();
        write_required(dir.path());
        fs::write(
            dir.path().join(files::TRAINING_CONFIG),
            r#"{"includes_cluster": true, "n_features": 3}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(files::FEATURE_IMPORTANCE),
            "Feature,Importance,Fold\nA,0.5,1\nmean,0.2,1\nA,0.3,2\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(files::FEATURE_DESCRIPTIONS),
            r#"{"mean": {"description": "Mean frequency", "detail": "Average"}, "A": {"description": "old"}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(files::AMINO_ACID_DESCRIPTIONS),
            r#"{"A": {"description": "Alanine", "detail": "GCN codons"}}"#,
        )
        .unwrap();

        let set = ArtifactSet::load_dir(dir.path()).unwrap();
        let config = set.training_config().unwrap();
        assert!(config.includes_cluster);
        assert_eq!(config.n_features, Some(3));

        let importance = set.importance().unwrap();
        assert_eq!(importance.top_features(5), vec!["A", "mean"]);
        assert!((importance.mean_importance("A").unwrap() - 0.4).abs() < 1e-12);

        let descriptions = set.descriptions().unwrap();
        assert_eq!(descriptions.description("A"), "Alanine");
        assert_eq!(descriptions.detail("mean"), "Average");
        assert_eq!(descriptions.description("gini"), "gini");
        assert_eq!(descriptions.detail("gini"), "");
    }

    #[test]
    fn test_malformed_artifact() {
        let dir = tempdir().unwrap();
        write_required(dir.path());
        fs::write(dir.path().join(files::CLUSTERER), r#"{"centroids": []}"#).unwrap();
        let err = ArtifactSet::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, CodonError::Artifact { .. }));
    }

    #[test]
    fn test_malformed_optional_files_skipped() {
        let dir = tempdir().unwrap();
        write_required(dir.path());
        fs::write(
            dir.path().join(files::FEATURE_IMPORTANCE),
            "Feature,Importance\nA,high\n",
        )
        .unwrap();
        fs::write(dir.path().join(files::TRAINING_CONFIG), "{not json").unwrap();
        fs::write(dir.path().join(files::FEATURE_DESCRIPTIONS), "[1, 2]").unwrap();
        fs::write(
            dir.path().join(files::AMINO_ACID_DESCRIPTIONS),
            r#"{"A": {"description": "Alanine"}}"#,
        )
        .unwrap();

        let set = ArtifactSet::load_dir(dir.path()).unwrap();
        assert!(set.importance().is_none());
        assert!(set.training_config().is_none());
        assert_eq!(set.descriptions().unwrap().description("A"), "Alanine");
    }

    #[test]
    fn test_duplicate_feature_names_rejected() {
        let dir = tempdir().unwrap();
        write_required(dir.path());
        fs::write(dir.path().join(files::FEATURE_COLUMNS), r#"["A", "A"]"#).unwrap();
        assert!(ArtifactSet::load_dir(dir.path()).is_err());
    }
}
