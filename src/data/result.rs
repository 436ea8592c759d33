//! Result types for a codon-usage analysis.

use super::raw_table::Field;
use crate::error::Result;
use crate::pipeline::{AlignmentReport, InputReconciliation};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Class label assigned to every row when classification fails.
pub const CLASSIFICATION_FAILED: &str = "Classification_Failed";

/// Warning attached to results produced without classification.
pub const CLASSIFICATION_WARNING: &str =
    "Classification failed, only clustering results are available";

/// Per-sample output: metadata fields plus predictions.
///
/// Serializes as a flat record: the metadata columns in upload order, then
/// `Cluster`, `Kingdom`, one `Kingdom_<label>_prob` per class and
/// `Classification_Error` when classification failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResult {
    /// Row index in the uploaded table.
    pub source_row: usize,
    /// Metadata columns as (name, value).
    pub metadata: Vec<(String, Field)>,
    /// Cluster label.
    pub cluster: usize,
    /// Predicted class, or [`CLASSIFICATION_FAILED`].
    pub kingdom: String,
    /// Per-class probabilities as (class label, probability).
    pub probabilities: Vec<(String, f64)>,
    /// Classifier error message, when classification failed.
    pub classification_error: Option<String>,
}

impl SampleResult {
    /// Column name of a class probability.
    pub fn probability_column(label: &str) -> String {
        format!("Kingdom_{}_prob", label)
    }

    /// Column names of this record, in serialization order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metadata.iter().map(|(name, _)| name.clone()).collect();
        names.push("Cluster".to_string());
        names.push("Kingdom".to_string());
        names.extend(self.probabilities.iter().map(|(label, _)| Self::probability_column(label)));
        if self.classification_error.is_some() {
            names.push("Classification_Error".to_string());
        }
        names
    }

    /// Values of this record as text, aligned with [`column_names`](Self::column_names).
    pub fn text_values(&self) -> Vec<String> {
        let mut values: Vec<String> = self
            .metadata
            .iter()
            .map(|(_, field)| match field {
                Field::Integer(i) => i.to_string(),
                Field::Number(v) => v.to_string(),
                Field::Text(s) => s.clone(),
                Field::Missing => "NA".to_string(),
            })
            .collect();
        values.push(self.cluster.to_string());
        values.push(self.kingdom.clone());
        values.extend(self.probabilities.iter().map(|(_, p)| format!("{:.6}", p)));
        if let Some(err) = &self.classification_error {
            values.push(err.clone());
        }
        values
    }
}

impl Serialize for SampleResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in &self.metadata {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("Cluster", &self.cluster)?;
        map.serialize_entry("Kingdom", &self.kingdom)?;
        for (label, p) in &self.probabilities {
            map.serialize_entry(&Self::probability_column(label), p)?;
        }
        if let Some(err) = &self.classification_error {
            map.serialize_entry("Classification_Error", err)?;
        }
        map.end()
    }
}

/// Number of samples per (class, cluster) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupCount {
    #[serde(rename = "Kingdom")]
    pub kingdom: String,
    #[serde(rename = "Cluster")]
    pub cluster: usize,
    pub count: usize,
}

/// A top feature reported for one (class, cluster) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    #[serde(rename = "Kingdom")]
    pub kingdom: String,
    #[serde(rename = "Cluster")]
    pub cluster: usize,
    pub n_species: usize,
    #[serde(rename = "Feature")]
    pub feature: String,
    #[serde(rename = "Importance")]
    pub importance: f64,
    #[serde(rename = "Feature_Description")]
    pub description: String,
    #[serde(rename = "Feature_Detail")]
    pub detail: String,
}

/// Bookkeeping about how a batch was processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub n_clusters_found: usize,
    pub features_used: usize,
    pub samples_received: usize,
    pub samples_dropped: usize,
    pub preprocessing_steps: Vec<String>,
    pub alignment: AlignmentReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<InputReconciliation>,
}

/// Output of one analysis request.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub status: String,
    pub clustering_completed: bool,
    pub classification_completed: bool,
    pub total_samples: usize,
    pub cluster_distribution: BTreeMap<usize, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kingdom_distribution: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_summary: Option<Vec<GroupCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_analysis: Option<Vec<EnrichmentRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_features: Option<Vec<String>>,
    pub detailed_results: Vec<SampleResult>,
    pub analysis_metadata: AnalysisMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustering_only: Option<bool>,
}

impl AnalysisResult {
    /// Number of result rows.
    pub fn len(&self) -> usize {
        self.detailed_results.len()
    }

    /// Whether no rows were produced.
    pub fn is_empty(&self) -> bool {
        self.detailed_results.is_empty()
    }

    /// Cluster labels in row order.
    pub fn clusters(&self) -> Vec<usize> {
        self.detailed_results.iter().map(|r| r.cluster).collect()
    }

    /// Class labels in row order.
    pub fn kingdoms(&self) -> Vec<&str> {
        self.detailed_results.iter().map(|r| r.kingdom.as_str()).collect()
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the per-sample records to a TSV file.
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_tsv_to(BufWriter::new(file))
    }

    /// Write the per-sample records as TSV, quoting cells that contain
    /// tabs, quotes or line breaks.
    pub fn write_tsv_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_writer(writer);

        if let Some(first) = self.detailed_results.first() {
            writer.write_record(first.column_names())?;
        }
        for record in &self.detailed_results {
            writer.write_record(record.text_values())?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(error: Option<&str>) -> SampleResult {
        SampleResult {
            source_row: 0,
            metadata: vec![
                ("SpeciesName".to_string(), Field::Text("E. coli".to_string())),
                ("Ncodons".to_string(), Field::Integer(1200)),
                ("Note".to_string(), Field::Missing),
            ],
            cluster: 2,
            kingdom: error.map_or("bct".to_string(), |_| CLASSIFICATION_FAILED.to_string()),
            probabilities: if error.is_some() {
                vec![]
            } else {
                vec![("bct".to_string(), 0.75), ("vrl".to_string(), 0.25)]
            },
            classification_error: error.map(String::from),
        }
    }

    #[test]
    fn test_sample_serialization_order() {
        let json = serde_json::to_string(&sample(None)).unwrap();
        assert_eq!(
            json,
            r#"{"SpeciesName":"E. coli","Ncodons":1200,"Note":null,"Cluster":2,"Kingdom":"bct","Kingdom_bct_prob":0.75,"Kingdom_vrl_prob":0.25}"#
        );
    }

    #[test]
    fn test_failed_sample_has_error_column() {
        let record = sample(Some("boom"));
        let names = record.column_names();
        assert_eq!(names.last().map(String::as_str), Some("Classification_Error"));
        assert_eq!(record.text_values()[4], CLASSIFICATION_FAILED);
        assert_eq!(record.text_values()[2], "NA");
    }

    #[test]
    fn test_tsv_quotes_embedded_separators() {
        let mut record = sample(Some("line one\nline two"));
        record.metadata[0].1 = Field::Text("E.\tcoli".to_string());
        let result = AnalysisResult {
            status: "success".to_string(),
            clustering_completed: true,
            classification_completed: false,
            total_samples: 1,
            cluster_distribution: BTreeMap::from([(2, 1)]),
            kingdom_distribution: None,
            classification_summary: None,
            detailed_analysis: None,
            top_features: None,
            detailed_results: vec![record],
            analysis_metadata: AnalysisMetadata {
                n_clusters_found: 1,
                features_used: 3,
                samples_received: 1,
                samples_dropped: 0,
                preprocessing_steps: Vec::new(),
                alignment: AlignmentReport::default(),
                reconciliation: None,
            },
            warning: Some(CLASSIFICATION_WARNING.to_string()),
            clustering_only: Some(true),
        };

        let mut buf = Vec::new();
        result.write_tsv_to(&mut buf).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(buf.as_slice());
        let header = reader.headers().unwrap().clone();
        assert_eq!(header.len(), 6);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "E.\tcoli");
        assert_eq!(&rows[0][5], "line one\nline two");
    }
}
