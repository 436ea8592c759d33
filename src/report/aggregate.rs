//! Join predictions back onto the uploaded metadata and summarize them.

use super::enrichment::enrich;
use crate::data::{
    AnalysisMetadata, AnalysisResult, GroupCount, RawTable, SampleResult, CLASSIFICATION_FAILED,
    CLASSIFICATION_WARNING,
};
use crate::error::{ClassificationError, CodonError, Result};
use crate::model::{ArtifactSet, ClassProbabilities};
use crate::pipeline::{AlignmentReport, ClassificationOutput, InputReconciliation};
use log::info;
use std::collections::BTreeMap;

/// Whether a metadata column would collide with a prediction column.
fn is_reserved_column(name: &str) -> bool {
    matches!(name, "Cluster" | "Kingdom" | "Classification_Error")
        || (name.starts_with("Kingdom_") && name.ends_with("_prob"))
}

/// One record per surviving row, in row order.
///
/// On classification failure every row carries the failure sentinel and the
/// error message. Metadata columns named like a prediction column are
/// replaced by the prediction.
pub fn build_sample_results(
    table: &RawTable,
    source_rows: &[usize],
    clusters: &[usize],
    classification: std::result::Result<&ClassificationOutput, &ClassificationError>,
) -> Result<Vec<SampleResult>> {
    if source_rows.len() != clusters.len() {
        return Err(CodonError::InvariantViolation(format!(
            "{} cluster labels for {} rows",
            clusters.len(),
            source_rows.len()
        )));
    }
    if let Ok(output) = classification {
        if output.labels.len() != source_rows.len() {
            return Err(CodonError::InvariantViolation(format!(
                "{} class labels for {} rows",
                output.labels.len(),
                source_rows.len()
            )));
        }
    }

    let mut results = Vec::with_capacity(source_rows.len());
    for (i, (&row, &cluster)) in source_rows.iter().zip(clusters).enumerate() {
        let metadata = table
            .metadata_names()
            .iter()
            .cloned()
            .zip(table.metadata_row(row).iter().cloned())
            .filter(|(name, _)| !is_reserved_column(name))
            .collect();

        let (kingdom, probabilities, classification_error) = match classification {
            Ok(output) => {
                let probabilities = match &output.probabilities {
                    ClassProbabilities::Available { labels, matrix } => labels
                        .iter()
                        .enumerate()
                        .map(|(k, label)| (label.clone(), matrix[(i, k)]))
                        .collect(),
                    ClassProbabilities::Unsupported => Vec::new(),
                };
                (output.labels[i].clone(), probabilities, None)
            }
            Err(err) => (CLASSIFICATION_FAILED.to_string(), Vec::new(), Some(err.to_string())),
        };

        results.push(SampleResult {
            source_row: row,
            metadata,
            cluster,
            kingdom,
            probabilities,
            classification_error,
        });
    }
    Ok(results)
}

/// Number of samples per cluster.
pub fn cluster_distribution(clusters: &[usize]) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for &c in clusters {
        *counts.entry(c).or_insert(0) += 1;
    }
    counts
}

/// Number of samples per predicted class.
pub fn kingdom_distribution(results: &[SampleResult]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for r in results {
        *counts.entry(r.kingdom.clone()).or_insert(0) += 1;
    }
    counts
}

/// Number of samples per (class, cluster) pair, sorted by class then cluster.
pub fn classification_summary(results: &[SampleResult]) -> Vec<GroupCount> {
    let mut counts: BTreeMap<(String, usize), usize> = BTreeMap::new();
    for r in results {
        *counts.entry((r.kingdom.clone(), r.cluster)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|((kingdom, cluster), count)| GroupCount {
            kingdom,
            cluster,
            count,
        })
        .collect()
}

/// Batch-level facts gathered by the pipeline before aggregation.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub samples_dropped: usize,
    pub preprocessing_steps: Vec<String>,
    pub alignment: AlignmentReport,
    pub reconciliation: Option<InputReconciliation>,
}

/// Assembles an [`AnalysisResult`] for one uploaded table.
pub struct ReportBuilder<'a> {
    table: &'a RawTable,
    artifacts: &'a ArtifactSet,
    top_features: usize,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(table: &'a RawTable, artifacts: &'a ArtifactSet, top_features: usize) -> Self {
        Self {
            table,
            artifacts,
            top_features,
        }
    }

    /// Build the result from the pipeline outputs.
    pub fn build(
        &self,
        source_rows: &[usize],
        clusters: &[usize],
        classification: &std::result::Result<ClassificationOutput, ClassificationError>,
        summary: BatchSummary,
    ) -> Result<AnalysisResult> {
        let detailed_results =
            build_sample_results(self.table, source_rows, clusters, classification.as_ref())?;
        let cluster_counts = cluster_distribution(clusters);
        let classified = classification.is_ok();

        let (kingdom_counts, summary_records, enrichment) = if classified {
            let groups = classification_summary(&detailed_results);
            let enrichment = enrich(
                &groups,
                self.artifacts.importance(),
                self.artifacts.descriptions(),
                self.top_features,
            );
            (
                Some(kingdom_distribution(&detailed_results)),
                Some(groups),
                enrichment,
            )
        } else {
            (None, None, None)
        };
        if let Some(counts) = &kingdom_counts {
            info!("Kingdom distribution: {:?}", counts);
        }

        let (top_features, detailed_analysis) = match enrichment {
            Some(e) => (Some(e.top_features), Some(e.records)),
            None => (None, None),
        };

        Ok(AnalysisResult {
            status: "success".to_string(),
            clustering_completed: true,
            classification_completed: classified,
            total_samples: detailed_results.len(),
            analysis_metadata: AnalysisMetadata {
                n_clusters_found: cluster_counts.len(),
                features_used: self.artifacts.feature_names().len(),
                samples_received: self.table.n_rows(),
                samples_dropped: summary.samples_dropped,
                preprocessing_steps: summary.preprocessing_steps,
                alignment: summary.alignment,
                reconciliation: summary.reconciliation,
            },
            cluster_distribution: cluster_counts,
            kingdom_distribution: kingdom_counts,
            classification_summary: summary_records,
            detailed_analysis,
            top_features,
            detailed_results,
            warning: (!classified).then(|| CLASSIFICATION_WARNING.to_string()),
            clustering_only: (!classified).then_some(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn table() -> RawTable {
        let csv = "Kingdom,DNAtype,SpeciesID,Ncodons,SpeciesName,GCU\n\
                   vrl,0,1,100,virus a,5\n\
                   arc,0,2,100,archaeon,6\n\
                   bct,0,3,100,bacterium,7\n";
        RawTable::from_bytes(csv.as_bytes(), 5).unwrap()
    }

    #[test]
    fn test_sample_results_success() {
        let output = ClassificationOutput {
            labels: vec!["x".into(), "y".into()],
            probabilities: ClassProbabilities::Available {
                labels: vec!["x".into(), "y".into()],
                matrix: DMatrix::from_row_slice(2, 2, &[0.9, 0.1, 0.2, 0.8]),
            },
        };
        let results = build_sample_results(&table(), &[0, 2], &[1, 0], Ok(&output)).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].source_row, 2);
        // the uploaded Kingdom column is superseded by the prediction
        assert_eq!(results[1].metadata.len(), 4);
        assert_eq!(results[1].metadata[3].0, "SpeciesName");
        assert_eq!(results[1].kingdom, "y");
        assert_eq!(results[1].probabilities[1], ("y".to_string(), 0.8));
        assert!(results[0].classification_error.is_none());
    }

    #[test]
    fn test_sample_results_failure() {
        let err = ClassificationError::Predict("bad input".into());
        let results = build_sample_results(&table(), &[0, 1, 2], &[0, 0, 1], Err(&err)).unwrap();
        assert!(results.iter().all(|r| r.kingdom == CLASSIFICATION_FAILED));
        assert!(results
            .iter()
            .all(|r| r.classification_error.as_deref() == Some("classifier predict failed: bad input")));
        assert!(results.iter().all(|r| r.probabilities.is_empty()));
    }

    #[test]
    fn test_distributions() {
        let err = ClassificationError::Predict("x".into());
        let mut results = build_sample_results(&table(), &[0, 1, 2], &[2, 0, 2], Err(&err)).unwrap();
        results[0].kingdom = "bct".into();
        results[1].kingdom = "arc".into();
        results[2].kingdom = "bct".into();

        let clusters = cluster_distribution(&[2, 0, 2]);
        assert_eq!(clusters.get(&2), Some(&2));
        assert_eq!(clusters.get(&0), Some(&1));

        let kingdoms = kingdom_distribution(&results);
        assert_eq!(kingdoms.get("bct"), Some(&2));

        let summary = classification_summary(&results);
        assert_eq!(
            summary,
            vec![
                GroupCount { kingdom: "arc".into(), cluster: 0, count: 1 },
                GroupCount { kingdom: "bct".into(), cluster: 2, count: 2 },
            ]
        );
    }

    #[test]
    fn test_mismatched_rows_rejected() {
        let err = ClassificationError::Predict("x".into());
        assert!(build_sample_results(&table(), &[0, 1], &[0], Err(&err)).is_err());
    }
}
