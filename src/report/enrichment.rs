//! Feature-importance enrichment of (class, cluster) groups.

use crate::data::{EnrichmentRecord, GroupCount};
use crate::model::{FeatureDescriptions, FeatureImportanceTable};
use log::debug;

/// Top features and one record per (group, top feature).
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub top_features: Vec<String>,
    pub records: Vec<EnrichmentRecord>,
}

/// Pair every (class, cluster) group with the `top_n` most important features.
///
/// Returns `None` when no importance table is available. Descriptions fall
/// back to the feature name and an empty detail.
pub fn enrich(
    groups: &[GroupCount],
    importance: Option<&FeatureImportanceTable>,
    descriptions: Option<&FeatureDescriptions>,
    top_n: usize,
) -> Option<Enrichment> {
    let Some(table) = importance.filter(|t| !t.is_empty()) else {
        debug!("No feature importance table loaded; skipping enrichment");
        return None;
    };

    let top_features = table.top_features(top_n);
    let scored: Vec<(String, f64, String, String)> = top_features
        .iter()
        .map(|feature| {
            let importance = table.mean_importance(feature).unwrap_or(0.0);
            let (description, detail) = match descriptions {
                Some(d) => (d.description(feature), d.detail(feature)),
                None => (feature.clone(), String::new()),
            };
            (feature.clone(), importance, description, detail)
        })
        .collect();

    let records = groups
        .iter()
        .flat_map(|group| {
            scored
                .iter()
                .map(move |(feature, importance, description, detail)| EnrichmentRecord {
                    kingdom: group.kingdom.clone(),
                    cluster: group.cluster,
                    n_species: group.count,
                    feature: feature.clone(),
                    importance: *importance,
                    description: description.clone(),
                    detail: detail.clone(),
                })
        })
        .collect();

    Some(Enrichment {
        top_features,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeatureDescription, FeatureImportance};
    use std::collections::HashMap;

    fn table() -> FeatureImportanceTable {
        let rows = [("gini", 0.9), ("A", 0.5), ("gini", 0.7), ("R", 0.1)]
            .iter()
            .map(|(f, i)| FeatureImportance {
                feature: f.to_string(),
                importance: *i,
            })
            .collect();
        FeatureImportanceTable::new(rows)
    }

    fn groups() -> Vec<GroupCount> {
        vec![
            GroupCount {
                kingdom: "bct".to_string(),
                cluster: 0,
                count: 3,
            },
            GroupCount {
                kingdom: "vrl".to_string(),
                cluster: 1,
                count: 2,
            },
        ]
    }

    #[test]
    fn test_enrichment_records() {
        let mut entries = HashMap::new();
        entries.insert(
            "gini".to_string(),
            FeatureDescription {
                description: Some("Gini coefficient".to_string()),
                detail: Some("Inequality of usage".to_string()),
            },
        );
        let descriptions = FeatureDescriptions::new(entries);

        let enrichment = enrich(&groups(), Some(&table()), Some(&descriptions), 2).unwrap();
        assert_eq!(enrichment.top_features, vec!["gini", "A"]);
        assert_eq!(enrichment.records.len(), 4);

        let first = &enrichment.records[0];
        assert_eq!(first.kingdom, "bct");
        assert_eq!(first.n_species, 3);
        assert_eq!(first.feature, "gini");
        assert!((first.importance - 0.8).abs() < 1e-12);
        assert_eq!(first.description, "Gini coefficient");

        let second = &enrichment.records[1];
        assert_eq!(second.description, "A");
        assert_eq!(second.detail, "");
    }

    #[test]
    fn test_missing_table_skips() {
        assert!(enrich(&groups(), None, None, 5).is_none());
        let empty = FeatureImportanceTable::default();
        assert!(enrich(&groups(), Some(&empty), None, 5).is_none());
    }
}
