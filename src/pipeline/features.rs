//! Feature engineering: raw codon counts to the engineered feature matrix.

use crate::config::AnalysisConfig;
use crate::data::{FeatureMatrix, RawTable};
use crate::error::Result;
use crate::filter::TotalFilterResult;
use crate::normalize::{aggregate_codons, filter_and_normalize};
use crate::profile::compute_descriptors;
use log::{debug, info};

/// Output of the feature-engineering stage.
#[derive(Debug, Clone)]
pub struct EngineeredFeatures {
    /// Amino-acid composition columns followed by the descriptor columns.
    pub matrix: FeatureMatrix,
    /// Which uploaded rows survived the low-total filter.
    pub filter: TotalFilterResult,
    /// Feature columns of the upload that are not sense codons.
    pub ignored_columns: Vec<String>,
}

impl EngineeredFeatures {
    /// Number of amino-acid columns.
    pub fn n_amino_acids(&self) -> usize {
        self.matrix.n_cols() - crate::profile::DESCRIPTOR_NAMES.len()
    }
}

/// Aggregate, filter, normalize and describe an uploaded table.
///
/// Fails with `EmptyData` when no row survives the low-total filter or no
/// codon column is recognized.
pub fn engineer_features(table: &RawTable, config: &AnalysisConfig) -> Result<EngineeredFeatures> {
    let counts = aggregate_codons(table);
    info!(
        "Aggregated {} codon columns into {} amino acids",
        counts.codon_columns,
        counts.n_amino_acids()
    );

    let (composition, filter) =
        filter_and_normalize(&counts, config.low_total_quantile, config.pseudocount)?;
    let descriptors = compute_descriptors(&composition, config.entropy_offset)?;
    let matrix = composition
        .to_feature_matrix()?
        .hstack(&descriptors)?
        .fill_nan(0.0);

    debug!("Engineered features: {:?}", matrix.column_names());
    info!(
        "Feature engineering produced {} samples x {} features",
        matrix.n_rows(),
        matrix.n_cols()
    );

    Ok(EngineeredFeatures {
        matrix,
        filter,
        ignored_columns: counts.ignored_columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::DESCRIPTOR_NAMES;
    use approx::assert_relative_eq;

    #[test]
    fn test_engineered_columns() {
        let csv = "id,name,kingdom,dna,ncodons,GCU,CGU,AAA,XYZ\n\
                   1,a,x,y,10,4,2,2,9\n\
                   2,b,x,y,10,0,0,6,9\n\
                   3,c,x,y,10,3,3,1,9\n\
                   4,d,x,y,10,5,1,1,9\n";
        let table = RawTable::from_bytes(csv.as_bytes(), 5).unwrap();
        let features = engineer_features(&table, &AnalysisConfig::default()).unwrap();

        let mut expected = vec!["A".to_string(), "R".to_string(), "K".to_string()];
        expected.extend(DESCRIPTOR_NAMES.iter().map(|s| s.to_string()));
        assert_eq!(features.matrix.column_names(), expected.as_slice());
        assert_eq!(features.n_amino_acids(), 3);
        assert_eq!(features.ignored_columns, vec!["XYZ"]);

        // the lowest-total row is the only one at or below the 5th percentile
        assert_eq!(features.matrix.n_rows(), 3);
        for i in 0..features.matrix.n_rows() {
            let row = features.matrix.row(i);
            assert_relative_eq!(row[..3].iter().sum::<f64>(), 1.0, epsilon = 1e-6);
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_all_zero_rows_rejected() {
        let csv = "a,b,c,d,e,GCU\n1,1,1,1,1,0\n2,2,2,2,2,0\n";
        let table = RawTable::from_bytes(csv.as_bytes(), 5).unwrap();
        assert!(engineer_features(&table, &AnalysisConfig::default()).is_err());
    }
}
