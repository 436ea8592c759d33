//! Result aggregation: per-sample records, distributions and enrichment.

mod aggregate;
mod enrichment;

pub use aggregate::{
    build_sample_results, classification_summary, cluster_distribution, kingdom_distribution,
    BatchSummary, ReportBuilder,
};
pub use enrichment::{enrich, Enrichment};
