//! Sample filtering primitives.

pub mod total;

pub use total::{filter_low_totals, quantile_linear, TotalFilterResult, DEFAULT_LOW_TOTAL_QUANTILE};
