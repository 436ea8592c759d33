//! Per-sample statistical descriptors of amino-acid compositions.

mod descriptors;

pub use descriptors::{
    compute_descriptors, cosine_similarity, describe_sample, excess_kurtosis, gini_coefficient,
    median, population_profiles, sample_std, shannon_entropy_base2, skewness, SampleDescriptors,
    DEFAULT_ENTROPY_OFFSET, DESCRIPTOR_NAMES,
};
