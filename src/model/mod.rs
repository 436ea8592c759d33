//! Trained model artifacts used by the inference pipeline.
//!
//! Artifacts are fit-free: they are loaded from disk (or built in code) and
//! only ever applied. The pipeline talks to them through the [`Transformer`],
//! [`Clusterer`] and [`Classifier`] traits.

pub mod artifacts;
pub mod classifier;
pub mod kmeans;
pub mod pca;
pub mod scaler;
pub mod traits;

pub use artifacts::{
    ArtifactSet, FeatureDescription, FeatureDescriptions, FeatureImportance,
    FeatureImportanceTable, TrainingConfig,
};
pub use classifier::{ClassifierModel, LogisticClassifier, NearestCentroidClassifier};
pub use kmeans::KMeans;
pub use pca::Pca;
pub use scaler::StandardScaler;
pub use traits::{ClassProbabilities, Classifier, Clusterer, Transformer};
