use std::path::PathBuf;

use churn_prep::{ErrorCategory, PrepError};

/// Errors from classifier training, evaluation, persistence, and inference.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when n_trees or n_estimators is zero.
    #[error("number of trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid count provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when a learning rate is not finite and positive.
    #[error("learning_rate must be positive and finite, got {learning_rate}")]
    InvalidLearningRate {
        /// The invalid learning rate provided.
        learning_rate: f64,
    },

    /// Returned when an inverse regularization strength is not finite and positive.
    #[error("C must be positive and finite, got {c}")]
    InvalidRegularization {
        /// The invalid C provided.
        c: f64,
    },

    /// Returned when an iteration cap is zero.
    #[error("max_iter must be at least 1, got {max_iter}")]
    InvalidIterationLimit {
        /// The invalid cap provided.
        max_iter: usize,
    },

    /// Returned when a test fraction is not in (0.0, 1.0).
    #[error("test_fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTestFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when the training labels contain a single class.
    #[error("training labels contain only class {class}")]
    SingleClass {
        /// The only class present.
        class: usize,
    },

    /// Returned when a label is neither 0 nor 1.
    #[error("sample {sample_index} has label {label}, expected 0 or 1")]
    InvalidLabel {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The offending label.
        label: usize,
    },

    /// Returned when the number of labels differs from the number of rows.
    #[error("{n_labels} labels for {n_rows} rows")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when single-record inference receives another row count.
    #[error("expected exactly one record, got {n_rows}")]
    ExpectedSingleRecord {
        /// Number of rows received.
        n_rows: usize,
    },

    /// Returned when a registry candidate fails to train or evaluate.
    #[error("candidate model {name} failed")]
    CandidateFailed {
        /// Registry name of the candidate.
        name: String,
        /// The underlying failure.
        source: Box<ModelError>,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },

    /// Returned when loading a model trained against another column schema.
    #[error("incompatible column schema in {path}: expected {expected}, found {found}")]
    IncompatibleSchema {
        /// The schema version this build expects.
        expected: u32,
        /// The schema version found in the file.
        found: u32,
        /// Path to the model file.
        path: PathBuf,
    },

    /// Returned when cleaning or column transformation fails.
    #[error(transparent)]
    Prep(#[from] PrepError),
}

impl ModelError {
    /// Schema or encoding classification for input-shape errors.
    ///
    /// Returns `None` for configuration, training, and persistence errors.
    #[must_use]
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            ModelError::Prep(e) => Some(e.category()),
            ModelError::LabelCountMismatch { .. }
            | ModelError::FeatureCountMismatch { .. }
            | ModelError::PredictionFeatureMismatch { .. }
            | ModelError::ExpectedSingleRecord { .. } => Some(ErrorCategory::Schema),
            ModelError::CandidateFailed { source, .. } => source.category(),
            _ => None,
        }
    }
}
