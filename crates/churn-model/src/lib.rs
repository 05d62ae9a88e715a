//! Baseline churn classifiers, the training harness, and the inference
//! facade.
//!
//! Five hand-rolled classifier families share one [`ClassifierConfig`] /
//! [`Classifier`] surface. [`fit_one`] pairs a fitted column transformer
//! with a classifier into a [`ChurnPipeline`]; [`train_all`] fits and scores
//! every registry candidate; [`ModelArtifact`] persists the selected
//! pipeline; [`predict_one`] and [`predict_batch`] score raw records through
//! any [`ChurnScorer`].

mod boosting;
mod classifier;
mod dataset;
mod error;
mod forest;
mod inference;
mod logistic;
mod metrics;
mod node;
mod pipeline;
mod registry;
mod serialize;
mod split;
mod svm;
mod trainer;
mod tree;

#[cfg(test)]
mod testing;

pub use boosting::{GradientBoosting, GradientBoostingConfig};
pub use classifier::{Classifier, ClassifierConfig};
pub use dataset::ClassWeight;
pub use error::ModelError;
pub use forest::{MaxFeatures, RandomForest, RandomForestConfig};
pub use inference::{
    CHURN_THRESHOLD, ChurnLabel, PREDICTION_COLUMN, PROBABILITY_COLUMN, Prediction,
    predict_batch, predict_one,
};
pub use logistic::{LogisticRegression, LogisticRegressionConfig};
pub use metrics::{ConfusionMatrix, Metrics, evaluate};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use pipeline::{ChurnPipeline, ChurnScorer, fit_one};
pub use registry::{Candidate, DEFAULT_SEED, candidate_models, candidate_models_with_seed};
pub use serialize::{FORMAT_VERSION, ModelArtifact};
pub use split::SplitCriterion;
pub use svm::{Gamma, Svc, SvcConfig};
pub use trainer::{ScoreTable, TrainedModel, TrainingOutcome, train_all, train_test_split};
pub use tree::{DecisionTree, DecisionTreeConfig};
