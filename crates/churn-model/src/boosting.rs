//! Gradient boosting with log-loss and Newton-step leaf values.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::dataset::{self, ClassWeight, check_width, sigmoid};
use crate::error::ModelError;
use crate::node::NodeIndex;
use crate::split::SplitCriterion;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// Configuration for binary gradient boosting.
///
/// Each stage fits a squared-error regression tree to the log-loss
/// residuals `y - p`, then replaces every leaf value by the Newton step
/// `sum(y - p) / sum(p * (1 - p))` over the samples in that leaf.
///
/// # Defaults
///
/// | Parameter          | Default |
/// |--------------------|---------|
/// | `n_estimators`     | 100     |
/// | `learning_rate`    | 0.1     |
/// | `max_depth`        | 3       |
/// | `min_samples_leaf` | 1       |
/// | `seed`             | 42      |
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoostingConfig {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    min_samples_leaf: usize,
    seed: u64,
}

impl GradientBoostingConfig {
    /// Create a config with `n_estimators` boosting stages.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidTreeCount`] if `n_estimators` is 0.
    pub fn new(n_estimators: usize) -> Result<Self, ModelError> {
        if n_estimators == 0 {
            return Err(ModelError::InvalidTreeCount {
                n_trees: n_estimators,
            });
        }
        Ok(Self {
            n_estimators,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            seed: 42,
        })
    }

    /// Set the shrinkage applied to every stage.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the depth of each stage's tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples per leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the master random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of stages.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return the learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Fit on row-major features and 0/1 labels.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                   |
    /// |--------------------------------------|----------------------------------------|
    /// | [`ModelError::InvalidLearningRate`]  | `learning_rate` not positive and finite |
    /// | [`ModelError::InvalidMaxDepth`]      | `max_depth` is 0                       |
    /// | training-set validation errors       | see [`DecisionTreeConfig::fit`]        |
    #[instrument(skip_all, fields(n_estimators = self.n_estimators, n_samples = features.len()))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<GradientBoosting, ModelError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ModelError::InvalidLearningRate {
                learning_rate: self.learning_rate,
            });
        }
        if self.max_depth == 0 {
            return Err(ModelError::InvalidMaxDepth { max_depth: 0 });
        }
        let n_features = dataset::validate(features, labels)?;
        let n_samples = features.len();

        info!(
            n_estimators = self.n_estimators,
            learning_rate = self.learning_rate,
            max_depth = self.max_depth,
            "training gradient boosting"
        );

        let col_features = dataset::to_column_major(features, n_features);
        let targets: Vec<f64> = labels.iter().map(|&l| l as f64).collect();
        let unit_weights = vec![1.0; n_samples];
        let all_samples: Vec<usize> = (0..n_samples).collect();

        let prior = targets.iter().sum::<f64>() / n_samples as f64;
        let init_score = (prior / (1.0 - prior)).ln();
        let mut scores = vec![init_score; n_samples];

        let stage_config = DecisionTreeConfig::new()
            .with_criterion(SplitCriterion::SquaredError)
            .with_class_weight(ClassWeight::Uniform)
            .with_max_depth(Some(self.max_depth))
            .with_min_samples_leaf(self.min_samples_leaf);
        let mut master_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            let probabilities: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&probabilities)
                .map(|(y, p)| y - p)
                .collect();

            let mut tree = stage_config
                .clone()
                .with_seed(master_rng.r#gen())
                .fit_weighted(&col_features, &residuals, &unit_weights, &all_samples)?;

            // Newton step per leaf.
            let mut numerator = vec![0.0; tree.n_nodes()];
            let mut denominator = vec![0.0; tree.n_nodes()];
            let leaves: Vec<usize> = features.iter().map(|row| tree.apply(row).index()).collect();
            for ((&leaf, r), p) in leaves.iter().zip(&residuals).zip(&probabilities) {
                numerator[leaf] += r;
                denominator[leaf] += p * (1.0 - p);
            }
            for (leaf, (num, den)) in numerator.iter().zip(&denominator).enumerate() {
                let value = if den.abs() < 1e-150 { 0.0 } else { num / den };
                tree.set_leaf_value(NodeIndex::new(leaf), value);
            }

            for (score, row) in scores.iter_mut().zip(features) {
                *score += self.learning_rate * tree.leaf_value(row);
            }
            trees.push(tree);
        }

        let train_loss = targets
            .iter()
            .zip(&scores)
            .map(|(y, &s)| {
                let p = sigmoid(s).clamp(1e-15, 1.0 - 1e-15);
                -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            .sum::<f64>()
            / n_samples as f64;
        debug!(train_loss, n_trees = trees.len(), "gradient boosting trained");

        Ok(GradientBoosting {
            init_score,
            learning_rate: self.learning_rate,
            trees,
            n_features,
        })
    }
}

/// 100 stages, otherwise the documented defaults.
impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// A fitted gradient boosting ensemble.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientBoosting {
    init_score: f64,
    learning_rate: f64,
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl GradientBoosting {
    /// Raw additive score (log-odds) for one sample.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn decision_function(&self, sample: &[f64]) -> Result<f64, ModelError> {
        check_width(sample, self.n_features)?;
        Ok(self.init_score
            + self.learning_rate * self.trees.iter().map(|t| t.leaf_value(sample)).sum::<f64>())
    }

    /// Positive-class probability for one sample.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, ModelError> {
        Ok(sigmoid(self.decision_function(sample)?))
    }

    /// Number of boosting stages.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of features the model was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }
}
