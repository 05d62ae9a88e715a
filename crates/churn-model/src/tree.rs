use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::dataset::{self, ClassWeight, check_width};
use crate::error::ModelError;
use crate::node::{Node, NodeIndex};
use crate::split::{NodeStats, SplitCriterion, SplitProblem, find_best_split};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `class_weight`      | `Balanced`            |
/// | `seed`              | 42                    |
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) class_weight: ClassWeight,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth. `None` grows until leaves are pure.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of features considered at each split. `None` means all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set how samples are weighted by class.
    #[must_use]
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the class weighting.
    #[must_use]
    pub fn class_weight(&self) -> ClassWeight {
        self.class_weight
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a binary classification tree on row-major features.
    ///
    /// Leaves predict the weighted fraction of positive samples.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                         |
    /// |------------------------------------------|----------------------------------------------|
    /// | [`ModelError::EmptyDataset`]             | `features` is empty                          |
    /// | [`ModelError::LabelCountMismatch`]       | `labels.len() != features.len()`             |
    /// | [`ModelError::FeatureCountMismatch`]     | rows have inconsistent lengths               |
    /// | [`ModelError::NonFiniteValue`]           | any value is NaN or infinite                 |
    /// | [`ModelError::SingleClass`]              | only one class is present                    |
    /// | [`ModelError::InvalidMaxFeatures`]       | `max_features` outside [1, n_features]       |
    /// | [`ModelError::InvalidMaxDepth`]          | `max_depth` is `Some(0)`                     |
    /// | [`ModelError::InvalidMinSamplesSplit`]   | `min_samples_split` < 2                      |
    /// | [`ModelError::InvalidMinSamplesLeaf`]    | `min_samples_leaf` < 1                       |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, ModelError> {
        let n_features = dataset::validate(features, labels)?;
        let col_features = dataset::to_column_major(features, n_features);
        let targets: Vec<f64> = labels.iter().map(|&l| l as f64).collect();
        let weights = self.class_weight.sample_weights(labels);
        let sample_indices: Vec<usize> = (0..features.len()).collect();
        self.fit_weighted(&col_features, &targets, &weights, &sample_indices)
    }

    /// Grow a tree over column-major, pre-validated data.
    ///
    /// `sample_indices` may repeat indices (bootstrap draws).
    pub(crate) fn fit_weighted(
        &self,
        col_features: &[Vec<f64>],
        targets: &[f64],
        weights: &[f64],
        sample_indices: &[usize],
    ) -> Result<DecisionTree, ModelError> {
        let n_features = col_features.len();

        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(ModelError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(ModelError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(ModelError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let problem = SplitProblem {
            features: col_features,
            targets,
            weights,
            criterion: self.criterion,
            max_features,
            min_samples_leaf: self.min_samples_leaf,
        };
        let mut builder = TreeBuilder {
            problem: &problem,
            config: self,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        builder.build(sample_indices, 0);

        debug!(n_nodes = builder.arena.len(), "decision tree built");

        Ok(DecisionTree {
            nodes: builder.arena,
            n_features,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct TreeBuilder<'a> {
    problem: &'a SplitProblem<'a>,
    config: &'a DecisionTreeConfig,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    /// Recursively grow the arena. Returns the index of the node just created.
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let stats =
            NodeStats::from_samples(self.problem.targets, self.problem.weights, sample_indices);
        let impurity = self.config.criterion.impurity(&stats);

        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = sample_indices.len() < self.config.min_samples_split;
        let pure = impurity.value() == 0.0;

        let split = if too_few || pure || depth_exceeded {
            None
        } else {
            find_best_split(self.problem, sample_indices, &mut self.rng)
        };

        let Some(split) = split else {
            let idx = self.arena.len();
            self.arena.push(Node::Leaf {
                value: stats.mean(),
                impurity,
                weight: stats.weight,
            });
            return NodeIndex::new(idx);
        };

        // Reserve the slot so children get valid indices, then overwrite.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            value: 0.0,
            impurity,
            weight: stats.weight,
        });

        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            weight: stats.weight,
        };
        NodeIndex::new(node_idx)
    }
}

/// A fitted CART tree stored as an arena of [`Node`]s.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Leaf value for one sample: the positive-class probability for a
    /// classification tree.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn predict_value(&self, sample: &[f64]) -> Result<f64, ModelError> {
        check_width(sample, self.n_features)?;
        Ok(self.leaf_value(sample))
    }

    /// Value of the leaf reached by a sample of known width.
    pub(crate) fn leaf_value(&self, sample: &[f64]) -> f64 {
        match &self.nodes[self.apply(sample).index()] {
            Node::Leaf { value, .. } => *value,
            Node::Split { .. } => 0.0,
        }
    }

    /// Traverse from the root and return the arena index of the leaf reached.
    pub(crate) fn apply(&self, sample: &[f64]) -> NodeIndex {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return NodeIndex::new(idx),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Overwrite the output of a leaf. Non-leaf indices are ignored.
    pub(crate) fn set_leaf_value(&mut self, leaf: NodeIndex, new_value: f64) {
        if let Some(Node::Leaf { value, .. }) = self.nodes.get_mut(leaf.index()) {
            *value = new_value;
        }
    }

    /// The node arena; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of features the tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Maximum depth; a single leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node_idx, d)) = stack.pop() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }
}
