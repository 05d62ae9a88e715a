use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Weighted Gini impurity of 0/1 targets: `2p(1 - p)`.
    Gini,
    /// Weighted variance of real-valued targets.
    SquaredError,
}

/// Weighted sufficient statistics of the targets reaching a node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct NodeStats {
    pub(crate) weight: f64,
    pub(crate) sum: f64,
    pub(crate) sum_sq: f64,
}

impl NodeStats {
    pub(crate) fn from_samples(targets: &[f64], weights: &[f64], sample_indices: &[usize]) -> Self {
        let mut stats = Self::default();
        for &si in sample_indices {
            stats.add(targets[si], weights[si]);
        }
        stats
    }

    fn add(&mut self, target: f64, weight: f64) {
        self.weight += weight;
        self.sum += weight * target;
        self.sum_sq += weight * target * target;
    }

    fn remove(&mut self, target: f64, weight: f64) {
        self.weight -= weight;
        self.sum -= weight * target;
        self.sum_sq -= weight * target * target;
    }

    /// Weighted mean target; 0 for an empty node.
    pub(crate) fn mean(&self) -> f64 {
        if self.weight > 0.0 { self.sum / self.weight } else { 0.0 }
    }
}

impl SplitCriterion {
    /// Impurity of a node from its weighted statistics.
    ///
    /// Returns 0 for a node with no weight.
    #[must_use]
    pub(crate) fn impurity(self, stats: &NodeStats) -> Impurity {
        if stats.weight <= 0.0 {
            return Impurity::new(0.0);
        }
        let mean = stats.mean();
        let value = match self {
            SplitCriterion::Gini => 2.0 * mean * (1.0 - mean),
            SplitCriterion::SquaredError => stats.sum_sq / stats.weight - mean * mean,
        };
        Impurity::new(value.max(0.0))
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Inputs shared by every split search within one tree.
pub(crate) struct SplitProblem<'a> {
    /// Column-major features: `features[feature_idx][sample_idx]`.
    pub(crate) features: &'a [Vec<f64>],
    pub(crate) targets: &'a [f64],
    pub(crate) weights: &'a [f64],
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

/// Find the best split among a random subset of `max_features` features.
///
/// Each candidate feature is sorted, then scanned left to right with
/// incremental statistics; the split with the largest weighted impurity
/// decrease wins, first found on ties.
///
/// Returns `None` when no valid split exists (all values identical, or
/// every boundary would violate `min_samples_leaf`).
pub(crate) fn find_best_split(
    problem: &SplitProblem<'_>,
    sample_indices: &[usize],
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = problem.features.len();
    let n_samples = sample_indices.len();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let parent = NodeStats::from_samples(problem.targets, problem.weights, sample_indices);
    let parent_impurity = problem.criterion.impurity(&parent);

    // Partial Fisher-Yates over the first `take` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = problem.max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in &feature_order[..take] {
        let feat_col = &problem.features[feat_idx];
        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut left = NodeStats::default();
        let mut right = parent;

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            left.add(problem.targets[si], problem.weights[si]);
            right.remove(problem.targets[si], problem.weights[si]);

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < problem.min_samples_leaf || n_right < problem.min_samples_leaf {
                continue;
            }

            let decrease = parent.weight * parent_impurity.value()
                - left.weight * problem.criterion.impurity(&left).value()
                - right.weight * problem.criterion.impurity(&right).value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((FeatureIndex::new(feat_idx), (val_i + val_next) / 2.0));
            }
        }
    }

    let (feature, threshold) = best?;
    let feat_col = &problem.features[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn stats(targets: &[f64], weights: &[f64]) -> NodeStats {
        let idx: Vec<usize> = (0..targets.len()).collect();
        NodeStats::from_samples(targets, weights, &idx)
    }

    #[test]
    fn gini_pure_and_balanced() {
        let pure = stats(&[1.0, 1.0, 1.0], &[1.0; 3]);
        assert!(SplitCriterion::Gini.impurity(&pure).value().abs() < f64::EPSILON);
        let balanced = stats(&[0.0, 1.0], &[1.0; 2]);
        assert!((SplitCriterion::Gini.impurity(&balanced).value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn gini_respects_weights() {
        // One positive weighted 3, one negative weighted 1: p = 0.75.
        let s = stats(&[1.0, 0.0], &[3.0, 1.0]);
        let expected = 2.0 * 0.75 * 0.25;
        assert!((SplitCriterion::Gini.impurity(&s).value() - expected).abs() < 1e-12);
    }

    #[test]
    fn squared_error_is_variance() {
        let s = stats(&[1.0, 2.0, 3.0, 4.0], &[1.0; 4]);
        assert!((SplitCriterion::SquaredError.impurity(&s).value() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn separable_data_finds_correct_split() {
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let targets = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let weights = vec![1.0; 6];
        let problem = SplitProblem {
            features: &features,
            targets: &targets,
            weights: &weights,
            criterion: SplitCriterion::Gini,
            max_features: 1,
            min_samples_leaf: 1,
        };
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(&problem, &indices, &mut rng).unwrap();
        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < 1e-12);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
    }

    #[test]
    fn constant_feature_has_no_split() {
        let features = vec![vec![5.0; 4]];
        let targets = vec![0.0, 1.0, 0.0, 1.0];
        let weights = vec![1.0; 4];
        let problem = SplitProblem {
            features: &features,
            targets: &targets,
            weights: &weights,
            criterion: SplitCriterion::Gini,
            max_features: 1,
            min_samples_leaf: 1,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(find_best_split(&problem, &[0, 1, 2, 3], &mut rng).is_none());
    }

    #[test]
    fn min_samples_leaf_blocks_small_children() {
        let features = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let targets = vec![0.0, 1.0, 1.0, 1.0];
        let weights = vec![1.0; 4];
        let problem = SplitProblem {
            features: &features,
            targets: &targets,
            weights: &weights,
            criterion: SplitCriterion::Gini,
            max_features: 1,
            min_samples_leaf: 2,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let split = find_best_split(&problem, &[0, 1, 2, 3], &mut rng).unwrap();
        assert_eq!(split.left_indices.len(), 2);
    }
}
