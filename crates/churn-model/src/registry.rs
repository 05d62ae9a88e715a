//! The fixed, ordered set of candidate classifiers.

use crate::boosting::GradientBoostingConfig;
use crate::classifier::ClassifierConfig;
use crate::dataset::ClassWeight;
use crate::forest::RandomForestConfig;
use crate::logistic::LogisticRegressionConfig;
use crate::svm::SvcConfig;
use crate::tree::DecisionTreeConfig;

/// Seed used by [`candidate_models`].
pub const DEFAULT_SEED: u64 = 42;

/// A named, unfitted classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Display and artifact name.
    pub name: &'static str,
    /// Hyperparameters.
    pub config: ClassifierConfig,
}

/// The five candidates, in training and tie-break order, seeded with
/// [`DEFAULT_SEED`].
#[must_use]
pub fn candidate_models() -> Vec<Candidate> {
    candidate_models_with_seed(DEFAULT_SEED)
}

/// The five candidates with every stochastic learner seeded from `seed`.
///
/// | Name                 | Family              | Notes                                |
/// |----------------------|---------------------|--------------------------------------|
/// | `LogisticRegression` | logistic regression | balanced, `max_iter` 5000            |
/// | `RandomForest`       | random forest       | balanced, 100 trees                  |
/// | `GradientBoosting`   | gradient boosting   | 100 stages, depth 3, rate 0.1        |
/// | `DecisionTree`       | decision tree       | balanced, unlimited depth            |
/// | `SVM`                | RBF SVC             | unweighted, Platt probabilities      |
#[must_use]
pub fn candidate_models_with_seed(seed: u64) -> Vec<Candidate> {
    vec![
        Candidate {
            name: "LogisticRegression",
            config: ClassifierConfig::LogisticRegression(
                LogisticRegressionConfig::new()
                    .with_max_iter(5000)
                    .with_class_weight(ClassWeight::Balanced),
            ),
        },
        Candidate {
            name: "RandomForest",
            config: ClassifierConfig::RandomForest(
                RandomForestConfig::default()
                    .with_class_weight(ClassWeight::Balanced)
                    .with_seed(seed),
            ),
        },
        Candidate {
            name: "GradientBoosting",
            config: ClassifierConfig::GradientBoosting(
                GradientBoostingConfig::default().with_seed(seed),
            ),
        },
        Candidate {
            name: "DecisionTree",
            config: ClassifierConfig::DecisionTree(
                DecisionTreeConfig::new()
                    .with_class_weight(ClassWeight::Balanced)
                    .with_seed(seed),
            ),
        },
        Candidate {
            name: "SVM",
            config: ClassifierConfig::Svm(SvcConfig::new()),
        },
    ]
}
