//! Closed set of classifier families behind one fit/predict surface.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::boosting::{GradientBoosting, GradientBoostingConfig};
use crate::error::ModelError;
use crate::forest::{RandomForest, RandomForestConfig};
use crate::logistic::{LogisticRegression, LogisticRegressionConfig};
use crate::svm::{Svc, SvcConfig};
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// An unfitted classifier of one of the supported families.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierConfig {
    /// L2-regularized logistic regression.
    LogisticRegression(LogisticRegressionConfig),
    /// Bagged CART ensemble.
    RandomForest(RandomForestConfig),
    /// Log-loss gradient boosting.
    GradientBoosting(GradientBoostingConfig),
    /// Single CART tree.
    DecisionTree(DecisionTreeConfig),
    /// RBF support vector classifier.
    Svm(SvcConfig),
}

impl ClassifierConfig {
    /// Fit on a dense row-major matrix and 0/1 labels.
    ///
    /// # Errors
    ///
    /// Propagates the configuration and training-set validation errors of
    /// the selected family.
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<Classifier, ModelError> {
        Ok(match self {
            ClassifierConfig::LogisticRegression(c) => {
                Classifier::LogisticRegression(c.fit(features, labels)?)
            }
            ClassifierConfig::RandomForest(c) => Classifier::RandomForest(c.fit(features, labels)?),
            ClassifierConfig::GradientBoosting(c) => {
                Classifier::GradientBoosting(c.fit(features, labels)?)
            }
            ClassifierConfig::DecisionTree(c) => Classifier::DecisionTree(c.fit(features, labels)?),
            ClassifierConfig::Svm(c) => Classifier::Svm(c.fit(features, labels)?),
        })
    }
}

/// A fitted classifier.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Classifier {
    /// Fitted logistic regression.
    LogisticRegression(LogisticRegression),
    /// Fitted random forest.
    RandomForest(RandomForest),
    /// Fitted gradient boosting ensemble.
    GradientBoosting(GradientBoosting),
    /// Fitted decision tree.
    DecisionTree(DecisionTree),
    /// Fitted support vector classifier.
    Svm(Svc),
}

impl Classifier {
    /// Positive-class probability for one feature row.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, ModelError> {
        match self {
            Classifier::LogisticRegression(m) => m.predict_proba(sample),
            Classifier::RandomForest(m) => m.predict_proba(sample),
            Classifier::GradientBoosting(m) => m.predict_proba(sample),
            Classifier::DecisionTree(m) => m.predict_value(sample),
            Classifier::Svm(m) => m.predict_proba(sample),
        }
    }

    /// Positive-class probabilities for many rows, computed in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first [`ModelError::PredictionFeatureMismatch`] encountered.
    pub fn predict_proba_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.par_iter().map(|row| self.predict_proba(row)).collect()
    }

    /// Number of input features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        match self {
            Classifier::LogisticRegression(m) => m.n_features(),
            Classifier::RandomForest(m) => m.n_features(),
            Classifier::GradientBoosting(m) => m.n_features(),
            Classifier::DecisionTree(m) => m.n_features(),
            Classifier::Svm(m) => m.n_features(),
        }
    }

    /// Family name, for logs and reports.
    #[must_use]
    pub fn family(&self) -> &'static str {
        match self {
            Classifier::LogisticRegression(_) => "logistic_regression",
            Classifier::RandomForest(_) => "random_forest",
            Classifier::GradientBoosting(_) => "gradient_boosting",
            Classifier::DecisionTree(_) => "decision_tree",
            Classifier::Svm(_) => "svc",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 4) as f64]).collect();
        let labels = (0..20).map(|i| usize::from(i >= 12)).collect();
        (features, labels)
    }

    fn every_family() -> Vec<ClassifierConfig> {
        vec![
            ClassifierConfig::LogisticRegression(LogisticRegressionConfig::new()),
            ClassifierConfig::RandomForest(RandomForestConfig::new(10).unwrap()),
            ClassifierConfig::GradientBoosting(GradientBoostingConfig::new(10).unwrap()),
            ClassifierConfig::DecisionTree(DecisionTreeConfig::new()),
            ClassifierConfig::Svm(SvcConfig::new()),
        ]
    }

    #[test]
    fn every_family_yields_probabilities() {
        let (features, labels) = data();
        for config in every_family() {
            let model = config.fit(&features, &labels).unwrap();
            assert_eq!(model.n_features(), 2);
            let probs = model.predict_proba_batch(&features).unwrap();
            assert_eq!(probs.len(), features.len());
            assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)), "{}", model.family());
        }
    }

    #[test]
    fn batch_matches_individual() {
        let (features, labels) = data();
        let model = every_family()[1].fit(&features, &labels).unwrap();
        let batch = model.predict_proba_batch(&features).unwrap();
        for (row, p) in features.iter().zip(&batch) {
            assert_eq!(model.predict_proba(row).unwrap(), *p);
        }
    }

    #[test]
    fn width_mismatch_surfaces_from_every_family() {
        let (features, labels) = data();
        for config in every_family() {
            let model = config.fit(&features, &labels).unwrap();
            assert!(matches!(
                model.predict_proba(&[1.0, 2.0, 3.0]),
                Err(ModelError::PredictionFeatureMismatch { expected: 2, got: 3 })
            ));
        }
    }
}
