//! Training harness: stratified split, fit-and-score every candidate, and
//! the plain-text score table.

use std::fmt;

use churn_prep::{ColumnTransformer, RecordSet};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::error::ModelError;
use crate::metrics::{Metrics, evaluate};
use crate::pipeline::{ChurnPipeline, fit_one};
use crate::registry::Candidate;

/// Stratified shuffle split of row indices into `(train, test)`.
///
/// Each class contributes `round(count * test_fraction)` rows to the test
/// side, capped so that a class with more than one row keeps at least one
/// row in training. Both index lists are returned sorted.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ModelError::InvalidTestFraction`] | `test_fraction` not in (0, 1) |
/// | [`ModelError::EmptyDataset`] | No labels |
/// | [`ModelError::InvalidLabel`] | A label other than 0 or 1 |
pub fn train_test_split(
    labels: &[usize],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), ModelError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ModelError::InvalidTestFraction {
            fraction: test_fraction,
        });
    }
    if labels.is_empty() {
        return Err(ModelError::EmptyDataset);
    }

    let mut by_class: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (sample_index, &label) in labels.iter().enumerate() {
        by_class
            .get_mut(label)
            .ok_or(ModelError::InvalidLabel {
                sample_index,
                label,
            })?
            .push(sample_index);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for mut indices in by_class {
        indices.shuffle(&mut rng);
        let count = indices.len();
        let n_test = ((count as f64 * test_fraction).round() as usize).min(count.saturating_sub(1));
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// One trained and scored candidate.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    /// Candidate name.
    pub name: &'static str,
    /// The fitted pipeline.
    pub pipeline: ChurnPipeline,
    /// Held-out scores.
    pub metrics: Metrics,
}

/// Every candidate's pipeline and scores, in registry order.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    models: Vec<TrainedModel>,
}

impl TrainingOutcome {
    /// All trained models in registry order.
    #[must_use]
    pub fn models(&self) -> &[TrainedModel] {
        &self.models
    }

    /// Look a model up by candidate name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TrainedModel> {
        self.models.iter().find(|m| m.name == name)
    }

    /// The model with the highest F1; the earliest candidate wins a tie.
    #[must_use]
    pub fn best_by_f1(&self) -> Option<&TrainedModel> {
        self.models.iter().reduce(|best, m| {
            if m.metrics.f1 > best.metrics.f1 { m } else { best }
        })
    }

    /// Consume the outcome and return the highest-F1 model.
    #[must_use]
    pub fn into_best_by_f1(self) -> Option<TrainedModel> {
        self.models.into_iter().reduce(|best, m| {
            if m.metrics.f1 > best.metrics.f1 { m } else { best }
        })
    }

    /// A printable score table.
    #[must_use]
    pub fn score_table(&self) -> ScoreTable<'_> {
        ScoreTable {
            models: &self.models,
        }
    }
}

/// Fixed-width `Model / Acc / Prec / Recall / F1` table.
pub struct ScoreTable<'a> {
    models: &'a [TrainedModel],
}

impl fmt::Display for ScoreTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<18} {:<10} {:<10} {:<10} {:<10}",
            "Model", "Acc", "Prec", "Recall", "F1"
        )?;
        for m in self.models {
            writeln!(
                f,
                "{:<18} {:.6}   {:.6}   {:.6}   {:.6}",
                m.name, m.metrics.accuracy, m.metrics.precision, m.metrics.recall, m.metrics.f1
            )?;
        }
        Ok(())
    }
}

/// Fit and evaluate every candidate in order.
///
/// The preprocessor is refitted on `x_train` for each candidate. The first
/// failure aborts the run.
///
/// # Errors
///
/// Returns [`ModelError::CandidateFailed`] wrapping the first fit or
/// evaluation error, named after the failing candidate.
#[instrument(skip_all, fields(n_candidates = candidates.len(), n_train = x_train.n_rows(), n_test = x_test.n_rows()))]
pub fn train_all(
    candidates: &[Candidate],
    preprocessor: &ColumnTransformer,
    x_train: &RecordSet,
    y_train: &[usize],
    x_test: &RecordSet,
    y_test: &[usize],
) -> Result<TrainingOutcome, ModelError> {
    let mut models = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let wrap = |source: ModelError| ModelError::CandidateFailed {
            name: candidate.name.to_string(),
            source: Box::new(source),
        };
        let pipeline = fit_one(preprocessor, &candidate.config, x_train, y_train).map_err(wrap)?;
        let metrics = evaluate(&pipeline, x_test, y_test).map_err(wrap)?;
        info!(
            model = candidate.name,
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            "candidate evaluated"
        );
        models.push(TrainedModel {
            name: candidate.name,
            pipeline,
            metrics,
        });
    }
    Ok(TrainingOutcome { models })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierConfig;
    use crate::logistic::LogisticRegressionConfig;
    use crate::metrics::ConfusionMatrix;
    use crate::testing::labelled_training_set;
    use crate::tree::DecisionTreeConfig;

    fn split(n: usize) -> (RecordSet, Vec<usize>, RecordSet, Vec<usize>) {
        let (x, y) = labelled_training_set(n);
        let (train, test) = train_test_split(&y, 0.25, 42).unwrap();
        (
            x.select_rows(&train),
            train.iter().map(|&i| y[i]).collect(),
            x.select_rows(&test),
            test.iter().map(|&i| y[i]).collect(),
        )
    }

    #[test]
    fn split_is_stratified_disjoint_and_deterministic() {
        let labels: Vec<usize> = (0..100).map(|i| usize::from(i % 4 == 0)).collect();
        let (train, test) = train_test_split(&labels, 0.2, 42).unwrap();
        assert_eq!(train.len() + test.len(), 100);
        assert_eq!(test.len(), 20);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 5);
        assert!(test.iter().all(|i| train.binary_search(i).is_err()));
        assert_eq!(train_test_split(&labels, 0.2, 42).unwrap(), (train, test));
    }

    #[test]
    fn split_rejects_bad_fraction() {
        for fraction in [0.0, 1.0, -0.5, f64::NAN] {
            assert!(matches!(
                train_test_split(&[0, 1], fraction, 0),
                Err(ModelError::InvalidTestFraction { .. })
            ));
        }
    }

    #[test]
    fn train_all_keeps_registry_order() {
        let (x_train, y_train, x_test, y_test) = split(60);
        let candidates = [
            Candidate {
                name: "DecisionTree",
                config: ClassifierConfig::DecisionTree(DecisionTreeConfig::new()),
            },
            Candidate {
                name: "LogisticRegression",
                config: ClassifierConfig::LogisticRegression(LogisticRegressionConfig::new()),
            },
        ];
        let outcome = train_all(
            &candidates,
            &ColumnTransformer::telco(),
            &x_train,
            &y_train,
            &x_test,
            &y_test,
        )
        .unwrap();
        let names: Vec<_> = outcome.models().iter().map(|m| m.name).collect();
        assert_eq!(names, ["DecisionTree", "LogisticRegression"]);
        for m in outcome.models() {
            assert_eq!(m.metrics.confusion.total(), y_test.len());
        }
    }

    #[test]
    fn first_failure_names_the_candidate() {
        let (x_train, y_train, x_test, y_test) = split(40);
        let candidates = [Candidate {
            name: "Broken",
            config: ClassifierConfig::LogisticRegression(LogisticRegressionConfig::new().with_c(-1.0)),
        }];
        let err = train_all(
            &candidates,
            &ColumnTransformer::telco(),
            &x_train,
            &y_train,
            &x_test,
            &y_test,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::CandidateFailed { ref name, .. } if name == "Broken"));
    }

    fn scored(name: &'static str, f1_truth: &[usize], pred: &[usize]) -> TrainedModel {
        let (x, y) = labelled_training_set(20);
        let pipeline = fit_one(
            &ColumnTransformer::telco(),
            &ClassifierConfig::DecisionTree(DecisionTreeConfig::new()),
            &x,
            &y,
        )
        .unwrap();
        TrainedModel {
            name,
            pipeline,
            metrics: ConfusionMatrix::from_labels(f1_truth, pred).unwrap().into(),
        }
    }

    #[test]
    fn best_by_f1_prefers_earliest_on_tie() {
        let outcome = TrainingOutcome {
            models: vec![
                scored("A", &[0, 1], &[0, 0]),
                scored("B", &[0, 1], &[0, 1]),
                scored("C", &[0, 1], &[0, 1]),
            ],
        };
        assert_eq!(outcome.best_by_f1().map(|m| m.name), Some("B"));
        assert_eq!(outcome.into_best_by_f1().map(|m| m.name), Some("B"));
    }

    #[test]
    fn score_table_layout() {
        let outcome = TrainingOutcome {
            models: vec![scored("DecisionTree", &[0, 1], &[0, 1])],
        };
        let table = outcome.score_table().to_string();
        let mut lines = table.lines();
        assert_eq!(
            lines.next(),
            Some("Model              Acc        Prec       Recall     F1        ")
        );
        assert_eq!(
            lines.next(),
            Some("DecisionTree       1.000000   1.000000   1.000000   1.000000")
        );
    }
}
