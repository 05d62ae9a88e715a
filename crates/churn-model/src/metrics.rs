//! Binary confusion matrix and the four headline scores.

use std::fmt;

use churn_prep::RecordSet;
use tracing::instrument;

use crate::error::ModelError;
use crate::inference::CHURN_THRESHOLD;
use crate::pipeline::ChurnPipeline;

/// Counts for a binary classifier, with class 1 (churn) as the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct ConfusionMatrix {
    /// True 0, predicted 0.
    pub true_negative: usize,
    /// True 0, predicted 1.
    pub false_positive: usize,
    /// True 1, predicted 0.
    pub false_negative: usize,
    /// True 1, predicted 1.
    pub true_positive: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted 0/1 labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::EmptyDataset`] | Zero labels provided |
    /// | [`ModelError::LabelCountMismatch`] | Slices differ in length |
    /// | [`ModelError::InvalidLabel`] | A label other than 0 or 1 |
    pub fn from_labels(true_labels: &[usize], predicted: &[usize]) -> Result<Self, ModelError> {
        if true_labels.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(ModelError::LabelCountMismatch {
                n_rows: predicted.len(),
                n_labels: true_labels.len(),
            });
        }
        let mut cm = Self::default();
        for (sample_index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            match (t, p) {
                (0, 0) => cm.true_negative += 1,
                (0, 1) => cm.false_positive += 1,
                (1, 0) => cm.false_negative += 1,
                (1, 1) => cm.true_positive += 1,
                _ => {
                    return Err(ModelError::InvalidLabel {
                        sample_index,
                        label: t.max(p),
                    });
                }
            }
        }
        Ok(cm)
    }

    /// Total number of samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// Proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    /// TP / (TP + FP). 0.0 if nothing was predicted positive.
    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// TP / (TP + FN). 0.0 if there are no true positives to find.
    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// Harmonic mean of precision and recall. 0.0 if both are zero.
    #[must_use]
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} {:>8} {:>8}", "", "pred_0", "pred_1")?;
        writeln!(
            f,
            "{:>8} {:>8} {:>8}",
            "true_0", self.true_negative, self.false_positive
        )?;
        writeln!(
            f,
            "{:>8} {:>8} {:>8}",
            "true_1", self.false_negative, self.true_positive
        )
    }
}

/// Held-out scores for one trained model.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Metrics {
    /// Proportion of correct predictions.
    pub accuracy: f64,
    /// Positive-class precision.
    pub precision: f64,
    /// Positive-class recall.
    pub recall: f64,
    /// Positive-class F1.
    pub f1: f64,
    /// The underlying counts.
    pub confusion: ConfusionMatrix,
}

impl From<ConfusionMatrix> for Metrics {
    fn from(confusion: ConfusionMatrix) -> Self {
        Self {
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            confusion,
        }
    }
}

/// Score a fitted pipeline on cleaned, held-out rows.
///
/// A row is predicted as churn when its probability is at least
/// [`CHURN_THRESHOLD`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ModelError::LabelCountMismatch`] | `y_test.len() != x_test.n_rows()` |
/// | [`ModelError::EmptyDataset`] | No test rows |
/// | [`ModelError::Prep`] | The transformer rejects the rows |
#[instrument(skip_all, fields(n_rows = x_test.n_rows()))]
pub fn evaluate(
    pipeline: &ChurnPipeline,
    x_test: &RecordSet,
    y_test: &[usize],
) -> Result<Metrics, ModelError> {
    if x_test.n_rows() != y_test.len() {
        return Err(ModelError::LabelCountMismatch {
            n_rows: x_test.n_rows(),
            n_labels: y_test.len(),
        });
    }
    if y_test.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    let predicted: Vec<usize> = pipeline
        .predict_proba_cleaned(x_test)?
        .into_iter()
        .map(|p| usize::from(p >= CHURN_THRESHOLD))
        .collect();
    Ok(ConfusionMatrix::from_labels(y_test, &predicted)?.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_counts() {
        // TN=2, FP=1, FN=1, TP=3
        let truth = [0, 0, 0, 1, 1, 1, 1];
        let pred = [0, 0, 1, 0, 1, 1, 1];
        let m = Metrics::from(ConfusionMatrix::from_labels(&truth, &pred).unwrap());
        assert_eq!(m.confusion.true_negative, 2);
        assert_eq!(m.confusion.false_positive, 1);
        assert_eq!(m.confusion.false_negative, 1);
        assert_eq!(m.confusion.true_positive, 3);
        assert!((m.accuracy - 5.0 / 7.0).abs() < 1e-12);
        assert!((m.precision - 0.75).abs() < 1e-12);
        assert!((m.recall - 0.75).abs() < 1e-12);
        assert!((m.f1 - 0.75).abs() < 1e-12);
    }

    #[test]
    fn undefined_scores_are_zero() {
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1], &[0, 0, 0]).unwrap();
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.recall(), 0.0);
        assert_eq!(cm.f1(), 0.0);
        assert!((cm.accuracy() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_empty_and_non_binary() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[]),
            Err(ModelError::EmptyDataset)
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 2], &[0, 1]),
            Err(ModelError::InvalidLabel { sample_index: 1, label: 2 })
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0]),
            Err(ModelError::LabelCountMismatch { .. })
        ));
    }

    #[test]
    fn display_has_both_rows() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1]).unwrap();
        let out = cm.to_string();
        assert!(out.contains("true_0"));
        assert!(out.contains("pred_1"));
    }
}
