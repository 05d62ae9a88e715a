//! Single-record and batch inference over any [`ChurnScorer`].

use std::fmt;

use churn_prep::{RecordSet, Value};
use tracing::{debug, instrument};

use crate::error::ModelError;
use crate::pipeline::ChurnScorer;

/// Probability at or above which a customer is labelled as churning.
pub const CHURN_THRESHOLD: f64 = 0.5;

/// Column appended by [`predict_batch`] holding the 0/1 prediction.
pub const PREDICTION_COLUMN: &str = "prediction";

/// Column appended by [`predict_batch`] holding the churn probability.
pub const PROBABILITY_COLUMN: &str = "churn_probability";

/// Thresholded churn decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ChurnLabel {
    /// Probability at or above [`CHURN_THRESHOLD`].
    #[serde(rename = "Churn")]
    Churn,
    /// Probability below [`CHURN_THRESHOLD`].
    #[serde(rename = "Not Churn")]
    NotChurn,
}

impl ChurnLabel {
    /// Label for `probability`.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability >= CHURN_THRESHOLD {
            ChurnLabel::Churn
        } else {
            ChurnLabel::NotChurn
        }
    }

    /// 1 for churn, 0 otherwise.
    #[must_use]
    pub fn as_class(self) -> usize {
        match self {
            ChurnLabel::Churn => 1,
            ChurnLabel::NotChurn => 0,
        }
    }
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChurnLabel::Churn => "Churn",
            ChurnLabel::NotChurn => "Not Churn",
        })
    }
}

/// One scored customer.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Prediction {
    /// Thresholded decision.
    pub label: ChurnLabel,
    /// Positive-class probability in [0, 1].
    pub probability: f64,
}

impl Prediction {
    fn from_probability(probability: f64) -> Self {
        Self {
            label: ChurnLabel::from_probability(probability),
            probability,
        }
    }
}

/// Score exactly one raw record.
///
/// # Errors
///
/// Returns [`ModelError::ExpectedSingleRecord`] unless `record` has exactly
/// one row, and propagates the scorer's errors.
pub fn predict_one<S>(scorer: &S, record: &RecordSet) -> Result<Prediction, ModelError>
where
    S: ChurnScorer + ?Sized,
{
    if record.n_rows() != 1 {
        return Err(ModelError::ExpectedSingleRecord {
            n_rows: record.n_rows(),
        });
    }
    let probabilities = scorer.predict_proba(record)?;
    let [probability] = probabilities[..] else {
        return Err(ModelError::ExpectedSingleRecord {
            n_rows: probabilities.len(),
        });
    };
    Ok(Prediction::from_probability(probability))
}

/// Score every row of a raw table.
///
/// Returns a copy of `rows` with [`PREDICTION_COLUMN`] (0/1) and
/// [`PROBABILITY_COLUMN`] appended, row order preserved. An existing column
/// of either name is overwritten.
///
/// # Errors
///
/// Propagates the scorer's errors.
#[instrument(skip_all, fields(n_rows = rows.n_rows()))]
pub fn predict_batch<S>(scorer: &S, rows: &RecordSet) -> Result<RecordSet, ModelError>
where
    S: ChurnScorer + ?Sized,
{
    let probabilities = scorer.predict_proba(rows)?;
    let mut out = rows.clone();
    let predictions = probabilities
        .iter()
        .map(|&p| Value::Number(ChurnLabel::from_probability(p).as_class() as f64))
        .collect();
    out.set_column(PREDICTION_COLUMN, predictions)?;
    out.set_column(
        PROBABILITY_COLUMN,
        probabilities.iter().map(|&p| Value::Number(p)).collect(),
    )?;
    debug!(
        n_churn = probabilities.iter().filter(|&&p| p >= CHURN_THRESHOLD).count(),
        "batch scored"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::raw_customer;

    /// Returns fixed probabilities, cycling through them.
    struct FixedScorer(Vec<f64>);

    impl ChurnScorer for FixedScorer {
        fn predict_proba(&self, records: &RecordSet) -> Result<Vec<f64>, ModelError> {
            Ok((0..records.n_rows())
                .map(|i| self.0[i % self.0.len()])
                .collect())
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(
            predict_one(&FixedScorer(vec![0.5]), &raw_customer()).unwrap().label,
            ChurnLabel::Churn
        );
        assert_eq!(
            predict_one(&FixedScorer(vec![0.4999]), &raw_customer()).unwrap().label,
            ChurnLabel::NotChurn
        );
    }

    #[test]
    fn predict_one_requires_one_row() {
        let empty = RecordSet::new(raw_customer().columns().to_vec());
        assert!(matches!(
            predict_one(&FixedScorer(vec![0.9]), &empty),
            Err(ModelError::ExpectedSingleRecord { n_rows: 0 })
        ));

        let mut two = raw_customer();
        two.push_row(raw_customer().rows()[0].clone()).unwrap();
        let err = predict_one(&FixedScorer(vec![0.9]), &two).unwrap_err();
        assert_eq!(err.category(), Some(churn_prep::ErrorCategory::Schema));
    }

    #[test]
    fn batch_appends_columns_in_order() {
        let mut rows = raw_customer();
        rows.push_row(raw_customer().rows()[0].clone()).unwrap();
        rows.push_row(raw_customer().rows()[0].clone()).unwrap();
        let out = predict_batch(&FixedScorer(vec![0.9, 0.1, 0.5]), &rows).unwrap();

        let n = rows.columns().len();
        assert_eq!(out.columns()[..n], rows.columns()[..]);
        assert_eq!(out.columns()[n], PREDICTION_COLUMN);
        assert_eq!(out.columns()[n + 1], PROBABILITY_COLUMN);
        let preds: Vec<_> = out.column(PREDICTION_COLUMN).unwrap().cloned().collect();
        assert_eq!(
            preds,
            [Value::Number(1.0), Value::Number(0.0), Value::Number(1.0)]
        );
        assert_eq!(out.get(1, PROBABILITY_COLUMN).unwrap(), &Value::Number(0.1));
    }

    #[test]
    fn labels_display_like_the_form() {
        assert_eq!(ChurnLabel::Churn.to_string(), "Churn");
        assert_eq!(ChurnLabel::NotChurn.to_string(), "Not Churn");
    }

    #[test]
    fn works_through_a_trait_object() {
        let scorer: Box<dyn ChurnScorer> = Box::new(FixedScorer(vec![0.7]));
        let p = predict_one(scorer.as_ref(), &raw_customer()).unwrap();
        assert_eq!(p.probability, 0.7);
    }
}
