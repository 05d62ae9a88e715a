//! The fitted preprocessing + classifier unit, and the scoring seam used
//! by the inference facade.

use churn_prep::{
    CleanOptions, ColumnTransformer, FittedColumnTransformer, RecordSet, clean_records,
};
use tracing::{debug, instrument};

use crate::classifier::{Classifier, ClassifierConfig};
use crate::error::ModelError;

/// Anything that turns raw customer records into churn probabilities.
///
/// [`ChurnPipeline`] is the production implementation; tests substitute
/// fixed scorers. Scorers are shared read-only across concurrent
/// prediction calls, hence the `Send + Sync` bound.
pub trait ChurnScorer: Send + Sync {
    /// Positive-class probability for every row of `records`, in row order.
    ///
    /// `records` are raw: not yet cleaned or encoded.
    ///
    /// # Errors
    ///
    /// Returns a schema or encoding error when the records cannot be
    /// cleaned or transformed.
    fn predict_proba(&self, records: &RecordSet) -> Result<Vec<f64>, ModelError>;
}

/// A fitted column transformer followed by a fitted classifier.
///
/// Immutable once built; share it by reference across inference calls.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChurnPipeline {
    preprocessor: FittedColumnTransformer,
    classifier: Classifier,
}

impl ChurnPipeline {
    /// Pair a fitted transformer with a classifier trained on its output.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PredictionFeatureMismatch`] if the classifier
    /// expects a different number of features than the transformer emits.
    pub fn new(
        preprocessor: FittedColumnTransformer,
        classifier: Classifier,
    ) -> Result<Self, ModelError> {
        if preprocessor.n_features_out() != classifier.n_features() {
            return Err(ModelError::PredictionFeatureMismatch {
                expected: classifier.n_features(),
                got: preprocessor.n_features_out(),
            });
        }
        Ok(Self {
            preprocessor,
            classifier,
        })
    }

    /// The fitted column transformer.
    #[must_use]
    pub fn preprocessor(&self) -> &FittedColumnTransformer {
        &self.preprocessor
    }

    /// The fitted classifier.
    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Names of the model's input features, in transformer output order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        self.preprocessor.feature_names()
    }

    /// Score records that have already been cleaned.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Prep`] when the transformer rejects the records.
    pub fn predict_proba_cleaned(&self, cleaned: &RecordSet) -> Result<Vec<f64>, ModelError> {
        let matrix = self.preprocessor.transform(cleaned)?;
        self.classifier.predict_proba_batch(&matrix)
    }
}

impl ChurnScorer for ChurnPipeline {
    fn predict_proba(&self, records: &RecordSet) -> Result<Vec<f64>, ModelError> {
        let cleaned = clean_records(records, &CleanOptions::inference())?;
        self.predict_proba_cleaned(&cleaned)
    }
}

/// Fit the preprocessor on the training rows only, transform them, and fit
/// the classifier on the result.
///
/// `x_train` holds cleaned features without the label column.
///
/// # Errors
///
/// | Variant                              | When                                   |
/// |--------------------------------------|----------------------------------------|
/// | [`ModelError::LabelCountMismatch`]   | `y_train.len() != x_train.n_rows()`    |
/// | [`ModelError::Prep`]                 | the transformer cannot be fitted       |
/// | classifier errors                    | see [`ClassifierConfig::fit`]          |
#[instrument(skip_all, fields(n_rows = x_train.n_rows()))]
pub fn fit_one(
    preprocessor: &ColumnTransformer,
    classifier: &ClassifierConfig,
    x_train: &RecordSet,
    y_train: &[usize],
) -> Result<ChurnPipeline, ModelError> {
    if x_train.n_rows() != y_train.len() {
        return Err(ModelError::LabelCountMismatch {
            n_rows: x_train.n_rows(),
            n_labels: y_train.len(),
        });
    }
    let fitted = preprocessor.fit(x_train)?;
    let matrix = fitted.transform(x_train)?;
    let model = classifier.fit(&matrix, y_train)?;
    debug!(
        family = model.family(),
        n_features = fitted.n_features_out(),
        "pipeline fitted"
    );
    ChurnPipeline::new(fitted, model)
}
