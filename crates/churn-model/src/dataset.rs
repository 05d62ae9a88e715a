//! Training-set validation and class weighting shared by every classifier.

use crate::error::ModelError;

/// Validate a row-major binary training set and return its feature count.
///
/// # Errors
///
/// | Variant                              | When                                  |
/// |--------------------------------------|---------------------------------------|
/// | [`ModelError::EmptyDataset`]         | `features` is empty                   |
/// | [`ModelError::ZeroFeatures`]         | rows have zero feature columns        |
/// | [`ModelError::LabelCountMismatch`]   | `labels.len() != features.len()`      |
/// | [`ModelError::FeatureCountMismatch`] | rows have inconsistent lengths        |
/// | [`ModelError::NonFiniteValue`]       | any value is NaN or infinite          |
/// | [`ModelError::InvalidLabel`]         | a label is not 0 or 1                 |
/// | [`ModelError::SingleClass`]          | only one class is present             |
pub(crate) fn validate(features: &[Vec<f64>], labels: &[usize]) -> Result<usize, ModelError> {
    if features.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    if labels.len() != features.len() {
        return Err(ModelError::LabelCountMismatch {
            n_rows: features.len(),
            n_labels: labels.len(),
        });
    }

    let n_features = features[0].len();
    if n_features == 0 {
        return Err(ModelError::ZeroFeatures);
    }

    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }

    if let Some((sample_index, &label)) = labels.iter().enumerate().find(|(_, l)| **l > 1) {
        return Err(ModelError::InvalidLabel {
            sample_index,
            label,
        });
    }
    if labels.iter().all(|&l| l == labels[0]) {
        return Err(ModelError::SingleClass { class: labels[0] });
    }

    Ok(n_features)
}

/// Check the width of a prediction input.
pub(crate) fn check_width(sample: &[f64], expected: usize) -> Result<(), ModelError> {
    if sample.len() != expected {
        return Err(ModelError::PredictionFeatureMismatch {
            expected,
            got: sample.len(),
        });
    }
    Ok(())
}

/// How per-sample weights are derived from the labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClassWeight {
    /// Every sample weighs 1.
    Uniform,
    /// Class `c` weighs `n_samples / (2 * count_c)`.
    Balanced,
}

impl ClassWeight {
    /// Per-sample weights for binary `labels`.
    #[must_use]
    pub fn sample_weights(self, labels: &[usize]) -> Vec<f64> {
        match self {
            ClassWeight::Uniform => vec![1.0; labels.len()],
            ClassWeight::Balanced => {
                let [w0, w1] = balanced_class_weights(labels);
                labels
                    .iter()
                    .map(|&l| if l == 1 { w1 } else { w0 })
                    .collect()
            }
        }
    }
}

/// `n / (n_classes * count_c)` for each class. An absent class weighs 0.
pub(crate) fn balanced_class_weights(labels: &[usize]) -> [f64; 2] {
    let n = labels.len() as f64;
    let n_pos = labels.iter().filter(|&&l| l == 1).count() as f64;
    let n_neg = n - n_pos;
    let weight = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 0.0 };
    [weight(n_neg), weight(n_pos)]
}

/// Convert row-major features to column-major: `out[feature][sample]`.
pub(crate) fn to_column_major(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
        .collect()
}

/// Numerically stable logistic function.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
