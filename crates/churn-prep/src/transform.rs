//! Column transformer: per-column scaling and categorical encoding.
//!
//! [`ColumnTransformer`] is the declaration; [`ColumnTransformer::fit`]
//! learns scaling statistics and one-hot vocabularies from training rows
//! only and returns a [`FittedColumnTransformer`] whose output column
//! layout is fixed from then on.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::PrepError;
use crate::features::TenureBin;
use crate::record::{RecordSet, Value};
use crate::schema::{
    AVG_MONTHLY_SPENT, CHURN, CONTRACT, CONTRACT_ORDER, CUSTOMER_ID, INTERNET_SERVICE,
    MONTHLY_CHARGES, PAYMENT_METHOD, SPENDING_INTENSITY, TENURE, TENURE_BIN, TOTAL_CHARGES,
};

/// Zero-mean, unit-variance scaling with population statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: f64,
    scale: f64,
}

impl StandardScaler {
    /// Learn mean and standard deviation. A constant column scales by 1.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::EmptyRecordSet`] if `values` is empty.
    pub fn fit(values: &[f64]) -> Result<Self, PrepError> {
        if values.is_empty() {
            return Err(PrepError::EmptyRecordSet);
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        Ok(Self {
            mean,
            scale: if std > 0.0 { std } else { 1.0 },
        })
    }

    /// Scale one value.
    #[must_use]
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    /// Learned mean.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Learned scale (standard deviation, or 1 for constant columns).
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }
}

/// Indicator encoding over categories learned at fit time.
///
/// Unknown categories at transform time produce an all-zero indicator row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<String>,
}

impl OneHotEncoder {
    /// Learn the sorted set of distinct categories.
    #[must_use]
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut categories: Vec<String> = values.into_iter().map(String::from).collect();
        categories.sort_unstable();
        categories.dedup();
        Self { categories }
    }

    /// Append the indicator row for `value` to `out`.
    pub fn transform_into(&self, value: &str, out: &mut Vec<f64>) {
        out.extend(
            self.categories
                .iter()
                .map(|c| if c == value { 1.0 } else { 0.0 }),
        );
    }

    /// Learned categories in output order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

/// Integer ranks over a fixed, explicit category order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    categories: Vec<String>,
}

impl OrdinalEncoder {
    /// Create an encoder with the given rank order.
    #[must_use]
    pub fn new<S: AsRef<str>>(order: &[S]) -> Self {
        Self {
            categories: order.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Rank of `value`, or `None` if it is not a known category.
    #[must_use]
    pub fn rank(&self, value: &str) -> Option<f64> {
        self.categories
            .iter()
            .position(|c| c == value)
            .map(|i| i as f64)
    }

    /// Categories in rank order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

/// Declaration of the per-column transformations.
///
/// Columns not listed and not excluded pass through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTransformer {
    numeric: Vec<String>,
    one_hot: Vec<String>,
    ordinal: Vec<(String, Vec<String>)>,
    excluded: Vec<String>,
}

impl ColumnTransformer {
    /// An empty declaration: every column passes through.
    #[must_use]
    pub fn new() -> Self {
        Self {
            numeric: Vec::new(),
            one_hot: Vec::new(),
            ordinal: Vec::new(),
            excluded: Vec::new(),
        }
    }

    /// The churn-model preprocessor.
    ///
    /// | Group        | Columns                                                             |
    /// |--------------|---------------------------------------------------------------------|
    /// | standardized | tenure, MonthlyCharges, TotalCharges, AvgMonthlySpent, spending_intensity |
    /// | one-hot      | InternetService, PaymentMethod                                      |
    /// | ordinal      | Contract, tenure_bin                                                |
    /// | excluded     | customerID, Churn                                                   |
    /// | passthrough  | everything else                                                     |
    #[must_use]
    pub fn telco() -> Self {
        Self::new()
            .with_numeric([
                TENURE,
                MONTHLY_CHARGES,
                TOTAL_CHARGES,
                AVG_MONTHLY_SPENT,
                SPENDING_INTENSITY,
            ])
            .with_one_hot([INTERNET_SERVICE, PAYMENT_METHOD])
            .with_ordinal(CONTRACT, &CONTRACT_ORDER)
            .with_ordinal(TENURE_BIN, &TenureBin::labels())
            .with_excluded([CUSTOMER_ID, CHURN])
    }

    /// Add standardized numeric columns.
    #[must_use]
    pub fn with_numeric<'a>(mut self, columns: impl IntoIterator<Item = &'a str>) -> Self {
        self.numeric.extend(columns.into_iter().map(String::from));
        self
    }

    /// Add one-hot encoded columns.
    #[must_use]
    pub fn with_one_hot<'a>(mut self, columns: impl IntoIterator<Item = &'a str>) -> Self {
        self.one_hot.extend(columns.into_iter().map(String::from));
        self
    }

    /// Add an ordinal column with an explicit category order.
    #[must_use]
    pub fn with_ordinal(mut self, column: &str, order: &[&str]) -> Self {
        self.ordinal.push((
            column.to_string(),
            order.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Exclude columns from the passthrough group.
    #[must_use]
    pub fn with_excluded<'a>(mut self, columns: impl IntoIterator<Item = &'a str>) -> Self {
        self.excluded.extend(columns.into_iter().map(String::from));
        self
    }

    fn is_declared(&self, column: &str) -> bool {
        self.numeric.iter().any(|c| c == column)
            || self.one_hot.iter().any(|c| c == column)
            || self.ordinal.iter().any(|(c, _)| c == column)
            || self.excluded.iter().any(|c| c == column)
    }

    /// Learn the transformer's parameters from training rows.
    ///
    /// # Errors
    ///
    /// | Variant                          | When                                         |
    /// |----------------------------------|----------------------------------------------|
    /// | [`PrepError::EmptyRecordSet`]    | `records` has no rows                        |
    /// | [`PrepError::MissingColumn`]     | a declared column is absent                  |
    /// | [`PrepError::MissingValue`]      | a used cell is missing                       |
    /// | [`PrepError::NonNumericCell`]    | a numeric or passthrough cell holds text     |
    /// | [`PrepError::UnknownCategory`]   | an ordinal value is outside its order        |
    #[instrument(skip_all, fields(n_rows = records.n_rows()))]
    pub fn fit(&self, records: &RecordSet) -> Result<FittedColumnTransformer, PrepError> {
        if records.is_empty() {
            return Err(PrepError::EmptyRecordSet);
        }

        let scalers = self
            .numeric
            .iter()
            .map(|c| {
                let values = numeric_values(records, c)?;
                Ok((c.clone(), StandardScaler::fit(&values)?))
            })
            .collect::<Result<Vec<_>, PrepError>>()?;

        let one_hot = self
            .one_hot
            .iter()
            .map(|c| {
                let values = categorical_values(records, c)?;
                Ok((c.clone(), OneHotEncoder::fit(values.iter().map(String::as_str))))
            })
            .collect::<Result<Vec<_>, PrepError>>()?;

        let ordinal: Vec<(String, OrdinalEncoder)> = self
            .ordinal
            .iter()
            .map(|(c, order)| (c.clone(), OrdinalEncoder::new(order.as_slice())))
            .collect();

        let passthrough: Vec<String> = records
            .columns()
            .iter()
            .filter(|c| !self.is_declared(c))
            .cloned()
            .collect();

        let fitted = FittedColumnTransformer::new(scalers, one_hot, ordinal, passthrough);
        // Validates ordinal vocabularies and passthrough types on the training rows.
        fitted.transform(records)?;

        debug!(
            n_features_out = fitted.n_features_out(),
            n_passthrough = fitted.passthrough.len(),
            "column transformer fitted"
        );
        Ok(fitted)
    }
}

impl Default for ColumnTransformer {
    fn default() -> Self {
        Self::new()
    }
}

/// A fitted column transformer with a fixed output layout:
/// standardized, one-hot, ordinal, then passthrough columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumnTransformer {
    scalers: Vec<(String, StandardScaler)>,
    one_hot: Vec<(String, OneHotEncoder)>,
    ordinal: Vec<(String, OrdinalEncoder)>,
    passthrough: Vec<String>,
    feature_names: Vec<String>,
}

impl FittedColumnTransformer {
    fn new(
        scalers: Vec<(String, StandardScaler)>,
        one_hot: Vec<(String, OneHotEncoder)>,
        ordinal: Vec<(String, OrdinalEncoder)>,
        passthrough: Vec<String>,
    ) -> Self {
        let mut feature_names: Vec<String> = scalers.iter().map(|(c, _)| c.clone()).collect();
        for (c, enc) in &one_hot {
            feature_names.extend(enc.categories().iter().map(|cat| format!("{c}_{cat}")));
        }
        feature_names.extend(ordinal.iter().map(|(c, _)| c.clone()));
        feature_names.extend(passthrough.iter().cloned());
        Self {
            scalers,
            one_hot,
            ordinal,
            passthrough,
            feature_names,
        }
    }

    /// Transform cleaned records into a dense row-major feature matrix.
    ///
    /// Columns not known to the transformer (such as an identifier or a
    /// label) are ignored.
    ///
    /// # Errors
    ///
    /// | Variant                          | When                                          |
    /// |----------------------------------|-----------------------------------------------|
    /// | [`PrepError::MissingColumn`]     | an input column seen at fit time is absent    |
    /// | [`PrepError::MissingValue`]      | a used cell is missing                        |
    /// | [`PrepError::NonNumericCell`]    | a numeric or passthrough cell holds text      |
    /// | [`PrepError::UnknownCategory`]   | an ordinal value is outside its order         |
    pub fn transform(&self, records: &RecordSet) -> Result<Vec<Vec<f64>>, PrepError> {
        let scaler_cols = indices(records, self.scalers.iter().map(|(c, _)| c))?;
        let one_hot_cols = indices(records, self.one_hot.iter().map(|(c, _)| c))?;
        let ordinal_cols = indices(records, self.ordinal.iter().map(|(c, _)| c))?;
        let passthrough_cols = indices(records, self.passthrough.iter())?;

        records
            .rows()
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                let mut out = Vec::with_capacity(self.feature_names.len());
                for ((name, scaler), &col) in self.scalers.iter().zip(&scaler_cols) {
                    out.push(scaler.transform(number_at(name, row_index, &row[col])?));
                }
                for ((name, enc), &col) in self.one_hot.iter().zip(&one_hot_cols) {
                    enc.transform_into(&category_at(name, row_index, &row[col])?, &mut out);
                }
                for ((name, enc), &col) in self.ordinal.iter().zip(&ordinal_cols) {
                    let value = category_at(name, row_index, &row[col])?;
                    let rank = enc.rank(&value).ok_or_else(|| PrepError::UnknownCategory {
                        column: name.clone(),
                        row_index,
                        value,
                    })?;
                    out.push(rank);
                }
                for (name, &col) in self.passthrough.iter().zip(&passthrough_cols) {
                    out.push(number_at(name, row_index, &row[col])?);
                }
                Ok(out)
            })
            .collect()
    }

    /// Output column names, in output order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of output columns.
    #[must_use]
    pub fn n_features_out(&self) -> usize {
        self.feature_names.len()
    }

    /// Columns passed through unchanged.
    #[must_use]
    pub fn passthrough(&self) -> &[String] {
        &self.passthrough
    }

    /// Learned scaler for a numeric column.
    #[must_use]
    pub fn scaler(&self, column: &str) -> Option<&StandardScaler> {
        self.scalers.iter().find(|(c, _)| c == column).map(|(_, s)| s)
    }

    /// Learned one-hot encoder for a categorical column.
    #[must_use]
    pub fn one_hot_encoder(&self, column: &str) -> Option<&OneHotEncoder> {
        self.one_hot.iter().find(|(c, _)| c == column).map(|(_, e)| e)
    }
}

fn indices<'a>(
    records: &RecordSet,
    names: impl Iterator<Item = &'a String>,
) -> Result<Vec<usize>, PrepError> {
    names.map(|n| records.column_index(n)).collect()
}

fn number_at(column: &str, row_index: usize, v: &Value) -> Result<f64, PrepError> {
    match v {
        Value::Number(n) => Ok(*n),
        Value::Missing => Err(PrepError::MissingValue {
            column: column.to_string(),
            row_index,
        }),
        Value::Text(s) => Err(PrepError::NonNumericCell {
            column: column.to_string(),
            row_index,
            raw: s.clone(),
        }),
    }
}

fn category_at(column: &str, row_index: usize, v: &Value) -> Result<String, PrepError> {
    match v {
        Value::Missing => Err(PrepError::MissingValue {
            column: column.to_string(),
            row_index,
        }),
        other => Ok(other.to_string()),
    }
}

fn numeric_values(records: &RecordSet, column: &str) -> Result<Vec<f64>, PrepError> {
    records
        .column(column)?
        .enumerate()
        .map(|(i, v)| number_at(column, i, v))
        .collect()
}

fn categorical_values(records: &RecordSet, column: &str) -> Result<Vec<String>, PrepError> {
    records
        .column(column)?
        .enumerate()
        .map(|(i, v)| category_at(column, i, v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::{CleanOptions, clean_records};
    use crate::testing::{raw_record, raw_table};

    fn training_features() -> RecordSet {
        clean_records(&raw_table(), &CleanOptions::training()).unwrap()
    }

    #[test]
    fn scaler_zero_mean_unit_variance() {
        let s = StandardScaler::fit(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let scaled: Vec<f64> = [1.0, 2.0, 3.0, 4.0].iter().map(|&x| s.transform(x)).collect();
        let mean = scaled.iter().sum::<f64>() / 4.0;
        let var = scaled.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn scaler_constant_column_scales_by_one() {
        let s = StandardScaler::fit(&[5.0, 5.0]).unwrap();
        assert_eq!(s.scale(), 1.0);
        assert_eq!(s.transform(5.0), 0.0);
    }

    #[test]
    fn one_hot_unknown_is_all_zero() {
        let enc = OneHotEncoder::fit(["DSL", "Fiber optic", "DSL"]);
        assert_eq!(enc.categories(), &["DSL", "Fiber optic"]);
        let mut out = Vec::new();
        enc.transform_into("Satellite", &mut out);
        assert_eq!(out, vec![0.0, 0.0]);
        out.clear();
        enc.transform_into("Fiber optic", &mut out);
        assert_eq!(out, vec![0.0, 1.0]);
    }

    #[test]
    fn ordinal_ranks_follow_declared_order() {
        let enc = OrdinalEncoder::new(&CONTRACT_ORDER);
        assert_eq!(enc.rank("Month-to-month"), Some(0.0));
        assert_eq!(enc.rank("One year"), Some(1.0));
        assert_eq!(enc.rank("Two year"), Some(2.0));
        assert_eq!(enc.rank("Three year"), None);

        let bins = OrdinalEncoder::new(&TenureBin::labels());
        assert_eq!(bins.rank("4+y"), Some(4.0));
    }

    #[test]
    fn telco_layout_is_stable() {
        let (features, _) = crate::clean::split_label(&training_features()).unwrap();
        let fitted = ColumnTransformer::telco().fit(&features).unwrap();
        let names = fitted.feature_names();
        assert_eq!(&names[..5], &[
            "tenure",
            "MonthlyCharges",
            "TotalCharges",
            "AvgMonthlySpent",
            "spending_intensity"
        ]);
        assert!(names.contains(&"InternetService_DSL".to_string()));
        assert!(names.contains(&"Contract".to_string()));
        assert!(names.contains(&"num_services".to_string()));
        assert!(!names.iter().any(|n| n == "customerID" || n == "Churn"));

        let matrix = fitted.transform(&features).unwrap();
        assert_eq!(matrix.len(), 3);
        assert!(matrix.iter().all(|r| r.len() == fitted.n_features_out()));
    }

    #[test]
    fn single_record_transforms_with_training_layout() {
        let (features, _) = crate::clean::split_label(&training_features()).unwrap();
        let fitted = ColumnTransformer::telco().fit(&features).unwrap();

        // The fiber-optic category never appeared in training: ignored, not an error.
        let record = clean_records(&raw_record(), &CleanOptions::inference()).unwrap();
        let row = &fitted.transform(&record).unwrap()[0];
        assert_eq!(row.len(), fitted.n_features_out());
        let names = fitted.feature_names();
        let idx = |n: &str| names.iter().position(|x| x == n).unwrap();
        assert_eq!(row[idx("InternetService_DSL")], 0.0);
        assert_eq!(row[idx("InternetService_No")], 0.0);
        assert_eq!(row[idx("Contract")], 0.0);
        assert_eq!(row[idx("tenure_bin")], 0.0);
    }

    #[test]
    fn missing_column_at_transform_is_schema_error() {
        let (features, _) = crate::clean::split_label(&training_features()).unwrap();
        let fitted = ColumnTransformer::telco().fit(&features).unwrap();
        let mut broken = features.clone();
        broken.drop_column("Partner");
        let err = fitted.transform(&broken).unwrap_err();
        assert!(matches!(err, PrepError::MissingColumn { column } if column == "Partner"));
    }

    #[test]
    fn unknown_contract_is_encoding_error() {
        let (features, _) = crate::clean::split_label(&training_features()).unwrap();
        let fitted = ColumnTransformer::telco().fit(&features).unwrap();
        let mut record = clean_records(&raw_record(), &CleanOptions::inference()).unwrap();
        record.set_column(CONTRACT, vec![Value::from("Weekly")]).unwrap();
        let err = fitted.transform(&record).unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Encoding);
    }

    #[test]
    fn scaling_statistics_come_from_fit_rows_only() {
        let (features, _) = crate::clean::split_label(&training_features()).unwrap();
        let fitted = ColumnTransformer::telco().fit(&features).unwrap();
        let before = fitted.scaler(TENURE).unwrap().clone();
        let record = clean_records(&raw_record(), &CleanOptions::inference()).unwrap();
        fitted.transform(&record).unwrap();
        assert_eq!(fitted.scaler(TENURE).unwrap(), &before);
        // tenure values in training: 1, 34, 0
        assert!((before.mean() - 35.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn fit_empty_is_error() {
        let empty = RecordSet::new(vec![TENURE.to_string()]);
        let err = ColumnTransformer::telco().fit(&empty).unwrap_err();
        assert!(matches!(err, PrepError::EmptyRecordSet));
    }
}
