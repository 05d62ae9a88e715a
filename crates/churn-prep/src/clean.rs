//! Cleaning and normalization of raw customer records.
//!
//! Each public step takes a borrowed [`RecordSet`] and returns an owned,
//! cleaned copy; the raw input is never mutated. [`clean_records`] runs the
//! steps in the order the model was trained with.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::error::PrepError;
use crate::features::derive_features_in_place;
use crate::record::{RecordSet, Value};
use crate::schema::{
    self, ADDON_SERVICES, CHURN, CUSTOMER_ID, ColumnKind, ColumnSpec, MULTIPLE_LINES,
    NO_INTERNET_SERVICE, NO_PHONE_SERVICE, NUMERIC_COLUMNS, TELCO_SCHEMA,
};

/// How missing numeric values are filled after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPolicy {
    /// Fill with the constant 0.
    #[default]
    Zero,
    /// Fill with the median of the parsed values in the same column.
    /// A column with no parsed value falls back to 0.
    Median,
}

/// Switches for [`clean_records`].
///
/// | Field             | `training()` | `inference()` |
/// |-------------------|--------------|---------------|
/// | `clean_label`     | true         | false         |
/// | `drop_id`         | true         | false         |
/// | `drop_incomplete` | true         | false         |
/// | `fill_policy`     | `Zero`       | `Zero`        |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    /// Encode the `Churn` label column.
    pub clean_label: bool,
    /// Remove the customer identifier column.
    pub drop_id: bool,
    /// Deduplicate rows and drop rows holding any missing value.
    pub drop_incomplete: bool,
    /// Fill policy for the numeric columns.
    pub fill_policy: FillPolicy,
}

impl CleanOptions {
    /// Options for a labelled training table.
    #[must_use]
    pub fn training() -> Self {
        Self {
            clean_label: true,
            drop_id: true,
            drop_incomplete: true,
            fill_policy: FillPolicy::Zero,
        }
    }

    /// Options for inference: never drops rows, so a single record survives.
    #[must_use]
    pub fn inference() -> Self {
        Self {
            clean_label: false,
            drop_id: false,
            drop_incomplete: false,
            fill_policy: FillPolicy::Zero,
        }
    }

    /// Override the numeric fill policy.
    #[must_use]
    pub fn with_fill_policy(mut self, fill_policy: FillPolicy) -> Self {
        self.fill_policy = fill_policy;
        self
    }
}

/// Collapse the "No internet service" and "No phone service" sentinels to `No`.
///
/// # Errors
///
/// Returns [`PrepError::MissingColumn`] if `MultipleLines` or any add-on column is absent.
pub fn normalize_sentinels(records: &RecordSet) -> Result<RecordSet, PrepError> {
    let mut out = records.clone();
    normalize_sentinels_in_place(&mut out)?;
    Ok(out)
}

fn normalize_sentinels_in_place(records: &mut RecordSet) -> Result<(), PrepError> {
    let targets = ADDON_SERVICES
        .iter()
        .map(|c| (*c, NO_INTERNET_SERVICE))
        .chain(std::iter::once((MULTIPLE_LINES, NO_PHONE_SERVICE)));

    for (column, sentinel) in targets {
        records.try_map_column(column, |_, v| {
            Ok(match v {
                Value::Text(s) if s == sentinel => Value::Text("No".to_string()),
                other => other.clone(),
            })
        })?;
    }
    Ok(())
}

/// Coerce columns to f64, then fill missing values per `fill_policy`.
///
/// Text is trimmed and parsed; blank, unparseable, and non-finite values
/// become missing before the fill.
///
/// # Errors
///
/// Returns [`PrepError::MissingColumn`] if a listed column is absent.
pub fn coerce_numeric(
    records: &RecordSet,
    columns: &[&str],
    fill_policy: FillPolicy,
) -> Result<RecordSet, PrepError> {
    let mut out = records.clone();
    coerce_numeric_in_place(&mut out, columns, fill_policy)?;
    Ok(out)
}

fn coerce_numeric_in_place(
    records: &mut RecordSet,
    columns: &[&str],
    fill_policy: FillPolicy,
) -> Result<(), PrepError> {
    for &column in columns {
        records.try_map_column(column, |_, v| Ok(parse_number(v)))?;

        let fill = match fill_policy {
            FillPolicy::Zero => 0.0,
            FillPolicy::Median => {
                let parsed: Vec<f64> = records.column(column)?.filter_map(Value::as_number).collect();
                median(parsed).unwrap_or(0.0)
            }
        };

        let mut n_filled = 0usize;
        records.try_map_column(column, |_, v| {
            Ok(match v {
                Value::Missing => {
                    n_filled += 1;
                    Value::Number(fill)
                }
                other => other.clone(),
            })
        })?;
        if n_filled > 0 {
            debug!(column, n_filled, fill, "filled missing numeric values");
        }
    }
    Ok(())
}

fn parse_number(v: &Value) -> Value {
    match v {
        Value::Number(n) if n.is_finite() => Value::Number(*n),
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Missing,
        },
        _ => Value::Missing,
    }
}

/// Median with the even-length midpoint average. `None` for an empty input.
fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Encode every Yes/No column of `schema` to 1/0, its gender column to 0/1,
/// and validate its flag columns as 0/1. Columns of other kinds are left
/// alone; [`TELCO_SCHEMA`] is the schema [`clean_records`] uses.
///
/// Cells already holding 0 or 1, as numbers or as numeric text such as
/// `"0.0"`, are accepted as that code, so encoding is idempotent and CSV
/// and JSON inputs agree. Missing cells stay missing.
///
/// # Errors
///
/// | Variant                         | When                                         |
/// |---------------------------------|----------------------------------------------|
/// | [`PrepError::MissingColumn`]    | a declared binary column is absent           |
/// | [`PrepError::UnknownCategory`]  | a value is outside the column's vocabulary   |
pub fn encode_binary(
    records: &RecordSet,
    schema: &[ColumnSpec],
) -> Result<RecordSet, PrepError> {
    let mut out = records.clone();
    encode_binary_in_place(&mut out, schema)?;
    Ok(out)
}

fn encode_binary_in_place(
    records: &mut RecordSet,
    schema: &[ColumnSpec],
) -> Result<(), PrepError> {
    for spec in schema {
        let mapping: &[(&str, f64)] = match spec.kind {
            ColumnKind::YesNo { .. } => &[("No", 0.0), ("Yes", 1.0)],
            ColumnKind::Gender => &[("Male", 0.0), ("Female", 1.0)],
            ColumnKind::Flag => &[("0", 0.0), ("1", 1.0)],
            _ => continue,
        };
        encode_column(records, spec.name, mapping)?;
    }
    Ok(())
}

/// Encode the `Churn` label, `Yes` → 1 and `No` → 0.
///
/// # Errors
///
/// Returns [`PrepError::MissingColumn`] if the label column is absent, or
/// [`PrepError::UnknownCategory`] for any other value.
pub fn encode_label(records: &RecordSet) -> Result<RecordSet, PrepError> {
    let mut out = records.clone();
    encode_column(&mut out, CHURN, &[("No", 0.0), ("Yes", 1.0)])?;
    Ok(out)
}

fn encode_column(
    records: &mut RecordSet,
    column: &str,
    mapping: &[(&str, f64)],
) -> Result<(), PrepError> {
    records.try_map_column(column, |row_index, v| match v {
        Value::Missing => Ok(Value::Missing),
        Value::Number(n) if mapping.iter().any(|&(_, code)| code == *n) => Ok(Value::Number(*n)),
        Value::Text(s) => mapping
            .iter()
            .find(|&&(label, _)| label == s.as_str())
            .map(|&(_, code)| code)
            .or_else(|| {
                let n = s.trim().parse::<f64>().ok()?;
                mapping.iter().any(|&(_, code)| code == n).then_some(n)
            })
            .map(Value::Number)
            .ok_or_else(|| PrepError::UnknownCategory {
                column: column.to_string(),
                row_index,
                value: s.clone(),
            }),
        Value::Number(n) => Err(PrepError::UnknownCategory {
            column: column.to_string(),
            row_index,
            value: n.to_string(),
        }),
    })
}

/// Optionally drop the identifier column, remove exact duplicate rows, and
/// drop rows holding any missing value.
///
/// Training-time only: applied to a single inference record it could leave
/// nothing to predict on, which is why [`CleanOptions::inference`] disables it.
#[must_use]
pub fn drop_identifier_and_duplicates(records: &RecordSet, drop_id: bool) -> RecordSet {
    let mut out = records.clone();
    if drop_id {
        out.drop_column(CUSTOMER_ID);
    }
    let before = out.n_rows();
    let mut seen = HashSet::with_capacity(before);
    out.retain_rows(|row| seen.insert(row.iter().map(Value::key).collect::<Vec<_>>()));
    let after_dedup = out.n_rows();
    out.retain_rows(|row| !row.iter().any(Value::is_missing));
    debug!(
        duplicates = before - after_dedup,
        incomplete = after_dedup - out.n_rows(),
        remaining = out.n_rows(),
        "dropped duplicate and incomplete rows"
    );
    out
}

/// Run the full cleaning and feature-engineering pipeline.
///
/// Step order: coerce numeric columns, normalize sentinels, encode binary
/// columns, derive features, encode the label, drop the identifier, then
/// deduplicate and drop incomplete rows. Later steps rely on the columns
/// earlier steps produce, so the order is fixed.
///
/// # Errors
///
/// Propagates the first [`PrepError`] from any step.
#[instrument(skip_all, fields(n_rows = records.n_rows()))]
pub fn clean_records(records: &RecordSet, options: &CleanOptions) -> Result<RecordSet, PrepError> {
    let mut out = records.clone();
    coerce_numeric_in_place(&mut out, &NUMERIC_COLUMNS, options.fill_policy)?;
    normalize_sentinels_in_place(&mut out)?;
    encode_binary_in_place(&mut out, &TELCO_SCHEMA)?;
    derive_features_in_place(&mut out)?;

    if options.clean_label {
        encode_column(&mut out, CHURN, &[("No", 0.0), ("Yes", 1.0)])?;
    }

    if options.drop_incomplete {
        out = drop_identifier_and_duplicates(&out, options.drop_id);
    } else if options.drop_id {
        out.drop_column(CUSTOMER_ID);
    }

    debug!(n_rows_out = out.n_rows(), "records cleaned");
    Ok(out)
}

/// Split an encoded `Churn` column off a cleaned record set.
///
/// Returns the remaining feature columns and the labels (0 or 1).
///
/// # Errors
///
/// | Variant                         | When                              |
/// |---------------------------------|-----------------------------------|
/// | [`PrepError::MissingColumn`]    | no `Churn` column                 |
/// | [`PrepError::MissingValue`]     | a label cell is missing           |
/// | [`PrepError::NonNumericCell`]   | a label cell was never encoded    |
pub fn split_label(records: &RecordSet) -> Result<(RecordSet, Vec<usize>), PrepError> {
    let mut features = records.clone();
    let values = features
        .drop_column(CHURN)
        .ok_or_else(|| PrepError::MissingColumn {
            column: CHURN.to_string(),
        })?;

    let labels = values
        .iter()
        .enumerate()
        .map(|(row_index, v)| match v {
            Value::Number(n) if *n == 0.0 || *n == 1.0 => Ok(*n as usize),
            Value::Missing => Err(PrepError::MissingValue {
                column: CHURN.to_string(),
                row_index,
            }),
            other => Err(PrepError::NonNumericCell {
                column: CHURN.to_string(),
                row_index,
                raw: other.to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((features, labels))
}

/// A categorical value outside its declared vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory {
    /// Column name.
    pub column: String,
    /// Zero-based row index.
    pub row_index: usize,
    /// The unexpected value.
    pub value: String,
}

/// List categorical cells outside the declared vocabularies.
///
/// Not an error: the column transformer ignores unknown one-hot categories,
/// but callers may want to surface them.
#[must_use]
pub fn unknown_categories(records: &RecordSet) -> Vec<UnknownCategory> {
    let mut found = Vec::new();
    for spec in &TELCO_SCHEMA {
        let ColumnKind::Categorical { allowed } = spec.kind else {
            continue;
        };
        let Ok(cells) = records.column(spec.name) else {
            continue;
        };
        for (row_index, cell) in cells.enumerate() {
            if let Value::Text(s) = cell
                && !allowed.contains(&s.as_str())
            {
                found.push(UnknownCategory {
                    column: spec.name.to_string(),
                    row_index,
                    value: s.clone(),
                });
            }
        }
    }
    found
}

/// Return `true` if every declared Yes/No column of `records` holds only 0/1.
#[must_use]
pub fn yes_no_columns_are_binary(records: &RecordSet) -> bool {
    schema::yes_no_columns().all(|spec| {
        records.column(spec.name).is_ok_and(|mut cells| {
            cells.all(|v| matches!(v.as_number(), Some(n) if n == 0.0 || n == 1.0))
        })
    })
}
