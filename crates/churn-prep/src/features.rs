//! Derived features computed from cleaned numeric and binary columns.

use std::fmt;

use crate::error::PrepError;
use crate::record::{RecordSet, Value};
use crate::schema::{
    ADDON_SERVICES, AVG_MONTHLY_SPENT, MONTHLY_CHARGES, NUM_SERVICES, SPENDING_INTENSITY,
    TENURE, TENURE_BIN, TOTAL_CHARGES,
};

/// Upper edges of the tenure buckets, in months.
pub const TENURE_BIN_EDGES: [f64; 5] = [6.0, 12.0, 24.0, 48.0, 1000.0];

/// Tenure bucket.
///
/// Buckets are right-closed over the edges `[0, 6, 12, 24, 48, 1000]`, and
/// the first bucket also includes 0. Tenure above the last edge clips into
/// [`TenureBin::FourPlusYears`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TenureBin {
    /// `[0, 6]` months.
    UpToSixMonths,
    /// `(6, 12]` months.
    SixToTwelveMonths,
    /// `(12, 24]` months.
    OneToTwoYears,
    /// `(24, 48]` months.
    TwoToFourYears,
    /// More than 48 months.
    FourPlusYears,
}

impl TenureBin {
    /// All buckets in rank order.
    pub const ALL: [TenureBin; 5] = [
        TenureBin::UpToSixMonths,
        TenureBin::SixToTwelveMonths,
        TenureBin::OneToTwoYears,
        TenureBin::TwoToFourYears,
        TenureBin::FourPlusYears,
    ];

    /// Bucket a non-negative tenure. Negative input is treated as 0.
    #[must_use]
    pub fn from_tenure(tenure: f64) -> Self {
        let idx = TENURE_BIN_EDGES
            .iter()
            .position(|&edge| tenure <= edge)
            .unwrap_or(TENURE_BIN_EDGES.len() - 1);
        Self::ALL[idx]
    }

    /// The label used in record sets and the ordinal encoder.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            TenureBin::UpToSixMonths => "0-6m",
            TenureBin::SixToTwelveMonths => "6-12m",
            TenureBin::OneToTwoYears => "1-2y",
            TenureBin::TwoToFourYears => "2-4y",
            TenureBin::FourPlusYears => "4+y",
        }
    }

    /// Bucket labels in rank order.
    #[must_use]
    pub fn labels() -> [&'static str; 5] {
        Self::ALL.map(Self::label)
    }
}

impl fmt::Display for TenureBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `TotalCharges / (tenure + 1)`. Finite for non-negative tenure.
#[must_use]
pub fn avg_monthly_spent(total_charges: f64, tenure: f64) -> f64 {
    total_charges / (tenure + 1.0)
}

/// `MonthlyCharges / (TotalCharges + 1)`. Finite for non-negative charges.
#[must_use]
pub fn spending_intensity(monthly_charges: f64, total_charges: f64) -> f64 {
    monthly_charges / (total_charges + 1.0)
}

/// Append `AvgMonthlySpent`, `tenure_bin`, `num_services`, and
/// `spending_intensity`, after clipping tenure at 0.
///
/// Expects coerced numeric columns and encoded add-on columns. Missing
/// inputs propagate as missing outputs.
///
/// # Errors
///
/// | Variant                        | When                                        |
/// |--------------------------------|---------------------------------------------|
/// | [`PrepError::MissingColumn`]   | tenure, a charge, or an add-on is absent    |
/// | [`PrepError::NonNumericCell`]  | one of those cells still holds text         |
pub fn derive_features(records: &RecordSet) -> Result<RecordSet, PrepError> {
    let mut out = records.clone();
    derive_features_in_place(&mut out)?;
    Ok(out)
}

pub(crate) fn derive_features_in_place(records: &mut RecordSet) -> Result<(), PrepError> {
    records.try_map_column(TENURE, |row_index, v| {
        Ok(match numeric_cell(TENURE, row_index, v)? {
            Some(t) => Value::Number(t.max(0.0)),
            None => Value::Missing,
        })
    })?;

    let tenure = numeric_column(records, TENURE)?;
    let monthly = numeric_column(records, MONTHLY_CHARGES)?;
    let total = numeric_column(records, TOTAL_CHARGES)?;
    let addons = ADDON_SERVICES
        .iter()
        .map(|c| numeric_column(records, c))
        .collect::<Result<Vec<_>, _>>()?;

    let avg: Vec<Value> = total
        .iter()
        .zip(&tenure)
        .map(|(tc, t)| both(*tc, *t, avg_monthly_spent))
        .collect();
    let bins: Vec<Value> = tenure
        .iter()
        .map(|t| t.map_or(Value::Missing, |t| Value::from(TenureBin::from_tenure(t).label())))
        .collect();
    let services: Vec<Value> = (0..records.n_rows())
        .map(|i| {
            addons
                .iter()
                .map(|col| col[i])
                .sum::<Option<f64>>()
                .map_or(Value::Missing, Value::Number)
        })
        .collect();
    let intensity: Vec<Value> = monthly
        .iter()
        .zip(&total)
        .map(|(mc, tc)| both(*mc, *tc, spending_intensity))
        .collect();

    records.set_column(AVG_MONTHLY_SPENT, avg)?;
    records.set_column(TENURE_BIN, bins)?;
    records.set_column(NUM_SERVICES, services)?;
    records.set_column(SPENDING_INTENSITY, intensity)?;
    Ok(())
}

fn both(a: Option<f64>, b: Option<f64>, f: fn(f64, f64) -> f64) -> Value {
    match (a, b) {
        (Some(a), Some(b)) => Value::Number(f(a, b)),
        _ => Value::Missing,
    }
}

fn numeric_cell(column: &str, row_index: usize, v: &Value) -> Result<Option<f64>, PrepError> {
    match v {
        Value::Number(n) => Ok(Some(*n)),
        Value::Missing => Ok(None),
        Value::Text(s) => Err(PrepError::NonNumericCell {
            column: column.to_string(),
            row_index,
            raw: s.clone(),
        }),
    }
}

fn numeric_column(records: &RecordSet, column: &str) -> Result<Vec<Option<f64>>, PrepError> {
    records
        .column(column)?
        .enumerate()
        .map(|(row_index, v)| numeric_cell(column, row_index, v))
        .collect()
}
