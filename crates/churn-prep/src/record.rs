//! In-memory tabular record sets.

use std::collections::HashSet;
use std::fmt;

use crate::error::PrepError;

/// A single cell of a record set.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or blank cell.
    Missing,
    /// Raw or categorical text.
    Text(String),
    /// Numeric value (coerced or encoded).
    Number(f64),
}

impl Value {
    /// Return the numeric value, if this cell holds one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Return the text, if this cell holds text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Return `true` if the cell is missing.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Hashable identity of the cell, used for exact-duplicate detection.
    pub(crate) fn key(&self) -> CellKey {
        match self {
            Value::Missing => CellKey::Missing,
            Value::Text(s) => CellKey::Text(s.clone()),
            // Normalize -0.0 so it deduplicates against 0.0.
            Value::Number(n) => CellKey::Number(if *n == 0.0 { 0 } else { n.to_bits() }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CellKey {
    Missing,
    Text(String),
    Number(u64),
}

/// A named-column table of [`Value`] cells.
///
/// Rows are stored row-major; `rows[i][j]` is the cell of row `i` in
/// column `columns[j]`. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordSet {
    /// Create an empty record set with the given columns.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a record set from columns and rows.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                                   |
    /// |------------------------------------|----------------------------------------|
    /// | [`PrepError::DuplicateColumn`]     | a column name appears twice            |
    /// | [`PrepError::RowLengthMismatch`]   | a row's length differs from the header |
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, PrepError> {
        check_unique(&columns)?;
        let expected = columns.len();
        if let Some((row_index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected)
        {
            return Err(PrepError::RowLengthMismatch {
                row_index,
                expected,
                got: row.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Build a one-row record set from `(column, value)` pairs.
    ///
    /// This is the shape an interactive form or a JSON object produces.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::DuplicateColumn`] if two pairs share a column.
    pub fn single<I, K>(pairs: I) -> Result<Self, PrepError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let (columns, row): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        check_unique(&columns)?;
        Ok(Self {
            columns,
            rows: vec![row],
        })
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::RowLengthMismatch`] if the row has the wrong length.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), PrepError> {
        if row.len() != self.columns.len() {
            return Err(PrepError::RowLengthMismatch {
                row_index: self.rows.len(),
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Return the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Return the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` if the record set has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Return `true` if a column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Return the position of a column.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::MissingColumn`] if the column is absent.
    pub fn column_index(&self, name: &str) -> Result<usize, PrepError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PrepError::MissingColumn {
                column: name.to_string(),
            })
    }

    /// Borrow the cell at `(row, column name)`.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::MissingColumn`] if the column is absent.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub fn get(&self, row: usize, column: &str) -> Result<&Value, PrepError> {
        let col = self.column_index(column)?;
        Ok(&self.rows[row][col])
    }

    /// Iterate over the cells of one column.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::MissingColumn`] if the column is absent.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_, PrepError> {
        let col = self.column_index(name)?;
        Ok(self.rows.iter().map(move |r| &r[col]))
    }

    /// Rewrite every cell of a column in place, row by row.
    ///
    /// The closure receives the zero-based row index and may fail, in which
    /// case the first error is returned and later rows are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::MissingColumn`] if the column is absent, or the
    /// first error produced by `f`.
    pub fn try_map_column<F>(&mut self, name: &str, mut f: F) -> Result<(), PrepError>
    where
        F: FnMut(usize, &Value) -> Result<Value, PrepError>,
    {
        let col = self.column_index(name)?;
        for (row_index, row) in self.rows.iter_mut().enumerate() {
            row[col] = f(row_index, &row[col])?;
        }
        Ok(())
    }

    /// Replace a column's values, appending the column if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::RowLengthMismatch`] if `values.len()` differs
    /// from the number of rows.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), PrepError> {
        if values.len() != self.rows.len() {
            return Err(PrepError::RowLengthMismatch {
                row_index: values.len().min(self.rows.len()),
                expected: self.rows.len(),
                got: values.len(),
            });
        }
        match self.columns.iter().position(|c| c == name) {
            Some(col) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[col] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }

    /// Remove a column if present. Returns its values when it existed.
    pub fn drop_column(&mut self, name: &str) -> Option<Vec<Value>> {
        let col = self.columns.iter().position(|c| c == name)?;
        self.columns.remove(col);
        Some(self.rows.iter_mut().map(|r| r.remove(col)).collect())
    }

    /// Keep only the rows for which `keep` returns `true`, preserving order.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|r| keep(r));
    }

    /// Copy the rows at `indices`, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> RecordSet {
        RecordSet {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

fn check_unique(columns: &[String]) -> Result<(), PrepError> {
    let mut seen = HashSet::with_capacity(columns.len());
    match columns.iter().find(|c| !seen.insert(c.as_str())) {
        Some(column) => Err(PrepError::DuplicateColumn {
            column: column.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordSet {
        RecordSet::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![Value::from("x"), Value::from(1.0)],
                vec![Value::Missing, Value::from(2.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = RecordSet::from_rows(vec!["a".into()], vec![vec![], vec![Value::Missing]])
            .unwrap_err();
        assert!(matches!(
            err,
            PrepError::RowLengthMismatch { row_index: 0, expected: 1, got: 0 }
        ));
    }

    #[test]
    fn single_builds_one_row() {
        let rs = RecordSet::single([("tenure", Value::from(3.0)), ("gender", Value::from("Male"))])
            .unwrap();
        assert_eq!(rs.n_rows(), 1);
        assert_eq!(rs.columns(), &["tenure", "gender"]);
        assert_eq!(rs.get(0, "gender").unwrap(), &Value::from("Male"));
    }

    #[test]
    fn single_rejects_repeated_columns() {
        let err = RecordSet::single([
            ("tenure", Value::from(3.0)),
            ("gender", Value::from("Male")),
            ("tenure", Value::from(4.0)),
        ])
        .unwrap_err();
        assert!(matches!(err, PrepError::DuplicateColumn { ref column } if column == "tenure"));
    }

    #[test]
    fn from_rows_rejects_repeated_columns() {
        let err = RecordSet::from_rows(vec!["a".into(), "a".into()], vec![]).unwrap_err();
        assert!(matches!(err, PrepError::DuplicateColumn { .. }));
    }

    #[test]
    fn set_column_appends_then_replaces() {
        let mut rs = sample();
        rs.set_column("c", vec![Value::from(9.0), Value::from(8.0)]).unwrap();
        assert_eq!(rs.columns().len(), 3);
        rs.set_column("c", vec![Value::from(7.0), Value::from(6.0)]).unwrap();
        assert_eq!(rs.columns().len(), 3);
        assert_eq!(rs.get(1, "c").unwrap().as_number(), Some(6.0));
    }

    #[test]
    fn drop_column_returns_values() {
        let mut rs = sample();
        let dropped = rs.drop_column("a").unwrap();
        assert_eq!(dropped.len(), 2);
        assert!(!rs.has_column("a"));
        assert!(rs.drop_column("a").is_none());
    }

    #[test]
    fn column_index_missing() {
        let err = sample().column_index("zzz").unwrap_err();
        assert!(matches!(err, PrepError::MissingColumn { .. }));
    }

    #[test]
    fn number_display_is_plain() {
        assert_eq!(Value::from(70.35).to_string(), "70.35");
        assert_eq!(Value::from(0.0).to_string(), "0");
        assert_eq!(Value::Missing.to_string(), "");
    }

    #[test]
    fn negative_zero_keys_like_zero() {
        assert_eq!(Value::from(-0.0).key(), Value::from(0.0).key());
    }

    #[test]
    fn select_rows_keeps_given_order() {
        let picked = sample().select_rows(&[1, 0]);
        assert_eq!(picked.n_rows(), 2);
        assert_eq!(picked.rows()[0], sample().rows()[1]);
        assert_eq!(picked.columns(), sample().columns());
    }
}
