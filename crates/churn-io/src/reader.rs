//! CSV table and JSON single-record readers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use churn_prep::{RecordSet, Value};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a raw customer table from a CSV file.
///
/// Expected CSV format:
/// - Header row required; column names are kept verbatim
/// - One row per customer, all rows must have the same number of columns
/// - Empty cells become [`Value::Missing`]; every other cell is kept as
///   [`Value::Text`] for the cleaning step to coerce
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::DuplicateColumn`] | Header repeats a column name |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
pub struct CsvRecordReader {
    path: PathBuf,
}

impl CsvRecordReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`RecordSet`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<RecordSet, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets the row-length check below report the row
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.parse_error(e))?;
        let columns: Vec<String> = header.iter().map(str::to_string).collect();
        check_unique(&self.path, &columns)?;
        let expected = columns.len();
        debug!(expected_cols = expected, "read CSV header");

        let mut rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }
            rows.push(record.iter().map(cell).collect());
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let records = RecordSet::from_rows(columns, rows).map_err(|e| IoError::Records {
            path: self.path.clone(),
            source: e,
        })?;
        info!(
            n_rows = records.n_rows(),
            n_columns = records.columns().len(),
            "records loaded"
        );
        Ok(records)
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

fn cell(raw: &str) -> Value {
    if raw.is_empty() {
        Value::Missing
    } else {
        Value::Text(raw.to_string())
    }
}

fn check_unique(path: &Path, columns: &[String]) -> Result<(), IoError> {
    let mut seen = HashSet::with_capacity(columns.len());
    match columns.iter().find(|c| !seen.insert(c.as_str())) {
        Some(column) => Err(IoError::DuplicateColumn {
            path: path.to_path_buf(),
            column: column.clone(),
        }),
        None => Ok(()),
    }
}

/// Reads one customer record from a JSON object file.
///
/// Strings become [`Value::Text`] (empty strings become [`Value::Missing`]),
/// numbers become [`Value::Number`], and `null` becomes [`Value::Missing`].
/// Columns come out in field-name order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::InvalidJson`] | Not valid JSON |
/// | [`IoError::UnsupportedJsonValue`] | Not an object, or a field is a bool, array, or object |
pub struct JsonRecordReader {
    path: PathBuf,
}

impl JsonRecordReader {
    /// Create a new reader for the given JSON file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read the file and return a one-row [`RecordSet`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<RecordSet, IoError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let document: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| IoError::InvalidJson {
                path: self.path.clone(),
                source: e,
            })?;

        let fields = match document {
            serde_json::Value::Object(fields) => fields,
            other => return Err(self.unsupported("<root>", &other)),
        };

        let mut pairs = Vec::with_capacity(fields.len());
        for (name, value) in &fields {
            let cell = match value {
                serde_json::Value::Null => Value::Missing,
                serde_json::Value::String(s) => cell(s),
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(x) => Value::Number(x),
                    None => return Err(self.unsupported(name, value)),
                },
                other => return Err(self.unsupported(name, other)),
            };
            pairs.push((name.clone(), cell));
        }
        debug!(n_fields = pairs.len(), "record loaded");
        RecordSet::single(pairs).map_err(|e| IoError::Records {
            path: self.path.clone(),
            source: e,
        })
    }

    fn unsupported(&self, field: &str, value: &serde_json::Value) -> IoError {
        let kind = match value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "a boolean",
            serde_json::Value::Number(_) => "a number",
            serde_json::Value::String(_) => "a string",
            serde_json::Value::Array(_) => "an array",
            serde_json::Value::Object(_) => "an object",
        };
        IoError::UnsupportedJsonValue {
            path: self.path.clone(),
            field: field.to_string(),
            kind,
        }
    }
}

/// Build a one-row record from `key=value` arguments, in argument order.
///
/// Values are kept as text; an empty value is missing.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::InvalidField`] | An argument has no `=` or an empty key |
/// | [`IoError::FieldRecord`] | A key is repeated |
pub fn record_from_fields<S: AsRef<str>>(fields: &[S]) -> Result<RecordSet, IoError> {
    let mut pairs: Vec<(String, Value)> = Vec::with_capacity(fields.len());
    for raw in fields {
        let raw = raw.as_ref();
        let Some((key, value)) = raw.split_once('=') else {
            return Err(IoError::InvalidField {
                raw: raw.to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(IoError::InvalidField {
                raw: raw.to_string(),
            });
        }
        pairs.push((key.to_string(), cell(value)));
    }
    RecordSet::single(pairs).map_err(|e| IoError::FieldRecord { source: e })
}
