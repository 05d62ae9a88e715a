//! I/O error types for churn-io.

use std::path::PathBuf;

use churn_prep::PrepError;

/// Errors from file I/O, CSV and JSON parsing, and report serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when the header names the same column twice.
    #[error("duplicate column \"{column}\" in {path}")]
    DuplicateColumn {
        /// Path to the input file.
        path: PathBuf,
        /// The repeated column name.
        column: String,
    },

    /// Returned when a JSON record file is not valid JSON.
    #[error("invalid JSON record in {path}")]
    InvalidJson {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a JSON record is not a flat object of strings,
    /// numbers, and nulls.
    #[error("unsupported JSON record in {path}: field \"{field}\" is {kind}")]
    UnsupportedJsonValue {
        /// Path to the JSON file.
        path: PathBuf,
        /// Offending field, or `<root>` for a non-object document.
        field: String,
        /// JSON type found.
        kind: &'static str,
    },

    /// Returned when a `key=value` field has no `=` or an empty key.
    #[error("invalid field \"{raw}\": expected key=value")]
    InvalidField {
        /// The raw argument.
        raw: String,
    },

    /// Returned when `key=value` fields cannot form a record, e.g. a key
    /// is repeated.
    #[error("invalid field record")]
    FieldRecord {
        /// Underlying record-set error.
        source: PrepError,
    },

    /// Returned when the run name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid run name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidRunName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a CSV file cannot be written.
    #[error("cannot write CSV file {path}")]
    CsvWrite {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a report cannot be encoded as JSON.
    #[error("cannot serialize report for {path}")]
    SerializeReport {
        /// Destination path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when parsed cells cannot form a record set.
    #[error("invalid records in {path}")]
    Records {
        /// Path to the input file.
        path: PathBuf,
        /// Underlying record-set error.
        source: PrepError,
    },
}
