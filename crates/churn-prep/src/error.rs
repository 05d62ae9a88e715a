/// Broad class of a [`PrepError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Expected columns are missing, or cells have the wrong shape or type.
    Schema,
    /// A categorical value falls outside its closed vocabulary.
    Encoding,
}

/// Errors from cleaning, feature engineering, and column transforms.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// Returned when a column required by a step is absent.
    #[error("missing column \"{column}\"")]
    MissingColumn {
        /// Name of the absent column.
        column: String,
    },

    /// Returned when a record set would name the same column twice.
    #[error("duplicate column \"{column}\"")]
    DuplicateColumn {
        /// The repeated column name.
        column: String,
    },

    /// Returned when a row has a different number of cells than there are columns.
    #[error("row {row_index} has {got} cells, expected {expected}")]
    RowLengthMismatch {
        /// Zero-based row index.
        row_index: usize,
        /// Number of columns in the record set.
        expected: usize,
        /// Number of cells in the offending row.
        got: usize,
    },

    /// Returned when a cell that must be numeric holds text.
    #[error("column \"{column}\" row {row_index}: expected a number, found \"{raw}\"")]
    NonNumericCell {
        /// Column name.
        column: String,
        /// Zero-based row index.
        row_index: usize,
        /// The offending text.
        raw: String,
    },

    /// Returned when a transform meets a missing value.
    #[error("column \"{column}\" row {row_index}: missing value")]
    MissingValue {
        /// Column name.
        column: String,
        /// Zero-based row index.
        row_index: usize,
    },

    /// Returned when fitting on a record set with zero rows.
    #[error("record set has zero rows")]
    EmptyRecordSet,

    /// Returned when a categorical value is outside its vocabulary.
    #[error("column \"{column}\" row {row_index}: unexpected value \"{value}\"")]
    UnknownCategory {
        /// Column name.
        column: String,
        /// Zero-based row index.
        row_index: usize,
        /// The out-of-vocabulary value.
        value: String,
    },
}

impl PrepError {
    /// Classify this error as a schema or encoding violation.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            PrepError::UnknownCategory { .. } => ErrorCategory::Encoding,
            _ => ErrorCategory::Schema,
        }
    }
}
