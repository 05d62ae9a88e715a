//! CSV table writer and JSON training-report writer.

use std::fs;
use std::path::{Path, PathBuf};

use churn_prep::{RecordSet, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::RunName;

/// Write a record set to CSV: header, then one line per row.
///
/// Missing cells are written empty and numbers use their shortest
/// round-trip form, so `1.0` is written as `1`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::OutputDirCreate`] | Parent directory cannot be created |
/// | [`IoError::CsvWrite`] | File cannot be created or written |
#[instrument(skip(records), fields(path = %path.display(), n_rows = records.n_rows()))]
pub fn write_records_csv(path: &Path, records: &RecordSet) -> Result<(), IoError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| IoError::OutputDirCreate {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let csv_error = |e: csv::Error| IoError::CsvWrite {
        path: path.to_path_buf(),
        source: e,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;
    wtr.write_record(records.columns()).map_err(csv_error)?;
    for row in records.rows() {
        wtr.write_record(row.iter().map(format_cell))
            .map_err(csv_error)?;
    }
    wtr.flush().map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!("records written");
    Ok(())
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Missing => String::new(),
        Value::Text(s) => s.clone(),
        Value::Number(n) => n.to_string(),
    }
}

/// Held-out scores of one candidate, as stored in the training report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScores {
    /// Candidate name.
    pub name: String,
    /// Proportion of correct predictions.
    pub accuracy: f64,
    /// Positive-class precision.
    pub precision: f64,
    /// Positive-class recall.
    pub recall: f64,
    /// Positive-class F1.
    pub f1: f64,
    /// `[[tn, fp], [fn, tp]]`.
    pub confusion_matrix: [[usize; 2]; 2],
}

/// Everything a training run reports.
///
/// Uses primitives only, so the writer has no dependency on `churn-model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Run name.
    pub run: String,
    /// Column schema version the models were trained against.
    pub schema_version: u32,
    /// Rows read from the input file.
    pub n_rows_raw: usize,
    /// Rows left after cleaning.
    pub n_rows_clean: usize,
    /// Training rows.
    pub n_train: usize,
    /// Held-out rows.
    pub n_test: usize,
    /// Seed used for the split and the stochastic learners.
    pub seed: u64,
    /// Name of the persisted model.
    pub selected_model: String,
    /// Path of the persisted model artifact.
    pub model_path: PathBuf,
    /// Scores per candidate, in training order.
    pub models: Vec<ModelScores>,
}

/// Writes training reports into an output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{run}_report.json`; the model artifact path is
/// `{run}_model.bin`.
pub struct ReportWriter {
    output_dir: PathBuf,
    run: RunName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), run = %run))]
    pub fn new(output_dir: &Path, run: RunName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            run,
        })
    }

    /// The run this writer names its files after.
    #[must_use]
    pub fn run(&self) -> &RunName {
        &self.run
    }

    /// Write the report to `{run}_report.json` and return its path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeReport`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | File cannot be written |
    #[instrument(skip_all)]
    pub fn write_report(&self, report: &TrainingReport) -> Result<PathBuf, IoError> {
        let path = self.report_path();
        let json =
            serde_json::to_string_pretty(report).map_err(|e| IoError::SerializeReport {
                path: path.clone(),
                source: e,
            })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "training report written");
        Ok(path)
    }

    /// Return the path of the report file.
    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_report.json", self.run.as_str()))
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything; just computes `{output_dir}/{run}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_model.bin", self.run.as_str()))
    }
}
