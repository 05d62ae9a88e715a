//! File I/O for the churn workflow: raw customer tables and single records
//! in, scored tables and training reports out.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::RunName;
pub use error::IoError;
pub use reader::{CsvRecordReader, JsonRecordReader, record_from_fields};
pub use writer::{ModelScores, ReportWriter, TrainingReport, write_records_csv};
