//! Customer-record preparation: cleaning, feature engineering, and the
//! column transformer that turns cleaned records into model features.
//!
//! Records are held in a small tabular [`RecordSet`]. Raw CSV rows and
//! single form records go through the same [`clean_records`] path, with
//! [`CleanOptions::training`] or [`CleanOptions::inference`] choosing which
//! training-only steps run.

mod clean;
mod error;
mod features;
mod record;
pub mod schema;
mod transform;

#[cfg(test)]
mod testing;

pub use clean::{
    CleanOptions, FillPolicy, UnknownCategory, clean_records, coerce_numeric,
    drop_identifier_and_duplicates, encode_binary, encode_label, normalize_sentinels,
    split_label, unknown_categories, yes_no_columns_are_binary,
};
pub use error::{ErrorCategory, PrepError};
pub use features::{
    TENURE_BIN_EDGES, TenureBin, avg_monthly_spent, derive_features, spending_intensity,
};
pub use record::{RecordSet, Value};
pub use transform::{
    ColumnTransformer, FittedColumnTransformer, OneHotEncoder, OrdinalEncoder, StandardScaler,
};
