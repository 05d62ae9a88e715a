//! Shared fixtures for unit tests.

use crate::record::{RecordSet, Value};

const COLUMNS: [&str; 21] = [
    "customerID",
    "gender",
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "tenure",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
    "MonthlyCharges",
    "TotalCharges",
    "Churn",
];

/// The single form record: a one-month fiber customer.
pub(crate) fn raw_record() -> RecordSet {
    RecordSet::single([
        ("gender", Value::from("Female")),
        ("SeniorCitizen", Value::from(0.0)),
        ("Partner", Value::from("Yes")),
        ("Dependents", Value::from("No")),
        ("tenure", Value::from(1.0)),
        ("PhoneService", Value::from("Yes")),
        ("MultipleLines", Value::from("No phone service")),
        ("InternetService", Value::from("Fiber optic")),
        ("OnlineSecurity", Value::from("No internet service")),
        ("OnlineBackup", Value::from("No")),
        ("DeviceProtection", Value::from("No")),
        ("TechSupport", Value::from("No")),
        ("StreamingTV", Value::from("No")),
        ("StreamingMovies", Value::from("No")),
        ("Contract", Value::from("Month-to-month")),
        ("PaperlessBilling", Value::from("Yes")),
        ("PaymentMethod", Value::from("Electronic check")),
        ("MonthlyCharges", Value::from(70.35)),
        ("TotalCharges", Value::from(70.35)),
    ])
    .expect("fixture columns are unique")
}

/// Three raw CSV-style rows (all text) with identifiers and labels.
pub(crate) fn raw_table() -> RecordSet {
    let rows = [
        [
            "7590-VHVEG", "Female", "0", "Yes", "No", "1", "No", "No phone service", "DSL",
            "No", "Yes", "No", "No", "No", "No", "Month-to-month", "Yes", "Electronic check",
            "29.85", "29.85", "Yes",
        ],
        [
            "5575-GNVDE", "Male", "0", "No", "No", "34", "Yes", "No", "DSL", "Yes", "No", "Yes",
            "No", "No", "No", "One year", "No", "Mailed check", "56.95", "1889.5", "No",
        ],
        [
            "4472-LVYGI", "Female", "0", "Yes", "Yes", "0", "No", "No phone service", "No",
            "No internet service", "No internet service", "No internet service",
            "No internet service", "No internet service", "No internet service", "Two year",
            "Yes", "Bank transfer (automatic)", "52.55", " ", "No",
        ],
    ];
    RecordSet::from_rows(
        COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|s| Value::from(*s)).collect())
            .collect(),
    )
    .expect("fixture rows match the header")
}
