//! Shared fixtures for unit tests.

use churn_prep::{CleanOptions, RecordSet, Value, clean_records, split_label};

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

const CONTRACTS: [&str; 4] = ["Month-to-month", "One year", "Two year", "Month-to-month"];
const INTERNET: [&str; 3] = ["DSL", "Fiber optic", "No"];
const PAYMENT: [&str; 4] = [
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// `n` raw CSV-style rows. Short month-to-month customers churn.
pub(crate) fn raw_telco(n: usize) -> RecordSet {
    let rows = (0..n)
        .map(|i| {
            let contract = CONTRACTS[i % 4];
            let internet = INTERNET[i % 3];
            let phone = i % 5 != 0;
            let tenure = (i * 7) % 72 + 1;
            let monthly = 20.0 + ((i * 13) % 97) as f64 + i as f64 * 0.01;
            let churn = contract == "Month-to-month" && tenure < 24;
            let addon = |k: usize| {
                if internet == "No" {
                    "No internet service"
                } else {
                    yes_no((i + k) % 2 == 0)
                }
            };
            let cells = [
                format!("{i:04}-TEST"),
                (if i % 2 == 0 { "Female" } else { "Male" }).to_string(),
                (if i % 6 == 0 { "1" } else { "0" }).to_string(),
                yes_no(i % 3 == 0).to_string(),
                yes_no(i % 4 == 1).to_string(),
                tenure.to_string(),
                yes_no(phone).to_string(),
                (if phone { yes_no(i % 2 == 1) } else { "No phone service" }).to_string(),
                internet.to_string(),
                addon(0).to_string(),
                addon(1).to_string(),
                addon(2).to_string(),
                addon(3).to_string(),
                addon(4).to_string(),
                addon(5).to_string(),
                contract.to_string(),
                yes_no(i % 3 != 2).to_string(),
                PAYMENT[i % 4].to_string(),
                format!("{monthly:.2}"),
                format!("{:.2}", monthly * tenure as f64),
                yes_no(churn).to_string(),
            ];
            cells.into_iter().map(Value::Text).collect()
        })
        .collect();
    RecordSet::from_rows(COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
        .expect("fixture rows match the header")
}

/// Cleaned features and labels for `n` synthetic customers.
pub(crate) fn labelled_training_set(n: usize) -> (RecordSet, Vec<usize>) {
    let cleaned = clean_records(&raw_telco(n), &CleanOptions::training()).expect("fixture cleans");
    split_label(&cleaned).expect("fixture has labels")
}

/// One raw form record without identifier or label.
pub(crate) fn raw_customer() -> RecordSet {
    RecordSet::single([
        ("gender", Value::from("Female")),
        ("SeniorCitizen", Value::from(0.0)),
        ("Partner", Value::from("Yes")),
        ("Dependents", Value::from("No")),
        ("tenure", Value::from(1.0)),
        ("PhoneService", Value::from("No")),
        ("MultipleLines", Value::from("No phone service")),
        ("InternetService", Value::from("DSL")),
        ("OnlineSecurity", Value::from("No")),
        ("OnlineBackup", Value::from("Yes")),
        ("DeviceProtection", Value::from("No")),
        ("TechSupport", Value::from("No")),
        ("StreamingTV", Value::from("No")),
        ("StreamingMovies", Value::from("No")),
        ("Contract", Value::from("Month-to-month")),
        ("PaperlessBilling", Value::from("Yes")),
        ("PaymentMethod", Value::from("Electronic check")),
        ("MonthlyCharges", Value::from(29.85)),
        ("TotalCharges", Value::from(29.85)),
    ])
    .expect("fixture columns are unique")
}
