//! Deterministic synthetic Telco-style customers shared by tests and benches.

use churn_prep::{RecordSet, Value};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const COLUMNS: [&str; 21] = [
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

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const INTERNET: [&str; 3] = ["DSL", "Fiber optic", "No"];
const PAYMENT: [&str; 4] = [
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

/// `n` raw customers as all-text cells, the way the CSV reader yields them.
///
/// Churn follows contract, tenure, and fiber service, with 5% of labels
/// flipped. One in fifty customers has a blank `TotalCharges`.
pub fn raw_customers(n: usize, seed: u64) -> RecordSet {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n);
    for i in 0..n {
        let contract = *CONTRACTS.choose(&mut rng).unwrap_or(&CONTRACTS[0]);
        let internet = *INTERNET.choose(&mut rng).unwrap_or(&INTERNET[0]);
        let phone = rng.gen_bool(0.9);
        let tenure: u32 = rng.gen_range(0..=72);
        let monthly: f64 = match internet {
            "Fiber optic" => rng.gen_range(70.0..110.0),
            "DSL" => rng.gen_range(40.0..70.0),
            _ => rng.gen_range(18.0..30.0),
        };
        let risk = match contract {
            "Month-to-month" => 0.55,
            "One year" => 0.15,
            _ => 0.03,
        } + if internet == "Fiber optic" { 0.2 } else { 0.0 }
            - (f64::from(tenure) / 72.0) * 0.4;
        let mut churn = risk > 0.35;
        if rng.gen_bool(0.05) {
            churn = !churn;
        }
        let addon = |rng: &mut ChaCha8Rng| {
            if internet == "No" {
                "No internet service".to_string()
            } else {
                yes_no(rng.gen_bool(0.4))
            }
        };
        let total = if i % 50 == 7 {
            " ".to_string()
        } else {
            format!("{:.2}", monthly * f64::from(tenure))
        };
        rows.push(
            [
                format!("{i:05}-SYNTH"),
                (if rng.gen_bool(0.5) { "Female" } else { "Male" }).to_string(),
                (if rng.gen_bool(0.16) { "1" } else { "0" }).to_string(),
                yes_no(rng.gen_bool(0.5)),
                yes_no(rng.gen_bool(0.3)),
                tenure.to_string(),
                yes_no(phone),
                if phone {
                    yes_no(rng.gen_bool(0.4))
                } else {
                    "No phone service".to_string()
                },
                internet.to_string(),
                addon(&mut rng),
                addon(&mut rng),
                addon(&mut rng),
                addon(&mut rng),
                addon(&mut rng),
                addon(&mut rng),
                contract.to_string(),
                yes_no(rng.gen_bool(0.6)),
                PAYMENT[rng.gen_range(0..PAYMENT.len())].to_string(),
                format!("{monthly:.2}"),
                total,
                yes_no(churn),
            ]
            .into_iter()
            .map(Value::Text)
            .collect(),
        );
    }
    RecordSet::from_rows(COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
        .expect("generated rows match the header")
}
