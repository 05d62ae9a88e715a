//! Explicit, versioned declaration of the customer-record columns.
//!
//! Every raw column is listed with its kind and closed vocabulary, so that
//! schema drift fails loudly at cleaning time instead of being silently
//! mis-encoded.

/// Version of the column schema. Stored in model artifacts and checked on load.
pub const SCHEMA_VERSION: u32 = 1;

/// Customer identifier column.
pub const CUSTOMER_ID: &str = "customerID";
/// Churn label column.
pub const CHURN: &str = "Churn";
/// Months the customer has held the service.
pub const TENURE: &str = "tenure";
/// Current monthly charge.
pub const MONTHLY_CHARGES: &str = "MonthlyCharges";
/// Lifetime charge.
pub const TOTAL_CHARGES: &str = "TotalCharges";
/// Gender column.
pub const GENDER: &str = "gender";
/// Multiple phone lines column.
pub const MULTIPLE_LINES: &str = "MultipleLines";
/// Internet service type.
pub const INTERNET_SERVICE: &str = "InternetService";
/// Contract length.
pub const CONTRACT: &str = "Contract";
/// Payment method.
pub const PAYMENT_METHOD: &str = "PaymentMethod";

/// Derived: `TotalCharges / (tenure + 1)`.
pub const AVG_MONTHLY_SPENT: &str = "AvgMonthlySpent";
/// Derived: `MonthlyCharges / (TotalCharges + 1)`.
pub const SPENDING_INTENSITY: &str = "spending_intensity";
/// Derived: count of subscribed add-on services.
pub const NUM_SERVICES: &str = "num_services";
/// Derived: tenure bucket label.
pub const TENURE_BIN: &str = "tenure_bin";

/// Sentinel collapsed to `No` in the internet add-on columns.
pub const NO_INTERNET_SERVICE: &str = "No internet service";
/// Sentinel collapsed to `No` in `MultipleLines`.
pub const NO_PHONE_SERVICE: &str = "No phone service";

/// The six optional internet add-on services.
pub const ADDON_SERVICES: [&str; 6] = [
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
];

/// Raw columns coerced to floating point.
pub const NUMERIC_COLUMNS: [&str; 3] = [TENURE, MONTHLY_CHARGES, TOTAL_CHARGES];

/// Contract categories in rank order.
pub const CONTRACT_ORDER: [&str; 3] = ["Month-to-month", "One year", "Two year"];

/// Internet service categories.
pub const INTERNET_SERVICE_VALUES: [&str; 3] = ["DSL", "Fiber optic", "No"];

/// Payment method categories.
pub const PAYMENT_METHOD_VALUES: [&str; 4] = [
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];

/// How a column is typed and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Opaque row identifier; never a feature.
    Identifier,
    /// `Male` → 0, `Female` → 1.
    Gender,
    /// Already numeric 0/1 flag.
    Flag,
    /// `Yes` → 1, `No` → 0, with an optional sentinel that collapses to `No`.
    YesNo {
        /// Sentinel value normalized to `No` before encoding.
        sentinel: Option<&'static str>,
    },
    /// Continuous value coerced to f64.
    Numeric,
    /// Closed categorical vocabulary, encoded later by the column transformer.
    Categorical {
        /// Allowed values.
        allowed: &'static [&'static str],
    },
    /// Training label, `Yes` → 1, `No` → 0.
    Label,
}

/// A declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name as it appears in the CSV header.
    pub name: &'static str,
    /// Column kind.
    pub kind: ColumnKind,
}

const fn yes_no(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::YesNo { sentinel: None },
    }
}

const fn addon(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::YesNo {
            sentinel: Some(NO_INTERNET_SERVICE),
        },
    }
}

/// The raw Telco customer-record schema, in CSV column order.
pub const TELCO_SCHEMA: [ColumnSpec; 21] = [
    ColumnSpec { name: CUSTOMER_ID, kind: ColumnKind::Identifier },
    ColumnSpec { name: GENDER, kind: ColumnKind::Gender },
    ColumnSpec { name: "SeniorCitizen", kind: ColumnKind::Flag },
    yes_no("Partner"),
    yes_no("Dependents"),
    ColumnSpec { name: TENURE, kind: ColumnKind::Numeric },
    yes_no("PhoneService"),
    ColumnSpec {
        name: MULTIPLE_LINES,
        kind: ColumnKind::YesNo { sentinel: Some(NO_PHONE_SERVICE) },
    },
    ColumnSpec {
        name: INTERNET_SERVICE,
        kind: ColumnKind::Categorical { allowed: &INTERNET_SERVICE_VALUES },
    },
    addon("OnlineSecurity"),
    addon("OnlineBackup"),
    addon("DeviceProtection"),
    addon("TechSupport"),
    addon("StreamingTV"),
    addon("StreamingMovies"),
    ColumnSpec {
        name: CONTRACT,
        kind: ColumnKind::Categorical { allowed: &CONTRACT_ORDER },
    },
    yes_no("PaperlessBilling"),
    ColumnSpec {
        name: PAYMENT_METHOD,
        kind: ColumnKind::Categorical { allowed: &PAYMENT_METHOD_VALUES },
    },
    ColumnSpec { name: MONTHLY_CHARGES, kind: ColumnKind::Numeric },
    ColumnSpec { name: TOTAL_CHARGES, kind: ColumnKind::Numeric },
    ColumnSpec { name: CHURN, kind: ColumnKind::Label },
];

/// Look up a column declaration by name.
#[must_use]
pub fn column_spec(name: &str) -> Option<&'static ColumnSpec> {
    TELCO_SCHEMA.iter().find(|c| c.name == name)
}

/// Iterate over the declared Yes/No columns.
pub fn yes_no_columns() -> impl Iterator<Item = &'static ColumnSpec> {
    TELCO_SCHEMA
        .iter()
        .filter(|c| matches!(c.kind, ColumnKind::YesNo { .. }))
}
