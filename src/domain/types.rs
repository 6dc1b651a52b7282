//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during training and inference
//! - exported to JSON for artifacts and CLI output
//! - reloaded later without re-deriving schema details

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of historical-production months carried per installation.
pub const HIST_MONTHS: usize = 12;

/// Categorical columns, in the order their encoded counterparts appear in the
/// feature contract.
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["energy_type", "energy_subtype"];

/// Numeric installation/request columns, in feature-contract order.
///
/// `hist_month_1..12` follow these, then the `<col>_encoded` columns.
pub const NUMERIC_COLUMNS: [&str; 7] = [
    "installation_size_kw",
    "location_latitude",
    "location_longitude",
    "panel_age_months",
    "month",
    "investment_per_share_eur",
    "total_shares",
];

/// Regression target column.
pub const TARGET_COLUMN: &str = "kwh_per_share_per_month";

/// Name of the n-th historical-production column (1-based, `1..=12`).
pub fn hist_column(month: usize) -> String {
    format!("hist_month_{month}")
}

/// One normalized installation-month observation from the training dataset.
///
/// Historical production is always expanded to exactly [`HIST_MONTHS`] scalars
/// (index 0 → month 1) by ingest, regardless of how the CSV stored it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationRow {
    pub energy_type: String,
    pub energy_subtype: String,
    pub installation_size_kw: f64,
    pub location_latitude: f64,
    pub location_longitude: f64,
    pub panel_age_months: f64,
    pub month: f64,
    pub investment_per_share_eur: f64,
    pub total_shares: f64,
    pub hist: [f64; HIST_MONTHS],
    pub kwh_per_share_per_month: f64,
}

impl InstallationRow {
    /// Look up a numeric feature by its contract column name.
    ///
    /// Returns `None` for unknown names and for the categorical/target columns;
    /// callers default those to 0 the same way inference does.
    pub fn numeric_value(&self, column: &str) -> Option<f64> {
        match column {
            "installation_size_kw" => Some(self.installation_size_kw),
            "location_latitude" => Some(self.location_latitude),
            "location_longitude" => Some(self.location_longitude),
            "panel_age_months" => Some(self.panel_age_months),
            "month" => Some(self.month),
            "investment_per_share_eur" => Some(self.investment_per_share_eur),
            "total_shares" => Some(self.total_shares),
            _ => {
                let idx = column.strip_prefix("hist_month_")?.parse::<usize>().ok()?;
                if (1..=HIST_MONTHS).contains(&idx) {
                    Some(self.hist[idx - 1])
                } else {
                    None
                }
            }
        }
    }

    /// Categorical value by column name.
    pub fn categorical_value(&self, column: &str) -> Option<&str> {
        match column {
            "energy_type" => Some(&self.energy_type),
            "energy_subtype" => Some(&self.energy_subtype),
            _ => None,
        }
    }
}

/// A loosely-typed feature record, as assembled per prediction call.
///
/// Categorical values stay as strings until the encoding contract turns them
/// into `<col>_encoded` numerics; everything the model consumes ends up in
/// `numerics` keyed by contract column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub categoricals: BTreeMap<String, String>,
    pub numerics: BTreeMap<String, f64>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_categorical(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.categoricals.insert(column.into(), value.into());
    }

    pub fn set_numeric(&mut self, column: impl Into<String>, value: f64) {
        self.numerics.insert(column.into(), value);
    }

    pub fn numeric(&self, column: &str) -> Option<f64> {
        self.numerics.get(column).copied()
    }
}

/// A prediction request as received from the serving layer.
///
/// The first five fields are always present; the optional installation fields
/// override the completion-cache baseline when supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub energy_type: String,
    pub energy_subtype: String,
    pub month: u32,
    pub investment_per_share_eur: f64,
    pub total_shares: u32,
    #[serde(default)]
    pub installation_size_kw: Option<f64>,
    #[serde(default)]
    pub location_latitude: Option<f64>,
    #[serde(default)]
    pub location_longitude: Option<f64>,
    #[serde(default)]
    pub panel_age_months: Option<f64>,
}

/// Scalar model output for one feature record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub kwh_per_share_per_month: f64,
}

/// Request-level prediction result with derived totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub kwh_per_share_per_month: f64,
    pub total_kwh_per_month: f64,
    pub predicted_at: DateTime<Utc>,
}

/// Outputs of a completed training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub rows_read: usize,
    pub rows_used: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub r2: f64,
    pub rmse: f64,
    pub feature_order: Vec<String>,
    pub model_path: PathBuf,
    pub contract_path: PathBuf,
    pub trained_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> InstallationRow {
        InstallationRow {
            energy_type: "Solar".to_string(),
            energy_subtype: "Rooftop".to_string(),
            installation_size_kw: 250.0,
            location_latitude: 41.0,
            location_longitude: 2.1,
            panel_age_months: 24.0,
            month: 6.0,
            investment_per_share_eur: 10.0,
            total_shares: 100.0,
            hist: [100.0; HIST_MONTHS],
            kwh_per_share_per_month: 42.0,
        }
    }

    #[test]
    fn numeric_lookup_covers_all_contract_columns() {
        let r = row();
        for col in NUMERIC_COLUMNS {
            assert!(r.numeric_value(col).is_some(), "missing numeric {col}");
        }
        for m in 1..=HIST_MONTHS {
            assert_eq!(r.numeric_value(&hist_column(m)), Some(100.0));
        }
    }

    #[test]
    fn numeric_lookup_rejects_unknown_and_out_of_range() {
        let r = row();
        assert_eq!(r.numeric_value("energy_type"), None);
        assert_eq!(r.numeric_value("hist_month_0"), None);
        assert_eq!(r.numeric_value("hist_month_13"), None);
        assert_eq!(r.numeric_value("no_such_column"), None);
    }
}
