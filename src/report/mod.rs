//! Terminal output formatting.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized

use crate::domain::{PredictionRequest, PredictionSummary, TrainingReport};

/// Format the training run summary.
pub fn format_training_summary(report: &TrainingReport) -> String {
    let mut out = String::new();

    out.push_str("=== yieldcast - training summary ===\n");
    out.push_str(&format!(
        "Rows: {} read, {} used ({} train / {} test)\n",
        report.rows_read, report.rows_used, report.train_rows, report.test_rows
    ));
    out.push_str(&format!("R2:   {:.4}\n", report.r2));
    out.push_str(&format!("RMSE: {:.4}\n", report.rmse));
    out.push_str(&format!("Features: {}\n", report.feature_order.len()));
    out.push_str(&format!("Model:    {}\n", report.model_path.display()));
    out.push_str(&format!("Contract: {}\n", report.contract_path.display()));
    out.push_str(&format!("Trained:  {}\n", report.trained_at.to_rfc3339()));
    out
}

/// Format a prediction result for the terminal.
pub fn format_prediction(request: &PredictionRequest, summary: &PredictionSummary) -> String {
    let mut out = String::new();

    out.push_str("=== yieldcast - prediction ===\n");
    out.push_str(&format!(
        "Installation: {} / {} (month {})\n",
        request.energy_type, request.energy_subtype, request.month
    ));
    out.push_str(&format!(
        "Yield per share: {:.4} kWh/month\n",
        summary.kwh_per_share_per_month
    ));
    out.push_str(&format!(
        "Total ({} shares): {:.2} kWh/month\n",
        request.total_shares, summary.total_kwh_per_month
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;
    use std::path::PathBuf;

    #[test]
    fn training_summary_mentions_metrics_and_paths() {
        let report = TrainingReport {
            rows_read: 100,
            rows_used: 98,
            train_rows: 78,
            test_rows: 20,
            r2: 0.9123,
            rmse: 1.5,
            feature_order: vec!["month".to_string()],
            model_path: PathBuf::from("models/forest.json"),
            contract_path: PathBuf::from("models/contract.json"),
            trained_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        let text = format_training_summary(&report);
        assert!(text.contains("0.9123"));
        assert!(text.contains("78 train / 20 test"));
        assert!(text.contains("models/forest.json"));
    }

    #[test]
    fn prediction_output_includes_totals() {
        let request = PredictionRequest {
            energy_type: "Solar".to_string(),
            energy_subtype: "Rooftop".to_string(),
            month: 6,
            investment_per_share_eur: 10.0,
            total_shares: 100,
            installation_size_kw: None,
            location_latitude: None,
            location_longitude: None,
            panel_age_months: None,
        };
        let summary = PredictionSummary {
            kwh_per_share_per_month: 12.5,
            total_kwh_per_month: 1250.0,
            predicted_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        let text = format_prediction(&request, &summary);
        assert!(text.contains("12.5000"));
        assert!(text.contains("1250.00"));
        assert!(text.contains("Solar / Rooftop"));
    }
}
