//! Training pipeline.
//!
//! One entry point, [`run_training_pipeline`], drives the full run:
//! ingest → split → encode → fit → evaluate → persist. Every failure is
//! surfaced as a structured [`PipelineError`]; nothing panics past this
//! boundary, and callers branch on the result, not on logs.
//!
//! The encoding rules here define the contract inference replays:
//! encoders are fit on the train split only, and the persisted feature
//! order is the literal column order of the training matrix.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::data::Dataset;
use crate::domain::{CATEGORICAL_COLUMNS, FeatureRecord, HIST_MONTHS, InstallationRow, NUMERIC_COLUMNS, TrainingReport, hist_column};
use crate::encode::{EncodingContract, LabelEncoder, canonical_feature_order};
use crate::error::PipelineError;
use crate::io::ArtifactStore;
use crate::math::{r2_score, rmse};
use crate::models::ForestRegressor;

/// Train, evaluate, and persist the model/contract pair.
///
/// `dataset_path` overrides the configured dataset location when given.
pub fn run_training_pipeline(
    config: &PipelineConfig,
    dataset_path: Option<&Path>,
) -> Result<TrainingReport, PipelineError> {
    config.validate()?;
    let path = dataset_path.unwrap_or(&config.dataset_path);
    info!(path = %path.display(), "starting training pipeline");

    let dataset = Dataset::load(path)?;
    if !dataset.row_errors.is_empty() {
        warn!(
            rejected = dataset.row_errors.len(),
            used = dataset.len(),
            "some dataset rows were rejected during ingest"
        );
    }

    let (train_rows, test_rows) = split_rows(dataset.rows(), config.test_ratio, config.seed);
    info!(train = train_rows.len(), test = test_rows.len(), "split dataset");

    // Encoders see the train split only; test-split categories unseen there
    // degrade to the sentinel code during matrix assembly.
    let mut encoders = BTreeMap::new();
    for column in CATEGORICAL_COLUMNS {
        let encoder = LabelEncoder::fit(
            train_rows
                .iter()
                .filter_map(|row| row.categorical_value(column)),
        );
        encoders.insert(column.to_string(), encoder);
    }
    let contract = EncodingContract {
        encoders,
        feature_order: canonical_feature_order(),
    };

    let (x_train, y_train, _) = design_matrix(&train_rows, &contract);
    let (x_test, y_test, test_fallbacks) = design_matrix(&test_rows, &contract);
    if test_fallbacks > 0 {
        warn!(
            fallbacks = test_fallbacks,
            "test-split categories unseen in train; substituted sentinel code"
        );
    }

    let mut forest_params = config.forest;
    forest_params.seed = config.seed;
    let forest = ForestRegressor::fit(&x_train, &y_train, forest_params)?;

    let predicted = forest.predict(&x_test)?;
    let r2 = r2_score(&y_test, &predicted);
    let test_rmse = rmse(&y_test, &predicted);
    if test_rows.is_empty() {
        warn!("test split is empty; evaluation metrics are degenerate");
    }
    info!(r2, rmse = test_rmse, "model evaluation");

    let trained_at = Utc::now();
    let store = ArtifactStore::new(&config.artifacts_dir);
    store.save_pair(&forest, &contract, trained_at)?;
    info!(
        model = %store.model_path().display(),
        contract = %store.contract_path().display(),
        "persisted artifact pair"
    );

    Ok(TrainingReport {
        rows_read: dataset.rows_read,
        rows_used: dataset.len(),
        train_rows: train_rows.len(),
        test_rows: test_rows.len(),
        r2,
        rmse: test_rmse,
        feature_order: contract.feature_order,
        model_path: store.model_path(),
        contract_path: store.contract_path(),
        trained_at,
    })
}

/// Deterministic shuffle-split. At least one row always stays in train.
fn split_rows(
    rows: &[InstallationRow],
    test_ratio: f64,
    seed: u64,
) -> (Vec<InstallationRow>, Vec<InstallationRow>) {
    let n = rows.len();
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_len = ((n as f64 * test_ratio).round() as usize).min(n.saturating_sub(1));
    let (test_idx, train_idx) = indices.split_at(test_len);

    let train = train_idx.iter().map(|&i| rows[i].clone()).collect();
    let test = test_idx.iter().map(|&i| rows[i].clone()).collect();
    (train, test)
}

/// Assemble the dense training matrix in contract order.
///
/// Returns `(rows, targets, sentinel substitutions)`. This goes through the
/// same [`EncodingContract`] methods inference uses, so the matrix layout and
/// the prediction-time layout cannot drift apart.
fn design_matrix(
    rows: &[InstallationRow],
    contract: &EncodingContract,
) -> (Vec<Vec<f64>>, Vec<f64>, usize) {
    let mut x = Vec::with_capacity(rows.len());
    let mut y = Vec::with_capacity(rows.len());
    let mut fallbacks = 0;

    for row in rows {
        let mut record = feature_record_from_row(row);
        fallbacks += contract.encode_into(&mut record);
        x.push(contract.feature_vector(&record));
        y.push(row.kwh_per_share_per_month);
    }
    (x, y, fallbacks)
}

fn feature_record_from_row(row: &InstallationRow) -> FeatureRecord {
    let mut record = FeatureRecord::new();
    for column in CATEGORICAL_COLUMNS {
        if let Some(value) = row.categorical_value(column) {
            record.set_categorical(column, value);
        }
    }
    for column in NUMERIC_COLUMNS {
        if let Some(value) = row.numeric_value(column) {
            record.set_numeric(column, value);
        }
    }
    for m in 1..=HIST_MONTHS {
        record.set_numeric(hist_column(m), row.hist[m - 1]);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synth::{SynthConfig, generate_dataset, write_dataset_csv};
    use crate::error::ErrorKind;
    use crate::infer::Predictor;

    fn temp_config(name: &str) -> PipelineConfig {
        let base = std::env::temp_dir().join(name);
        std::fs::remove_dir_all(&base).ok();
        std::fs::create_dir_all(&base).unwrap();
        PipelineConfig {
            dataset_path: base.join("dataset.csv"),
            artifacts_dir: base.join("models"),
            ..PipelineConfig::default()
        }
    }

    fn write_demo_dataset(config: &PipelineConfig, rows: usize) {
        let dataset = generate_dataset(&SynthConfig { rows, seed: 11 }).unwrap();
        write_dataset_csv(&config.dataset_path, &dataset).unwrap();
    }

    #[test]
    fn missing_dataset_is_data_not_found() {
        let config = temp_config("yieldcast_train_missing");
        let err = run_training_pipeline(&config, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataNotFound);
    }

    #[test]
    fn training_round_trip_predicts_seen_rows() {
        let mut config = temp_config("yieldcast_train_roundtrip");
        config.forest.n_trees = 20;
        write_demo_dataset(&config, 50);

        let report = run_training_pipeline(&config, None).unwrap();
        assert_eq!(report.rows_used, 50);
        assert_eq!(report.train_rows + report.test_rows, 50);
        assert!(report.r2.is_finite());
        assert!(report.rmse.is_finite() && report.rmse >= 0.0);
        assert_eq!(report.feature_order, canonical_feature_order());

        // Predict one of the training rows: categories are seen, so no
        // sentinel fallback fires and the prediction is finite.
        let predictor = Predictor::load(&ArtifactStore::new(&config.artifacts_dir)).unwrap();
        let dataset = Dataset::load(&config.dataset_path).unwrap();
        let (train_rows, _) = split_rows(dataset.rows(), config.test_ratio, config.seed);
        let record = feature_record_from_row(&train_rows[0]);

        let mut probe = record.clone();
        assert_eq!(predictor.contract().encode_into(&mut probe), 0);

        let outcome = predictor.predict(&record).unwrap();
        assert!(outcome.kwh_per_share_per_month.is_finite());
    }

    #[test]
    fn persisted_feature_order_matches_prediction_time_order() {
        let mut config = temp_config("yieldcast_train_order");
        config.forest.n_trees = 10;
        write_demo_dataset(&config, 30);

        let report = run_training_pipeline(&config, None).unwrap();
        let (_, contract) = ArtifactStore::new(&config.artifacts_dir).load_pair().unwrap();
        assert_eq!(contract.feature_order, report.feature_order);
    }

    #[test]
    fn split_is_deterministic_and_keeps_train_nonempty() {
        let dataset = generate_dataset(&SynthConfig { rows: 10, seed: 5 }).unwrap();
        let (train_a, test_a) = split_rows(dataset.rows(), 0.2, 42);
        let (train_b, test_b) = split_rows(dataset.rows(), 0.2, 42);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 2);

        let (train, test) = split_rows(&dataset.rows()[..1], 0.9, 42);
        assert_eq!(train.len(), 1);
        assert!(test.is_empty());
    }
}
