//! Request-level orchestration.
//!
//! [`YieldService`] is built once at process start and handed to request
//! handlers by reference: it owns the loaded predictor and the completion
//! cache as plain fields, so there is no lazy first-request loading and no
//! module-level mutable state. Reloading artifacts means rebuilding the
//! service (an explicit redeploy), never a mid-request swap.

use chrono::Utc;

use crate::config::PipelineConfig;
use crate::data::Dataset;
use crate::domain::{FeatureRecord, PredictionRequest, PredictionSummary};
use crate::error::PipelineError;
use crate::infer::Predictor;
use crate::io::ArtifactStore;
use crate::lookup::CompletionCache;

pub struct YieldService {
    predictor: Predictor,
    cache: CompletionCache,
}

impl YieldService {
    /// Build the service at startup: load artifacts, attach the reference
    /// dataset (optional; the cache synthesizes without it).
    pub fn initialize(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let store = ArtifactStore::new(&config.artifacts_dir);
        let predictor = Predictor::load(&store)?;
        let dataset = Dataset::load(&config.dataset_path).ok();
        let cache = CompletionCache::new(dataset, config.min_match_rows, config.seed);
        Ok(Self::from_parts(predictor, cache))
    }

    pub fn from_parts(predictor: Predictor, cache: CompletionCache) -> Self {
        Self { predictor, cache }
    }

    /// Whether a service could initialize against this config right now.
    ///
    /// This is the pre-flight readiness probe; a constructed service is
    /// ready by definition.
    pub fn artifacts_ready(config: &PipelineConfig) -> bool {
        ArtifactStore::new(&config.artifacts_dir).is_complete()
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn cache(&self) -> &CompletionCache {
        &self.cache
    }

    /// Complete the request, overlay explicit fields, and predict.
    pub fn predict_request(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionSummary, PipelineError> {
        let mut record = self.cache.complete(
            &request.energy_type,
            &request.energy_subtype,
            request.month,
            request.investment_per_share_eur,
            request.total_shares,
        );
        overlay_request(&mut record, request);

        let outcome = self.predictor.predict(&record)?;
        Ok(PredictionSummary {
            kwh_per_share_per_month: outcome.kwh_per_share_per_month,
            total_kwh_per_month: outcome.kwh_per_share_per_month * f64::from(request.total_shares),
            predicted_at: Utc::now(),
        })
    }
}

/// Explicitly-supplied installation fields win over the cache baseline.
fn overlay_request(record: &mut FeatureRecord, request: &PredictionRequest) {
    if let Some(v) = request.installation_size_kw {
        record.set_numeric("installation_size_kw", v);
    }
    if let Some(v) = request.location_latitude {
        record.set_numeric("location_latitude", v);
    }
    if let Some(v) = request.location_longitude {
        record.set_numeric("location_longitude", v);
    }
    if let Some(v) = request.panel_age_months {
        record.set_numeric("panel_age_months", v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synth::{SynthConfig, generate_dataset};
    use crate::domain::TARGET_COLUMN;
    use crate::encode::{EncodingContract, LabelEncoder, canonical_feature_order};
    use crate::models::{ForestParams, ForestRegressor};
    use std::collections::BTreeMap;

    /// Train a small in-memory service from the synthetic dataset.
    fn service() -> YieldService {
        let dataset = generate_dataset(&SynthConfig { rows: 50, seed: 11 }).unwrap();

        let mut encoders = BTreeMap::new();
        for column in crate::domain::CATEGORICAL_COLUMNS {
            encoders.insert(
                column.to_string(),
                LabelEncoder::fit(
                    dataset
                        .rows()
                        .iter()
                        .filter_map(|r| r.categorical_value(column)),
                ),
            );
        }
        let contract = EncodingContract {
            encoders,
            feature_order: canonical_feature_order(),
        };

        let mut x = Vec::new();
        let mut y = Vec::new();
        for row in dataset.rows() {
            let mut record = FeatureRecord::new();
            for column in crate::domain::CATEGORICAL_COLUMNS {
                record.set_categorical(column, row.categorical_value(column).unwrap());
            }
            for column in &contract.feature_order {
                if let Some(value) = row.numeric_value(column) {
                    record.set_numeric(column.clone(), value);
                }
            }
            contract.encode_into(&mut record);
            x.push(contract.feature_vector(&record));
            y.push(row.kwh_per_share_per_month);
        }

        let params = ForestParams {
            n_trees: 20,
            ..ForestParams::default()
        };
        let forest = ForestRegressor::fit(&x, &y, params).unwrap();
        let predictor = Predictor::from_parts(forest, contract).unwrap();
        let cache = CompletionCache::new(Some(dataset), 3, 42);
        YieldService::from_parts(predictor, cache)
    }

    fn request() -> PredictionRequest {
        PredictionRequest {
            energy_type: "Solar".to_string(),
            energy_subtype: "Rooftop".to_string(),
            month: 6,
            investment_per_share_eur: 10.0,
            total_shares: 100,
            installation_size_kw: None,
            location_latitude: None,
            location_longitude: None,
            panel_age_months: None,
        }
    }

    #[test]
    fn partial_request_round_trips_to_a_finite_prediction() {
        let svc = service();
        let summary = svc.predict_request(&request()).unwrap();
        assert!(summary.kwh_per_share_per_month.is_finite());
        assert!(
            (summary.total_kwh_per_month - summary.kwh_per_share_per_month * 100.0).abs() < 1e-9
        );
    }

    #[test]
    fn unknown_type_and_subtype_still_predict() {
        let svc = service();
        let mut req = request();
        req.energy_type = "Tidal".to_string();
        req.energy_subtype = "Barrage".to_string();
        let summary = svc.predict_request(&req).unwrap();
        assert!(summary.kwh_per_share_per_month.is_finite());
    }

    #[test]
    fn explicit_fields_override_the_baseline() {
        let svc = service();
        let mut req = request();
        req.installation_size_kw = Some(123.0);
        req.location_latitude = Some(37.5);

        let mut record = svc.cache.complete(
            &req.energy_type,
            &req.energy_subtype,
            req.month,
            req.investment_per_share_eur,
            req.total_shares,
        );
        overlay_request(&mut record, &req);
        assert_eq!(record.numeric("installation_size_kw"), Some(123.0));
        assert_eq!(record.numeric("location_latitude"), Some(37.5));
        // The target column never leaks into the request record.
        assert!(record.numeric(TARGET_COLUMN).is_none());
    }
}
