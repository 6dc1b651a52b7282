//! Inference pipeline.
//!
//! A [`Predictor`] wraps the persisted artifact pair, loaded once at startup
//! and read-only afterwards. Per call it normalizes field names, replays the
//! encoding contract (sentinel code for unseen categories, 0 for absent
//! features), reindexes to the persisted feature order, and runs the forest.
//! Sparse input degrades; it never aborts a prediction.

use tracing::warn;

use crate::domain::{FeatureRecord, HIST_MONTHS, PredictionOutcome, hist_column};
use crate::encode::EncodingContract;
use crate::error::{ErrorKind, PipelineError};
use crate::io::ArtifactStore;
use crate::models::ForestRegressor;

#[derive(Debug)]
pub struct Predictor {
    forest: ForestRegressor,
    contract: EncodingContract,
}

impl Predictor {
    /// Load the artifact pair from its fixed locations.
    pub fn load(store: &ArtifactStore) -> Result<Self, PipelineError> {
        let (forest, contract) = store.load_pair()?;
        Self::from_parts(forest, contract)
    }

    /// Assemble a predictor, verifying model width against the contract.
    pub fn from_parts(
        forest: ForestRegressor,
        contract: EncodingContract,
    ) -> Result<Self, PipelineError> {
        if forest.n_features() != contract.feature_order.len() {
            return Err(PipelineError::new(
                ErrorKind::ArtifactInconsistent,
                format!(
                    "Model expects {} features but the contract lists {}.",
                    forest.n_features(),
                    contract.feature_order.len()
                ),
            ));
        }
        Ok(Self { forest, contract })
    }

    pub fn contract(&self) -> &EncodingContract {
        &self.contract
    }

    /// Predict the monthly per-share yield for one feature record.
    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionOutcome, PipelineError> {
        let mut record = record.clone();
        normalize_hist_keys(&mut record);

        let fallbacks = self.contract.encode_into(&mut record);
        if fallbacks > 0 {
            warn!(fallbacks, "unseen categorical value; substituted sentinel code");
        }

        let features = self.contract.feature_vector(&record);
        let value = self.forest.predict_row(&features)?;
        Ok(PredictionOutcome {
            kwh_per_share_per_month: value,
        })
    }
}

/// Rename externally-conventioned historical fields
/// (`historical_production_kwh_N`) to the internal `hist_month_N` names used
/// at training time. An existing internal name wins over the alias.
fn normalize_hist_keys(record: &mut FeatureRecord) {
    for m in 1..=HIST_MONTHS {
        let alias = format!("historical_production_kwh_{m}");
        if let Some(value) = record.numerics.remove(&alias) {
            record.numerics.entry(hist_column(m)).or_insert(value);
        }
    }
}
