//! Paired artifact persistence.
//!
//! A trained model is only meaningful together with the encoding contract it
//! was fit against, so the two are written and read as one unit:
//!
//! - `forest.json` — the fitted ensemble
//! - `contract.json` — encoders + the exact feature order
//!
//! Both files embed the same pair token (hashed from the training timestamp
//! and the contract). A missing half or a token mismatch is reported as an
//! inconsistent pair, never silently misread.

use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::encode::EncodingContract;
use crate::error::{ErrorKind, PipelineError};
use crate::models::ForestRegressor;

const MODEL_FILE: &str = "forest.json";
const CONTRACT_FILE: &str = "contract.json";

#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    pair_token: String,
    trained_at: DateTime<Utc>,
    forest: ForestRegressor,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContractArtifact {
    pair_token: String,
    trained_at: DateTime<Utc>,
    contract: EncodingContract,
}

/// Fixed, paired artifact locations under one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn contract_path(&self) -> PathBuf {
        self.dir.join(CONTRACT_FILE)
    }

    /// Both halves of the pair are present on disk.
    pub fn is_complete(&self) -> bool {
        self.model_path().exists() && self.contract_path().exists()
    }

    /// Persist a matched model/contract pair.
    pub fn save_pair(
        &self,
        forest: &ForestRegressor,
        contract: &EncodingContract,
        trained_at: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            PipelineError::new(
                ErrorKind::Io,
                format!("Failed to create artifact dir '{}': {e}", self.dir.display()),
            )
        })?;

        let pair_token = pair_token(contract, trained_at);

        let model = ModelArtifact {
            pair_token: pair_token.clone(),
            trained_at,
            forest: forest.clone(),
        };
        write_json(&self.model_path(), &model)?;

        let contract = ContractArtifact {
            pair_token,
            trained_at,
            contract: contract.clone(),
        };
        write_json(&self.contract_path(), &contract)?;

        Ok(())
    }

    /// Load the pair, verifying that both halves exist and belong together.
    pub fn load_pair(&self) -> Result<(ForestRegressor, EncodingContract), PipelineError> {
        let model_path = self.model_path();
        let contract_path = self.contract_path();

        match (model_path.exists(), contract_path.exists()) {
            (false, false) => {
                return Err(PipelineError::new(
                    ErrorKind::ArtifactMissing,
                    format!(
                        "No trained artifacts under '{}'; run training first.",
                        self.dir.display()
                    ),
                ));
            }
            (true, false) | (false, true) => {
                return Err(PipelineError::new(
                    ErrorKind::ArtifactInconsistent,
                    format!(
                        "Partial artifact pair under '{}': model and contract must exist together.",
                        self.dir.display()
                    ),
                ));
            }
            (true, true) => {}
        }

        let model: ModelArtifact = read_json(&model_path)?;
        let contract: ContractArtifact = read_json(&contract_path)?;

        if model.pair_token != contract.pair_token || model.trained_at != contract.trained_at {
            return Err(PipelineError::new(
                ErrorKind::ArtifactInconsistent,
                format!(
                    "Artifact pair under '{}' is from different training runs (model {}, contract {}).",
                    self.dir.display(),
                    model.pair_token,
                    contract.pair_token
                ),
            ));
        }

        Ok((model.forest, contract.contract))
    }
}

fn pair_token(contract: &EncodingContract, trained_at: DateTime<Utc>) -> String {
    let mut hasher = DefaultHasher::new();
    trained_at.timestamp_micros().hash(&mut hasher);
    for column in &contract.feature_order {
        column.hash(&mut hasher);
    }
    for (column, encoder) in &contract.encoders {
        column.hash(&mut hasher);
        for class in encoder.classes() {
            class.hash(&mut hasher);
        }
    }
    format!("{:016x}", hasher.finish())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let file = File::create(path).map_err(|e| {
        PipelineError::new(
            ErrorKind::Io,
            format!("Failed to create artifact '{}': {e}", path.display()),
        )
    })?;
    serde_json::to_writer(file, value).map_err(|e| {
        PipelineError::new(
            ErrorKind::Io,
            format!("Failed to write artifact '{}': {e}", path.display()),
        )
    })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, PipelineError> {
    let file = File::open(path).map_err(|e| {
        PipelineError::new(
            ErrorKind::Io,
            format!("Failed to open artifact '{}': {e}", path.display()),
        )
    })?;
    serde_json::from_reader(file).map_err(|e| {
        PipelineError::new(
            ErrorKind::Io,
            format!("Invalid artifact JSON '{}': {e}", path.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::LabelEncoder;
    use crate::models::ForestParams;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn tiny_pair() -> (ForestRegressor, EncodingContract) {
        let rows = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 1.0], vec![3.0, 0.0]];
        let targets = vec![0.0, 1.0, 2.0, 3.0];
        let params = ForestParams {
            n_trees: 5,
            ..ForestParams::default()
        };
        let forest = ForestRegressor::fit(&rows, &targets, params).unwrap();

        let mut encoders = BTreeMap::new();
        encoders.insert("energy_type".to_string(), LabelEncoder::fit(["Solar", "Wind"]));
        let contract = EncodingContract {
            encoders,
            feature_order: vec!["month".to_string(), "energy_type_encoded".to_string()],
        };
        (forest, contract)
    }

    fn temp_store(name: &str) -> ArtifactStore {
        let dir = std::env::temp_dir().join(name);
        std::fs::remove_dir_all(&dir).ok();
        ArtifactStore::new(dir)
    }

    fn stamp(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    #[test]
    fn pair_round_trips() {
        let (forest, contract) = tiny_pair();
        let store = temp_store("yieldcast_artifacts_roundtrip");
        store.save_pair(&forest, &contract, stamp(1_700_000_000)).unwrap();
        assert!(store.is_complete());

        let (loaded_forest, loaded_contract) = store.load_pair().unwrap();
        assert_eq!(loaded_forest, forest);
        assert_eq!(loaded_contract, contract);
    }

    #[test]
    fn empty_dir_is_artifact_missing() {
        let store = temp_store("yieldcast_artifacts_missing");
        let err = store.load_pair().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactMissing);
    }

    #[test]
    fn half_a_pair_is_inconsistent() {
        let (forest, contract) = tiny_pair();
        let store = temp_store("yieldcast_artifacts_half");
        store.save_pair(&forest, &contract, stamp(1_700_000_000)).unwrap();
        std::fs::remove_file(store.contract_path()).unwrap();

        let err = store.load_pair().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactInconsistent);
    }

    #[test]
    fn mixed_generations_are_inconsistent() {
        let (forest, contract) = tiny_pair();
        let store_a = temp_store("yieldcast_artifacts_gen_a");
        let store_b = temp_store("yieldcast_artifacts_gen_b");
        store_a.save_pair(&forest, &contract, stamp(1_700_000_000)).unwrap();
        store_b.save_pair(&forest, &contract, stamp(1_800_000_000)).unwrap();

        // Simulate a partial redeploy: contract from a different run.
        std::fs::copy(store_b.contract_path(), store_a.contract_path()).unwrap();
        let err = store_a.load_pair().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactInconsistent);
    }
}
