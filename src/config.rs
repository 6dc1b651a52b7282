//! Pipeline configuration.
//!
//! Defaults mirror the shipped layout (`data/dataset.csv`, `models/`); a
//! `.env` file or environment variables override them, and CLI flags override
//! both. Judgment-call knobs (the averaging threshold, the split ratio, the
//! seed) live here rather than as constants.

use std::path::PathBuf;

use crate::error::{ErrorKind, PipelineError};
use crate::models::ForestParams;

pub const ENV_DATASET: &str = "YIELDCAST_DATA";
pub const ENV_ARTIFACTS: &str = "YIELDCAST_ARTIFACTS";
pub const ENV_MIN_MATCH_ROWS: &str = "YIELDCAST_MIN_MATCH_ROWS";
pub const ENV_SEED: &str = "YIELDCAST_SEED";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Reference/training dataset location.
    pub dataset_path: PathBuf,
    /// Directory holding the paired model + contract artifacts.
    pub artifacts_dir: PathBuf,
    /// Fraction of rows held out for evaluation.
    pub test_ratio: f64,
    /// Seed for the split shuffle, the forest, and the completion cache.
    pub seed: u64,
    /// Minimum matching rows before dataset averages are trusted over
    /// synthetic generation.
    pub min_match_rows: usize,
    pub forest: ForestParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/dataset.csv"),
            artifacts_dir: PathBuf::from("models"),
            test_ratio: 0.2,
            seed: 42,
            min_match_rows: 3,
            forest: ForestParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Build a config from the environment (after loading `.env` if present).
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(path) = std::env::var(ENV_DATASET) {
            config.dataset_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var(ENV_ARTIFACTS) {
            config.artifacts_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var(ENV_MIN_MATCH_ROWS) {
            config.min_match_rows = raw.parse().map_err(|_| {
                PipelineError::new(
                    ErrorKind::InvalidConfig,
                    format!("Invalid {ENV_MIN_MATCH_ROWS} value '{raw}' (expected integer)."),
                )
            })?;
        }
        if let Ok(raw) = std::env::var(ENV_SEED) {
            config.seed = raw.parse().map_err(|_| {
                PipelineError::new(
                    ErrorKind::InvalidConfig,
                    format!("Invalid {ENV_SEED} value '{raw}' (expected integer)."),
                )
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.test_ratio.is_finite() && self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(PipelineError::new(
                ErrorKind::InvalidConfig,
                "Test ratio must be strictly between 0 and 1.",
            ));
        }
        if self.min_match_rows == 0 {
            return Err(PipelineError::new(
                ErrorKind::InvalidConfig,
                "Minimum matching rows must be >= 1.",
            ));
        }
        if self.forest.n_trees == 0 {
            return Err(PipelineError::new(
                ErrorKind::InvalidConfig,
                "Forest must have at least one tree.",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_match_rows, 3);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn invalid_ratio_and_threshold_are_rejected() {
        let mut config = PipelineConfig::default();
        config.test_ratio = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.min_match_rows = 0;
        assert!(config.validate().is_err());
    }
}
