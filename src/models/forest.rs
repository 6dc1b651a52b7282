//! Bootstrap-aggregated forest regressor.
//!
//! Each tree is grown on a bootstrap resample of the training rows with its
//! own RNG seeded from `params.seed + tree index`, so the fitted ensemble is
//! identical run-to-run regardless of how rayon schedules the tree builds.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError};
use crate::models::tree::{RegressionTree, TreeParams};

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` considers all.
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: Some(12),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestRegressor {
    params: ForestParams,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl ForestRegressor {
    /// Fit the forest on a dense row-major feature matrix.
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        params: ForestParams,
    ) -> Result<Self, PipelineError> {
        if rows.is_empty() {
            return Err(PipelineError::new(
                ErrorKind::Dataset,
                "No rows to fit the forest on.",
            ));
        }
        if rows.len() != targets.len() {
            return Err(PipelineError::new(
                ErrorKind::Dataset,
                format!(
                    "Feature/target length mismatch: {} rows vs {} targets.",
                    rows.len(),
                    targets.len()
                ),
            ));
        }
        let n_features = rows[0].len();
        if n_features == 0 {
            return Err(PipelineError::new(
                ErrorKind::Dataset,
                "Rows must have at least one feature column.",
            ));
        }
        if rows.iter().any(|r| r.len() != n_features) {
            return Err(PipelineError::new(
                ErrorKind::Dataset,
                "Ragged feature matrix (rows differ in width).",
            ));
        }
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(PipelineError::new(
                ErrorKind::Dataset,
                "Targets must be finite.",
            ));
        }
        if params.n_trees == 0 {
            return Err(PipelineError::new(
                ErrorKind::InvalidConfig,
                "Forest must have at least one tree.",
            ));
        }

        let n = rows.len();
        let tree_params = params.tree_params();
        let trees: Vec<RegressionTree> = (0..params.n_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(tree_idx as u64));
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(rows, targets, &indices, &tree_params, &mut rng)
            })
            .collect();

        Ok(Self {
            params,
            n_features,
            trees,
        })
    }

    /// Predict a single row. The row width must match the training matrix.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, PipelineError> {
        if row.len() != self.n_features {
            return Err(PipelineError::new(
                ErrorKind::Prediction,
                format!(
                    "Feature width mismatch: model expects {} columns, got {}.",
                    self.n_features,
                    row.len()
                ),
            ));
        }
        if self.trees.is_empty() {
            return Err(PipelineError::new(
                ErrorKind::Prediction,
                "Forest has no trees.",
            ));
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        let prediction = sum / self.trees.len() as f64;
        if !prediction.is_finite() {
            return Err(PipelineError::new(
                ErrorKind::Prediction,
                "Forest produced a non-finite prediction.",
            ));
        }
        Ok(prediction)
    }

    /// Predict a batch of rows.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, PipelineError> {
        rows.iter().map(|r| self.predict_row(r)).collect()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::r2_score;

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 25,
            max_depth: Some(6),
            ..ForestParams::default()
        }
    }

    fn synthetic_rows(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        // Smooth signal with one dominant feature; easy for a forest to learn.
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64, (i % 5) as f64])
            .collect();
        let targets: Vec<f64> = rows.iter().map(|r| 3.0 * r[0] + r[1]).collect();
        (rows, targets)
    }

    #[test]
    fn forest_learns_training_signal() {
        let (rows, targets) = synthetic_rows(60);
        let forest = ForestRegressor::fit(&rows, &targets, small_params()).unwrap();
        let predicted = forest.predict(&rows).unwrap();
        assert!(predicted.iter().all(|p| p.is_finite()));
        assert!(r2_score(&targets, &predicted) > 0.8);
    }

    #[test]
    fn same_seed_fits_identical_forests() {
        let (rows, targets) = synthetic_rows(40);
        let a = ForestRegressor::fit(&rows, &targets, small_params()).unwrap();
        let b = ForestRegressor::fit(&rows, &targets, small_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn width_mismatch_is_a_prediction_error() {
        let (rows, targets) = synthetic_rows(20);
        let forest = ForestRegressor::fit(&rows, &targets, small_params()).unwrap();
        let err = forest.predict_row(&[1.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Prediction);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = ForestRegressor::fit(&[], &[], small_params()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dataset);
    }
}
