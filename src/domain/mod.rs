//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the canonical feature schema (column names, historical-month layout)
//! - normalized installation observations (`InstallationRow`)
//! - request/response types (`PredictionRequest`, `PredictionSummary`)
//! - pipeline outputs (`TrainingReport`)

pub mod types;

pub use types::*;
