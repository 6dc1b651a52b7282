//! Dataset access.
//!
//! - CSV ingest + validation (`dataset`)
//! - deterministic synthetic demo-dataset generation (`synth`)

pub mod dataset;
pub mod synth;

pub use dataset::*;
pub use synth::*;
