//! Tree-ensemble regression model.
//!
//! The regressor is a bootstrap-aggregated forest of variance-reduction
//! regression trees, implemented directly over `Vec<f64>` feature rows so the
//! fitted ensemble serializes cleanly as an artifact and predictions stay
//! deterministic for a fixed seed.

pub mod forest;
pub mod tree;

pub use forest::*;
pub use tree::*;
