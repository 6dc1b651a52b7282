//! Adaptive data-completion cache.
//!
//! Prediction requests rarely carry a full feature vector, so this module
//! fills the gaps: per `(energy_type, energy_subtype)` key it keeps one
//! baseline record — averaged from the reference dataset when enough matching
//! rows exist, synthesized from seeded randomness otherwise — and overlays
//! the per-call request fields on a fresh copy at every lookup.
//!
//! Design goals:
//! - `complete` never fails; synthesis is always available as a fallback
//! - baselines are computed once per key and live for the process lifetime
//! - the stored baseline is never mutated by per-request overlays
//! - with no dataset loaded, output is byte-for-byte reproducible per seed

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Mutex, PoisonError};

use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::debug;

use crate::data::Dataset;
use crate::domain::{FeatureRecord, HIST_MONTHS, InstallationRow, hist_column};
use crate::math::mean;

/// Typical installation size range (kW) for a known energy type.
///
/// Unrecognized types fall back to the Solar range.
pub fn typical_size_range(energy_type: &str) -> (f64, f64) {
    match energy_type {
        "Wind" => (1000.0, 10_000.0),
        "Hydro" => (500.0, 5000.0),
        "Biomass" => (500.0, 3000.0),
        "Geothermal" => (1000.0, 5000.0),
        _ => (100.0, 5000.0), // Solar and unrecognized types
    }
}

/// Plausible geographic box `((lat_min, lat_max), (lon_min, lon_max))` for a
/// known energy type. Unrecognized types fall back to the Solar box.
pub fn region_box(energy_type: &str) -> ((f64, f64), (f64, f64)) {
    match energy_type {
        "Wind" => ((30.0, 60.0), (-30.0, 60.0)),
        "Hydro" | "Biomass" | "Geothermal" => ((0.0, 60.0), (-30.0, 60.0)),
        _ => ((15.0, 45.0), (-10.0, 40.0)), // Solar and unrecognized types
    }
}

/// Seasonal production multiplier, period 12, rising through month 1.
pub fn seasonal_factor(month: usize) -> f64 {
    1.0 + 0.3 * ((month as f64 - 1.0) * PI / 6.0).sin()
}

type CacheKey = (String, String);

pub struct CompletionCache {
    dataset: Option<Dataset>,
    min_match_rows: usize,
    baselines: Mutex<HashMap<CacheKey, FeatureRecord>>,
    // One generator for the cache lifetime keeps no-dataset runs reproducible.
    rng: Mutex<StdRng>,
}

impl CompletionCache {
    /// `min_match_rows` is the number of exactly-matching dataset rows
    /// required before averages are trusted over synthetic generation.
    pub fn new(dataset: Option<Dataset>, min_match_rows: usize, seed: u64) -> Self {
        Self {
            dataset,
            min_match_rows,
            baselines: Mutex::new(HashMap::new()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Produce a complete feature record for the request. Never fails.
    ///
    /// The returned record carries the baseline installation fields plus the
    /// five request-scoped fields; the cached baseline itself stores neither
    /// the categoricals nor the request-scoped numerics.
    pub fn complete(
        &self,
        energy_type: &str,
        energy_subtype: &str,
        month: u32,
        investment_per_share_eur: f64,
        total_shares: u32,
    ) -> FeatureRecord {
        let key = (energy_type.to_string(), energy_subtype.to_string());

        // The lock spans the read-check-then-insert so a miss is computed
        // exactly once per key; lock order is baselines, then rng.
        let mut record = {
            let mut baselines = self
                .baselines
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match baselines.get(&key) {
                Some(baseline) => {
                    debug!(energy_type, energy_subtype, "completion cache hit");
                    baseline.clone()
                }
                None => {
                    let baseline = self.build_baseline(energy_type, energy_subtype);
                    baselines.insert(key, baseline.clone());
                    baseline
                }
            }
        };

        record.set_categorical("energy_type", energy_type);
        record.set_categorical("energy_subtype", energy_subtype);
        record.set_numeric("month", f64::from(month));
        record.set_numeric("investment_per_share_eur", investment_per_share_eur);
        record.set_numeric("total_shares", f64::from(total_shares));
        record
    }

    fn build_baseline(&self, energy_type: &str, energy_subtype: &str) -> FeatureRecord {
        if let Some(dataset) = &self.dataset {
            let matching = dataset.matching_rows(energy_type, energy_subtype);
            if matching.len() >= self.min_match_rows {
                debug!(
                    energy_type,
                    energy_subtype,
                    rows = matching.len(),
                    "averaging baseline from reference dataset"
                );
                return average_baseline(&matching);
            }
        }
        debug!(energy_type, energy_subtype, "synthesizing baseline");
        self.synthesize_baseline(energy_type)
    }

    fn synthesize_baseline(&self, energy_type: &str) -> FeatureRecord {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let (size_min, size_max) = typical_size_range(energy_type);
        let installation_size_kw = rng.gen_range(size_min..size_max);

        let ((lat_min, lat_max), (lon_min, lon_max)) = region_box(energy_type);
        let location_latitude = rng.gen_range(lat_min..lat_max);
        let location_longitude = rng.gen_range(lon_min..lon_max);

        let panel_age_months = rng.gen_range(6..120) as f64;

        let base_production = installation_size_kw * rng.gen_range(100.0..300.0);

        let mut record = FeatureRecord::new();
        record.set_numeric("installation_size_kw", installation_size_kw);
        record.set_numeric("location_latitude", location_latitude);
        record.set_numeric("location_longitude", location_longitude);
        record.set_numeric("panel_age_months", panel_age_months);
        for m in 1..=HIST_MONTHS {
            let noise = rng.gen_range(0.8..1.2);
            record.set_numeric(hist_column(m), base_production * seasonal_factor(m) * noise);
        }
        record
    }
}

fn average_baseline(rows: &[&InstallationRow]) -> FeatureRecord {
    let mut record = FeatureRecord::new();
    record.set_numeric(
        "installation_size_kw",
        mean(&collect(rows, |r| r.installation_size_kw)),
    );
    record.set_numeric(
        "location_latitude",
        mean(&collect(rows, |r| r.location_latitude)),
    );
    record.set_numeric(
        "location_longitude",
        mean(&collect(rows, |r| r.location_longitude)),
    );
    record.set_numeric(
        "panel_age_months",
        mean(&collect(rows, |r| r.panel_age_months)),
    );
    for m in 1..=HIST_MONTHS {
        record.set_numeric(hist_column(m), mean(&collect(rows, |r| r.hist[m - 1])));
    }
    record
}

fn collect(rows: &[&InstallationRow], f: impl Fn(&InstallationRow) -> f64) -> Vec<f64> {
    rows.iter().map(|&r| f(r)).collect()
}
