//! Categorical label encoding and the persisted feature contract.
//!
//! Training fits one [`LabelEncoder`] per categorical column and persists the
//! encoders together with the exact ordered feature list the model was fit
//! on. Inference replays that contract verbatim: same encoders, same columns,
//! same order. Nothing else about the input schema is trusted.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::{CATEGORICAL_COLUMNS, FeatureRecord, HIST_MONTHS, NUMERIC_COLUMNS, hist_column};

/// Code substituted when a categorical value was never seen at training time.
///
/// Sentinel 0 shares its code with the first class in sorted order, so an
/// unseen category is indistinguishable downstream from that class. This
/// ambiguity is inherited from the trained artifacts and is left unresolved.
pub const SENTINEL_CODE: u32 = 0;

/// Deterministic bijection from observed category strings to integer codes.
///
/// Classes are stored in sorted order, so fitting the same value set always
/// produces the same codes regardless of row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit an encoder on the observed values.
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let unique: BTreeSet<&str> = values.into_iter().collect();
        Self {
            classes: unique.into_iter().map(str::to_string).collect(),
        }
    }

    /// Transform a value to its code; `None` when the value was not seen at
    /// fit time.
    pub fn transform(&self, value: &str) -> Option<u32> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
            .map(|idx| idx as u32)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Name of the encoded counterpart of a categorical column.
pub fn encoded_column(column: &str) -> String {
    format!("{column}_encoded")
}

/// The feature order training fits against: numeric columns, then the 12
/// historical months, then the encoded categoricals.
///
/// Built once at training time and persisted; inference only ever consumes
/// the persisted copy.
pub fn canonical_feature_order() -> Vec<String> {
    let mut order: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
    for m in 1..=HIST_MONTHS {
        order.push(hist_column(m));
    }
    for column in CATEGORICAL_COLUMNS {
        order.push(encoded_column(column));
    }
    order
}

/// The persisted encoding contract: fitted encoders plus the literal column
/// order the model expects. Immutable once written; versioned as a unit with
/// the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingContract {
    pub encoders: BTreeMap<String, LabelEncoder>,
    pub feature_order: Vec<String>,
}

impl EncodingContract {
    /// Encode the record's categorical values into `<col>_encoded` numerics.
    ///
    /// A categorical column absent from the record is skipped (its encoded
    /// column later defaults to 0 during reindexing). An unseen value
    /// degrades to [`SENTINEL_CODE`]. Returns the number of sentinel
    /// substitutions so callers can log or assert on degraded encodes.
    pub fn encode_into(&self, record: &mut FeatureRecord) -> usize {
        let mut fallbacks = 0;
        for (column, encoder) in &self.encoders {
            let Some(raw) = record.categoricals.get(column) else {
                continue;
            };
            let code = match encoder.transform(raw) {
                Some(code) => code,
                None => {
                    fallbacks += 1;
                    SENTINEL_CODE
                }
            };
            record.set_numeric(encoded_column(column), f64::from(code));
        }
        fallbacks
    }

    /// Assemble the model input vector in exactly `feature_order`.
    ///
    /// Features absent from the record default to 0. Column order and
    /// identity here must match the training matrix bit-for-bit; this method
    /// is the only place inference builds model input.
    pub fn feature_vector(&self, record: &FeatureRecord) -> Vec<f64> {
        self.feature_order
            .iter()
            .map(|column| record.numeric(column).unwrap_or(0.0))
            .collect()
    }
}
