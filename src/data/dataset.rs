//! CSV ingest and normalization.
//!
//! Turns a heterogeneous installation-history CSV into clean
//! [`InstallationRow`]s that are safe to train on or average over.
//!
//! Design goals:
//! - **Strict schema** for required fields (clear errors, distinct exit code)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic expansion** of serialized historical-production lists
//!   into exactly 12 positional columns (index 0 → month 1)
//! - **Separation of concerns**: no encoding or modeling logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{HIST_MONTHS, InstallationRow, NUMERIC_COLUMNS, TARGET_COLUMN, hist_column};
use crate::error::{ErrorKind, PipelineError};

/// Column holding the serialized historical-production list, when the CSV
/// stores history as one field instead of 12 `hist_month_N` columns.
const HIST_LIST_COLUMN: &str = "historical_production_kwh";

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: normalized rows + row errors.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<InstallationRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl Dataset {
    /// Load and normalize a dataset CSV.
    ///
    /// A missing path is `DataNotFound`; a readable file from which no valid
    /// row survives is a `Dataset` error.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::new(
                ErrorKind::DataNotFound,
                format!("Dataset not found at '{}'.", path.display()),
            ));
        }
        let file = File::open(path).map_err(|e| {
            PipelineError::new(
                ErrorKind::Io,
                format!("Failed to open dataset '{}': {e}", path.display()),
            )
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| {
                PipelineError::new(ErrorKind::Dataset, format!("Failed to read CSV headers: {e}"))
            })?
            .clone();
        let header_map = build_header_map(&headers);

        ensure_required_columns_exist(&header_map)?;

        let mut rows = Vec::new();
        let mut row_errors = Vec::new();
        let mut rows_read = 0usize;

        for (idx, result) in reader.records().enumerate() {
            // +2: records() starts after the header row, CSV lines are 1-based.
            let line = idx + 2;
            rows_read += 1;

            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    row_errors.push(RowError {
                        line,
                        message: format!("CSV parse error: {e}"),
                    });
                    continue;
                }
            };

            match parse_row(&record, &header_map) {
                Ok(row) => rows.push(row),
                Err(message) => row_errors.push(RowError { line, message }),
            }
        }

        if rows.is_empty() {
            return Err(PipelineError::new(
                ErrorKind::Dataset,
                format!(
                    "No valid rows in '{}' ({} read, {} rejected).",
                    path.display(),
                    rows_read,
                    row_errors.len()
                ),
            ));
        }

        Ok(Self {
            rows,
            row_errors,
            rows_read,
        })
    }

    pub fn from_rows(rows: Vec<InstallationRow>) -> Self {
        let rows_read = rows.len();
        Self {
            rows,
            row_errors: Vec::new(),
            rows_read,
        }
    }

    pub fn rows(&self) -> &[InstallationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows matching both keys exactly (case-sensitive, like the encoders).
    pub fn matching_rows(&self, energy_type: &str, energy_subtype: &str) -> Vec<&InstallationRow> {
        self.rows
            .iter()
            .filter(|r| r.energy_type == energy_type && r.energy_subtype == energy_subtype)
            .collect()
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), PipelineError> {
    let mut required: Vec<&str> = vec!["energy_type", "energy_subtype", TARGET_COLUMN];
    required.extend(NUMERIC_COLUMNS);

    for name in required {
        if !header_map.contains_key(name) {
            return Err(PipelineError::new(
                ErrorKind::Dataset,
                format!("Missing required column: `{name}`"),
            ));
        }
    }
    // Identifier columns (`project_id`) and the historical columns are
    // optional: identifiers are never read, history defaults to zeros.
    Ok(())
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<InstallationRow, String> {
    let energy_type = get_required(record, header_map, "energy_type")?.to_string();
    let energy_subtype = get_required(record, header_map, "energy_subtype")?.to_string();

    let installation_size_kw = parse_f64(record, header_map, "installation_size_kw")?;
    let location_latitude = parse_f64(record, header_map, "location_latitude")?;
    let location_longitude = parse_f64(record, header_map, "location_longitude")?;
    let panel_age_months = parse_f64(record, header_map, "panel_age_months")?;
    let month = parse_f64(record, header_map, "month")?;
    let investment_per_share_eur = parse_f64(record, header_map, "investment_per_share_eur")?;
    let total_shares = parse_f64(record, header_map, "total_shares")?;
    let kwh_per_share_per_month = parse_f64(record, header_map, TARGET_COLUMN)?;

    let hist = parse_history(record, header_map)?;

    Ok(InstallationRow {
        energy_type,
        energy_subtype,
        installation_size_kw,
        location_latitude,
        location_longitude,
        panel_age_months,
        month,
        investment_per_share_eur,
        total_shares,
        hist,
        kwh_per_share_per_month,
    })
}

/// Resolve historical production for one row.
///
/// Priority: a serialized list column, then individual `hist_month_N`
/// columns, then zeros. The result always has exactly [`HIST_MONTHS`]
/// entries.
fn parse_history(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<[f64; HIST_MONTHS], String> {
    if let Some(raw) = get_optional(record, header_map, HIST_LIST_COLUMN) {
        return parse_hist_list(raw);
    }

    let mut hist = [0.0; HIST_MONTHS];
    for (i, slot) in hist.iter_mut().enumerate() {
        if let Some(raw) = get_optional(record, header_map, &hist_column(i + 1)) {
            *slot = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("Invalid `{}` value '{raw}'.", hist_column(i + 1)))?;
        }
    }
    Ok(hist)
}

fn parse_hist_list(raw: &str) -> Result<[f64; HIST_MONTHS], String> {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let values: Vec<f64> = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| format!("Invalid `{HIST_LIST_COLUMN}` list '{raw}'."))?;

    if values.len() != HIST_MONTHS {
        return Err(format!(
            "`{HIST_LIST_COLUMN}` must contain exactly {HIST_MONTHS} values, got {}.",
            values.len()
        ));
    }

    let mut hist = [0.0; HIST_MONTHS];
    hist.copy_from_slice(&values);
    Ok(hist)
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<f64, String> {
    let raw = get_required(record, header_map, name)?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Invalid `{name}` value '{raw}'."))
}
