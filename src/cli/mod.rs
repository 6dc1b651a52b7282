//! Command-line parsing for the energy-yield pipeline.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the pipeline/modeling code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::PredictionRequest;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "yieldcast",
    version,
    about = "Energy-yield prediction pipeline (train / predict / complete)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train from a dataset CSV and persist the model/contract artifact pair.
    Train(TrainArgs),
    /// Predict monthly yield per share for a (possibly partial) request.
    Predict(RequestArgs),
    /// Print the completed feature record for a request without predicting.
    Complete(RequestArgs),
    /// Generate a synthetic demo dataset CSV.
    Gen(GenArgs),
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Dataset CSV path (overrides YIELDCAST_DATA).
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Artifact directory (overrides YIELDCAST_ARTIFACTS).
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Seed for the split shuffle and the forest.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Fields of one prediction/completion request.
#[derive(Debug, Args, Clone)]
pub struct RequestArgs {
    /// Energy type (e.g. Solar, Wind, Hydro, Biomass, Geothermal).
    #[arg(long = "type")]
    pub energy_type: String,

    /// Energy subtype (e.g. Rooftop, Offshore).
    #[arg(long = "subtype")]
    pub energy_subtype: String,

    /// Prediction month (1-12).
    #[arg(long)]
    pub month: u32,

    /// Investment per share (EUR).
    #[arg(long)]
    pub investment: f64,

    /// Total shares of the installation.
    #[arg(long)]
    pub shares: u32,

    /// Installation size (kW); overrides the completion baseline.
    #[arg(long)]
    pub size: Option<f64>,

    /// Latitude; overrides the completion baseline.
    #[arg(long)]
    pub lat: Option<f64>,

    /// Longitude; overrides the completion baseline.
    #[arg(long)]
    pub lon: Option<f64>,

    /// Installation age in months; overrides the completion baseline.
    #[arg(long)]
    pub age: Option<f64>,

    /// Artifact directory (overrides YIELDCAST_ARTIFACTS).
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Matching-row threshold before dataset averages are trusted.
    #[arg(long)]
    pub min_match_rows: Option<usize>,
}

impl RequestArgs {
    pub fn to_request(&self) -> PredictionRequest {
        PredictionRequest {
            energy_type: self.energy_type.clone(),
            energy_subtype: self.energy_subtype.clone(),
            month: self.month,
            investment_per_share_eur: self.investment,
            total_shares: self.shares,
            installation_size_kw: self.size,
            location_latitude: self.lat,
            location_longitude: self.lon,
            panel_age_months: self.age,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct GenArgs {
    /// Number of rows to generate.
    #[arg(long, default_value_t = 200)]
    pub rows: usize,

    /// Generation seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV path.
    #[arg(long)]
    pub out: PathBuf,
}
