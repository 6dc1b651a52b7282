//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initializes logging
//! - resolves configuration (env + CLI overrides)
//! - builds the service / runs the pipeline for the chosen subcommand
//! - prints reports

use clap::Parser;

use crate::cli::{Cli, Command, GenArgs, RequestArgs, TrainArgs};
use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Entry point for the `yieldcast` binary.
pub fn run() -> Result<(), PipelineError> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Predict(args) => handle_predict(args),
        Command::Complete(args) => handle_complete(args),
        Command::Gen(args) => handle_gen(args),
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .ok();
}

fn handle_train(args: TrainArgs) -> Result<(), PipelineError> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(data) = args.data {
        config.dataset_path = data;
    }
    if let Some(artifacts) = args.artifacts {
        config.artifacts_dir = artifacts;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let report = crate::train::run_training_pipeline(&config, None)?;
    println!("{}", crate::report::format_training_summary(&report));
    Ok(())
}

fn handle_predict(args: RequestArgs) -> Result<(), PipelineError> {
    let config = request_config(&args)?;
    if !crate::service::YieldService::artifacts_ready(&config) {
        // Initialization below would fail anyway; this makes the likely
        // cause visible before the artifact errors do.
        tracing::warn!(
            artifacts = %config.artifacts_dir.display(),
            "artifact pair not found; run `yieldcast train` first"
        );
    }

    let service = crate::service::YieldService::initialize(&config)?;
    let request = args.to_request();
    let summary = service.predict_request(&request)?;
    println!("{}", crate::report::format_prediction(&request, &summary));
    Ok(())
}

fn handle_complete(args: RequestArgs) -> Result<(), PipelineError> {
    let config = request_config(&args)?;
    let dataset = crate::data::Dataset::load(&config.dataset_path).ok();
    let cache = crate::lookup::CompletionCache::new(dataset, config.min_match_rows, config.seed);

    let record = cache.complete(
        &args.energy_type,
        &args.energy_subtype,
        args.month,
        args.investment,
        args.shares,
    );
    let json = serde_json::to_string_pretty(&record).map_err(|e| {
        PipelineError::new(
            crate::error::ErrorKind::Io,
            format!("Failed to serialize completed record: {e}"),
        )
    })?;
    println!("{json}");
    Ok(())
}

fn handle_gen(args: GenArgs) -> Result<(), PipelineError> {
    let config = crate::data::SynthConfig {
        rows: args.rows,
        seed: args.seed,
    };
    let dataset = crate::data::generate_dataset(&config)?;
    crate::data::write_dataset_csv(&args.out, &dataset)?;
    println!(
        "Wrote {} synthetic rows to {}",
        dataset.len(),
        args.out.display()
    );
    Ok(())
}

fn request_config(args: &RequestArgs) -> Result<PipelineConfig, PipelineError> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(artifacts) = &args.artifacts {
        config.artifacts_dir = artifacts.clone();
    }
    if let Some(min_match_rows) = args.min_match_rows {
        config.min_match_rows = min_match_rows;
    }
    config.validate()?;
    Ok(config)
}
