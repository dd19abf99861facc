mod config;

use anyhow::{Context, Result};
use clap::Parser;
use qos_pipeline::{train, Dataset, UnknownCategoryPolicy};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fit the throughput model on a labeled CSV and write the artifact.
#[derive(Parser, Debug)]
#[command(name = "qos_trainer", version)]
struct Cli {
    /// Training CSV with a header row.
    #[arg(long)]
    data: PathBuf,

    /// Where to write the model artifact.
    #[arg(long, default_value = "qos_model.json")]
    output: PathBuf,

    /// Optional JSON training config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Label column name.
    #[arg(long)]
    target: Option<String>,

    #[arg(long)]
    test_size: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    n_estimators: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    max_depth: Option<usize>,

    /// sentinel | reject
    #[arg(long)]
    unknown_operator: Option<UnknownCategoryPolicy>,
}

impl Cli {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            test_size: self.test_size,
            seed: self.seed,
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
            unknown_operator: self.unknown_operator,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::TrainConfig::load(path)?,
        None => config::TrainConfig::default(),
    };
    let options = cli.overrides().apply(cfg.options);
    let target = cli
        .target
        .clone()
        .or(cfg.target_column)
        .unwrap_or_else(|| qos_pipeline::schema::TARGET.to_string());

    tracing::info!(data = %cli.data.display(), %target, "loading dataset");
    let dataset = Dataset::from_csv_path(&cli.data, &target)
        .with_context(|| format!("failed to read dataset {}", cli.data.display()))?;
    tracing::info!(rows = dataset.len(), "dataset loaded");

    let artifact = train(&dataset, &options).context("training failed")?;
    artifact
        .save(&cli.output)
        .with_context(|| format!("failed to write artifact {}", cli.output.display()))?;

    if let Some(summary) = artifact.summary() {
        match (summary.validation_rmse_log, summary.validation_rmse_mbps) {
            (Some(log), Some(mbps)) => {
                println!("Validation RMSE (log1p space): {log:.4}");
                println!("Validation RMSE (Mbps):        {mbps:.4}");
            }
            _ => println!("Validation RMSE: n/a (no validation rows)"),
        }
    }
    println!("Model saved to {}", cli.output.display());
    Ok(())
}
