use anyhow::{Context, Result};
use qos_pipeline::model::BoostingConfig;
use qos_pipeline::{TrainOptions, UnknownCategoryPolicy};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Optional JSON training config. Missing fields keep their defaults.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct TrainConfig {
    pub target_column: Option<String>,
    pub options: TrainOptions,
}

impl TrainConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("config file not found: {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid config JSON in {}", path.display()))
    }
}

/// Command-line values that win over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub test_size: Option<f64>,
    pub seed: Option<u64>,
    pub n_estimators: Option<usize>,
    pub learning_rate: Option<f64>,
    pub max_depth: Option<usize>,
    pub unknown_operator: Option<UnknownCategoryPolicy>,
}

impl Overrides {
    pub fn apply(&self, mut options: TrainOptions) -> TrainOptions {
        if let Some(v) = self.test_size {
            options.test_size = v;
        }
        if let Some(v) = self.seed {
            options.seed = v;
        }
        let BoostingConfig {
            n_estimators,
            learning_rate,
            tree,
        } = &mut options.boosting;
        if let Some(v) = self.n_estimators {
            *n_estimators = v;
        }
        if let Some(v) = self.learning_rate {
            *learning_rate = v;
        }
        if let Some(v) = self.max_depth {
            tree.max_depth = v;
        }
        if let Some(v) = self.unknown_operator {
            options.unknown_operator = v;
        }
        options
    }
}
