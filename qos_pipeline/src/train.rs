//! Offline training: dataset in, validated artifact out.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::artifact::{ModelArtifact, TrainingSummary};
use crate::dataset::{train_validation_split, Dataset};
use crate::encoding::UnknownCategoryPolicy;
use crate::error::{DatasetError, TrainingError};
use crate::features::{derive_features, DerivationMode, DerivationWarning};
use crate::model::{BoostingConfig, FittedRegressor, GradientBoostingRegressor, Regressor};
use crate::preprocess::Preprocessor;
use crate::schema::FeatureSchema;
use crate::target::TargetTransform;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    /// Share of rows held out for validation.
    pub test_size: f64,
    pub seed: u64,
    pub boosting: BoostingConfig,
    pub unknown_operator: UnknownCategoryPolicy,
    pub target: TargetTransform,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
            boosting: BoostingConfig::default(),
            unknown_operator: UnknownCategoryPolicy::default(),
            target: TargetTransform::Log1p,
        }
    }
}

impl TrainOptions {
    pub fn validate(&self) -> Result<(), TrainingError> {
        if !(0.0..1.0).contains(&self.test_size) {
            return Err(TrainingError::InvalidOption(format!(
                "test_size must be in [0, 1), got {}",
                self.test_size
            )));
        }
        self.boosting.validate()?;
        Ok(())
    }
}

pub fn rmse(predicted: &[f64], actual: &[f64]) -> Option<f64> {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return None;
    }
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a) * (p - a))
        .sum();
    Some((sum / predicted.len() as f64).sqrt())
}

/// derive → fit encoder and scaler → split → fit regressor on transformed
/// targets → evaluate on the held-out rows.
pub fn train(dataset: &Dataset, options: &TrainOptions) -> Result<ModelArtifact, TrainingError> {
    options.validate()?;
    if dataset.is_empty() {
        return Err(DatasetError::Empty.into());
    }
    if dataset.observations.len() != dataset.targets.len() {
        return Err(TrainingError::InvalidOption(
            "observation and target counts differ".into(),
        ));
    }
    if let Some((index, &value)) = dataset
        .targets
        .iter()
        .enumerate()
        .find(|(_, &y)| !options.target.accepts(y))
    {
        return Err(DatasetError::InvalidTarget {
            row: index + 1,
            value: value.to_string(),
        }
        .into());
    }

    let schema = FeatureSchema::throughput();
    let mut substituted: BTreeMap<String, usize> = BTreeMap::new();
    let mut rows = Vec::with_capacity(dataset.len());
    for (index, raw) in dataset.observations.iter().enumerate() {
        let derived = derive_features(raw, &schema, DerivationMode::Training).map_err(|source| {
            TrainingError::Preprocessing {
                row: index + 1,
                source,
            }
        })?;
        for warning in &derived.warnings {
            if let DerivationWarning::MissingFeature { column } = warning {
                *substituted.entry(column.clone()).or_default() += 1;
            }
        }
        rows.push(derived.row);
    }
    for (column, count) in &substituted {
        warn!(%column, rows = count, "missing values defaulted");
    }

    let (preprocessor, matrix) = Preprocessor::fit(&schema, &rows, options.unknown_operator)?;
    for encoder in preprocessor.encoders() {
        info!(
            column = encoder.column(),
            categories = encoder.categories().len(),
            "fitted ordinal encoder"
        );
    }

    let (train_idx, val_idx) =
        train_validation_split(dataset.len(), options.test_size, options.seed);
    if train_idx.is_empty() {
        return Err(TrainingError::InvalidOption(format!(
            "{} rows leave nothing to train on with test_size {}",
            dataset.len(),
            options.test_size
        )));
    }

    let transformed: Vec<f64> = dataset
        .targets
        .iter()
        .map(|&y| options.target.forward(y))
        .collect();
    let select = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        idx.iter()
            .map(|&i| (matrix[i].clone(), transformed[i]))
            .unzip()
    };
    let (x_train, y_train) = select(&train_idx);
    let (x_val, y_val) = select(&val_idx);

    info!(
        train = x_train.len(),
        validation = x_val.len(),
        estimators = options.boosting.n_estimators,
        "fitting regressor"
    );
    let regressor = GradientBoostingRegressor::new(options.boosting.clone()).fit(&x_train, &y_train)?;

    let val_pred = regressor.predict(&x_val)?;
    let validation_rmse_log = rmse(&val_pred, &y_val);
    let val_pred_mbps: Vec<f64> = val_pred.iter().map(|&p| options.target.inverse(p)).collect();
    let val_actual_mbps: Vec<f64> = val_idx.iter().map(|&i| dataset.targets[i]).collect();
    let validation_rmse_mbps = rmse(&val_pred_mbps, &val_actual_mbps);

    match validation_rmse_log {
        Some(rmse_log) => info!(
            rmse_log,
            rmse_mbps = validation_rmse_mbps.unwrap_or(f64::NAN),
            "validation"
        ),
        None => warn!("no validation rows; RMSE not computed"),
    }

    let summary = TrainingSummary {
        trained_at: Utc::now(),
        n_rows: dataset.len(),
        n_train: x_train.len(),
        n_validation: x_val.len(),
        test_size: options.test_size,
        seed: options.seed,
        validation_rmse_log,
        validation_rmse_mbps,
        boosting: options.boosting.clone(),
        substituted_defaults: substituted,
        vocabulary_sizes: preprocessor
            .encoders()
            .iter()
            .map(|e| (e.column().to_string(), e.categories().len()))
            .collect(),
    };

    Ok(ModelArtifact::new(
        schema,
        preprocessor,
        regressor,
        options.target,
        Some(summary),
    )?)
}
