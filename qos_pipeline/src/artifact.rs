//! The persisted model artifact and the serve-time prediction path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ArtifactError, ModelError, PipelineError, PreprocessingError};
use crate::features::{derive_features, DerivationMode, DerivationWarning};
use crate::model::{BoostingConfig, FittedRegressor, GradientBoostedTrees};
use crate::observation::RawObservation;
use crate::preprocess::{FeatureVector, Preprocessor};
use crate::schema::FeatureSchema;
use crate::target::TargetTransform;

/// Facts about the training run, stored for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub trained_at: DateTime<Utc>,
    pub n_rows: usize,
    pub n_train: usize,
    pub n_validation: usize,
    pub test_size: f64,
    pub seed: u64,
    /// RMSE of log-space predictions against log1p labels.
    pub validation_rmse_log: Option<f64>,
    pub validation_rmse_mbps: Option<f64>,
    pub boosting: BoostingConfig,
    /// Per column, how many training rows had a default substituted.
    pub substituted_defaults: BTreeMap<String, usize>,
    /// Fitted vocabulary size per categorical column.
    #[serde(default)]
    pub vocabulary_sizes: BTreeMap<String, usize>,
}

/// Schema, fitted preprocessing state and regressor, persisted as one blob.
///
/// Loaded once per process and shared read-only; nothing mutates it after
/// [`ModelArtifact::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    schema: FeatureSchema,
    preprocessor: Preprocessor,
    regressor: GradientBoostedTrees,
    target: TargetTransform,
    summary: Option<TrainingSummary>,
}

/// One successful serve-time evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// May be slightly negative when the model extrapolates below zero.
    pub throughput_mbps: f64,
    pub evaluated_at: DateTime<Utc>,
    pub warnings: Vec<DerivationWarning>,
    /// Scaled vector the regressor saw.
    pub features: FeatureVector,
}

impl ModelArtifact {
    pub fn new(
        schema: FeatureSchema,
        preprocessor: Preprocessor,
        regressor: GradientBoostedTrees,
        target: TargetTransform,
        summary: Option<TrainingSummary>,
    ) -> Result<Self, ArtifactError> {
        let artifact = Self {
            schema,
            preprocessor,
            regressor,
            target,
            summary,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn regressor(&self) -> &GradientBoostedTrees {
        &self.regressor
    }

    pub fn target(&self) -> TargetTransform {
        self.target
    }

    pub fn summary(&self) -> Option<&TrainingSummary> {
        self.summary.as_ref()
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        self.schema.validate()?;
        self.preprocessor.check(&self.schema)?;
        if !self.regressor.is_well_formed() {
            return Err(ArtifactError::Inconsistent("malformed regressor".into()));
        }
        if self.regressor.n_features() != self.schema.len() {
            return Err(ArtifactError::Inconsistent(format!(
                "regressor expects {} features, schema has {}",
                self.regressor.n_features(),
                self.schema.len()
            )));
        }
        Ok(())
    }

    /// Writes to a sibling temp file and renames it over `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let bytes = serde_json::to_vec(self)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let bytes = fs::read(path)?;
        let artifact: Self = serde_json::from_slice(&bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Serve-time feature vector for one observation.
    pub fn features(
        &self,
        raw: &RawObservation,
        now: DateTime<Utc>,
    ) -> Result<(FeatureVector, Vec<DerivationWarning>), PreprocessingError> {
        let derived = derive_features(raw, &self.schema, DerivationMode::Serving { now })?;
        for warning in &derived.warnings {
            warn!(%warning, "substituted default");
        }
        debug!(row = ?derived.row, "processed features");
        let vector = self.preprocessor.transform(&self.schema, &derived.row)?;
        Ok((vector, derived.warnings))
    }

    /// Raw observation to Mbps: derive, encode, scale, predict, invert.
    pub fn predict(
        &self,
        raw: &RawObservation,
        now: DateTime<Utc>,
    ) -> Result<Prediction, PipelineError> {
        let (vector, warnings) = self.features(raw, now)?;
        let throughput_mbps = self.predict_vector(&vector)?;
        debug!(throughput_mbps, "prediction");
        Ok(Prediction {
            throughput_mbps,
            evaluated_at: now,
            warnings,
            features: vector,
        })
    }

    /// Regressor plus inverse target transform on an already scaled vector.
    pub fn predict_vector(&self, vector: &FeatureVector) -> Result<f64, ModelError> {
        let raw = self.regressor.predict_row(vector.as_slice())?;
        let value = self.target.inverse(raw);
        if !value.is_finite() {
            return Err(ModelError::NonFinite("prediction output"));
        }
        Ok(value)
    }

    /// Runs the regressor on an all-zero scaled vector.
    pub fn warm_up(&self) -> Result<f64, ModelError> {
        self.predict_vector(&FeatureVector::zeros(self.schema.len()))
    }
}
