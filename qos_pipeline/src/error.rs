//! Error types shared by the training and serving pipelines.

use thiserror::Error;

/// Raw-observation to feature-row conversion failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreprocessingError {
    #[error("column '{column}' expected {expected}, got {got}")]
    InvalidType {
        column: String,
        expected: &'static str,
        got: String,
    },

    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("Hour must be an integer in 0..=23, got {0}")]
    HourOutOfRange(String),

    #[error("neither 'Hour' nor 'timestamp' present")]
    MissingHourSource,

    #[error("unknown category '{value}' for column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
}

/// Regressor fit/predict failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("{rows} feature rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("invalid hyper-parameter: {0}")]
    InvalidConfig(String),

    #[error("feature mismatch: model expects {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Training CSV loading failures.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: invalid target '{value}'")]
    InvalidTarget { row: usize, value: String },

    #[error("dataset has no rows")]
    Empty,
}

/// Persisted artifact load/save failures.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unsupported feature schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("inconsistent artifact: {0}")]
    Inconsistent(String),
}

/// Failures of the offline training run.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("row {row}: {source}")]
    Preprocessing {
        row: usize,
        #[source]
        source: PreprocessingError,
    },

    #[error("encoding failed: {0}")]
    Encoding(#[from] PreprocessingError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("invalid training option: {0}")]
    InvalidOption(String),
}

/// Failures of a single serve-time prediction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Preprocessing error: {0}")]
    Preprocessing(#[from] PreprocessingError),

    #[error("Prediction error: {0}")]
    Model(#[from] ModelError),
}
