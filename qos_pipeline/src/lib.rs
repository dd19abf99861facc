//! Throughput prediction pipeline shared by the trainer and the HTTP service.
//!
//! One code path turns a raw observation into a scaled feature vector at both
//! training and serving time; the fitted state travels in a single
//! [`ModelArtifact`].

pub mod artifact;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod features;
pub mod model;
pub mod observation;
pub mod preprocess;
pub mod scaling;
pub mod schema;
pub mod target;
pub mod train;

pub use artifact::{ModelArtifact, Prediction, TrainingSummary};
pub use dataset::{train_validation_split, Dataset};
pub use encoding::UnknownCategoryPolicy;
pub use error::{
    ArtifactError, DatasetError, ModelError, PipelineError, PreprocessingError, TrainingError,
};
pub use features::{derive_features, hour_from_timestamp, DerivationMode, DerivationWarning};
pub use observation::RawObservation;
pub use preprocess::{FeatureVector, Preprocessor};
pub use schema::FeatureSchema;
pub use target::TargetTransform;
pub use train::{train, TrainOptions};
