//! Regressor contract and the gradient-boosted tree implementation.

mod boosting;
mod tree;

pub use boosting::{BoostingConfig, GradientBoostedTrees, GradientBoostingRegressor};
pub use tree::{Node, RegressionTree, TreeConfig};

use crate::error::ModelError;

/// Unfitted estimator: `fit(X, y) -> model`.
pub trait Regressor {
    type Fitted: FittedRegressor;

    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Self::Fitted, ModelError>;
}

/// Fitted model: `predict(X) -> y`. Read-only after fit.
pub trait FittedRegressor: Send + Sync {
    fn n_features(&self) -> usize;

    fn predict_row(&self, x: &[f64]) -> Result<f64, ModelError>;

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }
}
