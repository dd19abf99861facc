//! Gradient boosting with squared loss over [`RegressionTree`] stages.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree::{RegressionTree, TreeConfig};
use super::{FittedRegressor, Regressor};
use crate::error::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    #[serde(flatten)]
    pub tree: TreeConfig,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            tree: TreeConfig::default(),
        }
    }
}

impl BoostingConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidConfig("n_estimators must be > 0".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.tree.max_depth == 0 {
            return Err(ModelError::InvalidConfig("max_depth must be > 0".into()));
        }
        if self.tree.min_samples_split < 2 {
            return Err(ModelError::InvalidConfig("min_samples_split must be >= 2".into()));
        }
        if self.tree.min_samples_leaf == 0 {
            return Err(ModelError::InvalidConfig("min_samples_leaf must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GradientBoostingRegressor {
    config: BoostingConfig,
}

impl GradientBoostingRegressor {
    pub fn new(config: BoostingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }
}

impl Regressor for GradientBoostingRegressor {
    type Fitted = GradientBoostedTrees;

    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<GradientBoostedTrees, ModelError> {
        self.config.validate()?;
        let n_features = check_training_set(x, y)?;

        let init = y.iter().sum::<f64>() / y.len() as f64;
        let mut current = vec![init; y.len()];
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for stage in 0..self.config.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&current).map(|(t, p)| t - p).collect();
            let tree = RegressionTree::fit(x, &residuals, &self.config.tree);
            for (pred, row) in current.iter_mut().zip(x) {
                *pred += self.config.learning_rate * tree.predict(row);
            }
            trees.push(tree);

            if (stage + 1) % 25 == 0 {
                debug!(stage = stage + 1, train_mse = mse(y, &current), "boosting progress");
            }
        }

        Ok(GradientBoostedTrees {
            n_features,
            init,
            learning_rate: self.config.learning_rate,
            trees,
        })
    }
}

/// Fitted ensemble: `init + learning_rate * sum(tree(x))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    n_features: usize,
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    /// Assembles an ensemble from existing trees.
    pub fn from_parts(
        n_features: usize,
        init: f64,
        learning_rate: f64,
        trees: Vec<RegressionTree>,
    ) -> Result<Self, ModelError> {
        let model = Self {
            n_features,
            init,
            learning_rate,
            trees,
        };
        if !model.is_well_formed() {
            return Err(ModelError::InvalidConfig("malformed ensemble".into()));
        }
        Ok(model)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_well_formed(&self) -> bool {
        self.n_features > 0
            && self.init.is_finite()
            && self.learning_rate.is_finite()
            && self.trees.iter().all(|t| t.is_well_formed(self.n_features))
    }
}

impl FittedRegressor for GradientBoostedTrees {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_row(&self, x: &[f64]) -> Result<f64, ModelError> {
        if x.len() != self.n_features {
            return Err(ModelError::FeatureMismatch {
                expected: self.n_features,
                got: x.len(),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite("prediction input"));
        }
        Ok(self
            .trees
            .iter()
            .fold(self.init, |acc, tree| acc + self.learning_rate * tree.predict(x)))
    }
}

fn check_training_set(x: &[Vec<f64>], y: &[f64]) -> Result<usize, ModelError> {
    if x.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    if x.len() != y.len() {
        return Err(ModelError::LengthMismatch {
            rows: x.len(),
            targets: y.len(),
        });
    }
    let n_features = x[0].len();
    if n_features == 0 {
        return Err(ModelError::FeatureMismatch {
            expected: 1,
            got: 0,
        });
    }
    if let Some(row) = x.iter().find(|r| r.len() != n_features) {
        return Err(ModelError::FeatureMismatch {
            expected: n_features,
            got: row.len(),
        });
    }
    if x.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite("features"));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite("targets"));
    }
    Ok(n_features)
}

fn mse(y: &[f64], pred: &[f64]) -> f64 {
    y.iter().zip(pred).map(|(a, b)| (a - b) * (a - b)).sum::<f64>() / y.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tree::Node;

    fn toy_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64, (i % 7) as f64])
            .collect();
        let y = x.iter().map(|r| 0.5 * r[0] + 2.0 * r[1]).collect();
        (x, y)
    }

    #[test]
    fn boosting_reduces_training_error() {
        let (x, y) = toy_data();
        let model = GradientBoostingRegressor::default().fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();

        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let baseline = mse(&y, &vec![mean; y.len()]);
        assert!(mse(&y, &preds) < baseline * 0.05);
        assert_eq!(model.n_trees(), 100);
    }

    #[test]
    fn fitting_is_deterministic() {
        let (x, y) = toy_data();
        let a = GradientBoostingRegressor::default().fit(&x, &y).unwrap();
        let b = GradientBoostingRegressor::default().fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hand_built_ensemble_sums_stages() {
        let tree = RegressionTree::from_nodes(vec![
            Node::Split {
                feature: 1,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: -1.0 },
            Node::Leaf { value: 1.0 },
        ])
        .unwrap();
        let model = GradientBoostedTrees::from_parts(2, 2.0, 0.5, vec![tree.clone(), tree]).unwrap();

        assert_eq!(model.predict_row(&[9.0, -3.0]).unwrap(), 1.0);
        assert_eq!(model.predict_row(&[9.0, 3.0]).unwrap(), 3.0);
    }

    #[test]
    fn rejects_bad_inputs() {
        let (x, y) = toy_data();
        let reg = GradientBoostingRegressor::default();

        assert_eq!(reg.fit(&[], &[]), Err(ModelError::EmptyTrainingSet));
        assert!(matches!(
            reg.fit(&x, &y[..3]),
            Err(ModelError::LengthMismatch { .. })
        ));

        let model = reg.fit(&x, &y).unwrap();
        assert!(matches!(
            model.predict_row(&[1.0]),
            Err(ModelError::FeatureMismatch { expected: 2, got: 1 })
        ));
        assert_eq!(
            model.predict_row(&[f64::NAN, 1.0]),
            Err(ModelError::NonFinite("prediction input"))
        );
    }

    #[test]
    fn invalid_config_is_reported() {
        let (x, y) = toy_data();
        let config = BoostingConfig {
            learning_rate: 0.0,
            ..BoostingConfig::default()
        };
        assert!(matches!(
            GradientBoostingRegressor::new(config).fit(&x, &y),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn feature_index_out_of_range_is_malformed() {
        let tree = RegressionTree::from_nodes(vec![
            Node::Split {
                feature: 5,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: 0.0 },
            Node::Leaf { value: 0.0 },
        ])
        .unwrap();
        assert!(GradientBoostedTrees::from_parts(2, 0.0, 0.1, vec![tree]).is_err());
    }
}
