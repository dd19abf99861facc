//! Variance-stabilising transform applied to the throughput label.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTransform {
    /// `log(1 + y)` before fit, `exp(p) - 1` after predict.
    #[default]
    Log1p,
    Identity,
}

impl TargetTransform {
    pub fn forward(self, y: f64) -> f64 {
        match self {
            TargetTransform::Log1p => y.ln_1p(),
            TargetTransform::Identity => y,
        }
    }

    /// Not clamped: a prediction below zero in log space gives a value in
    /// `(-1, 0)` Mbps.
    pub fn inverse(self, p: f64) -> f64 {
        match self {
            TargetTransform::Log1p => p.exp_m1(),
            TargetTransform::Identity => p,
        }
    }

    /// Labels the forward transform maps to a finite number.
    pub fn accepts(self, y: f64) -> bool {
        match self {
            TargetTransform::Log1p => y.is_finite() && y > -1.0,
            TargetTransform::Identity => y.is_finite(),
        }
    }
}
