//! Standard (z-score) scaling of the encoded feature matrix.
//!
//! `z = (x - mean) / std`, population standard deviation, zero-variance
//! columns keep a scale of 1.

use serde::{Deserialize, Serialize};

use crate::error::PreprocessingError;

#[derive(Debug, Clone, Default)]
pub struct StandardScaler;

impl StandardScaler {
    pub fn new() -> Self {
        Self
    }

    pub fn fit(&self, rows: &[Vec<f64>]) -> Result<FittedStandardScaler, PreprocessingError> {
        let first = rows.first().ok_or(PreprocessingError::FeatureMismatch {
            expected: 1,
            got: 0,
        })?;
        let cols = first.len();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; cols];
        for row in rows {
            if row.len() != cols {
                return Err(PreprocessingError::FeatureMismatch {
                    expected: cols,
                    got: row.len(),
                });
            }
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; cols];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }
        let scale = var
            .into_iter()
            .zip(&mean)
            .map(|(v, m)| {
                let var = v / n;
                if !var.is_finite() || is_constant(var, *m, n) {
                    1.0
                } else {
                    var.sqrt()
                }
            })
            .collect();

        Ok(FittedStandardScaler { mean, scale })
    }
}

/// A constant column whose mean picked up rounding error still has a tiny
/// nonzero variance; anything under the accumulated error bound counts as zero.
fn is_constant(var: f64, mean: f64, n: f64) -> bool {
    let upper_bound = n * f64::EPSILON * var + (n * mean * f64::EPSILON).powi(2);
    var <= upper_bound
}

/// Persisted per-column statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedStandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl FittedStandardScaler {
    /// Builds a scaler from known statistics.
    pub fn from_stats(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, PreprocessingError> {
        if mean.len() != scale.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected: mean.len(),
                got: scale.len(),
            });
        }
        Ok(Self { mean, scale })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, PreprocessingError> {
        if row.len() != self.n_features() {
            return Err(PreprocessingError::FeatureMismatch {
                expected: self.n_features(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((x, m), s)| (x - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PreprocessingError> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// No zero or non-finite scales, matching lengths.
    pub fn is_well_formed(&self) -> bool {
        self.mean.len() == self.scale.len()
            && self.mean.iter().all(|m| m.is_finite())
            && self.scale.iter().all(|s| s.is_finite() && *s != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centers_and_scales_columns() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = StandardScaler::new().fit(&rows).unwrap();

        assert_eq!(scaler.mean(), [2.0, 10.0]);
        assert_eq!(scaler.scale(), [1.0, 1.0]);
        assert_eq!(
            scaler.transform(&rows).unwrap(),
            vec![vec![-1.0, 0.0], vec![1.0, 0.0]]
        );
    }

    #[test]
    fn population_standard_deviation() {
        let rows = vec![vec![2.0], vec![4.0], vec![4.0], vec![4.0], vec![5.0], vec![5.0], vec![7.0], vec![9.0]];
        let scaler = StandardScaler::new().fit(&rows).unwrap();
        assert_eq!(scaler.mean(), [5.0]);
        assert_eq!(scaler.scale(), [2.0]);
    }

    #[test]
    fn rejects_wrong_width() {
        let scaler = StandardScaler::new().fit(&[vec![1.0, 2.0]]).unwrap();
        assert_eq!(
            scaler.transform_row(&[1.0]),
            Err(PreprocessingError::FeatureMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn constant_column_with_rounding_drift_keeps_unit_scale() {
        let rows = vec![vec![3.3, 0.1]; 150];
        let scaler = StandardScaler::new().fit(&rows).unwrap();
        assert_eq!(scaler.scale(), [1.0, 1.0]);
        for z in scaler.transform_row(&[4.3, 1.1]).unwrap() {
            assert!((z - 1.0).abs() < 1e-9, "{z}");
        }
    }

    #[test]
    fn small_but_real_spread_is_not_constant() {
        let rows = vec![vec![1e-3], vec![2e-3]];
        let scaler = StandardScaler::new().fit(&rows).unwrap();
        assert!((scaler.scale()[0] - 5e-4).abs() < 1e-15);
    }

    #[test]
    fn empty_fit_is_an_error() {
        assert!(StandardScaler::new().fit(&[]).is_err());
    }
}
