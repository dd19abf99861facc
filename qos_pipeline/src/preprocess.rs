//! Fitted encoding and scaling state, applied identically at both call sites.

use serde::{Deserialize, Serialize};

use crate::encoding::{FittedOrdinalEncoder, OrdinalEncoder, UnknownCategoryPolicy};
use crate::error::{ArtifactError, PreprocessingError};
use crate::features::{FeatureRow, FeatureValue};
use crate::scaling::{FittedStandardScaler, StandardScaler};
use crate::schema::{ColumnKind, FeatureSchema};

/// Scaled numeric features in schema order; what the regressor consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    encoders: Vec<FittedOrdinalEncoder>,
    scaler: FittedStandardScaler,
}

impl Preprocessor {
    pub fn from_parts(encoders: Vec<FittedOrdinalEncoder>, scaler: FittedStandardScaler) -> Self {
        Self { encoders, scaler }
    }

    /// Fits one encoder per categorical column, then the scaler on the full
    /// encoded matrix. Returns the fitted state and the scaled matrix.
    pub fn fit(
        schema: &FeatureSchema,
        rows: &[FeatureRow],
        policy: UnknownCategoryPolicy,
    ) -> Result<(Self, Vec<Vec<f64>>), PreprocessingError> {
        let encoder = OrdinalEncoder::new().with_unknown_policy(policy);
        let encoders = schema
            .categorical_columns()
            .map(|(index, column)| {
                encoder.fit(&column.name, rows.iter().map(|r| r.category(index)))
            })
            .collect();

        let mut fitted = Self {
            encoders,
            scaler: FittedStandardScaler::from_stats(vec![], vec![])?,
        };
        let encoded = rows
            .iter()
            .map(|row| fitted.encode_row(schema, row))
            .collect::<Result<Vec<_>, _>>()?;
        fitted.scaler = StandardScaler::new().fit(&encoded)?;
        let scaled = fitted.scaler.transform(&encoded)?;
        Ok((fitted, scaled))
    }

    /// Encodes categorical columns, leaving numbers unscaled.
    pub fn encode_row(
        &self,
        schema: &FeatureSchema,
        row: &FeatureRow,
    ) -> Result<Vec<f64>, PreprocessingError> {
        if row.len() != schema.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected: schema.len(),
                got: row.len(),
            });
        }

        schema
            .columns
            .iter()
            .zip(row.values())
            .map(|(column, value)| match (column.kind, value) {
                (ColumnKind::Categorical, FeatureValue::Category(category)) => self
                    .encoder(&column.name)
                    .ok_or_else(|| PreprocessingError::UnknownCategory {
                        column: column.name.clone(),
                        value: "<no encoder>".into(),
                    })?
                    .encode(category.as_deref()),
                (ColumnKind::Numeric | ColumnKind::Hour, FeatureValue::Number(v)) => Ok(*v),
                (kind, other) => Err(PreprocessingError::InvalidType {
                    column: column.name.clone(),
                    expected: if kind == ColumnKind::Categorical {
                        "category"
                    } else {
                        "number"
                    },
                    got: format!("{other:?}"),
                }),
            })
            .collect()
    }

    /// Encode then scale with the persisted statistics.
    pub fn transform(
        &self,
        schema: &FeatureSchema,
        row: &FeatureRow,
    ) -> Result<FeatureVector, PreprocessingError> {
        let encoded = self.encode_row(schema, row)?;
        Ok(FeatureVector(self.scaler.transform_row(&encoded)?))
    }

    pub fn encoder(&self, column: &str) -> Option<&FittedOrdinalEncoder> {
        self.encoders.iter().find(|e| e.column() == column)
    }

    pub fn encoders(&self) -> &[FittedOrdinalEncoder] {
        &self.encoders
    }

    pub fn scaler(&self) -> &FittedStandardScaler {
        &self.scaler
    }

    /// Every categorical column has a well-formed encoder and the scaler is as
    /// wide as the schema.
    pub fn check(&self, schema: &FeatureSchema) -> Result<(), ArtifactError> {
        for (_, column) in schema.categorical_columns() {
            match self.encoder(&column.name) {
                Some(encoder) if encoder.is_well_formed() => {}
                Some(_) => {
                    return Err(ArtifactError::Inconsistent(format!(
                        "encoder for '{}' has an unsorted vocabulary",
                        column.name
                    )))
                }
                None => {
                    return Err(ArtifactError::Inconsistent(format!(
                        "no encoder for categorical column '{}'",
                        column.name
                    )))
                }
            }
        }
        if self.scaler.n_features() != schema.len() || !self.scaler.is_well_formed() {
            return Err(ArtifactError::Inconsistent(format!(
                "scaler covers {} features, schema has {}",
                self.scaler.n_features(),
                schema.len()
            )));
        }
        Ok(())
    }
}
