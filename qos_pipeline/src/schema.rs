//! Ordered feature schema shared by training and serving.
//!
//! The schema is persisted inside the model artifact; serving derives features
//! in the artifact's column order rather than in whatever order the current
//! code would use.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ArtifactError;

/// Bump when the meaning of a column kind or the derivation rules change.
pub const SCHEMA_VERSION: u32 = 1;

pub const HOUR: &str = "Hour";
pub const TIMESTAMP: &str = "timestamp";
pub const TARGET: &str = "target";
pub const OPERATOR: &str = "operator";

/// How a column is obtained from a raw observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Read as a float, defaulting to 0 when absent.
    Numeric,
    /// Explicit hour, else derived from `timestamp` in UTC.
    Hour,
    /// String category passed through an ordinal encoder.
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub kind: ColumnKind,
}

impl FeatureColumn {
    fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    /// Column layout of the throughput model.
    pub fn throughput() -> Self {
        use ColumnKind::*;
        let columns = [
            ("Latitude", Numeric),
            ("Longitude", Numeric),
            ("Altitude", Numeric),
            ("speed_kmh", Numeric),
            (HOUR, Hour),
            ("temperature", Numeric),
            ("humidity", Numeric),
            ("windSpeed", Numeric),
            ("pressure", Numeric),
            (OPERATOR, Categorical),
        ]
        .into_iter()
        .map(|(name, kind)| FeatureColumn::new(name, kind))
        .collect();

        Self {
            version: SCHEMA_VERSION,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Keys a prediction request must carry. The hour column is optional
    /// because it can come from `timestamp` or the clock.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.kind != ColumnKind::Hour)
            .map(|c| c.name.as_str())
    }

    pub fn categorical_columns(&self) -> impl Iterator<Item = (usize, &FeatureColumn)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ColumnKind::Categorical)
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.version != SCHEMA_VERSION {
            return Err(ArtifactError::UnsupportedSchema {
                found: self.version,
                expected: SCHEMA_VERSION,
            });
        }
        if self.columns.is_empty() {
            return Err(ArtifactError::Inconsistent("schema has no columns".into()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ArtifactError::Inconsistent(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }

        let hours = self
            .columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Hour)
            .count();
        if hours > 1 {
            return Err(ArtifactError::Inconsistent(
                "more than one hour column".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::throughput()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_column_order() {
        let schema = FeatureSchema::throughput();
        let names: Vec<_> = schema.names().collect();
        assert_eq!(
            names,
            [
                "Latitude",
                "Longitude",
                "Altitude",
                "speed_kmh",
                "Hour",
                "temperature",
                "humidity",
                "windSpeed",
                "pressure",
                "operator"
            ]
        );
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn hour_is_not_a_required_key() {
        let schema = FeatureSchema::throughput();
        let required: Vec<_> = schema.required_keys().collect();
        assert_eq!(required.len(), 9);
        assert!(!required.contains(&HOUR));
        assert!(required.contains(&OPERATOR));
    }

    #[test]
    fn rejects_other_versions() {
        let mut schema = FeatureSchema::throughput();
        schema.version = SCHEMA_VERSION + 1;
        assert!(matches!(
            schema.validate(),
            Err(ArtifactError::UnsupportedSchema { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let mut schema = FeatureSchema::throughput();
        schema.columns.push(FeatureColumn::new("Latitude", ColumnKind::Numeric));
        assert!(matches!(
            schema.validate(),
            Err(ArtifactError::Inconsistent(_))
        ));
    }
}
