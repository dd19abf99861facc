//! Ordinal encoding for categorical columns.
//!
//! Categories are sorted lexicographically and numbered from zero. The fitted
//! encoder is persisted with the artifact and never refit at serve time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::PreprocessingError;

/// Ordinal assigned to unknown or missing categories under
/// [`UnknownCategoryPolicy::Sentinel`].
pub const UNKNOWN_ORDINAL: f64 = -1.0;

/// What to do with a category that was not seen during fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Encode as [`UNKNOWN_ORDINAL`].
    #[default]
    Sentinel,
    /// Fail with [`PreprocessingError::UnknownCategory`].
    Reject,
}

impl std::str::FromStr for UnknownCategoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sentinel" => Ok(Self::Sentinel),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown policy '{other}' (expected sentinel|reject)")),
        }
    }
}

/// Unfitted encoder.
#[derive(Debug, Clone, Default)]
pub struct OrdinalEncoder {
    policy: UnknownCategoryPolicy,
}

impl OrdinalEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unknown_policy(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Learns the vocabulary from the non-missing values of one column.
    pub fn fit<'a, I>(&self, column: &str, values: I) -> FittedOrdinalEncoder
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let categories: BTreeSet<&str> = values.into_iter().flatten().collect();
        FittedOrdinalEncoder {
            column: column.to_string(),
            categories: categories.into_iter().map(str::to_string).collect(),
            policy: self.policy,
        }
    }
}

/// Fitted encoder: a sorted vocabulary plus its unknown-category policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedOrdinalEncoder {
    column: String,
    categories: Vec<String>,
    policy: UnknownCategoryPolicy,
}

impl FittedOrdinalEncoder {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }

    /// Ordinal of `value`, or the policy outcome for unknown and missing values.
    pub fn encode(&self, value: Option<&str>) -> Result<f64, PreprocessingError> {
        let found = value.and_then(|v| {
            self.categories
                .binary_search_by(|c| c.as_str().cmp(v))
                .ok()
        });
        match (found, self.policy) {
            (Some(index), _) => Ok(index as f64),
            (None, UnknownCategoryPolicy::Sentinel) => Ok(UNKNOWN_ORDINAL),
            (None, UnknownCategoryPolicy::Reject) => Err(PreprocessingError::UnknownCategory {
                column: self.column.clone(),
                value: value.unwrap_or("<missing>").to_string(),
            }),
        }
    }

    /// Sorted, duplicate-free vocabulary check used when loading an artifact.
    pub fn is_well_formed(&self) -> bool {
        self.categories.windows(2).all(|w| w[0] < w[1])
    }
}
