//! Loosely-typed raw telemetry as it arrives from a CSV row or a JSON body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw observation: field name to scalar value.
///
/// CSV cells are kept as strings; numeric columns are parsed during feature
/// derivation so both call sites share a single conversion path. A JSON `null`
/// and an empty CSV cell both read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawObservation {
    fields: Map<String, Value>,
}

impl RawObservation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` unless `value` is a JSON object.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Builds an observation from a CSV record, skipping empty cells.
    pub fn from_csv_record(headers: &csv::StringRecord, record: &csv::StringRecord) -> Self {
        let fields = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.trim().is_empty())
            .map(|(name, cell)| (name.trim().to_string(), Value::String(cell.trim().to_string())))
            .collect();
        Self { fields }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Value for `key`, treating `null` as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Whether the key was sent at all, even as `null`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Keys from `required` that were not sent, in the order given.
    pub fn missing_keys<'a, I>(&self, required: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        required
            .into_iter()
            .filter(|key| !self.contains_key(key))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Map<String, Value>> for RawObservation {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
