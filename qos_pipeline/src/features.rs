//! Feature derivation: raw observation to an ordered feature row.
//!
//! Both the training driver and the prediction endpoint go through
//! [`derive_features`]; the only difference between them is the
//! [`DerivationMode`], which decides what happens when no hour source exists.

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::PreprocessingError;
use crate::observation::RawObservation;
use crate::schema::{ColumnKind, FeatureSchema, TIMESTAMP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMode {
    /// Rows without `Hour` or `timestamp` are rejected.
    Training,
    /// Rows without `Hour` or `timestamp` use the hour of `now`.
    Serving { now: DateTime<Utc> },
}

/// One derived column value before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    /// `None` when the category was not supplied.
    Category(Option<String>),
}

/// A default that was substituted during derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivationWarning {
    MissingFeature { column: String },
    HourFromClock { hour: u32 },
}

impl fmt::Display for DerivationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivationWarning::MissingFeature { column } => {
                write!(f, "missing feature '{column}' defaulted")
            }
            DerivationWarning::HourFromClock { hour } => {
                write!(f, "no Hour or timestamp; used current hour {hour}")
            }
        }
    }
}

/// Derived values in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    values: Vec<FeatureValue>,
}

impl FeatureRow {
    pub fn new(values: Vec<FeatureValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn number(&self, index: usize) -> Option<f64> {
        match self.values.get(index)? {
            FeatureValue::Number(v) => Some(*v),
            FeatureValue::Category(_) => None,
        }
    }

    pub fn category(&self, index: usize) -> Option<&str> {
        match self.values.get(index)? {
            FeatureValue::Category(c) => c.as_deref(),
            FeatureValue::Number(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    pub row: FeatureRow,
    pub warnings: Vec<DerivationWarning>,
}

pub fn derive_features(
    raw: &RawObservation,
    schema: &FeatureSchema,
    mode: DerivationMode,
) -> Result<Derived, PreprocessingError> {
    let mut values = Vec::with_capacity(schema.len());
    let mut warnings = Vec::new();

    for column in &schema.columns {
        let name = column.name.as_str();
        let value = match column.kind {
            ColumnKind::Numeric => match numeric(raw.get(name), name)? {
                Some(v) => FeatureValue::Number(v),
                None => {
                    warnings.push(DerivationWarning::MissingFeature {
                        column: name.to_string(),
                    });
                    FeatureValue::Number(0.0)
                }
            },
            ColumnKind::Hour => {
                let hour = derive_hour(raw, name, mode, &mut warnings)?;
                FeatureValue::Number(f64::from(hour))
            }
            ColumnKind::Categorical => {
                let category = categorical(raw.get(name), name)?;
                if category.is_none() {
                    warnings.push(DerivationWarning::MissingFeature {
                        column: name.to_string(),
                    });
                }
                FeatureValue::Category(category)
            }
        };
        values.push(value);
    }

    Ok(Derived {
        row: FeatureRow::new(values),
        warnings,
    })
}

/// Hour of day (UTC) for a Unix timestamp in seconds.
pub fn hour_from_timestamp(seconds: f64) -> Result<u32, PreprocessingError> {
    if !seconds.is_finite() {
        return Err(PreprocessingError::MalformedTimestamp(seconds.to_string()));
    }
    DateTime::from_timestamp(seconds.floor() as i64, 0)
        .map(|dt| dt.hour())
        .ok_or_else(|| PreprocessingError::MalformedTimestamp(seconds.to_string()))
}

fn derive_hour(
    raw: &RawObservation,
    name: &str,
    mode: DerivationMode,
    warnings: &mut Vec<DerivationWarning>,
) -> Result<u32, PreprocessingError> {
    if let Some(value) = raw.get(name) {
        return explicit_hour(value, name);
    }

    if let Some(value) = raw.get(TIMESTAMP) {
        let seconds = match numeric(Some(value), TIMESTAMP) {
            Ok(Some(s)) => s,
            _ => return Err(PreprocessingError::MalformedTimestamp(value.to_string())),
        };
        return hour_from_timestamp(seconds);
    }

    match mode {
        DerivationMode::Training => Err(PreprocessingError::MissingHourSource),
        DerivationMode::Serving { now } => {
            let hour = now.hour();
            warnings.push(DerivationWarning::HourFromClock { hour });
            Ok(hour)
        }
    }
}

fn explicit_hour(value: &Value, name: &str) -> Result<u32, PreprocessingError> {
    let hour = numeric(Some(value), name)?
        .ok_or_else(|| PreprocessingError::HourOutOfRange(value.to_string()))?;
    if hour.fract() != 0.0 || !(0.0..=23.0).contains(&hour) {
        return Err(PreprocessingError::HourOutOfRange(value.to_string()));
    }
    Ok(hour as u32)
}

/// `Ok(None)` means absent or NaN, which the caller fills with 0.
fn numeric(value: Option<&Value>, column: &str) -> Result<Option<f64>, PreprocessingError> {
    let parsed = match value {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => return Err(invalid_type(column, "number", value)),
        },
        Some(other) => return Err(invalid_type(column, "number", Some(other))),
    };
    Ok(parsed.filter(|v| v.is_finite()))
}

fn categorical(value: Option<&Value>, column: &str) -> Result<Option<String>, PreprocessingError> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(invalid_type(column, "string", Some(other))),
    }
}

fn invalid_type(column: &str, expected: &'static str, got: Option<&Value>) -> PreprocessingError {
    PreprocessingError::InvalidType {
        column: column.to_string(),
        expected,
        got: got.map(Value::to_string).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn full_request() -> RawObservation {
        RawObservation::from_json(json!({
            "Latitude": 1.0,
            "Longitude": 2.0,
            "Altitude": 10.0,
            "speed_kmh": 50.0,
            "Hour": 14,
            "temperature": 20.0,
            "humidity": 50.0,
            "windSpeed": 5.0,
            "pressure": 1013.0,
            "operator": "MTN",
            "device_id": "ignored"
        }))
        .unwrap()
    }

    fn serving_at(hour: u32) -> DerivationMode {
        DerivationMode::Serving {
            now: Utc.with_ymd_and_hms(2024, 3, 1, hour, 30, 0).unwrap(),
        }
    }

    #[test]
    fn explicit_hour_row_is_deterministic() {
        let schema = FeatureSchema::throughput();
        let a = derive_features(&full_request(), &schema, serving_at(3)).unwrap();
        let b = derive_features(&full_request(), &schema, serving_at(9)).unwrap();

        assert_eq!(a, b);
        assert!(a.warnings.is_empty());
        assert_eq!(a.row.len(), 10);
        assert_eq!(a.row.number(4), Some(14.0));
        assert_eq!(a.row.number(8), Some(1013.0));
        assert_eq!(a.row.category(9), Some("MTN"));
    }

    #[test]
    fn epoch_is_midnight_utc() {
        assert_eq!(hour_from_timestamp(0.0).unwrap(), 0);
        assert_eq!(hour_from_timestamp(1_700_000_000.0).unwrap(), 22);
        assert_eq!(hour_from_timestamp(-1.0).unwrap(), 23);
    }

    #[test]
    fn explicit_hour_wins_over_timestamp() {
        let raw = full_request().with("timestamp", 0);
        let derived = derive_features(&raw, &FeatureSchema::throughput(), DerivationMode::Training)
            .unwrap();
        assert_eq!(derived.row.number(4), Some(14.0));
    }

    #[test]
    fn clock_fallback_only_when_serving() {
        let raw = RawObservation::new().with("operator", "MTN");
        let schema = FeatureSchema::throughput();

        let served = derive_features(&raw, &schema, serving_at(17)).unwrap();
        assert_eq!(served.row.number(4), Some(17.0));
        assert!(served
            .warnings
            .contains(&DerivationWarning::HourFromClock { hour: 17 }));

        assert_eq!(
            derive_features(&raw, &schema, DerivationMode::Training),
            Err(PreprocessingError::MissingHourSource)
        );
    }

    #[test]
    fn missing_numeric_defaults_to_zero_with_warning() {
        let raw = RawObservation::new()
            .with("timestamp", 3600)
            .with("operator", "Glo")
            .with("humidity", serde_json::Value::Null);
        let derived =
            derive_features(&raw, &FeatureSchema::throughput(), serving_at(0)).unwrap();

        assert_eq!(derived.row.number(0), Some(0.0));
        assert_eq!(derived.row.number(4), Some(1.0));
        assert_eq!(derived.row.number(6), Some(0.0));
        assert_eq!(derived.warnings.len(), 8);
        assert!(derived.warnings.contains(&DerivationWarning::MissingFeature {
            column: "humidity".into()
        }));
    }

    #[test]
    fn missing_operator_is_an_absent_category() {
        let raw = full_request();
        let mut map = raw.as_map().clone();
        map.remove("operator");
        let derived = derive_features(
            &RawObservation::from(map),
            &FeatureSchema::throughput(),
            serving_at(0),
        )
        .unwrap();
        assert_eq!(derived.row.values()[9], FeatureValue::Category(None));
    }

    #[test]
    fn csv_strings_parse_like_json_numbers() {
        let headers = csv::StringRecord::from(vec![
            "Latitude", "Longitude", "Altitude", "speed_kmh", "timestamp", "temperature",
            "humidity", "windSpeed", "pressure", "operator",
        ]);
        let record = csv::StringRecord::from(vec![
            "1.0", "2.0", "10.0", "50.0", "1700000000", "20.0", "50.0", "5.0", "1013.0", "MTN",
        ]);
        let from_csv = RawObservation::from_csv_record(&headers, &record);
        let from_json = RawObservation::from_json(json!({
            "Latitude": 1.0, "Longitude": 2.0, "Altitude": 10.0, "speed_kmh": 50.0,
            "timestamp": 1700000000, "temperature": 20.0, "humidity": 50.0,
            "windSpeed": 5.0, "pressure": 1013.0, "operator": "MTN"
        }))
        .unwrap();

        let schema = FeatureSchema::throughput();
        let a = derive_features(&from_csv, &schema, DerivationMode::Training).unwrap();
        let b = derive_features(&from_json, &schema, DerivationMode::Training).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.row.number(4), Some(22.0));
    }

    #[test]
    fn bad_types_are_preprocessing_errors() {
        let schema = FeatureSchema::throughput();

        let raw = full_request().with("pressure", "high");
        assert!(matches!(
            derive_features(&raw, &schema, serving_at(0)),
            Err(PreprocessingError::InvalidType { .. })
        ));

        let raw = RawObservation::new().with("timestamp", json!({"s": 1}));
        assert!(matches!(
            derive_features(&raw, &schema, serving_at(0)),
            Err(PreprocessingError::MalformedTimestamp(_))
        ));

        let raw = full_request().with("Hour", 24);
        assert!(matches!(
            derive_features(&raw, &schema, serving_at(0)),
            Err(PreprocessingError::HourOutOfRange(_))
        ));

        let raw = full_request().with("operator", true);
        assert!(matches!(
            derive_features(&raw, &schema, serving_at(0)),
            Err(PreprocessingError::InvalidType { .. })
        ));
    }
}
