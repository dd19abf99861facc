use qos_pipeline::DerivationWarning;
use serde::{Deserialize, Serialize};

pub const UNIT_MBPS: &str = "Mbps";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PredictResponse {
    pub throughput: f64,
    pub unit: String,
    pub status: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PredictResponse {
    pub fn success(throughput: f64, timestamp: String, warnings: &[DerivationWarning]) -> Self {
        Self {
            throughput,
            unit: UNIT_MBPS.to_string(),
            status: "success".to_string(),
            timestamp,
            warnings: warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub status: String, // "healthy" | "unhealthy"
    pub message: String,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub error: String,
}
