use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use qos_pipeline::RawObservation;
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{HealthResponse, PredictResponse};
use crate::AppState;

pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let artifact = state.artifact.as_deref().ok_or(ApiError::ModelUnavailable)?;

    let Json(body) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let raw = RawObservation::from_json(body)
        .ok_or_else(|| ApiError::InvalidBody("expected an object".into()))?;
    tracing::info!(fields = raw.len(), "Received prediction request");

    // Hour is derived, so only the raw keys are required.
    let missing = raw.missing_keys(artifact.schema().required_keys());
    if !missing.is_empty() {
        return Err(ApiError::MissingKeys(missing));
    }

    let prediction = artifact.predict(&raw, Utc::now())?;
    if state.log_predictions {
        let sample: Vec<String> = artifact
            .schema()
            .names()
            .zip(prediction.features.as_slice())
            .map(|(name, v)| format!("{name}={v:.3}"))
            .collect();
        tracing::info!("scaled features [{}]", sample.join(", "));
    }
    tracing::info!(throughput = prediction.throughput_mbps, "Throughput prediction");

    Ok(Json(PredictResponse::success(
        prediction.throughput_mbps,
        prediction.evaluated_at.to_rfc3339(),
        &prediction.warnings,
    )))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let loaded = state.artifact.is_some();
    Json(HealthResponse {
        status: if loaded { "healthy" } else { "unhealthy" }.to_string(),
        message: "API is running".to_string(),
        model_loaded: loaded,
        // encoder and scaler ship inside the same artifact
        scaler_loaded: loaded,
        timestamp: Utc::now().to_rfc3339(),
    })
}
