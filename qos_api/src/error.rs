use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use qos_pipeline::{PipelineError, PreprocessingError};
use thiserror::Error;

use crate::types::ErrorBody;

/// Per-request failures; none of them touch the shared artifact.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Model or scaler not loaded properly")]
    ModelUnavailable,

    #[error("Missing keys: {0:?}")]
    MissingKeys(Vec<String>),

    #[error("Request body must be a JSON object: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingKeys(_) | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(PipelineError::Preprocessing(
                PreprocessingError::UnknownCategory { .. },
            )) => StatusCode::BAD_REQUEST,
            ApiError::ModelUnavailable | ApiError::Pipeline(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "prediction failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qos_pipeline::ModelError;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::MissingKeys(vec!["operator".into()]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::ModelUnavailable.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let malformed: ApiError =
            PipelineError::from(PreprocessingError::MalformedTimestamp("soon".into())).into();
        assert_eq!(malformed.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let unknown: ApiError = PipelineError::from(PreprocessingError::UnknownCategory {
            column: "operator".into(),
            value: "Orange".into(),
        })
        .into();
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

        let model: ApiError = PipelineError::from(ModelError::NonFinite("x")).into();
        assert_eq!(model.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_keys_message_lists_them() {
        let msg = ApiError::MissingKeys(vec!["operator".into(), "pressure".into()]).to_string();
        assert_eq!(msg, r#"Missing keys: ["operator", "pressure"]"#);
    }
}
