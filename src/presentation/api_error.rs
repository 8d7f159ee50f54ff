// Mapping of service errors onto HTTP responses
use crate::application::instrument_backend::BackendError;
use crate::domain::calibration::CalibrationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    Calibration(CalibrationError),
    Backend(BackendError),
}

impl From<CalibrationError> for ApiError {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Calibration(CalibrationError::NoSignal) => StatusCode::CONFLICT,
            ApiError::Calibration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Backend(BackendError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Backend(BackendError::InvalidRequest(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Calibration(e) => e.to_string(),
            ApiError::Backend(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.message());
        } else {
            tracing::debug!("Request rejected: {}", self.message());
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
