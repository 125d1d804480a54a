//! HTTP error mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::AirWatchError;

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    /// Stable code for programmatic handling
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Error type returned by handlers
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed request parameters
    BadRequest(String),
    /// Failure raised by the aggregation pipeline
    Service(AirWatchError),
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ApiError) {
        match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("BAD_REQUEST", msg.clone()),
            ),
            AppError::Service(err @ AirWatchError::InvalidCoordinate { .. }) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("INVALID_COORDINATE", err.user_message()),
            ),
            AppError::Service(err @ AirWatchError::InvalidMeasurement { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INVALID_MEASUREMENT", err.user_message())
                    .with_details(err.to_string()),
            ),
            AppError::Service(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", err.user_message()).with_details(err.to_string()),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            error!(code = %body.code, "Request failed: {:?}", self);
        }
        (status, Json(body)).into_response()
    }
}

impl From<AirWatchError> for AppError {
    fn from(err: AirWatchError) -> Self {
        AppError::Service(err)
    }
}
