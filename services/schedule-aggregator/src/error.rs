//! Error types for the schedule-aggregator HTTP surface.
//!
//! Mirrors the taxonomy in [`freight_core::FreightError`] but adds the
//! `axum::response::IntoResponse` mapping the outer layer needs: every
//! variant carries its own status code and machine-readable error code, so
//! a handler can simply `?` an `AggregatorError` out of a request and trust
//! the response shape is correct.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use freight_core::FreightError;
use serde_json::json;

pub type Result<T> = std::result::Result<T, AggregatorError>;

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("upstream unreachable")]
    Unavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<FreightError> for AggregatorError {
    fn from(err: FreightError) -> Self {
        match err {
            FreightError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            FreightError::Unavailable => Self::Unavailable,
            FreightError::Config(msg) | FreightError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl AggregatorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AggregatorError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal error reached the HTTP boundary");
        }

        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.error_code(),
        }));

        (status, body).into_response()
    }
}
