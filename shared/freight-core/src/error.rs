//! Error types shared by every component of the schedule aggregator.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FreightError>;

/// Closed error taxonomy for the aggregator's error handling design.
///
/// Transport failures, upstream 5xx/4xx, paging, and per-schedule validation
/// failures are absorbed by the task manager, HTTP facade, and aggregator
/// respectively and never reach this type — it only carries the conditions
/// allowed to propagate to the request boundary: bad request parameters,
/// total cache/config failure, and genuinely unexpected internal errors.
#[derive(Error, Debug)]
pub enum FreightError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("upstream unreachable")]
    Unavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl FreightError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::InvalidRequest(_) => 422,
            Self::Unavailable => 503,
            Self::Internal(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<std::io::Error> for FreightError {
    fn from(err: std::io::Error) -> Self {
        FreightError::Internal(err.to_string())
    }
}
