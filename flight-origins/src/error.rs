//! Error types and HTTP response conversion

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::airport::AirportCode;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
///
/// Request-time variants (`InvalidInput` through `Unexpected`) are recovered at
/// the request boundary. `Config` and `Io` only surface during startup.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be extracted
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Configuration was extracted but is not usable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Airport code is not exactly three characters
    #[error("Invalid airport code: {0:?}")]
    InvalidInput(String),

    /// The upstream call exceeded its deadline
    #[error("Upstream request timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// The upstream answered with a non-success status
    #[error("Upstream returned {status}: {body}")]
    Upstream {
        /// HTTP status code returned by the provider
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// The schedule contained no arrival with a resolvable origin country
    #[error("No flight data found for airport code: {0}")]
    NoDataFound(AirportCode),

    /// Rejected by the per-client rate limiter
    #[error("Rate limit exceeded")]
    TooManyRequests {
        /// Earliest time after which the client may retry
        retry_after: Duration,
    },

    /// Anything not classified above
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// HTTP status used when this error reaches a client
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Error::NoDataFound(_) => StatusCode::NOT_FOUND,
            Error::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Config(_)
            | Error::InvalidConfig(_)
            | Error::Io(_)
            | Error::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for JSON bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) => "CONFIG_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::InvalidInput(_) => "INVALID_AIRPORT_CODE",
            Error::Timeout(_) => "UPSTREAM_TIMEOUT",
            Error::Upstream { .. } => "UPSTREAM_ERROR",
            Error::NoDataFound(_) => "NO_DATA_FOUND",
            Error::TooManyRequests { .. } => "RATE_LIMIT_EXCEEDED",
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
        }
    }

    /// Message shown to the person who submitted the form
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidInput(_) => "Please enter a valid 3-letter airport code".to_string(),
            Error::Timeout(after) => format!(
                "Request timed out after {} seconds. The airport might have too many flights \
                 to process. Please try again or try a different airport.",
                after.as_secs()
            ),
            Error::Upstream { status, body } => format!("API Error: {} - {}", status, body),
            Error::NoDataFound(code) => {
                format!("No flight data found for airport code: {}", code)
            }
            Error::TooManyRequests { retry_after } => format!(
                "Too many requests. Please wait {} seconds and try again.",
                retry_after.as_secs().max(1)
            ),
            Error::Unexpected(msg) => format!("An unexpected error occurred: {}", msg),
            Error::Config(_) | Error::InvalidConfig(_) | Error::Io(_) => {
                "An unexpected error occurred: service misconfigured".to_string()
            }
        }
    }

    /// Emit the server-side log line for this error
    pub fn log(&self) {
        match self {
            Error::InvalidInput(raw) => tracing::debug!(input = %raw, "Rejected airport code"),
            Error::NoDataFound(code) => tracing::info!(airport = %code, "No arrivals found"),
            Error::TooManyRequests { .. } => tracing::warn!("Rate limit exceeded"),
            Error::Timeout(after) => tracing::warn!(timeout = ?after, "Upstream timed out"),
            Error::Upstream { status, .. } => {
                tracing::warn!(status = *status, "Upstream returned an error status")
            }
            Error::Unexpected(msg) => tracing::error!("Unexpected error: {}", msg),
            Error::Config(_) | Error::InvalidConfig(_) | Error::Io(_) => {
                tracing::error!("{}", self)
            }
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            status: status.as_u16(),
        }
    }

    /// Create error response with a code
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let body = ErrorResponse::with_code(status, self.code(), self.user_message());
        let mut response = (status, Json(body)).into_response();

        if let Error::TooManyRequests { retry_after } = self {
            let secs = (retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0)).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Unexpected(format!("malformed schedule payload: {}", err))
    }
}
