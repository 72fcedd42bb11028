//! Service error types with HTTP status code mapping.
//!
//! [`PointsError`] is the central error type for the HTTP layer. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::LedgerError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "request validation failed",
///     "errors": ["payer must not be null or blank"]
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see [`PointsError::error_code`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Itemized field errors for validation failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                 |
/// |-----------|------------|-----------------------------|
/// | 1000–1999 | Validation | 400 Bad Request             |
/// | 3000–3999 | Server     | 500 Internal Server Error   |
/// | 4000–4999 | Ledger     | 400 / 422                   |
#[derive(Debug, thiserror::Error)]
pub enum PointsError {
    /// Request could not be read (malformed JSON, bad path, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// One or more request fields failed validation.
    #[error("request validation failed")]
    ValidationFailed(Vec<String>),

    /// Error raised by the ledger engine.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PointsError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::ValidationFailed(_) => 1002,
            Self::Ledger(LedgerError::InvalidDeduction { .. }) => 4001,
            Self::Ledger(LedgerError::BalanceOverflow { .. }) => 4002,
            Self::Ledger(LedgerError::NonPositiveDeduction(_)) => 4003,
            Self::Ledger(LedgerError::IncompatiblePayer { .. }) => 3002,
            Self::Ledger(LedgerError::Inconsistent(_)) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::ValidationFailed(_)
            | Self::Ledger(LedgerError::InvalidDeduction { .. }) => StatusCode::BAD_REQUEST,
            Self::Ledger(
                LedgerError::BalanceOverflow { .. } | LedgerError::NonPositiveDeduction(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Ledger(LedgerError::IncompatiblePayer { .. } | LedgerError::Inconsistent(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PointsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{self}");
        }
        let code = self.error_code();
        let message = self.to_string();
        let errors = match self {
            Self::ValidationFailed(errors) => errors,
            _ => Vec::new(),
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message,
                details: None,
                errors,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
