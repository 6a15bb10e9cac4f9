//! Error types for the HTTP API.
//!
//! Every handler returns `Result<_, ApiError>`. Core and database errors
//! convert with `?`, and the response body is always
//! `{ "code": "SCREAMING_SNAKE", "message": "..." }`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use shopdesk_core::CoreError;
use shopdesk_db::DbError;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// A business rule rejected an otherwise well-formed request.
    #[error("{message}")]
    Unprocessable { code: &'static str, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code: "BAD_REQUEST",
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{} not found: {}", entity, id))
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn unprocessable(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Unprocessable {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::BadRequest { code, .. }
            | ApiError::Conflict { code, .. }
            | ApiError::Unprocessable { code, .. } => *code,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match self {
            ApiError::Internal(detail) => {
                error!(%detail, "Request failed");
                "Internal server error".to_string()
            }
            other => {
                warn!(status = status.as_u16(), code, error = %other, "Request rejected");
                other.to_string()
            }
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();

        match &err {
            CoreError::Validation(inner) => ApiError::Validation(inner.to_string()),
            CoreError::ProductNotFound(_) => ApiError::NotFound(message),
            CoreError::InsufficientStock { .. } => ApiError::conflict("INSUFFICIENT_STOCK", message),
            CoreError::DayClosed => ApiError::conflict("DAY_CLOSED", message),
            CoreError::DayAlreadyOpen { .. } => ApiError::conflict("DAY_ALREADY_OPEN", message),
            CoreError::DayAlreadyClosed { .. } => ApiError::conflict("DAY_ALREADY_CLOSED", message),
            CoreError::InvalidStatusTransition { .. } => {
                ApiError::conflict("INVALID_STATUS_TRANSITION", message)
            }
            CoreError::CannotVoid { .. } => ApiError::conflict("CANNOT_VOID", message),
            CoreError::InsufficientCash { .. } => ApiError::unprocessable("INSUFFICIENT_CASH", message),
            CoreError::CustomerRequired => ApiError::unprocessable("CUSTOMER_REQUIRED", message),
            CoreError::InvoiceClosed { .. } => ApiError::unprocessable("INVOICE_CLOSED", message),
            CoreError::Overpayment { .. } => ApiError::unprocessable("OVERPAYMENT", message),
            CoreError::AmountOverflow(_) => ApiError::unprocessable("AMOUNT_OUT_OF_RANGE", message),
            CoreError::InsufficientHistory { .. } => {
                ApiError::unprocessable("INSUFFICIENT_HISTORY", message)
            }
            CoreError::MalformedBackup(_) => ApiError::BadRequest {
                code: "MALFORMED_BACKUP",
                message,
            },
            CoreError::Export(_) => ApiError::Internal(message),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::conflict("DUPLICATE", err.to_string()),
            DbError::ForeignKeyViolation { .. } => {
                ApiError::conflict("REFERENCE_CONFLICT", err.to_string())
            }
            DbError::Conflict(message) => ApiError::conflict("CONFLICT", message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            code: "INVALID_BODY",
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest {
            code: "INVALID_QUERY",
            message: rejection.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shopdesk_core::{Money, ValidationError};

    #[test]
    fn test_core_error_status_mapping() {
        let cases: Vec<(CoreError, StatusCode, &str)> = vec![
            (
                ValidationError::required("name").into(),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                CoreError::InsufficientStock {
                    product: "Tea".into(),
                    available: 1,
                    requested: 2,
                },
                StatusCode::CONFLICT,
                "INSUFFICIENT_STOCK",
            ),
            (
                CoreError::DayAlreadyOpen {
                    date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                },
                StatusCode::CONFLICT,
                "DAY_ALREADY_OPEN",
            ),
            (
                CoreError::Overpayment {
                    outstanding: Money::from_cents(100),
                    requested: Money::from_cents(200),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
                "OVERPAYMENT",
            ),
            (
                CoreError::MalformedBackup("bad".into()),
                StatusCode::BAD_REQUEST,
                "MALFORMED_BACKUP",
            ),
            (
                CoreError::AmountOverflow("$1.00 x 9".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "AMOUNT_OUT_OF_RANGE",
            ),
            (
                CoreError::ProductNotFound("p-1".into()),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status(), status, "{}", api);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn test_db_error_status_mapping() {
        let dup: ApiError = DbError::duplicate("name", "Tea").into();
        assert_eq!(dup.status(), StatusCode::CONFLICT);
        assert_eq!(dup.code(), "DUPLICATE");

        let missing: ApiError = DbError::not_found("Product", "p-1").into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let internal: ApiError = DbError::QueryFailed("disk I/O error".into()).into();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
