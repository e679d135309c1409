//! Ошибки бронирования и их HTTP-представление.
//!
//! Клиент получает машинный `kind` и короткое сообщение. Детали ошибок
//! хранилища и непредвиденных сбоев пишутся только в лог.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::auth::AuthRejection;
use crate::ledger::LedgerError;

/// Уточнение причины 401. Наружу не выдаётся, нужно для диагностики.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    Missing,
    Invalid,
    Expired,
}

impl From<AuthRejection> for AuthFailure {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::Invalid => AuthFailure::Invalid,
            AuthRejection::Expired => AuthFailure::Expired,
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::Missing => write!(f, "missing credential"),
            AuthFailure::Invalid => write!(f, "invalid credential"),
            AuthFailure::Expired => write!(f, "expired credential"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(AuthFailure),

    #[error("owner not found")]
    OwnerNotFound,

    #[error("showtime {0} has no seats")]
    ShowtimeNotFound(String),

    #[error("seats unavailable: {}", .0.join(", "))]
    SeatsUnavailable(Vec<String>),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl BookingError {
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::InvalidRequest(_) => "INVALID_REQUEST",
            BookingError::Unauthorized(_) => "UNAUTHORIZED",
            BookingError::OwnerNotFound => "OWNER_NOT_FOUND",
            BookingError::ShowtimeNotFound(_) => "SHOWTIME_NOT_FOUND",
            BookingError::SeatsUnavailable(_) => "SEATS_UNAVAILABLE",
            BookingError::StorageFailure(_) => "STORAGE_FAILURE",
            BookingError::Unexpected(_) => "UNEXPECTED",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BookingError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BookingError::OwnerNotFound
            | BookingError::ShowtimeNotFound(_)
            | BookingError::SeatsUnavailable(_) => StatusCode::NOT_FOUND,
            BookingError::StorageFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Безопасное для клиента сообщение.
    pub fn public_message(&self) -> String {
        match self {
            BookingError::InvalidRequest(reason) => reason.clone(),
            BookingError::Unauthorized(_) => "Invalid or expired token".to_string(),
            BookingError::OwnerNotFound => "User not found".to_string(),
            BookingError::ShowtimeNotFound(showtime_id) => {
                format!("No seats found for showtime with ID: {}", showtime_id)
            }
            BookingError::SeatsUnavailable(_) => {
                "One or more selected seats not found or not available".to_string()
            }
            BookingError::StorageFailure(_) => {
                "Booking could not be completed, please retry".to_string()
            }
            BookingError::Unexpected(_) => "Internal server error".to_string(),
        }
    }
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        if err.is_retryable() {
            BookingError::StorageFailure(err.to_string())
        } else {
            BookingError::Unexpected(err.to_string())
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seats: Option<Vec<String>>,
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        match &self {
            BookingError::StorageFailure(detail) => {
                tracing::error!(error = %detail, "Booking storage failure");
            }
            BookingError::Unexpected(detail) => {
                tracing::error!(error = %detail, "Unexpected booking failure");
            }
            BookingError::Unauthorized(reason) => {
                tracing::debug!(reason = %reason, "Booking rejected as unauthorized");
            }
            _ => {}
        }

        let seats = match &self {
            BookingError::SeatsUnavailable(seats) => Some(seats.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.public_message(),
                seats,
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}
