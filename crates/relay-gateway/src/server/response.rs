//! HTTP error responses
//!
//! Maps relay and application errors onto `ErrorResponse` JSON bodies.

use crate::error::RelayError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_common::{AppError, ErrorResponse};
use relay_core::AuthError;

/// Error returned by the HTTP handlers
#[derive(Debug)]
pub struct HttpError(pub AppError);

impl HttpError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for HttpError {
    fn from(err: AuthError) -> Self {
        Self(AppError::from(err))
    }
}

impl From<RelayError> for HttpError {
    fn from(err: RelayError) -> Self {
        let app = match err {
            RelayError::Validation(message) => AppError::Validation(message),
            RelayError::InvalidState(state) => {
                AppError::Validation(format!("Connection is {state}"))
            }
            RelayError::Unauthenticated => AppError::MissingAuth,
            RelayError::Persistence { message, .. } => AppError::Unavailable(message.to_string()),
            RelayError::AuthFailure(e) => AppError::from(e),
        };
        Self(app)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self.0, "Server error occurred");
        }

        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// Result type for HTTP handlers
pub type HttpResult<T> = Result<T, HttpError>;
