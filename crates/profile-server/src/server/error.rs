//! HTTP error responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::protocol::ErrorResponse;
use common::ServiceError;

use crate::validation::FieldErrors;

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// 400 `validation_failed` carrying per-field messages.
    Validation(FieldErrors),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Service(ServiceError::Unauthorized(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Service(ServiceError::NotFound(message.into()))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Service(ServiceError::Conflict(message.into()))
    }

    /// Generic 500; never carries the underlying cause.
    pub fn internal() -> Self {
        Self::Service(ServiceError::Internal("internal server error".into()))
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}

impl From<FieldErrors> for ApiError {
    fn from(fields: FieldErrors) -> Self {
        Self::Validation(fields)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Service(ServiceError::BadRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Service(e) => {
                let status =
                    StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(ErrorResponse::new(e.code(), e.public_message()))).into_response()
            }
            ApiError::Validation(fields) => {
                let body = ErrorResponse::new("validation_failed", "request validation failed")
                    .with_fields(fields);
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}
