//! Consistent error responses.
//!
//! Authentication failures collapse to a generic 401 here; the specific cause
//! is logged, never returned. `Forbidden` stays distinct (403).

use axum::http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use classifieds_auth::AuthError;
use classifieds_core::DomainError;
use classifieds_infra::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid identifier")]
    InvalidId,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::InvalidId(_) => ApiError::InvalidId,
            DomainError::NotFound => ApiError::NotFound("record"),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ApiError::NotFound("record"),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(e) => auth_error_to_response(e),
            ApiError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::InvalidId => json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid identifier"),
            ApiError::NotFound(what) => {
                json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
            }
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
            }
        }
    }
}

fn auth_error_to_response(err: AuthError) -> Response {
    if err.is_server_fault() {
        tracing::error!(cause = err.kind(), error = %err, "authentication backend failure");
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error");
    }

    match err {
        AuthError::Forbidden => {
            json_error(StatusCode::FORBIDDEN, "forbidden", "not enough permissions")
        }
        AuthError::InvalidCredentials => unauthorized("invalid username or password"),
        other => {
            tracing::warn!(cause = other.kind(), "authentication rejected");
            unauthorized("unauthorized")
        }
    }
}

fn unauthorized(message: &'static str) -> Response {
    let mut response = json_error(StatusCode::UNAUTHORIZED, "unauthorized", message);
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
