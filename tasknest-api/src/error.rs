//! Error handling for the API server
//!
//! Handlers return `ApiResult<T>`; every library error converts into
//! [`ApiError`] through a `From` impl so `?` does the mapping.
//!
//! | Variant | Status | Body |
//! |---|---|---|
//! | `BadRequest(msg)` | 400 | `{"error": msg}` |
//! | `ValidationError(details)` | 400 | `{"error": "validation_error", "message", "details"}` |
//! | `Unauthorized` | 401 | `{"error": "Please authenticate."}` |
//! | `NotFound` | 404 | empty |
//! | `InternalError(msg)` | 500 | generic; `msg` is only logged |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tasknest_shared::{
    accounts::AccountError,
    auth::AuthError,
    avatar::AvatarError,
    models::FieldError,
    store::StoreError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400) with a single message
    BadRequest(String),

    /// Bad request (400) with per-field details
    ValidationError(Vec<FieldError>),

    /// Missing, invalid or revoked session (401)
    Unauthorized,

    /// Not found or not yours (404)
    NotFound,

    /// Internal server error (500)
    InternalError(String),
}

/// Body for validation and internal errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::ValidationError(details) => {
                let body = ErrorResponse {
                    error: "validation_error".to_string(),
                    message: "Request validation failed".to_string(),
                    details: Some(details),
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Please authenticate." })),
            )
                .into_response(),
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                let body = ErrorResponse {
                    error: "internal_error".to_string(),
                    message: "An internal error occurred".to_string(),
                    details: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::ValidationError(vec![FieldError::new(
                "email",
                "Email is already in use",
            )]),
            StoreError::Database(msg) => {
                ApiError::InternalError(format!("Database error: {}", msg))
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_rejection() {
            tracing::debug!(reason = %err, "Request rejected");
            ApiError::Unauthorized
        } else {
            ApiError::InternalError(format!("Authentication lookup failed: {}", err))
        }
    }
}

impl From<AvatarError> for ApiError {
    fn from(err: AvatarError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::InternalError(err.to_string())
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(details) => ApiError::ValidationError(details),
            AccountError::EmailTaken => StoreError::DuplicateEmail.into(),
            AccountError::InvalidCredentials => ApiError::BadRequest("Unable to login".to_string()),
            AccountError::NotFound => ApiError::NotFound,
            AccountError::Auth(e) => e.into(),
            AccountError::Avatar(e) => e.into(),
            AccountError::Password(e) => {
                ApiError::ValidationError(vec![FieldError::new("password", e.to_string())])
            }
            AccountError::Store(e) => e.into(),
            AccountError::Token(e) => ApiError::InternalError(e.to_string()),
            AccountError::Join(msg) => ApiError::InternalError(msg),
        }
    }
}
