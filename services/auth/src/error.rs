//! Error types for the session service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{CacheError, DatabaseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors raised by the session subsystem
#[derive(Error, Debug)]
pub enum AuthError {
    /// The submitted email/password pair did not match a stored identity
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A provisioning request was rejected before reaching the store
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A protected route was requested without an authenticated session
    #[error("Unauthorized")]
    Unauthenticated,

    /// The session store or user directory could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Anything else that prevents the request from completing
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CacheError> for AuthError {
    fn from(e: CacheError) -> Self {
        AuthError::StoreUnavailable(e.to_string())
    }
}

impl From<DatabaseError> for AuthError {
    fn from(e: DatabaseError) -> Self {
        AuthError::StoreUnavailable(e.to_string())
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::StoreUnavailable(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AuthError::InvalidCredentials | AuthError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            AuthError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AuthError::StoreUnavailable(detail)
            | AuthError::Configuration(detail)
            | AuthError::Internal(detail) => {
                error!("Request failed: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for session service results
pub type AuthResult<T> = Result<T, AuthError>;
