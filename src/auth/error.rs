use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::store::StoreError;

/// Request-terminal failures of the auth operations. Every variant maps to a
/// single response status; none carries plaintext credentials or raw tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    Unauthorized,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Access denied")]
    Forbidden,
    #[error("Email already registered")]
    Conflict,
    #[error("Service temporarily unavailable")]
    Unavailable(#[source] sqlx::Error),
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AuthError::Conflict,
            StoreError::Unavailable(e) => AuthError::Unavailable(e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match &self {
            AuthError::Unavailable(e) => error!(error = %e, "credential store unavailable"),
            AuthError::Internal(e) => error!(error = %e, "internal error"),
            other => warn!(error = %other, "request rejected"),
        }
        (status, self.to_string()).into_response()
    }
}
