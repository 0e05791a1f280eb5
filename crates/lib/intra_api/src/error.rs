//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use intra_core::auth::AuthError;
use serde::Serialize;
use thiserror::Error;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// JSON error body: stable code plus human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// HTTP status, stable code, and message for the response body.
    fn parts(&self) -> (StatusCode, String, String) {
        match self {
            AppError::Auth(e) => (auth_status(e), e.code().to_string(), public_message(e)),
            AppError::Unauthorized(m) => {
                (StatusCode::UNAUTHORIZED, "unauthorized".into(), m.clone())
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error".into(),
                "Internal server error".into(),
            ),
        }
    }
}

/// Status mapping for domain auth errors.
fn auth_status(e: &AuthError) -> StatusCode {
    match e {
        AuthError::InvalidCredentials
        | AuthError::MissingRefresh
        | AuthError::InvalidTokenType
        | AuthError::InvalidTokenPayload
        | AuthError::InvalidRole
        | AuthError::TokenExpired
        | AuthError::InvalidAudience
        | AuthError::InvalidIssuer
        | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden => StatusCode::FORBIDDEN,
        AuthError::DirectoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Db(err) if is_unique_violation(err) => StatusCode::CONFLICT,
        AuthError::Db(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Message shown to clients; database details never leak.
fn public_message(e: &AuthError) -> String {
    match e {
        AuthError::Db(err) if is_unique_violation(err) => {
            "User record conflicts with an existing one".into()
        }
        AuthError::Db(_) | AuthError::Internal(_) => "Internal server error".into(),
        other => other.to_string(),
    }
}

/// Unique-constraint violation on ad_guid/ad_login — a concurrent insert
/// race, surfaced as a conflict rather than a server fault.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code = %error, %status, "request failed: {self}");
        } else {
            tracing::warn!(code = %error, %status, "request rejected");
        }
        let body = Json(ErrorResponse {
            error: error.clone(),
            message,
        });
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Auth(AuthError::Db(e))
    }
}
