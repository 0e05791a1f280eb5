//! Authentication and authorization logic.
//!
//! Ties the directory client, role resolver, user synchronizer, and token
//! codec together behind [`service::AuthService`].

pub mod jwt;
pub mod ldap;
pub mod queries;
pub mod roles;
pub mod service;

use thiserror::Error;

/// Authentication errors.
///
/// Each variant carries a stable code (see [`AuthError::code`]) that the
/// HTTP layer surfaces unchanged.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("User does not have a required group")]
    Forbidden,

    #[error("Refresh token is required")]
    MissingRefresh,

    #[error("Token is not a refresh token")]
    InvalidTokenType,

    #[error("Token payload is missing login")]
    InvalidTokenPayload,

    #[error("Token role is not recognized")]
    InvalidRole,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid audience")]
    InvalidAudience,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Token is invalid: {0}")]
    InvalidToken(String),

    #[error("Directory service is temporarily unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Forbidden => "forbidden",
            AuthError::MissingRefresh => "missing_refresh",
            AuthError::InvalidTokenType => "invalid_token_type",
            AuthError::InvalidTokenPayload => "invalid_token_payload",
            AuthError::InvalidRole => "invalid_role",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::DirectoryUnavailable(_) => "ldap_unavailable",
            AuthError::Db(_) => "db_error",
            AuthError::Internal(_) => "internal_error",
        }
    }
}
