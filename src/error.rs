/// Unified error handling for the identity/session core.
///
/// Every failure a handler can surface is one of a small set of typed
/// kinds (see `AuthError` in particular): string-matching on error
/// messages is never used for control flow. Each kind carries its own
/// HTTP mapping and logging severity.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for request inputs (email, name, password shape).
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Authentication and session errors.
///
/// `InvalidOrExpiredToken` deliberately merges unknown jti, expired,
/// already-revoked, and wrong-secret: callers must not be able to tell
/// which case occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Presented refresh credential is not of the `jti.secret` shape.
    /// Raised before any storage access.
    MalformedToken,
    /// Refresh credential is unknown, expired, revoked, rotated away,
    /// or carries the wrong secret.
    InvalidOrExpiredToken,
    /// Login failed; covers both unknown email and wrong password.
    InvalidCredentials,
    /// Access token is missing, expired, or has a bad signature.
    Unauthenticated,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MalformedToken => write!(f, "malformed refresh credential"),
            AuthError::InvalidOrExpiredToken => write!(f, "invalid or expired refresh token"),
            AuthError::InvalidCredentials => write!(f, "invalid email or password"),
            AuthError::Unauthenticated => write!(f, "invalid or expired access token"),
        }
    }
}

impl StdError for AuthError {}

/// Storage (Postgres) failures. Never folded into a token error: a
/// broken database must surface as a retryable 5xx, not as a forced
/// re-login.
#[derive(Debug)]
pub enum StorageError {
    UniqueViolation(String),
    Unavailable(String),
    Query(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::UniqueViolation(msg) => write!(f, "duplicate entry: {}", msg),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {}", msg),
            StorageError::Query(msg) => write!(f, "storage query failed: {}", msg),
        }
    }
}

impl StdError for StorageError {}

/// Central application error; everything a route returns maps into it.
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    Storage(StorageError),
    RateLimited,
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Storage(e) => write!(f, "{}", e),
            AppError::RateLimited => write!(f, "too many requests"),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let msg = err.to_string();

        if msg.contains("duplicate key") || msg.contains("unique constraint") {
            AppError::Storage(StorageError::UniqueViolation(
                "email already registered".to_string(),
            ))
        } else if msg.contains("pool") || msg.contains("connect") {
            AppError::Storage(StorageError::Unavailable(msg))
        } else {
            AppError::Storage(StorageError::Query(msg))
        }
    }
}

/// JSON body returned for every error response.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating a client report with server logs
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    fn response_parts(&self) -> (StatusCode, String, String) {
        match self {
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                e.to_string(),
            ),

            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS".to_string(),
                    e.to_string(),
                ),
                AuthError::MalformedToken => (
                    StatusCode::UNAUTHORIZED,
                    "MALFORMED_TOKEN".to_string(),
                    e.to_string(),
                ),
                AuthError::InvalidOrExpiredToken => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID".to_string(),
                    e.to_string(),
                ),
                AuthError::Unauthenticated => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHENTICATED".to_string(),
                    e.to_string(),
                ),
            },

            AppError::Storage(e) => match e {
                StorageError::UniqueViolation(_) => (
                    StatusCode::CONFLICT,
                    "DUPLICATE_ENTRY".to_string(),
                    e.to_string(),
                ),
                StorageError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORAGE_UNAVAILABLE".to_string(),
                    "storage temporarily unavailable".to_string(),
                ),
                StorageError::Query(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR".to_string(),
                    "storage error occurred".to_string(),
                ),
            },

            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED".to_string(),
                "too many requests".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                "internal server error".to_string(),
            ),
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Validation error");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Authentication error");
            }
            AppError::Storage(e) => {
                tracing::error!(error_id = error_id, error = %e, "Storage error");
            }
            AppError::RateLimited => {
                tracing::warn!(error_id = error_id, "Request rate limited");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let (status, code, message) = self.response_parts();
        let body = ErrorResponse::new(error_id, message, code, status.as_u16());

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.response_parts().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = ValidationError::EmptyField("email".to_string());
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn auth_error_converts_into_app_error() {
        let app_err: AppError = AuthError::InvalidOrExpiredToken.into();
        match app_err {
            AppError::Auth(AuthError::InvalidOrExpiredToken) => (),
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[test]
    fn token_errors_share_the_unauthorized_status() {
        // Wrong-secret and unknown-jti must be indistinguishable on the wire.
        let a = AppError::Auth(AuthError::InvalidOrExpiredToken);
        let b = AppError::Auth(AuthError::MalformedToken);
        assert_eq!(a.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(b.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn storage_errors_are_not_auth_errors() {
        let err = AppError::Storage(StorageError::Unavailable("pool timeout".to_string()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn error_response_carries_code_and_status() {
        let response = ErrorResponse::new(
            "abc-123".to_string(),
            "nope".to_string(),
            "TOKEN_INVALID".to_string(),
            401,
        );
        assert_eq!(response.error_id, "abc-123");
        assert_eq!(response.code, "TOKEN_INVALID");
        assert_eq!(response.status, 401);
    }
}
