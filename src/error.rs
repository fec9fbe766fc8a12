/// Unified error types for the Lumera partner client and edge functions
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type shared by the client core and the edge functions
#[derive(Error, Debug)]
pub enum PartnerError {
    /// Database errors (device store or platform Postgres)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Client-side validation failures; no network call was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Credential, OTP, banned, blocked or unlinked-profile rejections
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// Too many requests or login attempts
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: std::time::Duration },

    /// Transport-level failures reaching the platform
    #[error("Network error: {0}")]
    Network(String),

    /// Media quota reached for a provider profile
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Caller does not own the addressed resource
    #[error("Forbidden: {0}")]
    Ownership(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server-side failures (500-class)
    #[error("Server error: {0}")]
    Server(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A transfer was cancelled by the user
    #[error("Upload cancelled")]
    Cancelled,
}

/// JSON error body returned by the edge functions
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl PartnerError {
    /// HTTP status this error maps to when surfaced by the edge functions
    pub fn status_code(&self) -> StatusCode {
        match self {
            PartnerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PartnerError::AuthRejected(_) => StatusCode::UNAUTHORIZED,
            PartnerError::Ownership(_) => StatusCode::FORBIDDEN,
            PartnerError::NotFound(_) => StatusCode::NOT_FOUND,
            PartnerError::QuotaExceeded(_) => StatusCode::CONFLICT,
            PartnerError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert PartnerError to an HTTP response with a JSON `{error}` body
impl IntoResponse for PartnerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            // Don't leak internals on 500-class failures
            PartnerError::Database(_) | PartnerError::Server(_) | PartnerError::Io(_) => {
                "Internal server error".to_string()
            }
            PartnerError::RateLimited { .. } => "Rate limit exceeded".to_string(),
            other => other.to_string(),
        };

        let body = Json(ErrorBody { error: message });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for PartnerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            PartnerError::Network(err.to_string())
        } else {
            PartnerError::Server(err.to_string())
        }
    }
}

/// Result type alias for partner operations
pub type PartnerResult<T> = Result<T, PartnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            PartnerError::InvalidInput("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PartnerError::AuthRejected("no".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PartnerError::Ownership("not yours".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            PartnerError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PartnerError::QuotaExceeded("full".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PartnerError::Server("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = PartnerError::Server("connection string leaked".into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
