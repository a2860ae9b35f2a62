use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 401 always carries this fixed message; the server body is ignored
    /// and the owning app clears the session in response.
    #[error("Session expired. Please sign in again.")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Fallback when an error body carries no parseable detail
const GENERIC_ERROR_MESSAGE: &str = "Unexpected server error.";

/// Maximum length for raw response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error envelope used by the backend for every non-success status.
#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    /// Extract the server-provided detail message, falling back to a
    /// generic message when the body is not the expected envelope.
    fn detail_from_body(body: &str) -> String {
        serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.detail)
            .unwrap_or_else(|_| GENERIC_ERROR_MESSAGE.to_string())
    }

    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(Self::detail_from_body(body)),
            404 => ApiError::NotFound(Self::detail_from_body(body)),
            400..=499 => ApiError::Rejected(Self::detail_from_body(body)),
            500..=599 => ApiError::ServerError(Self::detail_from_body(body)),
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }
}
