use thiserror::Error;

/// Failure of one backend call. `Clone` so a single dispatch outcome can
/// settle several waiters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Backend command failed: {0}")]
    CommandFailed(String),

    #[error("Unauthorized - backend rejected the request")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for backend output quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl BackendError {
    /// Truncate backend output to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        let body = body.trim();
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 | 403 => BackendError::Unauthorized,
            404 => BackendError::NotFound(truncated),
            429 => BackendError::RateLimited,
            500..=599 => BackendError::ServerError(truncated),
            _ => BackendError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Failed process run: prefer stderr, fall back to stdout.
    pub fn from_output(stderr: &str, stdout: &str) -> Self {
        let message = if stderr.trim().is_empty() { stdout } else { stderr };
        BackendError::CommandFailed(Self::truncate_body(message))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            BackendError::Unreachable(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}
