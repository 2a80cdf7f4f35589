//! Error types for backend communication.
//!
//! All failures crossing the dispatcher boundary are expressed as
//! [`ApiError`]. Streaming failures never reach the caller as errors at
//! all; they are written into the affected transcript message instead.

use thiserror::Error;

use crate::traits::HttpError;

/// Error type for ask/health operations against the navigator backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Backend answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection-level failure (refused, reset, DNS, TLS)
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded its deadline
    #[error("timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The backend answered 2xx but the body was not the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The backend reported a structured error of its own
    #[error("{0}")]
    Backend(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Http { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            ApiError::Transport(_) => true,
            ApiError::Timeout { .. } => true,
            ApiError::InvalidResponse(_) => false,
            ApiError::Backend(_) => false,
        }
    }

    /// A message suitable for showing to the person asking the question.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { status, .. } => match *status {
                429 => "Too many requests. Please wait a moment and try again.".to_string(),
                500..=599 => {
                    "The assistant service is having trouble. Please try again later.".to_string()
                }
                _ => format!("The server returned an error (HTTP {}).", status),
            },
            ApiError::Transport(_) => {
                "Unable to reach the assistant service. Please check your connection.".to_string()
            }
            ApiError::Timeout { seconds } => {
                format!("The request timed out after {} seconds.", seconds)
            }
            ApiError::InvalidResponse(_) => {
                "Received an unexpected response from the assistant service.".to_string()
            }
            ApiError::Backend(message) => message.clone(),
        }
    }
}

impl From<HttpError> for ApiError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status { status, body } => ApiError::Http { status, body },
            HttpError::Timeout(message) => ApiError::Transport(message),
            HttpError::ConnectionFailed(message)
            | HttpError::Io(message)
            | HttpError::Other(message) => ApiError::Transport(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_status_and_body() {
        let err = ApiError::Http {
            status: 500,
            body: "rate limited".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("500"));
        assert!(display.contains("rate limited"));
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(ApiError::Http {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(ApiError::Http {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(ApiError::Transport("reset".to_string()).is_retryable());
        assert!(ApiError::Timeout { seconds: 30 }.is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        assert!(!ApiError::Http {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(!ApiError::InvalidResponse("bad json".to_string()).is_retryable());
        assert!(!ApiError::Backend("no results".to_string()).is_retryable());
    }

    #[test]
    fn test_user_message_for_backend_error_passes_through() {
        let err = ApiError::Backend("No providers found for that region.".to_string());
        assert_eq!(err.user_message(), "No providers found for that region.");
    }

    #[test]
    fn test_user_message_mentions_timeout() {
        let err = ApiError::Timeout { seconds: 30 };
        assert!(err.user_message().contains("30 seconds"));
    }

    #[test]
    fn test_from_http_error() {
        let err: ApiError = HttpError::Status {
            status: 404,
            body: "not found".to_string(),
        }
        .into();
        assert_eq!(
            err,
            ApiError::Http {
                status: 404,
                body: "not found".to_string()
            }
        );

        let err: ApiError = HttpError::ConnectionFailed("refused".to_string()).into();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
