//! HTTP client trait abstraction.
//!
//! All request bodies this crate sends are JSON, so implementations set
//! the content type themselves and the trait stays small: one buffered
//! GET, one buffered POST, and one streaming POST for the SSE path.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Incrementally readable response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Buffered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response.
    pub fn new(status: u16, body: Bytes) -> Self {
        Self { status, body }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the response body as a string.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    /// Parse the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP client errors.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Connection failed
    ConnectionFailed(String),
    /// Request timeout
    Timeout(String),
    /// Server returned an error status; the body has already been read
    Status { status: u16, body: String },
    /// IO error while reading a body
    Io(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for HTTP operations against the navigator backend.
///
/// Implementations include the production reqwest-based client and a
/// scripted mock for tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request and buffer the response.
    async fn get(&self, url: &str) -> Result<Response, HttpError>;

    /// POST a JSON body and buffer the response.
    async fn post(&self, url: &str, body: &str) -> Result<Response, HttpError>;

    /// POST a JSON body and return the response body as a byte stream.
    ///
    /// A non-2xx status is reported as [`HttpError::Status`] with the body
    /// already read, so callers never have to stream an error response.
    async fn post_stream(&self, url: &str, body: &str) -> Result<ByteStream, HttpError>;
}
