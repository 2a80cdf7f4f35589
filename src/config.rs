//! Client configuration.
//!
//! Defaults suit local development; deployments override through the
//! builder or the `NAVIK_*` environment variables.

use std::time::Duration;

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 120;

/// Configuration for a [`ChatSession`](crate::session::ChatSession).
///
/// # Example
///
/// ```ignore
/// use navik::config::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_base_url("https://api.navik.app")
///     .with_streaming(false);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash
    pub base_url: String,
    /// Use the streaming endpoint; false selects the single-shot fallback
    pub streaming: bool,
    /// Deadline for the fallback and health requests
    pub request_timeout: Duration,
    /// Longest tolerated gap between stream reads; streams may legitimately
    /// pause between chunks, so this is the longer of the two timeouts
    pub stream_idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            streaming: true,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            stream_idle_timeout: Duration::from_secs(DEFAULT_STREAM_IDLE_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend base URL. A trailing slash is trimmed.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        self.base_url = base_url;
        self
    }

    /// Enable or disable the streaming endpoint.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Set the fallback/health request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the streaming idle timeout.
    pub fn with_stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    /// Build a config from the environment.
    ///
    /// - `NAVIK_BASE_URL` - backend base URL
    /// - `NAVIK_NO_STREAM` - when set, use the single-shot fallback
    /// - `NAVIK_REQUEST_TIMEOUT_SECS` - fallback deadline in seconds
    /// - `NAVIK_STREAM_IDLE_TIMEOUT_SECS` - streaming idle timeout in seconds
    ///
    /// Unparseable timeout values fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("NAVIK_BASE_URL") {
            if !base_url.is_empty() {
                config = config.with_base_url(base_url);
            }
        }

        if std::env::var("NAVIK_NO_STREAM").is_ok() {
            config.streaming = false;
        }

        if let Some(secs) = env_secs("NAVIK_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = env_secs("NAVIK_STREAM_IDLE_TIMEOUT_SECS") {
            config.stream_idle_timeout = Duration::from_secs(secs);
        }

        config
    }
}

fn env_secs(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(_) => {
            tracing::warn!(name, %raw, "ignoring unparseable timeout override");
            None
        }
    }
}
