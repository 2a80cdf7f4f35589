//! Mock HTTP client for testing.
//!
//! Scripts responses per URL, records every request for verification, and
//! can replay SSE byte streams chunk by chunk, inject mid-stream errors,
//! or leave a stream hanging to exercise cancellation paths.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::{ByteStream, HttpClient, HttpError, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET or POST)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request body (for POST requests)
    pub body: Option<String>,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a buffered response
    Success(Response),
    /// Return an error
    Error(HttpError),
    /// Stream the given chunk results, then close
    Stream(Vec<Result<Bytes, HttpError>>),
    /// Stream the given chunks, then stay open forever; lets tests cancel
    /// mid-stream
    HangingStream(Vec<Bytes>),
}

/// Scripted [`HttpClient`] for tests.
///
/// URLs are matched exactly first, then by prefix, then the default
/// response applies.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for a URL (exact or prefix match).
    pub fn set_response(&self, url: &str, response: MockResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(url.to_string(), response);
        }
    }

    /// Script the response used when no URL matches.
    pub fn set_default_response(&self, response: MockResponse) {
        if let Ok(mut default) = self.default_response.lock() {
            *default = Some(response);
        }
    }

    /// Script an SSE stream that delivers each frame as its own chunk and
    /// then closes.
    pub fn set_sse_frames(&self, url: &str, payloads: &[&str]) {
        let chunks = payloads
            .iter()
            .map(|payload| Ok(Bytes::from(format!("data: {}\n\n", payload))))
            .collect();
        self.set_response(url, MockResponse::Stream(chunks));
    }

    /// All requests made so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of requests made to the given URL.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.url == url).count()
    }

    fn record(&self, method: &str, url: &str, body: Option<String>) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                method: method.to_string(),
                url: url.to_string(),
                body,
            });
        }
    }

    fn lookup(&self, url: &str) -> Option<MockResponse> {
        if let Ok(responses) = self.responses.lock() {
            if let Some(response) = responses.get(url) {
                return Some(response.clone());
            }
            for (pattern, response) in responses.iter() {
                if url.starts_with(pattern.as_str()) {
                    return Some(response.clone());
                }
            }
        }
        self.default_response.lock().ok().and_then(|d| d.clone())
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str) -> Result<Response, HttpError> {
        self.record("GET", url, None);

        match self.lookup(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(_) => Err(HttpError::Other(
                "stream response scripted for buffered request".to_string(),
            )),
            None => Err(HttpError::Other(format!("no mock response for {}", url))),
        }
    }

    async fn post(&self, url: &str, body: &str) -> Result<Response, HttpError> {
        self.record("POST", url, Some(body.to_string()));

        match self.lookup(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(_) => Err(HttpError::Other(
                "stream response scripted for buffered request".to_string(),
            )),
            None => Err(HttpError::Other(format!("no mock response for {}", url))),
        }
    }

    async fn post_stream(&self, url: &str, body: &str) -> Result<ByteStream, HttpError> {
        self.record("POST", url, Some(body.to_string()));

        match self.lookup(url) {
            Some(MockResponse::Stream(chunks)) => Ok(Box::pin(stream::iter(chunks))),
            Some(MockResponse::HangingStream(chunks)) => {
                let delivered = stream::iter(chunks.into_iter().map(Ok::<Bytes, HttpError>));
                Ok(Box::pin(
                    delivered.chain(stream::pending::<Result<Bytes, HttpError>>()),
                ))
            }
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Success(_)) => Err(HttpError::Other(
                "buffered response scripted for stream request".to_string(),
            )),
            None => Err(HttpError::Other(format!("no mock response for {}", url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_get() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://mock/health",
            MockResponse::Success(Response::new(200, Bytes::from("ok"))),
        );

        let response = client.get("http://mock/health").await.unwrap();
        assert_eq!(response.status, 200);

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].url, "http://mock/health");
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://mock/ask",
            MockResponse::Error(HttpError::ConnectionFailed("refused".to_string())),
        );

        let result = client.post("http://mock/ask", "{}").await;
        assert_eq!(
            result,
            Err(HttpError::ConnectionFailed("refused".to_string()))
        );
    }

    #[tokio::test]
    async fn test_post_records_body() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://mock/ask",
            MockResponse::Success(Response::new(200, Bytes::from("{\"answer\":\"hi\"}"))),
        );

        client
            .post("http://mock/ask", r#"{"query":"hello"}"#)
            .await
            .unwrap();

        let requests = client.requests();
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"query":"hello"}"#));
    }

    #[tokio::test]
    async fn test_stream_replays_chunks() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://mock/ask-stream",
            MockResponse::Stream(vec![
                Ok(Bytes::from("data: one\n\n")),
                Ok(Bytes::from("data: two\n\n")),
            ]),
        );

        let mut stream = client.post_stream("http://mock/ask-stream", "{}").await.unwrap();
        let mut chunks = Vec::new();
        while let Some(result) = stream.next().await {
            chunks.push(result.unwrap());
        }
        assert_eq!(chunks.len(), 2);
    }

    #[tokio::test]
    async fn test_stream_error_injection() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://mock/ask-stream",
            MockResponse::Stream(vec![
                Ok(Bytes::from("data: one\n\n")),
                Err(HttpError::Io("connection reset".to_string())),
            ]),
        );

        let mut stream = client.post_stream("http://mock/ask-stream", "{}").await.unwrap();
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_hanging_stream_stays_pending() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://mock/ask-stream",
            MockResponse::HangingStream(vec![Bytes::from("data: one\n\n")]),
        );

        let mut stream = client.post_stream("http://mock/ask-stream", "{}").await.unwrap();
        assert!(stream.next().await.is_some());

        let next = tokio::time::timeout(std::time::Duration::from_millis(20), stream.next()).await;
        assert!(next.is_err(), "hanging stream should not yield again");
    }

    #[tokio::test]
    async fn test_set_sse_frames_helper() {
        let client = MockHttpClient::new();
        client.set_sse_frames("http://mock/ask-stream", &[r#"{"type":"done"}"#]);

        let mut stream = client.post_stream("http://mock/ask-stream", "{}").await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk, Bytes::from("data: {\"type\":\"done\"}\n\n"));
    }

    #[tokio::test]
    async fn test_prefix_match_and_default() {
        let client = MockHttpClient::new();
        client.set_response(
            "http://mock/api",
            MockResponse::Success(Response::new(200, Bytes::new())),
        );
        client.set_default_response(MockResponse::Success(Response::new(404, Bytes::new())));

        assert_eq!(client.get("http://mock/api/v2").await.unwrap().status, 200);
        assert_eq!(client.get("http://elsewhere").await.unwrap().status, 404);
    }

    #[tokio::test]
    async fn test_unscripted_url_errors() {
        let client = MockHttpClient::new();
        let result = client.get("http://mock/missing").await;
        assert!(matches!(result, Err(HttpError::Other(_))));
    }
}
