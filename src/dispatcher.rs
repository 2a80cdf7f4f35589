//! Request dispatcher for the ask endpoints.
//!
//! Builds outbound queries, selects the transport, and drives the SSE byte
//! stream through the frame decoder and event interpreter. Every failure
//! on the streaming path ends up as content on the placeholder message;
//! nothing propagates to the caller as a fault.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{AskRequest, AskResponse, ErrorBody};
use crate::sse::{apply_payload, Disposition, FrameDecoder};
use crate::traits::{HttpClient, HttpError};
use crate::transcript::Transcript;

/// Longest error-body excerpt surfaced into a message.
const ERROR_BODY_LIMIT: usize = 500;

/// Dispatches queries to the navigator backend.
pub struct AskDispatcher {
    base_url: String,
    http: Arc<dyn HttpClient>,
    request_timeout: Duration,
    stream_idle_timeout: Duration,
}

impl AskDispatcher {
    /// Create a dispatcher from a config and an HTTP client.
    pub fn new(config: &ClientConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            http,
            request_timeout: config.request_timeout,
            stream_idle_timeout: config.stream_idle_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Stream an answer onto the placeholder message.
    ///
    /// Runs until a terminal event, transport close, idle timeout, or
    /// cancellation; whichever comes first settles the message, and that
    /// settling is the last mutation the message sees. Frames that were
    /// fully decoded before a cancellation signal still apply; a partial
    /// frame is never force-flushed.
    pub async fn run_streaming(
        &self,
        request: &AskRequest,
        transcript: &Arc<Mutex<Transcript>>,
        message_id: Uuid,
        mut cancel_rx: watch::Receiver<bool>,
    ) {
        let body = match serde_json::to_string(request) {
            Ok(body) => body,
            Err(err) => {
                transcript
                    .lock()
                    .await
                    .fail(message_id, &format!("Could not encode request: {}", err));
                return;
            }
        };

        tracing::debug!(query = %request.query, "opening answer stream");
        let ask_stream_url = self.url("/ask-stream");
        let opened = tokio::select! {
            _ = cancel_rx.changed() => {
                tracing::debug!("answer stream cancelled before connecting");
                transcript.lock().await.settle(message_id);
                return;
            }
            opened = self.http.post_stream(&ask_stream_url, &body) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(HttpError::Status { status, body }) => {
                let text = format!("HTTP {}: {}", status, truncate_utf8(&body, ERROR_BODY_LIMIT));
                transcript.lock().await.fail(message_id, &text);
                return;
            }
            Err(err) => {
                transcript.lock().await.fail(message_id, &err.to_string());
                return;
            }
        };

        let mut decoder = FrameDecoder::new();
        loop {
            let next = tokio::select! {
                _ = cancel_rx.changed() => {
                    tracing::debug!("answer stream cancelled by caller");
                    transcript.lock().await.settle(message_id);
                    return;
                }
                next = tokio::time::timeout(self.stream_idle_timeout, stream.next()) => next,
            };

            match next {
                Err(_) => {
                    let seconds = self.stream_idle_timeout.as_secs();
                    transcript.lock().await.fail(
                        message_id,
                        &format!("Stream timed out after {} seconds of silence", seconds),
                    );
                    return;
                }
                Ok(Some(Ok(chunk))) => {
                    for payload in decoder.feed(&chunk) {
                        let mut transcript = transcript.lock().await;
                        if apply_payload(&mut transcript, message_id, &payload)
                            == Disposition::Finished
                        {
                            return;
                        }
                    }
                }
                Ok(Some(Err(err))) => {
                    transcript.lock().await.fail(message_id, &err.to_string());
                    return;
                }
                Ok(None) => {
                    decoder.finish();
                    tracing::debug!("answer stream closed without a done event");
                    transcript.lock().await.settle(message_id);
                    return;
                }
            }
        }
    }

    /// Single-shot fallback for when streaming is disabled or unsupported.
    pub async fn send_once(&self, request: &AskRequest) -> Result<AskResponse, ApiError> {
        let body = serde_json::to_string(request)
            .map_err(|err| ApiError::Transport(format!("could not encode request: {}", err)))?;

        let response = tokio::time::timeout(
            self.request_timeout,
            self.http.post(&self.url("/ask"), &body),
        )
        .await
        .map_err(|_| ApiError::Timeout {
            seconds: self.request_timeout.as_secs(),
        })?
        .map_err(ApiError::from)?;

        let text = response
            .text()
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;

        if !response.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(ApiError::Http {
                status: response.status,
                body: truncate_utf8(&detail, ERROR_BODY_LIMIT),
            });
        }

        if let Ok(answer) = serde_json::from_str::<AskResponse>(&text) {
            return Ok(answer);
        }
        if let Ok(err) = serde_json::from_str::<ErrorBody>(&text) {
            return Err(ApiError::Backend(err.error));
        }
        Err(ApiError::InvalidResponse(format!(
            "unrecognized answer body: {}",
            truncate_utf8(&text, 120)
        )))
    }

    /// Check whether the backend is reachable and healthy.
    pub async fn health_check(&self) -> Result<bool, ApiError> {
        let response = tokio::time::timeout(self.request_timeout, self.http.get(&self.url("/health")))
            .await
            .map_err(|_| ApiError::Timeout {
                seconds: self.request_timeout.as_secs(),
            })?
            .map_err(ApiError::from)?;
        Ok(response.is_success())
    }
}

/// Truncate to at most `limit` bytes without splitting a character.
fn truncate_utf8(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse};
    use crate::traits::Response;
    use bytes::Bytes;

    fn dispatcher_with(mock: &MockHttpClient) -> AskDispatcher {
        let config = ClientConfig::new().with_base_url("http://mock");
        AskDispatcher::new(&config, Arc::new(mock.clone()))
    }

    fn streaming_fixture() -> (Arc<Mutex<Transcript>>, Uuid) {
        let mut transcript = Transcript::new();
        transcript.push_user("question");
        let id = transcript.push_streaming_placeholder();
        (Arc::new(Mutex::new(transcript)), id)
    }

    fn never_cancelled() -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        // keep the sender alive for the whole test
        std::mem::forget(tx);
        rx
    }

    #[test]
    fn test_truncate_utf8_short_text_untouched() {
        assert_eq!(truncate_utf8("short", 500), "short");
    }

    #[test]
    fn test_truncate_utf8_respects_char_boundaries() {
        let text = "caf\u{e9}".repeat(200);
        let truncated = truncate_utf8(&text, 501);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 504);
        // must not panic and must be valid UTF-8 end to end
        assert!(truncated.chars().count() > 0);
    }

    #[tokio::test]
    async fn test_run_streaming_happy_path() {
        let mock = MockHttpClient::new();
        mock.set_sse_frames(
            "http://mock/ask-stream",
            &[
                r#"{"type":"chunk","content":"Hel"}"#,
                r#"{"type":"chunk","content":"lo"}"#,
                r#"{"type":"done"}"#,
            ],
        );
        let dispatcher = dispatcher_with(&mock);
        let (transcript, id) = streaming_fixture();

        dispatcher
            .run_streaming(&AskRequest::new("question"), &transcript, id, never_cancelled())
            .await;

        let transcript = transcript.lock().await;
        let message = transcript.get(id).unwrap();
        assert_eq!(message.content, "Hello");
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn test_run_streaming_http_error_surfaces_status_and_body() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://mock/ask-stream",
            MockResponse::Error(HttpError::Status {
                status: 500,
                body: r#"{"error":"rate limited"}"#.to_string(),
            }),
        );
        let dispatcher = dispatcher_with(&mock);
        let (transcript, id) = streaming_fixture();

        dispatcher
            .run_streaming(&AskRequest::new("question"), &transcript, id, never_cancelled())
            .await;

        let transcript = transcript.lock().await;
        let message = transcript.get(id).unwrap();
        assert!(message.content.contains("500"));
        assert!(message.content.contains("rate limited"));
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn test_run_streaming_transport_failure_mid_stream() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://mock/ask-stream",
            MockResponse::Stream(vec![
                Ok(Bytes::from("data: {\"type\":\"chunk\",\"content\":\"par\"}\n\n")),
                Err(HttpError::Io("connection reset".to_string())),
            ]),
        );
        let dispatcher = dispatcher_with(&mock);
        let (transcript, id) = streaming_fixture();

        dispatcher
            .run_streaming(&AskRequest::new("question"), &transcript, id, never_cancelled())
            .await;

        let transcript = transcript.lock().await;
        let message = transcript.get(id).unwrap();
        assert!(message.content.contains("connection reset"));
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn test_run_streaming_close_without_done_settles() {
        let mock = MockHttpClient::new();
        mock.set_sse_frames(
            "http://mock/ask-stream",
            &[r#"{"type":"chunk","content":"partial"}"#],
        );
        let dispatcher = dispatcher_with(&mock);
        let (transcript, id) = streaming_fixture();

        dispatcher
            .run_streaming(&AskRequest::new("question"), &transcript, id, never_cancelled())
            .await;

        let transcript = transcript.lock().await;
        let message = transcript.get(id).unwrap();
        assert_eq!(message.content, "partial");
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn test_run_streaming_idle_timeout_is_transport_failure() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://mock/ask-stream",
            MockResponse::HangingStream(vec![Bytes::from(
                "data: {\"type\":\"chunk\",\"content\":\"x\"}\n\n",
            )]),
        );
        let config = ClientConfig::new()
            .with_base_url("http://mock")
            .with_stream_idle_timeout(Duration::from_millis(30));
        let dispatcher = AskDispatcher::new(&config, Arc::new(mock.clone()));
        let (transcript, id) = streaming_fixture();

        dispatcher
            .run_streaming(&AskRequest::new("question"), &transcript, id, never_cancelled())
            .await;

        let transcript = transcript.lock().await;
        let message = transcript.get(id).unwrap();
        assert!(message.content.contains("timed out"));
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn test_run_streaming_cancellation_preserves_partial_content() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://mock/ask-stream",
            MockResponse::HangingStream(vec![Bytes::from(
                "data: {\"type\":\"chunk\",\"content\":\"partial\"}\n\n",
            )]),
        );
        let dispatcher = dispatcher_with(&mock);
        let (transcript, id) = streaming_fixture();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = {
            let transcript = Arc::clone(&transcript);
            let request = AskRequest::new("question");
            tokio::spawn(async move {
                dispatcher.run_streaming(&request, &transcript, id, cancel_rx).await;
            })
        };

        // let the first chunk land, then cancel
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel_tx.send(true).unwrap();
        task.await.unwrap();

        let transcript = transcript.lock().await;
        let message = transcript.get(id).unwrap();
        assert_eq!(message.content, "partial");
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn test_send_once_parses_answer() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://mock/ask",
            MockResponse::Success(Response::new(
                200,
                Bytes::from(
                    r#"{"answer":"Two providers match.","referencedEntities":["Provider A"],"matchedRegion":"East Bay"}"#,
                ),
            )),
        );
        let dispatcher = dispatcher_with(&mock);

        let answer = dispatcher.send_once(&AskRequest::new("question")).await.unwrap();
        assert_eq!(answer.answer, "Two providers match.");
        assert_eq!(answer.referenced_entities, vec!["Provider A"]);
        assert_eq!(answer.matched_region.as_deref(), Some("East Bay"));
    }

    #[tokio::test]
    async fn test_send_once_maps_error_status() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://mock/ask",
            MockResponse::Success(Response::new(
                503,
                Bytes::from(r#"{"error":"overloaded"}"#),
            )),
        );
        let dispatcher = dispatcher_with(&mock);

        let err = dispatcher.send_once(&AskRequest::new("question")).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: 503,
                body: "overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_send_once_backend_error_with_ok_status() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://mock/ask",
            MockResponse::Success(Response::new(
                200,
                Bytes::from(r#"{"error":"no providers found"}"#),
            )),
        );
        let dispatcher = dispatcher_with(&mock);

        let err = dispatcher.send_once(&AskRequest::new("question")).await.unwrap_err();
        assert_eq!(err, ApiError::Backend("no providers found".to_string()));
    }

    #[tokio::test]
    async fn test_send_once_rejects_unrecognized_body() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://mock/ask",
            MockResponse::Success(Response::new(200, Bytes::from("[]"))),
        );
        let dispatcher = dispatcher_with(&mock);

        let err = dispatcher.send_once(&AskRequest::new("question")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_send_once_sends_context() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://mock/ask",
            MockResponse::Success(Response::new(200, Bytes::from(r#"{"answer":"ok"}"#))),
        );
        let dispatcher = dispatcher_with(&mock);

        let request = AskRequest::new("question")
            .with_context(crate::models::QueryContext::new().with_location("94103"));
        dispatcher.send_once(&request).await.unwrap();

        let recorded = mock.requests();
        let body: serde_json::Value =
            serde_json::from_str(recorded[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["query"], "question");
        assert_eq!(body["context"]["location"], "94103");
    }

    #[tokio::test]
    async fn test_health_check() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://mock/health",
            MockResponse::Success(Response::new(200, Bytes::new())),
        );
        let dispatcher = dispatcher_with(&mock);
        assert!(dispatcher.health_check().await.unwrap());

        mock.set_response(
            "http://mock/health",
            MockResponse::Success(Response::new(503, Bytes::new())),
        );
        assert!(!dispatcher.health_check().await.unwrap());
    }
}
