//! Session controller: the public entry point for asking questions.
//!
//! A session owns the transcript and at most one in-flight request.
//! Submitting a new question replaces (cancels) the previous one rather
//! than queueing behind it. The spawned request task is the only writer
//! touching the placeholder message while it runs, and settling the
//! message is always its last mutation.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::adapters::ReqwestHttpClient;
use crate::config::ClientConfig;
use crate::dispatcher::AskDispatcher;
use crate::error::ApiError;
use crate::models::{AskRequest, Feedback, Message, QueryContext};
use crate::traits::HttpClient;
use crate::transcript::Transcript;

struct ActiveRequest {
    handle: JoinHandle<()>,
    cancel_tx: watch::Sender<bool>,
    message_id: Uuid,
}

/// One conversation with the navigator assistant.
pub struct ChatSession {
    transcript: Arc<Mutex<Transcript>>,
    dispatcher: Arc<AskDispatcher>,
    streaming: bool,
    active: Option<ActiveRequest>,
}

impl ChatSession {
    /// Create a session backed by the production HTTP client.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_http(config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Create a session with a custom HTTP client (used by tests).
    pub fn with_http(config: ClientConfig, http: Arc<dyn HttpClient>) -> Self {
        let streaming = config.streaming;
        Self {
            transcript: Arc::new(Mutex::new(Transcript::new())),
            dispatcher: Arc::new(AskDispatcher::new(&config, http)),
            streaming,
            active: None,
        }
    }

    /// Submit a question.
    ///
    /// An empty query (after trimming) is a no-op and returns `None`.
    /// Otherwise any in-flight request is cancelled first, the user message
    /// and an empty assistant placeholder are appended before any network
    /// activity, and the id of the placeholder is returned.
    pub async fn ask(&mut self, query: &str, context: Option<QueryContext>) -> Option<Uuid> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        self.cancel().await;

        let mut request = AskRequest::new(query);
        if let Some(context) = context {
            request = request.with_context(context);
        }

        let message_id = {
            let mut transcript = self.transcript.lock().await;
            transcript.push_user(query);
            if self.streaming {
                transcript.push_streaming_placeholder()
            } else {
                transcript.push_loading_placeholder()
            }
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let dispatcher = Arc::clone(&self.dispatcher);
        let transcript = Arc::clone(&self.transcript);
        let streaming = self.streaming;

        let handle = tokio::spawn(async move {
            if streaming {
                dispatcher
                    .run_streaming(&request, &transcript, message_id, cancel_rx)
                    .await;
            } else {
                run_fallback(dispatcher, transcript, message_id, request, cancel_rx).await;
            }
        });

        self.active = Some(ActiveRequest {
            handle,
            cancel_tx,
            message_id,
        });
        Some(message_id)
    }

    /// Cancel the in-flight request, if any.
    ///
    /// Idempotent; safe to call when idle. Returns once the placeholder
    /// message has settled, with whatever partial content it had (not
    /// discarded, not marked as an error).
    pub async fn cancel(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        let _ = active.cancel_tx.send(true);
        if let Err(err) = active.handle.await {
            tracing::warn!(%err, "request task did not shut down cleanly");
        }
        // normally the task settles the message; this is a no-op then
        self.transcript.lock().await.settle(active.message_id);
    }

    /// Cancel any in-flight request and empty the transcript.
    pub async fn clear(&mut self) {
        self.cancel().await;
        self.transcript.lock().await.clear();
    }

    /// Record feedback on a message. Local only; returns false for an
    /// unknown id.
    pub async fn set_feedback(&mut self, message_id: Uuid, feedback: Feedback) -> bool {
        self.transcript.lock().await.set_feedback(message_id, feedback)
    }

    /// Snapshot of the conversation so far.
    pub async fn messages(&self) -> Vec<Message> {
        self.transcript.lock().await.snapshot()
    }

    /// Subscribe to transcript revision ticks.
    pub async fn subscribe(&self) -> watch::Receiver<u64> {
        self.transcript.lock().await.subscribe()
    }

    /// Wait until the in-flight request (if any) has finished.
    pub async fn wait_for_idle(&mut self) {
        if let Some(active) = self.active.take() {
            if let Err(err) = active.handle.await {
                tracing::warn!(%err, "request task did not shut down cleanly");
            }
            self.transcript.lock().await.settle(active.message_id);
        }
    }

    /// Whether a request is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.active
            .as_ref()
            .map(|active| !active.handle.is_finished())
            .unwrap_or(false)
    }

    /// Whether this session uses the streaming endpoint.
    pub fn streaming_enabled(&self) -> bool {
        self.streaming
    }

    /// Switch between the streaming endpoint and the single-shot fallback.
    /// Affects the next `ask`, not a request already in flight.
    pub fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
    }

    /// Render the conversation as markdown.
    pub async fn export_markdown(&self) -> String {
        self.transcript.lock().await.to_markdown()
    }

    /// Serialize the conversation as pretty JSON.
    pub async fn export_json(&self) -> Result<String, serde_json::Error> {
        let snapshot = self.transcript.lock().await.snapshot();
        serde_json::to_string_pretty(&snapshot)
    }

    /// Check backend reachability.
    pub async fn health_check(&self) -> Result<bool, ApiError> {
        self.dispatcher.health_check().await
    }
}

/// Drive the single-shot fallback, racing it against cancellation.
async fn run_fallback(
    dispatcher: Arc<AskDispatcher>,
    transcript: Arc<Mutex<Transcript>>,
    message_id: Uuid,
    request: AskRequest,
    mut cancel_rx: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = cancel_rx.changed() => {
            tracing::debug!("fallback request cancelled by caller");
            transcript.lock().await.settle(message_id);
        }
        result = dispatcher.send_once(&request) => {
            let mut transcript = transcript.lock().await;
            match result {
                Ok(answer) => transcript.complete_once(
                    message_id,
                    &answer.answer,
                    answer.referenced_entities,
                    answer.matched_region,
                ),
                Err(err) => transcript.fail(message_id, &err.to_string()),
            }
        }
    }
}
