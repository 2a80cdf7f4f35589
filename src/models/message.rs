use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// User-supplied signal on an assistant answer.
///
/// Purely local state; forwarding it to the backend is the embedding
/// application's concern.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Liked,
    Disliked,
}

/// One turn in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Stable identifier assigned at creation
    pub id: Uuid,
    /// Role of the message sender
    pub role: MessageRole,
    /// Message text; assistant messages grow incrementally while streaming
    pub content: String,
    /// When the message was created
    pub created_at: DateTime<Utc>,
    /// True only for a fallback assistant placeholder awaiting its single response
    #[serde(default)]
    pub is_loading: bool,
    /// True only while the message is actively receiving stream chunks
    #[serde(default)]
    pub is_streaming: bool,
    /// Optional reader feedback, mutable after the fact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    /// Provider names the backend cited; populated only at finalization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_entities: Vec<String>,
    /// Regional center the backend matched; populated only at finalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_region: Option<String>,
}

impl Message {
    /// Create a settled message with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            is_loading: false,
            is_streaming: false,
            feedback: None,
            referenced_entities: Vec::new(),
            matched_region: None,
        }
    }

    /// Empty assistant placeholder for the streaming path.
    pub fn streaming_placeholder() -> Self {
        let mut message = Self::new(MessageRole::Assistant, "");
        message.is_streaming = true;
        message
    }

    /// Empty assistant placeholder for the non-streaming fallback path.
    pub fn loading_placeholder() -> Self {
        let mut message = Self::new(MessageRole::Assistant, "");
        message.is_loading = true;
        message
    }

    /// Whether the message is still waiting on the backend.
    pub fn is_active(&self) -> bool {
        self.is_streaming || self.is_loading
    }

    /// Append a streamed chunk. No-op once the message has settled.
    pub fn append_chunk(&mut self, chunk: &str) {
        if self.is_streaming {
            self.content.push_str(chunk);
        }
    }

    /// Finalize a streaming message, attaching any citations.
    pub fn finish_stream(&mut self, referenced_entities: Vec<String>, matched_region: Option<String>) {
        if self.is_streaming {
            self.is_streaming = false;
            self.referenced_entities = referenced_entities;
            self.matched_region = matched_region;
        }
    }

    /// Settle without a terminal event (cancellation or transport close).
    /// Partial content is preserved; this is not an error outcome.
    pub fn settle(&mut self) {
        self.is_streaming = false;
        self.is_loading = false;
    }

    /// Replace the content with error text and settle.
    pub fn fail(&mut self, text: &str) {
        if self.is_active() {
            self.content = text.to_string();
            self.settle();
        }
    }

    /// Write the single fallback answer. The content of a loading
    /// placeholder is written exactly once.
    pub fn complete_once(
        &mut self,
        answer: &str,
        referenced_entities: Vec<String>,
        matched_region: Option<String>,
    ) {
        if self.is_loading {
            self.content = answer.to_string();
            self.is_loading = false;
            self.referenced_entities = referenced_entities;
            self.matched_region = matched_region;
        }
    }
}
