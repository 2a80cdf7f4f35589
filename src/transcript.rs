//! Conversation transcript store.
//!
//! The transcript is append-only apart from in-place mutation of the
//! active assistant placeholder. At most one message is streaming at any
//! time, and a message that has settled is never reopened; the mutation
//! methods here enforce both by refusing to touch settled messages.
//!
//! Observers subscribe to a revision counter published on a watch channel
//! and re-read a snapshot when it ticks.

use tokio::sync::watch;
use uuid::Uuid;

use crate::models::{Feedback, Message, MessageRole};

/// Ordered conversation history for one session.
#[derive(Debug)]
pub struct Transcript {
    messages: Vec<Message>,
    revision: u64,
    revision_tx: watch::Sender<u64>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            messages: Vec::new(),
            revision: 0,
            revision_tx,
        }
    }

    /// Subscribe to revision ticks. Receivers observe the latest revision
    /// only; intermediate ones may be coalesced.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    /// The current revision number.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
        let _ = self.revision_tx.send(self.revision);
    }

    fn find_mut(&mut self, id: Uuid) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Append a message and return its id.
    pub fn push(&mut self, message: Message) -> Uuid {
        let id = message.id;
        self.messages.push(message);
        self.bump();
        id
    }

    /// Append a user message.
    pub fn push_user(&mut self, content: impl Into<String>) -> Uuid {
        self.push(Message::new(MessageRole::User, content))
    }

    /// Append an empty streaming assistant placeholder.
    pub fn push_streaming_placeholder(&mut self) -> Uuid {
        self.push(Message::streaming_placeholder())
    }

    /// Append an empty loading assistant placeholder for the fallback path.
    pub fn push_loading_placeholder(&mut self) -> Uuid {
        self.push(Message::loading_placeholder())
    }

    /// Append streamed text to a streaming message.
    pub fn append_chunk(&mut self, id: Uuid, chunk: &str) {
        if let Some(message) = self.find_mut(id) {
            if message.is_streaming {
                message.append_chunk(chunk);
                self.bump();
            }
        }
    }

    /// Finalize a streaming message with its citations.
    pub fn finish_stream(
        &mut self,
        id: Uuid,
        referenced_entities: Vec<String>,
        matched_region: Option<String>,
    ) {
        if let Some(message) = self.find_mut(id) {
            if message.is_streaming {
                message.finish_stream(referenced_entities, matched_region);
                self.bump();
            }
        }
    }

    /// Replace an active message's content with error text and settle it.
    pub fn fail(&mut self, id: Uuid, text: &str) {
        if let Some(message) = self.find_mut(id) {
            if message.is_active() {
                message.fail(text);
                self.bump();
            }
        }
    }

    /// Settle an active message without an error, preserving whatever
    /// content it accumulated (cancellation, transport close).
    pub fn settle(&mut self, id: Uuid) {
        if let Some(message) = self.find_mut(id) {
            if message.is_active() {
                message.settle();
                self.bump();
            }
        }
    }

    /// Write the single fallback answer onto a loading placeholder.
    pub fn complete_once(
        &mut self,
        id: Uuid,
        answer: &str,
        referenced_entities: Vec<String>,
        matched_region: Option<String>,
    ) {
        if let Some(message) = self.find_mut(id) {
            if message.is_loading {
                message.complete_once(answer, referenced_entities, matched_region);
                self.bump();
            }
        }
    }

    /// Record feedback on a message. Returns false for an unknown id.
    pub fn set_feedback(&mut self, id: Uuid, feedback: Feedback) -> bool {
        match self.find_mut(id) {
            Some(message) => {
                message.feedback = Some(feedback);
                self.bump();
                true
            }
            None => false,
        }
    }

    /// Remove every message.
    pub fn clear(&mut self) {
        if !self.messages.is_empty() {
            self.messages.clear();
            self.bump();
        }
    }

    /// The messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// An owned copy of the messages, for handing across task boundaries.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Look up a message by id.
    pub fn get(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether any message is still waiting on the backend.
    pub fn has_active(&self) -> bool {
        self.messages.iter().any(Message::is_active)
    }

    /// Render the conversation as markdown for sharing.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            let label = match message.role {
                MessageRole::User => "You",
                MessageRole::Assistant => "Assistant",
                MessageRole::System => "System",
            };
            out.push_str(&format!(
                "**{}** ({})\n\n{}\n\n",
                label,
                message.created_at.format("%Y-%m-%d %H:%M UTC"),
                message.content
            ));
            if !message.referenced_entities.is_empty() {
                out.push_str(&format!(
                    "_Sources: {}_\n\n",
                    message.referenced_entities.join(", ")
                ));
            }
        }
        out
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
