//! Applies decoded stream events to the transcript.
//!
//! One payload maps to at most one mutation of the placeholder assistant
//! message. Undecodable payloads are skipped so a single corrupted frame
//! cannot kill an otherwise healthy stream.

use uuid::Uuid;

use crate::sse::events::{parse_event, StreamEvent};
use crate::transcript::Transcript;

/// Shown when the backend sends an error event without any message text.
pub const GENERIC_ERROR_TEXT: &str =
    "The assistant is unavailable right now. Please try again.";

/// Whether the stream should keep being consumed after a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// More events may follow
    Continue,
    /// A terminal event settled the message; stop reading
    Finished,
}

/// Apply one frame payload to the target assistant message.
pub fn apply_payload(transcript: &mut Transcript, message_id: Uuid, payload: &str) -> Disposition {
    match parse_event(payload) {
        Ok(event) => apply_event(transcript, message_id, event),
        Err(err) => {
            tracing::debug!(%err, "skipping undecodable stream frame");
            Disposition::Continue
        }
    }
}

/// Apply an already-decoded event to the target assistant message.
pub fn apply_event(
    transcript: &mut Transcript,
    message_id: Uuid,
    event: StreamEvent,
) -> Disposition {
    match event {
        StreamEvent::Chunk { content } => {
            if let Some(content) = content {
                if !content.is_empty() {
                    transcript.append_chunk(message_id, &content);
                }
            }
            Disposition::Continue
        }
        StreamEvent::Done {
            referenced_entities,
            matched_region,
        } => {
            transcript.finish_stream(message_id, referenced_entities, matched_region);
            Disposition::Finished
        }
        StreamEvent::Error { message } => {
            let text = message.unwrap_or_else(|| GENERIC_ERROR_TEXT.to_string());
            transcript.fail(message_id, &text);
            Disposition::Finished
        }
        StreamEvent::Other { kind } => {
            tracing::debug!(%kind, "ignoring unknown stream event");
            Disposition::Continue
        }
    }
}
