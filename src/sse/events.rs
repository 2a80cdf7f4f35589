//! Stream event types.
//!
//! A frame payload decodes into exactly one [`StreamEvent`]; events are
//! applied to the transcript once and discarded.

use serde::Deserialize;

/// Typed event decoded from one frame payload.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental answer text
    Chunk { content: Option<String> },
    /// Stream completed; citations arrive here
    Done {
        referenced_entities: Vec<String>,
        matched_region: Option<String>,
    },
    /// Terminal backend failure
    Error { message: Option<String> },
    /// Event type this client does not know; ignored for forward
    /// compatibility
    Other { kind: String },
}

impl StreamEvent {
    /// The wire-level type name, for logging.
    pub fn kind(&self) -> &str {
        match self {
            StreamEvent::Chunk { .. } => "chunk",
            StreamEvent::Done { .. } => "done",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Other { kind } => kind,
        }
    }
}

/// Wire shape of a frame payload. Every field except `type` is optional;
/// which ones are present depends on the event type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    referenced_entities: Option<Vec<String>>,
    #[serde(default)]
    matched_region: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Parse a frame payload into a typed event.
pub fn parse_event(payload: &str) -> Result<StreamEvent, serde_json::Error> {
    let raw: RawEvent = serde_json::from_str(payload)?;
    Ok(match raw.kind.as_str() {
        "chunk" => StreamEvent::Chunk { content: raw.content },
        "done" => StreamEvent::Done {
            referenced_entities: raw.referenced_entities.unwrap_or_default(),
            matched_region: raw.matched_region,
        },
        "error" => StreamEvent::Error { message: raw.message },
        _ => StreamEvent::Other { kind: raw.kind },
    })
}
