//! SSE stream handling.
//!
//! The backend streams its answer as `data: <json>\n\n` frames over a plain
//! HTTP response body. End of stream is detected from the body closing,
//! never from headers.
//!
//! # Module structure
//! - `framer` - byte buffer splitting the body into complete frame payloads
//! - `events` - typed stream events and payload parsing
//! - `interpreter` - maps events to transcript mutations

mod events;
mod framer;
mod interpreter;

pub use events::{parse_event, StreamEvent};
pub use framer::FrameDecoder;
pub use interpreter::{apply_event, apply_payload, Disposition, GENERIC_ERROR_TEXT};
