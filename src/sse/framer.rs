//! SSE frame decoding.
//!
//! The backend streams `data: <json>\n\n` frames over the response body.
//! Network reads split those frames at arbitrary byte positions, including
//! inside the blank-line separator and inside multi-byte characters, so the
//! decoder buffers raw bytes and only decodes text once a complete frame is
//! present.

/// Payload prefix of a data frame. Frames without it (comments,
/// keep-alives) carry nothing for the transcript and are discarded.
const DATA_PREFIX: &str = "data: ";

/// Stateful decoder turning an incoming byte sequence into frame payloads.
///
/// One decoder per request; it is not restartable.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Create a decoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk, returning every payload the chunk completed,
    /// in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some((end, separator_len)) = find_separator(&self.buf) {
            let frame = String::from_utf8_lossy(&self.buf[..end]).into_owned();
            self.buf.drain(..end + separator_len);

            if let Some(payload) = extract_payload(&frame) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Signal that the byte source closed.
    ///
    /// An unterminated trailing frame is dropped rather than emitted: the
    /// blank line is what guarantees the payload is complete, and without it
    /// the bytes are assumed to be a truncated frame.
    pub fn finish(&mut self) {
        if !self.buf.is_empty() {
            tracing::debug!(bytes = self.buf.len(), "dropping unterminated trailing frame");
            self.buf.clear();
        }
    }

    /// Whether undelivered bytes are sitting in the buffer.
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }
}

/// Find the first blank-line separator. Returns the frame end offset and
/// the separator length; `\n\n` and `\n\r\n` both terminate a frame, which
/// covers CRLF-framed backends since the frame text trims its trailing CR.
fn find_separator(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' {
            if buf[i + 1] == b'\n' {
                return Some((i, 2));
            }
            if i + 2 < buf.len() && buf[i + 1] == b'\r' && buf[i + 2] == b'\n' {
                return Some((i, 3));
            }
        }
        i += 1;
    }
    None
}

/// Strip the `data: ` prefix; frames without it yield `None`.
fn extract_payload(frame: &str) -> Option<String> {
    let frame = frame.trim_end_matches('\r');
    frame.strip_prefix(DATA_PREFIX).map(str::to_string)
}
