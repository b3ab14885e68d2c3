use tracing::warn;

use crate::frame::{StreamFrame, WireError, DATA_PREFIX, DONE_MARKER};
use crate::line_buffer::LineBuffer;

/// Result of interpreting one complete wire line.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLine {
    Frame(StreamFrame),
    Done,
    /// Blank separator lines and lines without the `data: ` prefix.
    Skipped,
}

/// Interprets one complete line of the wire protocol.
pub fn decode_line(line: &str) -> Result<DecodedLine, WireError> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(DecodedLine::Skipped);
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(DecodedLine::Skipped);
    }
    if payload == DONE_MARKER {
        return Ok(DecodedLine::Done);
    }
    serde_json::from_str::<StreamFrame>(payload)
        .map(DecodedLine::Frame)
        .map_err(|source| WireError::Malformed {
            payload: payload.to_string(),
            source,
        })
}

/// Incremental decoder for a byte stream of wire frames.
///
/// Malformed lines are logged and dropped; everything after the done marker is
/// ignored.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    lines: LineBuffer,
    done: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds one chunk and returns the frames it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        if self.done {
            return Vec::new();
        }

        let mut frames = Vec::new();
        for line in self.lines.push(chunk) {
            match decode_line(&line) {
                Ok(DecodedLine::Frame(frame)) => frames.push(frame),
                Ok(DecodedLine::Done) => {
                    self.done = true;
                    break;
                }
                Ok(DecodedLine::Skipped) => {}
                Err(e) => {
                    let preview: String = line.chars().take(200).collect();
                    warn!(line_len = line.len(), "Dropping wire line: {e}; line: {preview}");
                }
            }
        }
        frames
    }

    /// Called at end of stream; anything still buffered was never terminated.
    pub fn finish(&mut self) {
        if let Some(rest) = self.lines.finish() {
            let preview: String = rest.chars().take(200).collect();
            warn!("Unterminated data left after stream end: {preview}");
        }
    }
}
