//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForHeader`: Need at least 9 bytes
//! - `WaitingForPayload`: Header parsed and validated, need N more payload bytes
//!
//! # Example
//!
//! ```
//! use localwire::protocol::{build_frame, FrameBuffer};
//! use localwire::Value;
//!
//! let mut buffer = FrameBuffer::new();
//! let bytes = build_frame(&Value::from_string("hi"));
//!
//! // Data arrives in chunks from the socket
//! assert!(buffer.push(&bytes[..4]).unwrap().is_empty());
//! let frames = buffer.push(&bytes[4..]).unwrap();
//! assert_eq!(frames.len(), 1);
//! ```

use bytes::BytesMut;

use super::wire_format::{Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
use super::Frame;
use crate::error::Result;
use crate::value::Kind;

/// Initial accumulator capacity.
const INITIAL_CAPACITY: usize = 4 * 1024;

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for complete header (need 9 bytes).
    WaitingForHeader,
    /// Header parsed, waiting for payload bytes.
    WaitingForPayload { header: Header, kind: Kind },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// Headers are validated as soon as they are complete, so a protocol
/// violation surfaces before the (possibly bogus) payload is awaited.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with custom max payload size.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            state: State::WaitingForHeader,
            max_payload_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Returns a vector of complete frames in arrival order (may be empty if
    /// still waiting for data). Partial data stays buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns `MalformedFrame` if a header fails validation. The buffer is
    /// left as it was at the offending header; callers are expected to close
    /// the connection.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on protocol violation
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    let Some(header) = Header::decode(&self.buffer) else {
                        return Ok(None);
                    };
                    let kind = header.validate(self.max_payload_size)?;

                    let _ = self.buffer.split_to(HEADER_SIZE);
                    self.state = State::WaitingForPayload { header, kind };
                }

                State::WaitingForPayload { header, kind } => {
                    let needed = header.payload_length as usize;
                    if self.buffer.len() < needed {
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(needed).freeze();
                    self.state = State::WaitingForHeader;
                    return Ok(Some(Frame::new(header, kind, payload)));
                }
            }
        }
    }

    /// Get the number of buffered bytes that are not yet part of a frame.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check whether no partial frame is pending.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && matches!(self.state, State::WaitingForHeader)
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
