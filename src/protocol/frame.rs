//! Frame types: decoded inbound frames and serialized outbound frames.
//!
//! Inbound frames come out of the [`FrameBuffer`](super::FrameBuffer) as a
//! header plus zero-copy payload. Outbound frames are serialized once from a
//! [`Value`] and then written out across as many `sendmsg` calls as the kernel
//! needs, tracking the write offset.
//!
//! # Example
//!
//! ```
//! use localwire::protocol::{build_frame, OutboundFrame, HEADER_SIZE};
//! use localwire::Value;
//!
//! let value = Value::from_string("hello");
//! let bytes = build_frame(&value);
//! assert_eq!(bytes.len(), HEADER_SIZE + 5);
//!
//! let mut frame = OutboundFrame::from_value(&value);
//! frame.advance(4);
//! assert_eq!(frame.remaining().len(), HEADER_SIZE + 1);
//! ```

use std::os::unix::io::RawFd;

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{Header, HEADER_SIZE};
use crate::error::Result;
use crate::value::{Kind, Value};

/// A complete inbound frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Kind resolved during validation.
    pub kind: Kind,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from a validated header and its payload.
    pub fn new(header: Header, kind: Kind, payload: Bytes) -> Self {
        Self {
            header,
            kind,
            payload,
        }
    }

    /// Get the correlation ID.
    #[inline]
    pub fn correlation_id(&self) -> u32 {
        self.header.correlation_id
    }

    /// Check if this frame announces an out-of-band descriptor.
    #[inline]
    pub fn is_descriptor(&self) -> bool {
        self.kind == Kind::SocketDescriptor
    }

    /// Convert into a value.
    ///
    /// Descriptor frames have no inline payload and must be paired with a
    /// received descriptor instead; use [`Value::from_descriptor`] for those.
    pub fn into_value(self) -> Result<Value> {
        Value::from_raw(self.kind, self.payload, self.header.correlation_id)
    }
}

/// Append the wire encoding of `value` to `buf`.
///
/// Descriptor values are written with a zero payload length and no payload.
fn put_frame(buf: &mut BytesMut, value: &Value) {
    let payload: &[u8] = if value.kind() == Kind::SocketDescriptor {
        &[]
    } else {
        value.payload()
    };
    let header = Header::new(value.kind(), value.correlation_id(), payload.len() as u32);
    buf.reserve(HEADER_SIZE + payload.len());
    buf.put_slice(&header.encode());
    buf.put_slice(payload);
}

/// Build a complete frame as a single byte vector.
///
/// Encodes header and appends payload into a contiguous buffer. The
/// descriptor of a `SocketDescriptor` value is not part of the bytes.
pub fn build_frame(value: &Value) -> Vec<u8> {
    let mut buf = BytesMut::new();
    put_frame(&mut buf, value);
    buf.to_vec()
}

/// A frame being written to the socket.
///
/// Exactly one of these is in flight per socket. The optional descriptor is
/// attached to the first `sendmsg` that transmits bytes of this frame and
/// released as soon as that call succeeds.
#[derive(Debug)]
pub struct OutboundFrame {
    data: Bytes,
    written: usize,
    descriptor: Option<RawFd>,
}

impl OutboundFrame {
    /// Serialize a value into an outbound frame.
    pub fn from_value(value: &Value) -> Self {
        let mut buf = BytesMut::new();
        put_frame(&mut buf, value);
        // Always Some for descriptor values: constructors enforce the 8-byte payload.
        let descriptor = if value.kind() == Kind::SocketDescriptor {
            value.to_descriptor()
        } else {
            None
        };
        Self {
            data: buf.freeze(),
            written: 0,
            descriptor,
        }
    }

    /// Bytes not yet accepted by the kernel.
    #[inline]
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.written..]
    }

    /// Descriptor still waiting to be attached to a write, if any.
    #[inline]
    pub fn descriptor(&self) -> Option<RawFd> {
        self.descriptor
    }

    /// Record that the kernel accepted `n` more bytes.
    ///
    /// Any held descriptor went out with those bytes and is released.
    pub fn advance(&mut self, n: usize) {
        self.written = (self.written + n).min(self.data.len());
        if n > 0 {
            self.descriptor = None;
        }
    }

    /// Whether every byte of the frame has been written.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.written >= self.data.len()
    }

    /// Bytes written so far.
    #[inline]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Total size of this frame (header + payload).
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
