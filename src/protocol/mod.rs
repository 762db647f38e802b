//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary protocol spoken on the socket:
//! - 9-byte header encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - Outbound frames with a write cursor for partial writes

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, Frame, OutboundFrame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
