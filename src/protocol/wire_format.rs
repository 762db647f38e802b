//! Wire format encoding and decoding.
//!
//! Implements the 9-byte header format:
//! ```text
//! ┌──────────┬────────────────┬──────────┐
//! │ Kind tag │ Correlation ID │ Length   │
//! │ 1 byte   │ 4 bytes        │ 4 bytes  │
//! │          │ uint32 LE      │ uint32 LE│
//! └──────────┴────────────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Little Endian. Descriptor frames always carry
//! a length of 0; the descriptor itself travels as `SCM_RIGHTS` ancillary data
//! on the same `sendmsg` as the header.

use crate::error::{LocalwireError, Result};
use crate::value::Kind;

/// Header size in bytes (fixed, exactly 9).
pub const HEADER_SIZE: usize = 9;

/// Default maximum payload size (1 GB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 1_073_741_824;

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Raw kind tag (see [`Kind`]).
    pub tag: u8,
    /// Correlation identifier, opaque to this layer.
    pub correlation_id: u32,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(kind: Kind, correlation_id: u32, payload_length: u32) -> Self {
        Self {
            tag: kind.tag(),
            correlation_id,
            payload_length,
        }
    }

    /// Encode header to bytes (Little Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use localwire::protocol::Header;
    /// use localwire::Kind;
    ///
    /// let header = Header::new(Kind::UInt32, 7, 4);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 9);
    /// assert_eq!(bytes[0], 0x05);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0] = self.tag;
        buf[1..5].copy_from_slice(&self.correlation_id.to_le_bytes());
        buf[5..9].copy_from_slice(&self.payload_length.to_le_bytes());
        buf
    }

    /// Decode header from bytes (Little Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        let bytes: &[u8; HEADER_SIZE] = buf.get(..HEADER_SIZE)?.try_into().ok()?;
        Some(Self {
            tag: bytes[0],
            correlation_id: u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
            payload_length: u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
        })
    }

    /// Validate the header and resolve its kind.
    ///
    /// Checks:
    /// - Tag names a known kind
    /// - Payload length doesn't exceed max
    /// - Fixed-width kinds announce exactly their width
    /// - Descriptor frames carry no inline payload
    pub fn validate(&self, max_payload_size: u32) -> Result<Kind> {
        let kind = Kind::from_tag(self.tag).ok_or_else(|| {
            LocalwireError::MalformedFrame(format!("Unknown kind tag 0x{:02x}", self.tag))
        })?;

        if self.payload_length > max_payload_size {
            return Err(LocalwireError::MalformedFrame(format!(
                "Payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }

        let expected = match kind {
            Kind::SocketDescriptor => Some(0),
            other => other.fixed_width(),
        };
        if let Some(expected) = expected {
            if self.payload_length as usize != expected {
                return Err(LocalwireError::MalformedFrame(format!(
                    "{:?} frame announces {} payload bytes, expected {}",
                    kind, self.payload_length, expected
                )));
            }
        }

        Ok(kind)
    }

    /// Check if this header announces a descriptor transfer.
    #[inline]
    pub fn is_descriptor(&self) -> bool {
        self.tag == Kind::SocketDescriptor.tag()
    }

    /// Total frame size (header + payload).
    #[inline]
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_length as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original = Header::new(Kind::String, 42, 100);
        let encoded = original.encode();
        let decoded = Header::decode(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_header_little_endian_byte_order() {
        let header = Header::new(Kind::ByteArray, 0x04030201, 0x08070605);
        let bytes = header.encode();

        assert_eq!(bytes[0], 0x09);
        assert_eq!(&bytes[1..5], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[5..9], &[0x05, 0x06, 0x07, 0x08]);
    }

    #[test]
    fn test_header_size_is_exactly_9() {
        assert_eq!(HEADER_SIZE, 9);
        assert_eq!(Header::new(Kind::None, 0, 0).encode().len(), 9);
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; 8];
        assert!(Header::decode(&buf).is_none());
        assert!(Header::decode(&[]).is_none());
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut buf = Header::new(Kind::UInt8, 1, 1).encode().to_vec();
        buf.push(0xAA);
        let header = Header::decode(&buf).unwrap();
        assert_eq!(header.payload_length, 1);
        assert_eq!(header.frame_len(), HEADER_SIZE + 1);
    }

    #[test]
    fn test_validate_unknown_tag_rejected() {
        let header = Header {
            tag: 0x7F,
            correlation_id: 0,
            payload_length: 0,
        };
        let err = header.validate(DEFAULT_MAX_PAYLOAD_SIZE).unwrap_err();
        assert!(err.to_string().contains("Unknown kind tag"));
    }

    #[test]
    fn test_validate_payload_too_large() {
        let header = Header::new(Kind::ByteArray, 1, 1_000_000);
        let result = header.validate(100);
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_fixed_width_mismatch() {
        let header = Header::new(Kind::UInt32, 0, 3);
        assert!(matches!(
            header.validate(DEFAULT_MAX_PAYLOAD_SIZE),
            Err(LocalwireError::MalformedFrame(_))
        ));

        let header = Header::new(Kind::UInt32, 0, 4);
        assert_eq!(header.validate(DEFAULT_MAX_PAYLOAD_SIZE).unwrap(), Kind::UInt32);
    }

    #[test]
    fn test_validate_descriptor_must_be_empty() {
        let header = Header::new(Kind::SocketDescriptor, 3, 8);
        assert!(header.validate(DEFAULT_MAX_PAYLOAD_SIZE).is_err());

        let header = Header::new(Kind::SocketDescriptor, 3, 0);
        assert!(header.is_descriptor());
        assert_eq!(
            header.validate(DEFAULT_MAX_PAYLOAD_SIZE).unwrap(),
            Kind::SocketDescriptor
        );
    }
}
