//! Value kinds and their on-wire tag bytes.

/// Kind of a [`Value`](super::Value).
///
/// The discriminant is the tag byte written at offset 0 of every frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Kind {
    /// Absent / invalid value.
    #[default]
    None = 0x00,
    UInt8 = 0x01,
    Int8 = 0x02,
    UInt16 = 0x03,
    Int16 = 0x04,
    UInt32 = 0x05,
    Int32 = 0x06,
    UInt64 = 0x07,
    Int64 = 0x08,
    /// Opaque byte buffer.
    ByteArray = 0x09,
    /// UTF-8 text.
    String = 0x10,
    Bool = 0x11,
    /// A live descriptor carried out-of-band via `SCM_RIGHTS`.
    SocketDescriptor = 0x12,
    /// String-keyed map, ordered by key.
    Map = 0x13,
    /// Ordered list of values.
    List = 0x14,
}

impl Kind {
    /// Look up a kind by its tag byte.
    ///
    /// Returns `None` for tags outside the closed set.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0x00 => Self::None,
            0x01 => Self::UInt8,
            0x02 => Self::Int8,
            0x03 => Self::UInt16,
            0x04 => Self::Int16,
            0x05 => Self::UInt32,
            0x06 => Self::Int32,
            0x07 => Self::UInt64,
            0x08 => Self::Int64,
            0x09 => Self::ByteArray,
            0x10 => Self::String,
            0x11 => Self::Bool,
            0x12 => Self::SocketDescriptor,
            0x13 => Self::Map,
            0x14 => Self::List,
            _ => return None,
        })
    }

    /// The tag byte for this kind.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Payload width in bytes for fixed-width kinds.
    ///
    /// `SocketDescriptor` reports the width of its *local* payload (the
    /// descriptor number as `i64`); on the wire it carries no payload.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Self::None => Some(0),
            Self::UInt8 | Self::Int8 | Self::Bool => Some(1),
            Self::UInt16 | Self::Int16 => Some(2),
            Self::UInt32 | Self::Int32 => Some(4),
            Self::UInt64 | Self::Int64 | Self::SocketDescriptor => Some(8),
            Self::ByteArray | Self::String | Self::Map | Self::List => None,
        }
    }

    /// True for the eight integer kinds.
    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::UInt8
                | Self::Int8
                | Self::UInt16
                | Self::Int16
                | Self::UInt32
                | Self::Int32
                | Self::UInt64
                | Self::Int64
        )
    }

    /// True for the signed integer kinds.
    #[inline]
    pub fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }
}
