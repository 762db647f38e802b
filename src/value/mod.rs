//! Typed values - the unit carried by every frame.
//!
//! A [`Value`] is a tagged payload: a [`Kind`], the raw bytes the kind
//! interprets, and a correlation id the RPC layer uses to pair calls with
//! their replies. Numbers are stored little-endian at their natural width.
//!
//! # Example
//!
//! ```
//! use localwire::{Kind, Value};
//!
//! let value = Value::from(300u16).with_correlation_id(12);
//! assert_eq!(value.kind(), Kind::UInt16);
//! assert_eq!(value.to_u32(), Some(300));
//! assert_eq!(value.to_u8(), Some(44)); // truncated
//! assert_eq!(value.to_text().as_deref(), Some("300"));
//! ```

mod convert;
mod kind;
mod nested;

use std::collections::BTreeMap;
use std::os::unix::io::RawFd;

use bytes::Bytes;

use crate::error::{LocalwireError, Result};

pub use kind::Kind;

/// A typed value with an optional correlation id.
///
/// Equality is structural: same kind, same payload bytes, same correlation id.
///
/// A `SocketDescriptor` value holds a descriptor number that is valid in the
/// process that built or received it. Values received from a peer own their
/// descriptor; closing it is up to the application.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Value {
    kind: Kind,
    payload: Bytes,
    correlation_id: u32,
}

impl Value {
    /// The absent value (`Kind::None`).
    pub fn none() -> Self {
        Self::default()
    }

    /// Construct a value from raw parts, checking the payload width.
    ///
    /// Fixed-width kinds (integers, `Bool`, `SocketDescriptor`, `None`) must
    /// carry exactly their width.
    pub fn from_raw(kind: Kind, payload: impl Into<Bytes>, correlation_id: u32) -> Result<Self> {
        let payload = payload.into();
        if let Some(width) = kind.fixed_width() {
            if payload.len() != width {
                return Err(LocalwireError::MalformedFrame(format!(
                    "{:?} value needs {} payload bytes, got {}",
                    kind,
                    width,
                    payload.len()
                )));
            }
        }
        Ok(Self {
            kind,
            payload,
            correlation_id,
        })
    }

    fn tagged(kind: Kind, payload: Bytes) -> Self {
        Self {
            kind,
            payload,
            correlation_id: 0,
        }
    }

    pub fn from_u8(num: u8) -> Self {
        Self::tagged(Kind::UInt8, Bytes::copy_from_slice(&num.to_le_bytes()))
    }

    pub fn from_i8(num: i8) -> Self {
        Self::tagged(Kind::Int8, Bytes::copy_from_slice(&num.to_le_bytes()))
    }

    pub fn from_u16(num: u16) -> Self {
        Self::tagged(Kind::UInt16, Bytes::copy_from_slice(&num.to_le_bytes()))
    }

    pub fn from_i16(num: i16) -> Self {
        Self::tagged(Kind::Int16, Bytes::copy_from_slice(&num.to_le_bytes()))
    }

    pub fn from_u32(num: u32) -> Self {
        Self::tagged(Kind::UInt32, Bytes::copy_from_slice(&num.to_le_bytes()))
    }

    pub fn from_i32(num: i32) -> Self {
        Self::tagged(Kind::Int32, Bytes::copy_from_slice(&num.to_le_bytes()))
    }

    pub fn from_u64(num: u64) -> Self {
        Self::tagged(Kind::UInt64, Bytes::copy_from_slice(&num.to_le_bytes()))
    }

    pub fn from_i64(num: i64) -> Self {
        Self::tagged(Kind::Int64, Bytes::copy_from_slice(&num.to_le_bytes()))
    }

    pub fn from_bool(boolean: bool) -> Self {
        Self::tagged(Kind::Bool, Bytes::copy_from_slice(&[u8::from(boolean)]))
    }

    /// Opaque byte buffer.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::tagged(Kind::ByteArray, data.into())
    }

    /// UTF-8 string.
    pub fn from_string(string: impl Into<String>) -> Self {
        Self::tagged(Kind::String, Bytes::from(string.into().into_bytes()))
    }

    /// A descriptor to transfer to the peer.
    ///
    /// The descriptor must stay open until the frame carrying it has been
    /// written; the sender keeps its own copy afterwards.
    pub fn from_descriptor(fd: RawFd) -> Self {
        Self::tagged(
            Kind::SocketDescriptor,
            Bytes::copy_from_slice(&i64::from(fd).to_le_bytes()),
        )
    }

    /// Ordered list of values.
    pub fn from_list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::tagged(Kind::List, nested::encode_list(items))
    }

    /// String-keyed map, encoded in key order.
    pub fn from_map(map: &BTreeMap<String, Value>) -> Self {
        Self::tagged(Kind::Map, nested::encode_map(map))
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Raw payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Anything but `Kind::None`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.kind != Kind::None
    }

    #[inline]
    pub fn correlation_id(&self) -> u32 {
        self.correlation_id
    }

    pub fn set_correlation_id(&mut self, correlation_id: u32) {
        self.correlation_id = correlation_id;
    }

    /// Builder-style [`set_correlation_id`](Self::set_correlation_id).
    pub fn with_correlation_id(mut self, correlation_id: u32) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $ctor:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$ctor(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    u8 => from_u8,
    i8 => from_i8,
    u16 => from_u16,
    i16 => from_i16,
    u32 => from_u32,
    i32 => from_i32,
    u64 => from_u64,
    i64 => from_i64,
    bool => from_bool,
    Bytes => from_bytes,
    String => from_string,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::from_string(s)
    }
}

impl From<&[u8]> for Value {
    fn from(data: &[u8]) -> Self {
        Value::from_bytes(Bytes::copy_from_slice(data))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::from_list(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::from_map(&map)
    }
}
