//! Conversions out of a [`Value`].
//!
//! Every conversion is fallible and returns `None` when the stored kind has
//! no meaning as the requested type.

use std::collections::BTreeMap;
use std::os::unix::io::RawFd;

use super::{nested, Kind, Value};

/// Read a little-endian integer of exactly `N` bytes.
#[inline]
fn le<const N: usize>(payload: &[u8]) -> Option<[u8; N]> {
    payload.try_into().ok()
}

impl Value {
    /// Widen the stored value to `i128` so every integer request can be
    /// served by a single truncating cast.
    fn integer(&self, signed_request: bool) -> Option<i128> {
        let p = self.payload();
        let wide = match self.kind() {
            Kind::UInt8 | Kind::Bool => i128::from(u8::from_le_bytes(le(p)?)),
            Kind::Int8 => i128::from(i8::from_le_bytes(le(p)?)),
            Kind::UInt16 => i128::from(u16::from_le_bytes(le(p)?)),
            Kind::Int16 => i128::from(i16::from_le_bytes(le(p)?)),
            Kind::UInt32 => i128::from(u32::from_le_bytes(le(p)?)),
            Kind::Int32 => i128::from(i32::from_le_bytes(le(p)?)),
            Kind::UInt64 => i128::from(u64::from_le_bytes(le(p)?)),
            Kind::Int64 | Kind::SocketDescriptor | Kind::ByteArray => {
                i128::from(i64::from_le_bytes(le(p)?))
            }
            Kind::String => {
                let text = std::str::from_utf8(p).ok()?.trim();
                if signed_request {
                    i128::from(text.parse::<i64>().ok()?)
                } else {
                    i128::from(text.parse::<u64>().ok()?)
                }
            }
            Kind::None | Kind::List | Kind::Map => return None,
        };
        Some(wide)
    }

    pub fn to_u8(&self) -> Option<u8> {
        self.integer(false).map(|v| v as u8)
    }

    pub fn to_i8(&self) -> Option<i8> {
        self.integer(true).map(|v| v as i8)
    }

    pub fn to_u16(&self) -> Option<u16> {
        self.integer(false).map(|v| v as u16)
    }

    pub fn to_i16(&self) -> Option<i16> {
        self.integer(true).map(|v| v as i16)
    }

    pub fn to_u32(&self) -> Option<u32> {
        self.integer(false).map(|v| v as u32)
    }

    pub fn to_i32(&self) -> Option<i32> {
        self.integer(true).map(|v| v as i32)
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.integer(false).map(|v| v as u64)
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.integer(true).map(|v| v as i64)
    }

    /// Truthiness of the value.
    ///
    /// Integers and `Bool` are true when non-zero, descriptors when positive,
    /// strings when they read `"true"` ignoring case and surrounding space.
    pub fn to_bool(&self) -> Option<bool> {
        match self.kind() {
            k if k.is_integer() || k == Kind::Bool => self.integer(false).map(|v| v != 0),
            Kind::SocketDescriptor => self.to_descriptor().map(|fd| fd > 0),
            Kind::String => {
                let text = std::str::from_utf8(self.payload()).ok()?;
                Some(text.trim().eq_ignore_ascii_case("true"))
            }
            _ => None,
        }
    }

    /// Text rendering of the value.
    ///
    /// Byte arrays render as lowercase hex.
    pub fn to_text(&self) -> Option<String> {
        match self.kind() {
            Kind::String => std::str::from_utf8(self.payload()).ok().map(str::to_owned),
            Kind::ByteArray => Some(hex::encode(self.payload())),
            Kind::Bool => self.to_bool().map(|b| b.to_string()),
            k if k.is_signed() || k == Kind::SocketDescriptor => {
                self.integer(true).map(|v| v.to_string())
            }
            k if k.is_integer() => self.integer(false).map(|v| v.to_string()),
            _ => None,
        }
    }

    /// The raw payload, for any valid value.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        self.is_valid().then(|| self.payload().to_vec())
    }

    /// The descriptor number carried by a `SocketDescriptor` value.
    pub fn to_descriptor(&self) -> Option<RawFd> {
        if self.kind() != Kind::SocketDescriptor {
            return None;
        }
        let fd = i64::from_le_bytes(le(self.payload())?);
        RawFd::try_from(fd).ok()
    }

    /// Decode the elements of a `List` value.
    pub fn to_list(&self) -> Option<Vec<Value>> {
        if self.kind() != Kind::List {
            return None;
        }
        nested::decode_list(self.payload())
    }

    /// Decode the entries of a `Map` value.
    pub fn to_map(&self) -> Option<BTreeMap<String, Value>> {
        if self.kind() != Kind::Map {
            return None;
        }
        nested::decode_map(self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widening_and_truncation() {
        let v = Value::from_u16(300);
        assert_eq!(v.to_u64(), Some(300));
        assert_eq!(v.to_u8(), Some(44));
        assert_eq!(v.to_i8(), Some(44));

        let v = Value::from_i8(-1);
        assert_eq!(v.to_i64(), Some(-1));
        assert_eq!(v.to_u16(), Some(0xFFFF));
        assert_eq!(v.to_u32(), Some(u32::MAX));
    }

    #[test]
    fn test_integer_boundaries() {
        assert_eq!(Value::from_u64(u64::MAX).to_u64(), Some(u64::MAX));
        assert_eq!(Value::from_u64(u64::MAX).to_i64(), Some(-1));
        assert_eq!(Value::from_i64(i64::MIN).to_i64(), Some(i64::MIN));
        assert_eq!(Value::from_i32(i32::MIN).to_i32(), Some(i32::MIN));
        assert_eq!(Value::from_u32(u32::MAX).to_u32(), Some(u32::MAX));
        assert_eq!(Value::from_i16(i16::MAX).to_u8(), Some(0xFF));
    }

    #[test]
    fn test_bool_as_integer() {
        assert_eq!(Value::from_bool(true).to_u32(), Some(1));
        assert_eq!(Value::from_bool(false).to_i64(), Some(0));
    }

    #[test]
    fn test_string_parse() {
        assert_eq!(Value::from_string(" 42 ").to_u32(), Some(42));
        assert_eq!(Value::from_string("-7").to_i16(), Some(-7));
        assert_eq!(Value::from_string("-7").to_u32(), None);
        assert_eq!(Value::from_string("abc").to_i32(), None);
        assert_eq!(Value::from_string("70000").to_u16(), Some(70000u32 as u16));
    }

    #[test]
    fn test_byte_array_needs_eight_bytes() {
        let v = Value::from_bytes((-5i64).to_le_bytes().to_vec());
        assert_eq!(v.to_i64(), Some(-5));
        assert_eq!(Value::from_bytes(vec![1u8, 2, 3]).to_i64(), None);
    }

    #[test]
    fn test_non_numeric_kinds_fail() {
        assert_eq!(Value::none().to_u8(), None);
        assert_eq!(Value::from_list(vec![Value::from_u8(1)]).to_u8(), None);
        assert_eq!(Value::from_map(&BTreeMap::new()).to_i64(), None);
    }

    #[test]
    fn test_to_bool() {
        assert_eq!(Value::from_u32(0).to_bool(), Some(false));
        assert_eq!(Value::from_i8(-3).to_bool(), Some(true));
        assert_eq!(Value::from_bool(true).to_bool(), Some(true));
        assert_eq!(Value::from_descriptor(0).to_bool(), Some(false));
        assert_eq!(Value::from_descriptor(4).to_bool(), Some(true));
        assert_eq!(Value::from_string(" TRUE ").to_bool(), Some(true));
        assert_eq!(Value::from_string("yes").to_bool(), Some(false));
        assert_eq!(Value::from_bytes(vec![1u8]).to_bool(), None);
        assert_eq!(Value::none().to_bool(), None);
    }

    #[test]
    fn test_to_bool_tests_whole_integer() {
        // Non-zero anywhere in the width is true, not just the low byte.
        assert_eq!(Value::from_u16(256).to_bool(), Some(true));
        assert_eq!(Value::from_i64(1 << 40).to_bool(), Some(true));
        assert_eq!(Value::from_u64(0).to_bool(), Some(false));
    }

    #[test]
    fn test_to_text() {
        assert_eq!(Value::from_string("héllo").to_text().as_deref(), Some("héllo"));
        assert_eq!(
            Value::from_bytes(vec![0xdeu8, 0xad, 0x01]).to_text().as_deref(),
            Some("dead01")
        );
        assert_eq!(Value::from_i32(-12).to_text().as_deref(), Some("-12"));
        assert_eq!(Value::from_u64(u64::MAX).to_text(), Some(u64::MAX.to_string()));
        assert_eq!(Value::from_bool(false).to_text().as_deref(), Some("false"));
        assert_eq!(Value::from_descriptor(7).to_text().as_deref(), Some("7"));
        assert_eq!(Value::none().to_text(), None);
        assert_eq!(Value::from_list(Vec::new()).to_text(), None);
    }

    #[test]
    fn test_to_text_rejects_invalid_utf8() {
        let v = Value::from_raw(Kind::String, vec![0xffu8, 0xfe], 0).unwrap();
        assert_eq!(v.to_text(), None);
    }

    #[test]
    fn test_to_bytes() {
        assert_eq!(Value::from_u16(1).to_bytes(), Some(vec![1, 0]));
        assert_eq!(Value::from_string("ab").to_bytes(), Some(b"ab".to_vec()));
        assert_eq!(Value::none().to_bytes(), None);
    }

    #[test]
    fn test_to_descriptor_only_for_descriptor_kind() {
        assert_eq!(Value::from_descriptor(11).to_descriptor(), Some(11));
        assert_eq!(Value::from_i64(11).to_descriptor(), None);
        assert_eq!(Value::from_descriptor(11).to_i32(), Some(11));
    }
}
