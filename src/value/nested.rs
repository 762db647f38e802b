//! Nested encoding for `List` and `Map` payloads.
//!
//! A list payload is the concatenation of its elements' frames (header plus
//! payload). A map payload is, per entry in key order, a `String` frame with
//! the key followed by the value's frame.
//!
//! Descriptor elements keep their local 8-byte payload here; nested
//! descriptors are not transferred out-of-band.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};

use super::{Kind, Value};
use crate::protocol::{Header, HEADER_SIZE};

fn put_nested(buf: &mut BytesMut, value: &Value) {
    let header = Header::new(value.kind(), value.correlation_id(), value.len() as u32);
    buf.reserve(HEADER_SIZE + value.len());
    buf.put_slice(&header.encode());
    buf.put_slice(value.payload());
}

pub(super) fn encode_list(items: impl IntoIterator<Item = Value>) -> Bytes {
    let mut buf = BytesMut::new();
    for item in items {
        put_nested(&mut buf, &item);
    }
    buf.freeze()
}

pub(super) fn encode_map(map: &BTreeMap<String, Value>) -> Bytes {
    let mut buf = BytesMut::new();
    for (key, value) in map {
        put_nested(&mut buf, &Value::from_string(key.as_str()));
        put_nested(&mut buf, value);
    }
    buf.freeze()
}

/// Iterator over nested frames. Yields `None` as its final item on a
/// truncated or inconsistent frame.
struct NestedFrames<'a> {
    rest: &'a [u8],
}

impl NestedFrames<'_> {
    fn next_value(&mut self) -> Option<Value> {
        let header = Header::decode(self.rest)?;
        let kind = Kind::from_tag(header.tag)?;
        let end = header.frame_len();
        let payload = self.rest.get(HEADER_SIZE..end)?;
        let value = Value::from_raw(kind, Bytes::copy_from_slice(payload), header.correlation_id)
            .ok()?;
        self.rest = &self.rest[end..];
        Some(value)
    }
}

impl Iterator for NestedFrames<'_> {
    type Item = Option<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let value = self.next_value();
        if value.is_none() {
            self.rest = &[];
        }
        Some(value)
    }
}

pub(super) fn decode_list(payload: &[u8]) -> Option<Vec<Value>> {
    NestedFrames { rest: payload }.collect()
}

pub(super) fn decode_map(payload: &[u8]) -> Option<BTreeMap<String, Value>> {
    let mut frames = NestedFrames { rest: payload };
    let mut map = BTreeMap::new();
    while let Some(key) = frames.next() {
        let key = key?;
        if key.kind() != Kind::String {
            return None;
        }
        let value = frames.next()??;
        map.insert(key.to_text()?, value);
    }
    Some(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_preserves_order_and_kinds() {
        let items = vec![
            Value::from_u8(1),
            Value::from_string("two").with_correlation_id(2),
            Value::none(),
            Value::from_list(vec![Value::from_bool(true)]),
        ];
        let list = Value::from_list(items.clone());

        assert_eq!(list.to_list(), Some(items));
    }

    #[test]
    fn test_empty_list() {
        let list = Value::from_list(Vec::new());
        assert!(list.is_empty());
        assert_eq!(list.to_list(), Some(Vec::new()));
    }

    #[test]
    fn test_map_roundtrip() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), Value::from_i32(-2));
        map.insert("a".to_string(), Value::from_bytes(vec![1u8, 2]));
        let value = Value::from_map(&map);

        assert_eq!(value.to_map(), Some(map));
    }

    #[test]
    fn test_map_encodes_in_key_order() {
        let mut map = BTreeMap::new();
        map.insert("z".to_string(), Value::from_u8(0));
        map.insert("a".to_string(), Value::from_u8(0));
        let value = Value::from_map(&map);

        let first = decode_list(value.payload()).unwrap();
        assert_eq!(first[0].to_text().as_deref(), Some("a"));
        assert_eq!(first[2].to_text().as_deref(), Some("z"));
    }

    #[test]
    fn test_descriptor_element_keeps_local_payload() {
        let list = Value::from_list(vec![Value::from_descriptor(6)]);
        let items = list.to_list().unwrap();
        assert_eq!(items[0].to_descriptor(), Some(6));
    }

    #[test]
    fn test_truncated_list_fails() {
        let list = Value::from_list(vec![Value::from_string("hello")]);
        let cut = &list.payload()[..list.len() - 1];
        assert_eq!(decode_list(cut), None);
        assert_eq!(decode_list(&list.payload()[..4]), None);
    }

    #[test]
    fn test_map_with_non_string_key_fails() {
        let bogus = encode_list(vec![Value::from_u8(1), Value::from_u8(2)]);
        assert_eq!(decode_map(&bogus), None);

        let dangling_key = encode_list(vec![Value::from_string("k")]);
        assert_eq!(decode_map(&dangling_key), None);
    }
}
