//! Structural wire values
//!
//! [`WireValue`] is what the outer MessagePack deserialization produces. It
//! keeps the distinction between `bin` and `str` as separate variants, so
//! callers never need to inspect types at runtime to tell an opaque tagged
//! payload from plain text.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::Result;

/// A self-describing value as it travels across the boundary.
///
/// Maps keep their entries in wire order and may have non-text keys.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// MessagePack nil
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// UTF-8 string (`str`)
    Text(String),
    /// Opaque byte string (`bin`)
    Bytes(Vec<u8>),
    /// Sequence of values
    Array(Vec<WireValue>),
    /// Key/value pairs in wire order
    Map(Vec<(WireValue, WireValue)>),
}

impl WireValue {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            WireValue::Nil => "Nil",
            WireValue::Bool(_) => "Bool",
            WireValue::Int(_) => "Int",
            WireValue::Float(_) => "Float",
            WireValue::Text(_) => "Text",
            WireValue::Bytes(_) => "Bytes",
            WireValue::Array(_) => "Array",
            WireValue::Map(_) => "Map",
        }
    }

    /// Check if this is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, WireValue::Nil)
    }

    /// Get as &str if this is a Text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            WireValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Build a map value from text keys.
    pub fn text_map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, WireValue)>,
    {
        WireValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (WireValue::Text(k.into()), v))
                .collect(),
        )
    }

    /// Look up an entry of a map by text key.
    pub fn get(&self, key: &str) -> Option<&WireValue> {
        match self {
            WireValue::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Encode a value as MessagePack.
pub fn to_msgpack(value: &WireValue) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec(value)?)
}

/// Decode a single MessagePack value.
pub fn from_msgpack(bytes: &[u8]) -> Result<WireValue> {
    Ok(rmp_serde::from_slice(bytes)?)
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::Text(s.to_string())
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        WireValue::Text(s)
    }
}

impl From<i64> for WireValue {
    fn from(i: i64) -> Self {
        WireValue::Int(i)
    }
}

impl From<bool> for WireValue {
    fn from(b: bool) -> Self {
        WireValue::Bool(b)
    }
}

impl From<f64> for WireValue {
    fn from(f: f64) -> Self {
        WireValue::Float(f)
    }
}

impl From<Vec<WireValue>> for WireValue {
    fn from(items: Vec<WireValue>) -> Self {
        WireValue::Array(items)
    }
}

impl Serialize for WireValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            WireValue::Nil => serializer.serialize_unit(),
            WireValue::Bool(b) => serializer.serialize_bool(*b),
            WireValue::Int(i) => serializer.serialize_i64(*i),
            WireValue::Float(f) => serializer.serialize_f64(*f),
            WireValue::Text(s) => serializer.serialize_str(s),
            WireValue::Bytes(b) => serializer.serialize_bytes(b),
            WireValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            WireValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

struct WireValueVisitor;

impl<'de> Visitor<'de> for WireValueVisitor {
    type Value = WireValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a self-describing wire value")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<WireValue, E> {
        Ok(WireValue::Nil)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<WireValue, E> {
        Ok(WireValue::Nil)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<WireValue, D::Error> {
        WireValue::deserialize(d)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<WireValue, E> {
        Ok(WireValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<WireValue, E> {
        Ok(WireValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<WireValue, E> {
        i64::try_from(v)
            .map(WireValue::Int)
            .map_err(|_| E::custom(format!("integer {} out of range", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<WireValue, E> {
        Ok(WireValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<WireValue, E> {
        Ok(WireValue::Text(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<WireValue, E> {
        Ok(WireValue::Text(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<WireValue, E> {
        Ok(WireValue::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> std::result::Result<WireValue, E> {
        Ok(WireValue::Bytes(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<WireValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = seq.next_element::<WireValue>()? {
            items.push(item);
        }
        Ok(WireValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<WireValue, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0).min(4096));
        while let Some(entry) = map.next_entry::<WireValue, WireValue>()? {
            entries.push(entry);
        }
        Ok(WireValue::Map(entries))
    }
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<WireValue, D::Error> {
        d.deserialize_any(WireValueVisitor)
    }
}
