//! Call arguments.
//!
//! A call carries positional and keyword arguments. Handlers pull each
//! parameter by position and name, the way a keyword-capable call site
//! binds them, then call [`CallArgs::finish`] to reject leftovers.

use std::collections::BTreeMap;

use sandbox_core::{codec, CellValue, WireValue};

use crate::{Error, Result};

/// Arguments of one inbound call, consumed as the handler binds them.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArgs {
    method: String,
    positional: Vec<Option<WireValue>>,
    keyword: BTreeMap<String, WireValue>,
}

impl CallArgs {
    /// Wrap the arguments of a call to `method`.
    pub fn new(
        method: impl Into<String>,
        positional: Vec<WireValue>,
        keyword: BTreeMap<String, WireValue>,
    ) -> Self {
        CallArgs {
            method: method.into(),
            positional: positional.into_iter().map(Some).collect(),
            keyword,
        }
    }

    /// Arguments with positional values only.
    pub fn positional(method: impl Into<String>, positional: Vec<WireValue>) -> Self {
        CallArgs::new(method, positional, BTreeMap::new())
    }

    /// Name of the method being called.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Bind a parameter that must be present.
    pub fn required<T: FromWire>(&mut self, index: usize, name: &str) -> Result<T> {
        match self.take(index, name)? {
            Some(value) => self.convert(name, value),
            None => Err(Error::MissingArgument {
                method: self.method.clone(),
                argument: name.to_string(),
            }),
        }
    }

    /// Bind a parameter that may be absent or nil.
    pub fn optional<T: FromWire>(&mut self, index: usize, name: &str) -> Result<Option<T>> {
        match self.take(index, name)? {
            None | Some(WireValue::Nil) => Ok(None),
            Some(value) => self.convert(name, value).map(Some),
        }
    }

    /// Bind a parameter with a default used when it is absent or nil.
    pub fn or<T: FromWire>(&mut self, index: usize, name: &str, default: T) -> Result<T> {
        match self.take(index, name)? {
            None | Some(WireValue::Nil) => Ok(default),
            Some(value) => self.convert(name, value),
        }
    }

    /// Fail if any argument was supplied that no parameter bound.
    pub fn finish(self) -> Result<()> {
        if let Some(index) = self.positional.iter().position(Option::is_some) {
            return Err(Error::InvalidArgument {
                method: self.method,
                argument: format!("#{}", index),
                reason: format!("takes {} positional argument(s)", index),
            });
        }
        if let Some(name) = self.keyword.keys().next() {
            return Err(Error::InvalidArgument {
                argument: name.clone(),
                method: self.method,
                reason: "unexpected keyword argument".to_string(),
            });
        }
        Ok(())
    }

    fn take(&mut self, index: usize, name: &str) -> Result<Option<WireValue>> {
        let by_position = self.positional.get_mut(index).and_then(Option::take);
        let by_name = self.keyword.remove(name);
        match (by_position, by_name) {
            (Some(_), Some(_)) => Err(Error::InvalidArgument {
                method: self.method.clone(),
                argument: name.to_string(),
                reason: "got multiple values".to_string(),
            }),
            (value, None) | (None, value) => Ok(value),
        }
    }

    fn convert<T: FromWire>(&self, name: &str, value: WireValue) -> Result<T> {
        T::from_wire(value).map_err(|reason| Error::InvalidArgument {
            method: self.method.clone(),
            argument: name.to_string(),
            reason,
        })
    }
}

/// Conversion from a wire argument into a handler parameter.
pub trait FromWire: Sized {
    /// Convert, or explain why the value has the wrong shape.
    fn from_wire(value: WireValue) -> std::result::Result<Self, String>;
}

fn expected(what: &str, got: &WireValue) -> String {
    format!("expected {}, got {}", what, got.type_name())
}

impl FromWire for WireValue {
    fn from_wire(value: WireValue) -> std::result::Result<Self, String> {
        Ok(value)
    }
}

impl FromWire for String {
    fn from_wire(value: WireValue) -> std::result::Result<Self, String> {
        match value {
            WireValue::Text(s) => Ok(s),
            other => Err(expected("text", &other)),
        }
    }
}

impl FromWire for i64 {
    fn from_wire(value: WireValue) -> std::result::Result<Self, String> {
        match value {
            WireValue::Int(i) => Ok(i),
            other => Err(expected("an integer", &other)),
        }
    }
}

impl FromWire for bool {
    fn from_wire(value: WireValue) -> std::result::Result<Self, String> {
        match value {
            WireValue::Bool(b) => Ok(b),
            other => Err(expected("a boolean", &other)),
        }
    }
}

impl FromWire for CellValue {
    fn from_wire(value: WireValue) -> std::result::Result<Self, String> {
        codec::decode(value).map_err(|e| e.to_string())
    }
}

impl<T: FromWire> FromWire for Vec<T> {
    fn from_wire(value: WireValue) -> std::result::Result<Self, String> {
        match value {
            WireValue::Array(items) => items.into_iter().map(T::from_wire).collect(),
            other => Err(expected("a list", &other)),
        }
    }
}

impl<T: FromWire> FromWire for Option<T> {
    fn from_wire(value: WireValue) -> std::result::Result<Self, String> {
        match value {
            WireValue::Nil => Ok(None),
            other => T::from_wire(other).map(Some),
        }
    }
}

impl<T: FromWire> FromWire for BTreeMap<String, T> {
    fn from_wire(value: WireValue) -> std::result::Result<Self, String> {
        match value {
            WireValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| match k {
                    WireValue::Text(key) => Ok((key, T::from_wire(v)?)),
                    other => Err(expected("text keys", &other)),
                })
                .collect(),
            other => Err(expected("a map", &other)),
        }
    }
}

/// Opaque byte string argument, such as raw snapshot bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    /// The bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromWire for Blob {
    fn from_wire(value: WireValue) -> std::result::Result<Self, String> {
        match value {
            WireValue::Bytes(b) => Ok(Blob(b)),
            other => Err(expected("bytes", &other)),
        }
    }
}
