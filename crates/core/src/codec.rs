//! Cell value codec
//!
//! Converts single cells between their wire form ([`WireValue`]) and their
//! domain form ([`CellValue`]).
//!
//! Scalars pass through unchanged. Objects travel in one of two shapes:
//!
//! - **envelope**: a `bin` whose content is the MessagePack encoding of
//!   `[tag, args...]`. This is how stored snapshots carry objects, and what
//!   [`encode`] produces.
//! - **structural**: the bare `[tag, args...]` array. Arguments inside an
//!   envelope use it, and so do values the host sends inside user actions.
//!
//! Round-trip law: `decode(encode(v)?)? == v` for every representable `v`.
//! An unrecognized tag fails immediately with [`Error::UnknownTag`].

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};
use crate::value::*;
use crate::wire::{from_msgpack, to_msgpack, WireValue};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Decode one wire value into a cell.
pub fn decode(raw: WireValue) -> Result<CellValue> {
    match raw {
        WireValue::Nil => Ok(CellValue::Null),
        WireValue::Bool(b) => Ok(CellValue::Bool(b)),
        WireValue::Int(i) => Ok(CellValue::Int(i)),
        WireValue::Float(f) => Ok(CellValue::Float(f)),
        WireValue::Text(s) => Ok(CellValue::Text(s)),
        WireValue::Bytes(bytes) => decode_envelope(&bytes),
        WireValue::Array(items) => decode_object(items).map(CellValue::Object),
        WireValue::Map(_) => Err(Error::decode("a map is not a cell value")),
    }
}

/// Decode the content of a tagged-binary envelope.
pub fn decode_envelope(bytes: &[u8]) -> Result<CellValue> {
    let parsed = from_msgpack(bytes)
        .map_err(|e| Error::decode(format!("corrupt tagged payload: {}", e)))?;
    match parsed {
        WireValue::Array(items) => decode_object(items).map(CellValue::Object),
        other => Err(Error::decode(format!(
            "tagged payload must be an array, got {}",
            other.type_name()
        ))),
    }
}

/// Encode a cell for the host, wrapping objects in a tagged-binary envelope.
pub fn encode(value: &CellValue) -> Result<WireValue> {
    match value {
        CellValue::Object(obj) => Ok(WireValue::Bytes(to_msgpack(&encode_object(obj))?)),
        scalar => Ok(encode_structural(scalar)),
    }
}

/// Encode a cell in structural form: objects become bare `[tag, args...]`.
pub fn encode_structural(value: &CellValue) -> WireValue {
    match value {
        CellValue::Null => WireValue::Nil,
        CellValue::Bool(b) => WireValue::Bool(*b),
        CellValue::Int(i) => WireValue::Int(*i),
        CellValue::Float(f) => WireValue::Float(*f),
        CellValue::Text(s) => WireValue::Text(s.clone()),
        CellValue::Object(obj) => encode_object(obj),
    }
}

fn encode_object(obj: &TaggedObject) -> WireValue {
    let mut items = vec![WireValue::Text(obj.tag().to_string())];
    match obj {
        TaggedObject::List(values) => items.extend(values.iter().map(encode_structural)),
        TaggedObject::Dict(entries) => items.push(WireValue::text_map(
            entries.iter().map(|(k, v)| (k.clone(), encode_structural(v))),
        )),
        TaggedObject::Date(date) => items.push(WireValue::Int(
            date.num_days_from_ce() as i64 - UNIX_EPOCH_DAYS_FROM_CE,
        )),
        TaggedObject::DateTime {
            timestamp,
            timezone,
        } => {
            items.push(WireValue::Float(*timestamp));
            items.push(WireValue::Text(timezone.clone()));
        }
        TaggedObject::Reference { table_id, row_id } => {
            items.push(WireValue::Text(table_id.clone()));
            items.push(WireValue::Int(*row_id));
        }
        TaggedObject::ReferenceList { table_id, row_ids } => {
            items.push(WireValue::Text(table_id.clone()));
            items.push(WireValue::Array(
                row_ids.iter().map(|id| WireValue::Int(*id)).collect(),
            ));
        }
        TaggedObject::Exception { name, details } => {
            items.push(WireValue::Text(name.clone()));
            items.extend(details.iter().map(encode_structural));
        }
        TaggedObject::Pending | TaggedObject::Censored => {}
        TaggedObject::Unmarshallable(repr) => items.push(WireValue::Text(repr.clone())),
    }
    WireValue::Array(items)
}

fn decode_object(items: Vec<WireValue>) -> Result<TaggedObject> {
    let mut items = items.into_iter();
    let tag = match items.next() {
        Some(WireValue::Text(tag)) => tag,
        Some(other) => {
            return Err(Error::decode(format!(
                "object tag must be text, got {}",
                other.type_name()
            )))
        }
        None => return Err(Error::decode("tagged object has no tag")),
    };
    let mut args = ObjectArgs {
        tag: &tag,
        items: items.collect(),
    };

    let obj = match tag.as_str() {
        TAG_LIST => TaggedObject::List(args.rest()?),
        TAG_DICT => {
            let entries = args.map()?;
            args.finish()?;
            TaggedObject::Dict(entries)
        }
        TAG_DATE => {
            let days = args.int()?;
            args.finish()?;
            TaggedObject::Date(date_from_days(days)?)
        }
        TAG_DATE_TIME => {
            let timestamp = args.number()?;
            let timezone = args.text()?;
            args.finish()?;
            TaggedObject::DateTime {
                timestamp,
                timezone,
            }
        }
        TAG_REFERENCE => {
            let table_id = args.text()?;
            let row_id = args.int()?;
            args.finish()?;
            TaggedObject::Reference { table_id, row_id }
        }
        TAG_REFERENCE_LIST => {
            let table_id = args.text()?;
            let row_ids = args.int_list()?;
            args.finish()?;
            TaggedObject::ReferenceList { table_id, row_ids }
        }
        TAG_EXCEPTION => {
            let name = args.text()?;
            TaggedObject::Exception {
                name,
                details: args.rest()?,
            }
        }
        TAG_PENDING => {
            args.finish()?;
            TaggedObject::Pending
        }
        TAG_CENSORED => {
            args.finish()?;
            TaggedObject::Censored
        }
        TAG_UNMARSHALLABLE => {
            let repr = args.text()?;
            args.finish()?;
            TaggedObject::Unmarshallable(repr)
        }
        _ => return Err(Error::UnknownTag { tag: tag.clone() }),
    };
    Ok(obj)
}

fn date_from_days(days: i64) -> Result<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(|ce| i32::try_from(ce).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| Error::decode(format!("date {} days from epoch is out of range", days)))
}

/// Positional arguments of one tagged object, consumed front to back.
struct ObjectArgs<'a> {
    tag: &'a str,
    items: std::collections::VecDeque<WireValue>,
}

impl ObjectArgs<'_> {
    fn next(&mut self, what: &str) -> Result<WireValue> {
        self.items
            .pop_front()
            .ok_or_else(|| Error::decode(format!("{} is missing its {} argument", self.tag, what)))
    }

    fn mismatch(&self, what: &str, got: &WireValue) -> Error {
        Error::decode(format!(
            "{} expects {} argument, got {}",
            self.tag,
            what,
            got.type_name()
        ))
    }

    fn text(&mut self) -> Result<String> {
        match self.next("text")? {
            WireValue::Text(s) => Ok(s),
            other => Err(self.mismatch("a text", &other)),
        }
    }

    fn int(&mut self) -> Result<i64> {
        match self.next("integer")? {
            WireValue::Int(i) => Ok(i),
            other => Err(self.mismatch("an integer", &other)),
        }
    }

    fn number(&mut self) -> Result<f64> {
        match self.next("numeric")? {
            WireValue::Float(f) => Ok(f),
            WireValue::Int(i) => Ok(i as f64),
            other => Err(self.mismatch("a numeric", &other)),
        }
    }

    fn int_list(&mut self) -> Result<Vec<i64>> {
        match self.next("list")? {
            WireValue::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    WireValue::Int(i) => Ok(i),
                    other => Err(self.mismatch("integer row ids as its", &other)),
                })
                .collect(),
            other => Err(self.mismatch("a list", &other)),
        }
    }

    fn map(&mut self) -> Result<BTreeMap<String, CellValue>> {
        match self.next("map")? {
            WireValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| match k {
                    WireValue::Text(key) => Ok((key, decode(v)?)),
                    other => Err(self.mismatch("text keys in its", &other)),
                })
                .collect(),
            other => Err(self.mismatch("a map", &other)),
        }
    }

    fn rest(&mut self) -> Result<Vec<CellValue>> {
        self.items.drain(..).map(decode).collect()
    }

    fn finish(&self) -> Result<()> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(Error::decode(format!(
                "{} has {} unexpected extra argument(s)",
                self.tag,
                self.items.len()
            )))
        }
    }
}
