//! Cell value types
//!
//! This module defines:
//! - CellValue: the decoded value of a single table cell
//! - TaggedObject: domain values richer than scalars (dates, references,
//!   error markers, containers)
//!
//! ## Type Rules
//!
//! - `Int(1) != Float(1.0)` - different types are never equal
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - Text is never confused with an object payload: objects arrive as `bin`
//!   on the wire, text arrives as `str`

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Identifier of a row within a table
pub type RowId = i64;

/// Decoded value of one table cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Value that needs a tagged envelope to keep its type
    Object(TaggedObject),
}

/// Domain value carried in a tagged-binary envelope.
///
/// The tag names which variant the arguments construct; see
/// [`TaggedObject::tag`] for the exact spelling on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedObject {
    /// Ordered list of values
    List(Vec<CellValue>),
    /// Text-keyed dictionary
    Dict(BTreeMap<String, CellValue>),
    /// Calendar day
    Date(NaiveDate),
    /// Instant with the timezone it should be shown in
    DateTime {
        /// Seconds since the Unix epoch
        timestamp: f64,
        /// IANA timezone name
        timezone: String,
    },
    /// Reference to one row of another table
    Reference {
        /// Target table
        table_id: String,
        /// Target row, 0 for an empty reference
        row_id: RowId,
    },
    /// Reference to several rows of another table
    ReferenceList {
        /// Target table
        table_id: String,
        /// Target rows
        row_ids: Vec<RowId>,
    },
    /// Error raised while computing a cell
    Exception {
        /// Exception class name
        name: String,
        /// Message and any further details
        details: Vec<CellValue>,
    },
    /// Value still being computed
    Pending,
    /// Value hidden from the current user
    Censored,
    /// Value the engine could not represent, kept as its textual form
    Unmarshallable(String),
}

/// Tag of [`TaggedObject::List`]
pub const TAG_LIST: &str = "List";
/// Tag of [`TaggedObject::Dict`]
pub const TAG_DICT: &str = "Dict";
/// Tag of [`TaggedObject::Date`]
pub const TAG_DATE: &str = "Date";
/// Tag of [`TaggedObject::DateTime`]
pub const TAG_DATE_TIME: &str = "DateTime";
/// Tag of [`TaggedObject::Reference`]
pub const TAG_REFERENCE: &str = "Reference";
/// Tag of [`TaggedObject::ReferenceList`]
pub const TAG_REFERENCE_LIST: &str = "ReferenceList";
/// Tag of [`TaggedObject::Exception`]
pub const TAG_EXCEPTION: &str = "Exception";
/// Tag of [`TaggedObject::Pending`]
pub const TAG_PENDING: &str = "Pending";
/// Tag of [`TaggedObject::Censored`]
pub const TAG_CENSORED: &str = "Censored";
/// Tag of [`TaggedObject::Unmarshallable`]
pub const TAG_UNMARSHALLABLE: &str = "Unmarshallable";

impl TaggedObject {
    /// The tag written in front of the arguments on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            TaggedObject::List(_) => TAG_LIST,
            TaggedObject::Dict(_) => TAG_DICT,
            TaggedObject::Date(_) => TAG_DATE,
            TaggedObject::DateTime { .. } => TAG_DATE_TIME,
            TaggedObject::Reference { .. } => TAG_REFERENCE,
            TaggedObject::ReferenceList { .. } => TAG_REFERENCE_LIST,
            TaggedObject::Exception { .. } => TAG_EXCEPTION,
            TaggedObject::Pending => TAG_PENDING,
            TaggedObject::Censored => TAG_CENSORED,
            TaggedObject::Unmarshallable(_) => TAG_UNMARSHALLABLE,
        }
    }
}

impl CellValue {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "Null",
            CellValue::Bool(_) => "Bool",
            CellValue::Int(_) => "Int",
            CellValue::Float(_) => "Float",
            CellValue::Text(_) => "Text",
            CellValue::Object(obj) => obj.tag(),
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a Text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the tagged object if this is an Object value
    pub fn as_object(&self) -> Option<&TaggedObject> {
        match self {
            CellValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Build an exception marker cell.
    pub fn exception(name: impl Into<String>, message: impl Into<String>) -> Self {
        CellValue::Object(TaggedObject::Exception {
            name: name.into(),
            details: vec![CellValue::Text(message.into())],
        })
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i as i64)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Object(TaggedObject::Date(d))
    }
}

impl From<TaggedObject> for CellValue {
    fn from(o: TaggedObject) -> Self {
        CellValue::Object(o)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}
