//! Core types for the sandbox bridge
//!
//! This crate defines the data that crosses the host/engine boundary:
//! - WireValue: self-describing MessagePack value, `bin` kept apart from `str`
//! - CellValue / TaggedObject: decoded cell values
//! - codec: per-cell decode/encode between wire and domain form
//! - TableData: decoded table snapshot, and the snapshot decoder/encoder
//! - Error: codec failures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod snapshot;
pub mod value;
pub mod wire;

pub use error::{Error, Result};
pub use snapshot::{TableData, ID_COLUMN, TABLE_DATA_ACTION};
pub use value::{CellValue, RowId, TaggedObject};
pub use wire::{from_msgpack, to_msgpack, WireValue};
