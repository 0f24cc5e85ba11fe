//! # Sandbox Executor
//!
//! The trust boundary between the host and the formula engine.
//!
//! The host sends named calls over a byte channel; this crate binds their
//! arguments, decodes table snapshots, forwards everything to an
//! [`EngineFacade`] and sends back exactly one reply per call:
//! - [`MethodRegistry`] - open registration, built once at startup
//! - [`Dispatcher`] - the closed method table and the serve loop
//! - [`Transport`] - length-prefixed MessagePack framing
//! - [`MemoryEngine`] - an engine that stores tables without formulas
//!
//! ## Quick Start
//!
//! ```text
//! use sandbox_executor::{MemoryEngine, MethodRegistry, Transport, DEFAULT_MAX_MESSAGE_BYTES};
//!
//! let dispatcher = MethodRegistry::with_builtin_methods()?.into_dispatcher();
//! let mut engine = MemoryEngine::new(1);
//! let mut transport = Transport::new(stdin, stdout, DEFAULT_MAX_MESSAGE_BYTES);
//! dispatcher.serve(&mut engine, &mut transport)?;
//! ```
//!
//! ## Method Surface
//!
//! | Group | Methods |
//! |-------|---------|
//! | **Actions** | `apply_user_actions` |
//! | **Reads** | `fetch_table`, `fetch_table_schema`, `fetch_meta_tables` |
//! | **Loading** | `load_meta_tables`, `load_table`, `load_empty`, `load_done` |
//! | **Formulas** | `autocomplete`, `find_col_from_values`, `get_formula_error` |
//! | **Schema** | `create_migrations`, `get_version` |
//! | **Access control** | `parse_acl_formula` |

#![warn(missing_docs)]

mod args;
mod config;
mod convert;
mod dispatcher;
mod error;
mod facade;
mod memory;
mod registry;
pub mod methods;
mod transport;

// Test modules
#[cfg(test)]
mod tests;

// =============================================================================
// Public API
// =============================================================================

pub use args::{Blob, CallArgs, FromWire};
pub use config::{SandboxConfig, CONFIG_FILE_NAME};
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use facade::{Action, EngineError, EngineFacade, EngineResult, Query};
pub use memory::MemoryEngine;
pub use registry::{logged, Handler, MethodRegistration, MethodRegistry};
pub use transport::{
    decode_replies, encode_calls, Call, Failure, Reply, Transport, DEFAULT_MAX_MESSAGE_BYTES,
    HEADER_SIZE,
};

// Re-export the data model so hosts and engines need only this crate
pub use sandbox_core::{codec, CellValue, RowId, TableData, TaggedObject, WireValue};

/// Result type for dispatch operations
pub type Result<T> = std::result::Result<T, Error>;
