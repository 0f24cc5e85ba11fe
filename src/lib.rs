//! Sandbox bridge - the trust boundary between a host and a sandboxed table engine
//!
//! The host keeps documents as column-oriented table snapshots and talks to
//! the engine through a small, fixed set of named calls. This crate decodes
//! what crosses that boundary and routes each call to the engine.
//!
//! # Quick Start
//!
//! ```ignore
//! use sandbox_bridge::{Call, MemoryEngine, MethodRegistry, WireValue};
//!
//! let dispatcher = MethodRegistry::with_builtin_methods()?.into_dispatcher();
//! let mut engine = MemoryEngine::new(1);
//!
//! let version = dispatcher.call(&mut engine, Call::new("get_version", vec![]))?;
//! assert_eq!(version, WireValue::Int(1));
//! ```
//!
//! # Architecture
//!
//! - `sandbox-core`: wire values, the cell codec and the snapshot decoder
//! - `sandbox-executor`: argument binding, method registry, dispatcher,
//!   framing and the in-memory engine
//!
//! Everything public is re-exported here.

// Re-export the public API from sandbox-executor
pub use sandbox_executor::*;

// Codec errors are distinct from dispatch errors
pub use sandbox_core::Error as CodecError;
