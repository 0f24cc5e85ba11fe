//! Bridge Integration Tests
//!
//! Drive the public API the way a host does:
//! - snapshot bytes decoded through `load_table` / `load_meta_tables`
//! - cell values crossing the boundary in both directions
//! - whole sessions framed into a byte buffer and served in one pass

mod common;

mod cells;
mod session;
mod snapshots;
