//! The engine facade contract.
//!
//! [`EngineFacade`] is the set of operations the dispatcher forwards decoded
//! data to. The formula engine, the migration logic, the schema and the
//! access-control parser all live behind it; this crate only marshals
//! arguments in and results out.
//!
//! Every operation takes `&mut self`: the facade is not designed for
//! concurrent mutation, and the serve loop runs one call at a time.

use std::collections::BTreeMap;

use sandbox_core::{CellValue, RowId, TableData, WireValue};
use serde::{Deserialize, Serialize};

/// Result type for facade operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Filter for `fetch_table`: column name to the values a row may hold.
pub type Query = BTreeMap<String, Vec<CellValue>>;

/// Failure raised by the engine.
///
/// Passed back to the host unmodified: `kind` names the failure the way the
/// engine does, `message` is its text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct EngineError {
    /// Failure class, e.g. `KeyError`
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl EngineError {
    /// Create an engine error.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// The engine does not implement this operation.
    pub fn not_supported(operation: &str) -> Self {
        EngineError::new("NotSupported", format!("{} is not supported", operation))
    }
}

/// An action in `[name, args...]` form.
///
/// Used both for user actions sent by the host and for document actions
/// returned to it. Arguments stay in wire form; the engine decides which of
/// them are cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Action name, e.g. `AddRecord`
    pub name: String,
    /// Positional arguments
    pub args: Vec<WireValue>,
}

impl Action {
    /// Create an action.
    pub fn new(name: impl Into<String>, args: Vec<WireValue>) -> Self {
        Action {
            name: name.into(),
            args,
        }
    }

    /// Parse the `[name, args...]` form.
    pub fn from_repr(repr: WireValue) -> sandbox_core::Result<Self> {
        let mut items = match repr {
            WireValue::Array(items) => items.into_iter(),
            other => {
                return Err(sandbox_core::Error::decode(format!(
                    "action must be an array, got {}",
                    other.type_name()
                )))
            }
        };
        match items.next() {
            Some(WireValue::Text(name)) => Ok(Action {
                name,
                args: items.collect(),
            }),
            _ => Err(sandbox_core::Error::decode("action must start with its name")),
        }
    }

    /// The `[name, args...]` form.
    pub fn to_repr(&self) -> WireValue {
        let mut items = Vec::with_capacity(self.args.len() + 1);
        items.push(WireValue::Text(self.name.clone()));
        items.extend(self.args.iter().cloned());
        WireValue::Array(items)
    }
}

/// Operations the dispatcher forwards to the engine.
///
/// One method per exported operation. Table snapshots arrive already decoded
/// as [`TableData`]; results are re-encoded by the dispatcher.
pub trait EngineFacade {
    /// Apply a batch of user actions and return the engine's account of them.
    fn apply_user_actions(
        &mut self,
        actions: Vec<Action>,
        user: Option<WireValue>,
    ) -> EngineResult<WireValue>;

    /// Contents of one table, optionally restricted by `query`.
    fn fetch_table(
        &mut self,
        table_id: &str,
        formulas: bool,
        query: Option<&Query>,
    ) -> EngineResult<TableData>;

    /// Textual description of the current schema.
    fn fetch_table_schema(&mut self) -> EngineResult<String>;

    /// Completion candidates for `txt` typed in a formula of the given column.
    fn autocomplete(
        &mut self,
        txt: &str,
        table_id: &str,
        column_id: &str,
        user: WireValue,
    ) -> EngineResult<Vec<WireValue>>;

    /// Columns whose values best match `values`, best first, at most `n`.
    fn find_col_from_values(
        &mut self,
        values: Vec<CellValue>,
        n: i64,
        table_id: Option<&str>,
    ) -> EngineResult<Vec<i64>>;

    /// All metadata tables by table id.
    fn fetch_meta_tables(&mut self, formulas: bool) -> EngineResult<BTreeMap<String, TableData>>;

    /// Load the two metadata tables that describe the document's schema.
    fn load_meta_tables(&mut self, tables: TableData, columns: TableData) -> EngineResult<()>;

    /// Load one user table.
    fn load_table(&mut self, data: TableData) -> EngineResult<()>;

    /// Document actions that bring `all_tables` up to the current schema.
    fn create_migrations(
        &mut self,
        all_tables: BTreeMap<String, TableData>,
        metadata_only: bool,
    ) -> EngineResult<Vec<Action>>;

    /// Schema version this engine implements.
    fn schema_version(&self) -> i64;

    /// The error stored in a formula cell.
    fn get_formula_error(
        &mut self,
        table_id: &str,
        col_id: &str,
        row_id: RowId,
    ) -> EngineResult<CellValue>;

    /// Parse an access-control formula into its tree form.
    fn parse_acl_formula(&mut self, text: &str) -> EngineResult<WireValue>;

    /// Initialize an empty document.
    fn load_empty(&mut self) -> EngineResult<()>;

    /// Signal that all tables have been loaded.
    fn load_done(&mut self) -> EngineResult<()>;
}
