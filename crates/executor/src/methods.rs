//! The fixed method surface.
//!
//! Each function here binds its arguments, decodes snapshots through
//! [`TableData::from_raw`], forwards to the [`EngineFacade`] and re-encodes
//! the result. The set of names is the contract with the host: adding or
//! removing one is a breaking protocol change.
//!
//! | Method | Engine operation |
//! |--------|------------------|
//! | `apply_user_actions` | `apply_user_actions` |
//! | `fetch_table` | `fetch_table` |
//! | `fetch_table_schema` | `fetch_table_schema` |
//! | `autocomplete` | `autocomplete` |
//! | `find_col_from_values` | `find_col_from_values` |
//! | `fetch_meta_tables` | `fetch_meta_tables` |
//! | `load_meta_tables` | `load_meta_tables` |
//! | `load_table` | `load_table` |
//! | `create_migrations` | `create_migrations` |
//! | `get_version` | `schema_version` |
//! | `get_formula_error` | `get_formula_error` |
//! | `parse_acl_formula` | `parse_acl_formula` |
//! | `load_empty` | `load_empty` |
//! | `load_done` | `load_done` |

use std::collections::BTreeMap;

use sandbox_core::{codec, CellValue, TableData, WireValue};

use crate::args::{Blob, CallArgs};
use crate::facade::{Action, EngineFacade, Query};
use crate::registry::MethodRegistry;
use crate::Result;

/// Table id under which the table list snapshot is decoded
pub const META_TABLES_ID: &str = "_grist_Tables";

/// Table id under which the column list snapshot is decoded
pub const META_COLUMNS_ID: &str = "_grist_Tables_column";

/// Every name [`register_builtin_methods`] registers.
pub const BUILTIN_METHODS: [&str; 14] = [
    "apply_user_actions",
    "fetch_table",
    "fetch_table_schema",
    "autocomplete",
    "find_col_from_values",
    "fetch_meta_tables",
    "load_meta_tables",
    "load_table",
    "create_migrations",
    "get_version",
    "get_formula_error",
    "parse_acl_formula",
    "load_empty",
    "load_done",
];

/// Export the whole fixed surface into `registry`.
pub fn register_builtin_methods(registry: &mut MethodRegistry) -> Result<()> {
    crate::export!(registry, apply_user_actions)?;
    crate::export!(registry, fetch_table)?;
    crate::export!(registry, fetch_table_schema)?;
    crate::export!(registry, autocomplete)?;
    crate::export!(registry, find_col_from_values)?;
    crate::export!(registry, fetch_meta_tables)?;
    crate::export!(registry, load_meta_tables)?;
    crate::export!(registry, load_table)?;
    crate::export!(registry, create_migrations)?;
    crate::export!(registry, get_version)?;
    crate::export!(registry, get_formula_error)?;

    // Operations supplied by collaborators outside the engine proper
    crate::export!(registry, parse_acl_formula)?;
    crate::export!(registry, load_empty)?;
    crate::export!(registry, load_done)?;
    Ok(())
}

fn snapshot(table_id: &str, blob: Option<Blob>) -> Result<TableData> {
    Ok(TableData::from_raw(
        table_id,
        blob.as_ref().map(Blob::as_bytes),
    )?)
}

/// Apply user actions given as `[name, args...]` lists.
pub fn apply_user_actions(engine: &mut dyn EngineFacade, mut args: CallArgs) -> Result<WireValue> {
    let action_reprs: Vec<WireValue> = args.required(0, "action_reprs")?;
    let user: Option<WireValue> = args.optional(1, "user")?;
    args.finish()?;

    let actions = action_reprs
        .into_iter()
        .map(Action::from_repr)
        .collect::<sandbox_core::Result<Vec<_>>>()?;
    Ok(engine.apply_user_actions(actions, user)?)
}

/// Return one table in `TableData` action form.
pub fn fetch_table(engine: &mut dyn EngineFacade, mut args: CallArgs) -> Result<WireValue> {
    let table_id: String = args.required(0, "table_id")?;
    let formulas = args.or(1, "formulas", true)?;
    let query: Option<Query> = args.optional(2, "query")?;
    args.finish()?;

    let table = engine.fetch_table(&table_id, formulas, query.as_ref())?;
    Ok(table.to_action_repr()?)
}

/// Return the schema description.
pub fn fetch_table_schema(engine: &mut dyn EngineFacade, args: CallArgs) -> Result<WireValue> {
    args.finish()?;
    Ok(WireValue::Text(engine.fetch_table_schema()?))
}

/// Return completion candidates.
pub fn autocomplete(engine: &mut dyn EngineFacade, mut args: CallArgs) -> Result<WireValue> {
    let txt: String = args.required(0, "txt")?;
    let table_id: String = args.required(1, "table_id")?;
    let column_id: String = args.required(2, "column_id")?;
    let user: WireValue = args.required(3, "user")?;
    args.finish()?;

    let candidates = engine.autocomplete(&txt, &table_id, &column_id, user)?;
    Ok(WireValue::Array(candidates))
}

/// Return the columns best matching a sample of values.
pub fn find_col_from_values(engine: &mut dyn EngineFacade, mut args: CallArgs) -> Result<WireValue> {
    let values: Vec<CellValue> = args.required(0, "values")?;
    let n: i64 = args.required(1, "n")?;
    let table_id: Option<String> = args.optional(2, "opt_table_id")?;
    args.finish()?;

    let cols = engine.find_col_from_values(values, n, table_id.as_deref())?;
    Ok(WireValue::Array(cols.into_iter().map(WireValue::Int).collect()))
}

/// Return every metadata table, keyed by table id.
pub fn fetch_meta_tables(engine: &mut dyn EngineFacade, mut args: CallArgs) -> Result<WireValue> {
    let formulas = args.or(0, "formulas", true)?;
    args.finish()?;

    let tables = engine.fetch_meta_tables(formulas)?;
    let mut entries = Vec::with_capacity(tables.len());
    for (table_id, table) in tables {
        entries.push((WireValue::Text(table_id), table.to_action_repr()?));
    }
    Ok(WireValue::Map(entries))
}

/// Decode and load the two schema-describing metadata tables.
pub fn load_meta_tables(engine: &mut dyn EngineFacade, mut args: CallArgs) -> Result<WireValue> {
    let meta_tables: Option<Blob> = args.optional(0, "meta_tables")?;
    let meta_columns: Option<Blob> = args.optional(1, "meta_columns")?;
    args.finish()?;

    let tables = snapshot(META_TABLES_ID, meta_tables)?;
    let columns = snapshot(META_COLUMNS_ID, meta_columns)?;
    engine.load_meta_tables(tables, columns)?;
    Ok(WireValue::Nil)
}

/// Decode and load one user table.
pub fn load_table(engine: &mut dyn EngineFacade, mut args: CallArgs) -> Result<WireValue> {
    let table_name: String = args.required(0, "table_name")?;
    let table_data: Option<Blob> = args.optional(1, "table_data")?;
    args.finish()?;

    let table = snapshot(&table_name, table_data)?;
    engine.load_table(table)?;
    Ok(WireValue::Nil)
}

/// Decode every table and return the migration actions for them.
pub fn create_migrations(engine: &mut dyn EngineFacade, mut args: CallArgs) -> Result<WireValue> {
    let all_tables: BTreeMap<String, Option<Blob>> = args.required(0, "all_tables")?;
    let metadata_only = args.or(1, "metadata_only", false)?;
    args.finish()?;

    let mut decoded = BTreeMap::new();
    for (table_id, blob) in all_tables {
        let table = snapshot(&table_id, blob)?;
        decoded.insert(table_id, table);
    }
    let actions = engine.create_migrations(decoded, metadata_only)?;
    Ok(WireValue::Array(actions.iter().map(Action::to_repr).collect()))
}

/// Return the schema version.
pub fn get_version(engine: &mut dyn EngineFacade, args: CallArgs) -> Result<WireValue> {
    args.finish()?;
    Ok(WireValue::Int(engine.schema_version()))
}

/// Return the error held by a formula cell, as a bare tagged object.
pub fn get_formula_error(engine: &mut dyn EngineFacade, mut args: CallArgs) -> Result<WireValue> {
    let table_id: String = args.required(0, "table_id")?;
    let col_id: String = args.required(1, "col_id")?;
    let row_id: i64 = args.required(2, "row_id")?;
    args.finish()?;

    let error = engine.get_formula_error(&table_id, &col_id, row_id)?;
    Ok(codec::encode_structural(&error))
}

/// Parse an access-control formula.
pub fn parse_acl_formula(engine: &mut dyn EngineFacade, mut args: CallArgs) -> Result<WireValue> {
    let text: String = args.required(0, "text")?;
    args.finish()?;
    Ok(engine.parse_acl_formula(&text)?)
}

/// Initialize an empty document.
pub fn load_empty(engine: &mut dyn EngineFacade, args: CallArgs) -> Result<WireValue> {
    args.finish()?;
    engine.load_empty()?;
    Ok(WireValue::Nil)
}

/// Signal that loading is complete.
pub fn load_done(engine: &mut dyn EngineFacade, args: CallArgs) -> Result<WireValue> {
    args.finish()?;
    engine.load_done()?;
    Ok(WireValue::Nil)
}
