//! In-memory engine
//!
//! [`MemoryEngine`] keeps loaded tables in memory and applies record-level
//! user actions to them. It has no formula engine: formula operations report
//! `NotSupported`. The `sandbox` binary serves it, and the integration tests
//! drive it end to end.

use std::collections::BTreeMap;

use sandbox_core::{codec, CellValue, RowId, TableData, WireValue, ID_COLUMN};
use tracing::{debug, info};

use crate::facade::{Action, EngineError, EngineFacade, EngineResult, Query};
use crate::methods::{META_COLUMNS_ID, META_TABLES_ID};

const ADD_RECORD: &str = "AddRecord";
const BULK_ADD_RECORD: &str = "BulkAddRecord";
const UPDATE_RECORD: &str = "UpdateRecord";
const REMOVE_RECORD: &str = "RemoveRecord";

/// Engine that stores tables and nothing more.
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    schema_version: i64,
    tables: BTreeMap<String, TableData>,
    meta: BTreeMap<String, TableData>,
    loaded: bool,
}

impl MemoryEngine {
    /// Empty engine reporting `schema_version`.
    pub fn new(schema_version: i64) -> Self {
        MemoryEngine {
            schema_version,
            tables: BTreeMap::new(),
            meta: BTreeMap::new(),
            loaded: false,
        }
    }

    /// A loaded user table.
    pub fn table(&self, table_id: &str) -> Option<&TableData> {
        self.tables.get(table_id)
    }

    /// Ids of all loaded user tables, sorted.
    pub fn table_ids(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// True after `load_done` or `load_empty`.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        MemoryEngine::new(1)
    }
}

impl EngineFacade for MemoryEngine {
    fn apply_user_actions(
        &mut self,
        actions: Vec<Action>,
        _user: Option<WireValue>,
    ) -> EngineResult<WireValue> {
        // All or nothing: work on a copy and keep it only if every action applies
        let mut tables = self.tables.clone();
        let mut stored = Vec::with_capacity(actions.len());
        let mut ret_values = Vec::with_capacity(actions.len());
        for action in actions {
            let (doc_action, ret) = apply_action(&mut tables, action)?;
            stored.push(doc_action.to_repr());
            ret_values.push(ret);
        }
        self.tables = tables;
        debug!(target: "sandbox::engine", actions = stored.len(), "Applied user actions");

        Ok(WireValue::text_map([
            ("stored", WireValue::Array(stored)),
            ("retValues", WireValue::Array(ret_values)),
        ]))
    }

    fn fetch_table(
        &mut self,
        table_id: &str,
        _formulas: bool,
        query: Option<&Query>,
    ) -> EngineResult<TableData> {
        let table = lookup(&self.tables, table_id)?;
        match query {
            Some(query) => filter(table, query),
            None => Ok(table.clone()),
        }
    }

    fn fetch_table_schema(&mut self) -> EngineResult<String> {
        let mut schema = String::new();
        for (table_id, table) in &self.tables {
            let columns: Vec<&str> = table.columns.keys().map(String::as_str).collect();
            schema.push_str(table_id);
            schema.push_str(": ");
            schema.push_str(&columns.join(", "));
            schema.push('\n');
        }
        Ok(schema)
    }

    fn autocomplete(
        &mut self,
        _txt: &str,
        _table_id: &str,
        _column_id: &str,
        _user: WireValue,
    ) -> EngineResult<Vec<WireValue>> {
        Ok(Vec::new())
    }

    fn find_col_from_values(
        &mut self,
        _values: Vec<CellValue>,
        _n: i64,
        _table_id: Option<&str>,
    ) -> EngineResult<Vec<i64>> {
        Err(EngineError::not_supported("find_col_from_values"))
    }

    fn fetch_meta_tables(&mut self, _formulas: bool) -> EngineResult<BTreeMap<String, TableData>> {
        Ok(self.meta.clone())
    }

    fn load_meta_tables(&mut self, tables: TableData, columns: TableData) -> EngineResult<()> {
        info!(
            target: "sandbox::engine",
            tables = tables.num_rows(),
            columns = columns.num_rows(),
            "Loaded metadata"
        );
        self.meta.insert(META_TABLES_ID.to_string(), tables);
        self.meta.insert(META_COLUMNS_ID.to_string(), columns);
        Ok(())
    }

    fn load_table(&mut self, data: TableData) -> EngineResult<()> {
        debug!(
            target: "sandbox::engine",
            table = %data.table_id,
            rows = data.num_rows(),
            "Loaded table"
        );
        self.tables.insert(data.table_id.clone(), data);
        Ok(())
    }

    fn create_migrations(
        &mut self,
        _all_tables: BTreeMap<String, TableData>,
        _metadata_only: bool,
    ) -> EngineResult<Vec<Action>> {
        Ok(Vec::new())
    }

    fn schema_version(&self) -> i64 {
        self.schema_version
    }

    fn get_formula_error(
        &mut self,
        _table_id: &str,
        _col_id: &str,
        _row_id: RowId,
    ) -> EngineResult<CellValue> {
        Err(EngineError::not_supported("get_formula_error"))
    }

    fn parse_acl_formula(&mut self, _text: &str) -> EngineResult<WireValue> {
        Err(EngineError::not_supported("parse_acl_formula"))
    }

    fn load_empty(&mut self) -> EngineResult<()> {
        self.tables.clear();
        self.meta.clear();
        self.loaded = true;
        Ok(())
    }

    fn load_done(&mut self) -> EngineResult<()> {
        info!(target: "sandbox::engine", tables = self.tables.len(), "Document loaded");
        self.loaded = true;
        Ok(())
    }
}

fn lookup<'a>(
    tables: &'a BTreeMap<String, TableData>,
    table_id: &str,
) -> EngineResult<&'a TableData> {
    tables
        .get(table_id)
        .ok_or_else(|| EngineError::new("KeyError", format!("no such table: {}", table_id)))
}

fn filter(table: &TableData, query: &Query) -> EngineResult<TableData> {
    for column in query.keys() {
        if column != ID_COLUMN && !table.columns.contains_key(column) {
            return Err(EngineError::new(
                "KeyError",
                format!("no such column: {}.{}", table.table_id, column),
            ));
        }
    }

    let keep: Vec<usize> = (0..table.num_rows())
        .filter(|&row| {
            query.iter().all(|(column, allowed)| {
                let cell = if column == ID_COLUMN {
                    CellValue::Int(table.row_ids[row])
                } else {
                    table.columns[column][row].clone()
                };
                allowed.contains(&cell)
            })
        })
        .collect();

    let mut result = TableData::empty(table.table_id.clone());
    result.row_ids = keep.iter().map(|&row| table.row_ids[row]).collect();
    for (name, cells) in &table.columns {
        result
            .columns
            .insert(name.clone(), keep.iter().map(|&row| cells[row].clone()).collect());
    }
    Ok(result)
}

fn apply_action(
    tables: &mut BTreeMap<String, TableData>,
    action: Action,
) -> EngineResult<(Action, WireValue)> {
    let mut args = ActionArgs::new(action);
    let table_id = args.text()?;
    let table = tables
        .get_mut(&table_id)
        .ok_or_else(|| EngineError::new("KeyError", format!("no such table: {}", table_id)))?;

    let name = args.name.clone();
    match name.as_str() {
        ADD_RECORD => {
            let requested = args.optional_row_id()?;
            let values = args.cells()?;
            args.finish()?;
            let row_id = add_row(table, requested, &values)?;
            let doc = Action::new(
                ADD_RECORD,
                vec![table_id.into(), WireValue::Int(row_id), encode_cells(&values)?],
            );
            Ok((doc, WireValue::Int(row_id)))
        }
        BULK_ADD_RECORD => {
            let requested = args.row_id_list()?;
            let columns = args.cell_columns()?;
            args.finish()?;
            for (name, cells) in &columns {
                if cells.len() != requested.len() {
                    return Err(bad_action(
                        BULK_ADD_RECORD,
                        format!(
                            "column {} has {} values for {} rows",
                            name,
                            cells.len(),
                            requested.len()
                        ),
                    ));
                }
            }

            let mut row_ids = Vec::with_capacity(requested.len());
            for (index, requested) in requested.into_iter().enumerate() {
                let values: BTreeMap<String, CellValue> = columns
                    .iter()
                    .map(|(name, cells)| (name.clone(), cells[index].clone()))
                    .collect();
                row_ids.push(add_row(table, requested, &values)?);
            }

            let mut encoded = Vec::with_capacity(columns.len());
            for (name, cells) in &columns {
                let cells = cells
                    .iter()
                    .map(encode_cell)
                    .collect::<EngineResult<Vec<_>>>()?;
                encoded.push((WireValue::Text(name.clone()), WireValue::Array(cells)));
            }
            let ids = WireValue::Array(row_ids.iter().copied().map(WireValue::Int).collect());
            let doc = Action::new(
                BULK_ADD_RECORD,
                vec![table_id.into(), ids.clone(), WireValue::Map(encoded)],
            );
            Ok((doc, ids))
        }
        UPDATE_RECORD => {
            let row_id = args.row_id()?;
            let values = args.cells()?;
            args.finish()?;
            let row = existing_row(table, row_id)?;
            for (name, value) in &values {
                ensure_column(table, name);
                if let Some(cells) = table.columns.get_mut(name) {
                    cells[row] = value.clone();
                }
            }
            let doc = Action::new(
                UPDATE_RECORD,
                vec![table_id.into(), WireValue::Int(row_id), encode_cells(&values)?],
            );
            Ok((doc, WireValue::Nil))
        }
        REMOVE_RECORD => {
            let row_id = args.row_id()?;
            args.finish()?;
            let row = existing_row(table, row_id)?;
            table.row_ids.remove(row);
            for cells in table.columns.values_mut() {
                cells.remove(row);
            }
            let doc = Action::new(REMOVE_RECORD, vec![table_id.into(), WireValue::Int(row_id)]);
            Ok((doc, WireValue::Nil))
        }
        other => Err(EngineError::not_supported(other)),
    }
}

fn add_row(
    table: &mut TableData,
    requested: Option<RowId>,
    values: &BTreeMap<String, CellValue>,
) -> EngineResult<RowId> {
    let row_id = match requested {
        Some(id) if id > 0 => {
            if table.row_index(id).is_some() {
                return Err(bad_action(
                    ADD_RECORD,
                    format!("row {} already exists in {}", id, table.table_id),
                ));
            }
            id
        }
        _ => table
            .row_ids
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| bad_action(ADD_RECORD, "row id space exhausted"))?,
    };

    for name in values.keys() {
        ensure_column(table, name);
    }
    table.row_ids.push(row_id);
    for (name, cells) in table.columns.iter_mut() {
        cells.push(values.get(name).cloned().unwrap_or(CellValue::Null));
    }
    Ok(row_id)
}

fn ensure_column(table: &mut TableData, name: &str) {
    let rows = table.row_ids.len();
    table
        .columns
        .entry(name.to_string())
        .or_insert_with(|| vec![CellValue::Null; rows]);
}

fn existing_row(table: &TableData, row_id: RowId) -> EngineResult<usize> {
    table.row_index(row_id).ok_or_else(|| {
        EngineError::new(
            "KeyError",
            format!("no row {} in table {}", row_id, table.table_id),
        )
    })
}

fn bad_action(action: &str, reason: impl Into<String>) -> EngineError {
    EngineError::new("ValueError", format!("{}: {}", action, reason.into()))
}

fn encode_cell(value: &CellValue) -> EngineResult<WireValue> {
    codec::encode(value).map_err(|e| EngineError::new(e.kind(), e.to_string()))
}

fn encode_cells(values: &BTreeMap<String, CellValue>) -> EngineResult<WireValue> {
    let mut entries = Vec::with_capacity(values.len());
    for (name, value) in values {
        entries.push((WireValue::Text(name.clone()), encode_cell(value)?));
    }
    Ok(WireValue::Map(entries))
}

/// Positional arguments of one user action.
struct ActionArgs {
    name: String,
    args: std::vec::IntoIter<WireValue>,
}

impl ActionArgs {
    fn new(action: Action) -> Self {
        ActionArgs {
            name: action.name,
            args: action.args.into_iter(),
        }
    }

    fn next(&mut self, what: &str) -> EngineResult<WireValue> {
        self.args
            .next()
            .ok_or_else(|| bad_action(&self.name, format!("missing {}", what)))
    }

    fn text(&mut self) -> EngineResult<String> {
        match self.next("table id")? {
            WireValue::Text(s) => Ok(s),
            other => Err(bad_action(
                &self.name,
                format!("table id must be text, got {}", other.type_name()),
            )),
        }
    }

    fn row_id(&mut self) -> EngineResult<RowId> {
        match self.next("row id")? {
            WireValue::Int(id) => Ok(id),
            other => Err(bad_action(
                &self.name,
                format!("row id must be an integer, got {}", other.type_name()),
            )),
        }
    }

    fn optional_row_id(&mut self) -> EngineResult<Option<RowId>> {
        match self.next("row id")? {
            WireValue::Nil => Ok(None),
            WireValue::Int(id) => Ok(Some(id)),
            other => Err(bad_action(
                &self.name,
                format!("row id must be an integer or nil, got {}", other.type_name()),
            )),
        }
    }

    fn row_id_list(&mut self) -> EngineResult<Vec<Option<RowId>>> {
        match self.next("row ids")? {
            WireValue::Array(ids) => ids
                .into_iter()
                .map(|id| match id {
                    WireValue::Nil => Ok(None),
                    WireValue::Int(id) => Ok(Some(id)),
                    other => Err(bad_action(
                        &self.name,
                        format!("row id must be an integer or nil, got {}", other.type_name()),
                    )),
                })
                .collect(),
            other => Err(bad_action(
                &self.name,
                format!("row ids must be a list, got {}", other.type_name()),
            )),
        }
    }

    fn column_map(&mut self) -> EngineResult<Vec<(String, WireValue)>> {
        match self.next("column values")? {
            WireValue::Map(entries) => entries
                .into_iter()
                .map(|(key, value)| match key {
                    WireValue::Text(name) => Ok((name, value)),
                    other => Err(bad_action(
                        &self.name,
                        format!("column name must be text, got {}", other.type_name()),
                    )),
                })
                .collect(),
            other => Err(bad_action(
                &self.name,
                format!("column values must be a map, got {}", other.type_name()),
            )),
        }
    }

    fn cell(&self, value: WireValue) -> EngineResult<CellValue> {
        codec::decode(value).map_err(|e| bad_action(&self.name, e.to_string()))
    }

    fn cells(&mut self) -> EngineResult<BTreeMap<String, CellValue>> {
        let mut values = BTreeMap::new();
        for (name, value) in self.column_map()? {
            if name == ID_COLUMN {
                return Err(bad_action(&self.name, "the id column cannot be set"));
            }
            let cell = self.cell(value)?;
            values.insert(name, cell);
        }
        Ok(values)
    }

    fn cell_columns(&mut self) -> EngineResult<BTreeMap<String, Vec<CellValue>>> {
        let mut columns = BTreeMap::new();
        for (name, value) in self.column_map()? {
            if name == ID_COLUMN {
                return Err(bad_action(&self.name, "the id column cannot be set"));
            }
            let cells = match value {
                WireValue::Array(cells) => cells
                    .into_iter()
                    .map(|cell| self.cell(cell))
                    .collect::<EngineResult<Vec<_>>>()?,
                other => {
                    return Err(bad_action(
                        &self.name,
                        format!("column {} must be a list, got {}", name, other.type_name()),
                    ))
                }
            };
            columns.insert(name, cells);
        }
        Ok(columns)
    }

    fn finish(&mut self) -> EngineResult<()> {
        match self.args.next() {
            None => Ok(()),
            Some(_) => Err(bad_action(&self.name, "too many arguments")),
        }
    }
}
