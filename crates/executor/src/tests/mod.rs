//! Test modules for the executor crate.
//!
//! [`RecordingEngine`] stands in for the formula engine: it records every
//! operation it receives with the decoded arguments, so tests can check what
//! the dispatcher forwarded.


use std::collections::BTreeMap;

use sandbox_core::{CellValue, RowId, TableData, WireValue};

use crate::facade::{Action, EngineError, EngineFacade, EngineResult, Query};
use crate::transport::Call;
use crate::{Dispatcher, MethodRegistry, Result};

/// Engine fake that records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub calls: Vec<&'static str>,
    pub fail_with: Option<EngineError>,
    pub actions: Vec<Action>,
    pub user: Option<WireValue>,
    pub fetched: Option<(String, bool, Option<Query>)>,
    pub autocompleted: Option<(String, String, String, WireValue)>,
    pub found: Option<(Vec<CellValue>, i64, Option<String>)>,
    pub meta: Option<(TableData, TableData)>,
    pub loaded: Vec<TableData>,
    pub migrated: Option<(BTreeMap<String, TableData>, bool)>,
    pub formula_error: Option<(String, String, RowId)>,
    pub acl: Option<String>,
}

impl RecordingEngine {
    pub fn failing(kind: &str, message: &str) -> Self {
        RecordingEngine {
            fail_with: Some(EngineError::new(kind, message)),
            ..Default::default()
        }
    }

    fn record(&mut self, operation: &'static str) -> EngineResult<()> {
        self.calls.push(operation);
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

/// Table every fetch returns: `Tasks` with two rows.
pub fn tasks() -> TableData {
    let mut columns = BTreeMap::new();
    columns.insert(
        "title".to_string(),
        vec![CellValue::from("write"), CellValue::from("test")],
    );
    TableData::new("Tasks", vec![1, 2], columns).unwrap()
}

impl EngineFacade for RecordingEngine {
    fn apply_user_actions(
        &mut self,
        actions: Vec<Action>,
        user: Option<WireValue>,
    ) -> EngineResult<WireValue> {
        self.record("apply_user_actions")?;
        let count = actions.len() as i64;
        self.actions = actions;
        self.user = user;
        Ok(WireValue::text_map([("applied", WireValue::Int(count))]))
    }

    fn fetch_table(
        &mut self,
        table_id: &str,
        formulas: bool,
        query: Option<&Query>,
    ) -> EngineResult<TableData> {
        self.record("fetch_table")?;
        self.fetched = Some((table_id.to_string(), formulas, query.cloned()));
        Ok(tasks())
    }

    fn fetch_table_schema(&mut self) -> EngineResult<String> {
        self.record("fetch_table_schema")?;
        Ok("Tasks: title\n".to_string())
    }

    fn autocomplete(
        &mut self,
        txt: &str,
        table_id: &str,
        column_id: &str,
        user: WireValue,
    ) -> EngineResult<Vec<WireValue>> {
        self.record("autocomplete")?;
        self.autocompleted = Some((
            txt.to_string(),
            table_id.to_string(),
            column_id.to_string(),
            user,
        ));
        Ok(vec![WireValue::from("$title")])
    }

    fn find_col_from_values(
        &mut self,
        values: Vec<CellValue>,
        n: i64,
        table_id: Option<&str>,
    ) -> EngineResult<Vec<i64>> {
        self.record("find_col_from_values")?;
        self.found = Some((values, n, table_id.map(str::to_string)));
        Ok(vec![4, 2])
    }

    fn fetch_meta_tables(&mut self, _formulas: bool) -> EngineResult<BTreeMap<String, TableData>> {
        self.record("fetch_meta_tables")?;
        let mut tables = BTreeMap::new();
        tables.insert("_grist_Tables".to_string(), TableData::empty("_grist_Tables"));
        Ok(tables)
    }

    fn load_meta_tables(&mut self, tables: TableData, columns: TableData) -> EngineResult<()> {
        self.record("load_meta_tables")?;
        self.meta = Some((tables, columns));
        Ok(())
    }

    fn load_table(&mut self, data: TableData) -> EngineResult<()> {
        self.record("load_table")?;
        self.loaded.push(data);
        Ok(())
    }

    fn create_migrations(
        &mut self,
        all_tables: BTreeMap<String, TableData>,
        metadata_only: bool,
    ) -> EngineResult<Vec<Action>> {
        self.record("create_migrations")?;
        self.migrated = Some((all_tables, metadata_only));
        Ok(vec![Action::new(
            "AddColumn",
            vec![WireValue::from("Tasks"), WireValue::from("due")],
        )])
    }

    fn schema_version(&self) -> i64 {
        38
    }

    fn get_formula_error(
        &mut self,
        table_id: &str,
        col_id: &str,
        row_id: RowId,
    ) -> EngineResult<CellValue> {
        self.record("get_formula_error")?;
        self.formula_error = Some((table_id.to_string(), col_id.to_string(), row_id));
        Ok(CellValue::exception("ZeroDivisionError", "division by zero"))
    }

    fn parse_acl_formula(&mut self, text: &str) -> EngineResult<WireValue> {
        self.record("parse_acl_formula")?;
        self.acl = Some(text.to_string());
        Ok(WireValue::Array(vec![WireValue::from("Const"), WireValue::Bool(true)]))
    }

    fn load_empty(&mut self) -> EngineResult<()> {
        self.record("load_empty")
    }

    fn load_done(&mut self) -> EngineResult<()> {
        self.record("load_done")
    }
}

/// Dispatcher holding the built-in surface.
pub fn dispatcher() -> Dispatcher {
    MethodRegistry::with_builtin_methods()
        .unwrap()
        .into_dispatcher()
}

/// Dispatch one positional call.
pub fn call(engine: &mut RecordingEngine, name: &str, args: Vec<WireValue>) -> Result<WireValue> {
    dispatcher().call(engine, Call::new(name, args))
}

/// Snapshot bytes for `entries`, as the host sends them.
pub fn snapshot(entries: Vec<(&str, WireValue)>) -> WireValue {
    WireValue::Bytes(sandbox_core::to_msgpack(&WireValue::text_map(entries)).unwrap())
}

/// A list of integers.
pub fn ints(values: &[i64]) -> WireValue {
    WireValue::Array(values.iter().copied().map(WireValue::Int).collect())
}
