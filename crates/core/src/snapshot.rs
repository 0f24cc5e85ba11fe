//! Table snapshots
//!
//! A snapshot is the host's column-oriented serialization of one table: a
//! MessagePack map from column key to a sequence of cells, plus the sentinel
//! `"id"` column holding row identifiers.
//!
//! [`TableData::from_raw`] turns snapshot bytes into a [`TableData`];
//! [`TableData::to_raw`] is the inverse.
//!
//! ## Invariants
//!
//! - every column has exactly one value per row id, in row-id order
//! - column keys are text, even when they arrived as `bin`
//! - non-empty input always carries an `"id"` column
//!
//! Row-id uniqueness is a precondition the host guarantees; it is not checked
//! here.

use std::collections::BTreeMap;

use crate::codec;
use crate::error::{Error, Result};
use crate::value::{CellValue, RowId};
use crate::wire::{from_msgpack, to_msgpack, WireValue};

/// Name of the sentinel row-id column
pub const ID_COLUMN: &str = "id";

/// Tag in front of the action form of a table
pub const TABLE_DATA_ACTION: &str = "TableData";

/// Decoded contents of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    /// Table identifier
    pub table_id: String,
    /// Row ids in arrival order
    pub row_ids: Vec<RowId>,
    /// Column name to cells, parallel to `row_ids`
    pub columns: BTreeMap<String, Vec<CellValue>>,
}

impl TableData {
    /// A table with no rows and no columns.
    pub fn empty(table_id: impl Into<String>) -> Self {
        TableData {
            table_id: table_id.into(),
            row_ids: Vec::new(),
            columns: BTreeMap::new(),
        }
    }

    /// Build a table, checking that every column matches the row count.
    pub fn new(
        table_id: impl Into<String>,
        row_ids: Vec<RowId>,
        columns: BTreeMap<String, Vec<CellValue>>,
    ) -> Result<Self> {
        let table = TableData {
            table_id: table_id.into(),
            row_ids,
            columns,
        };
        table.check_lengths()?;
        Ok(table)
    }

    /// Decode snapshot bytes.
    ///
    /// Absent or empty bytes are the "no data" case and give an empty table.
    ///
    /// # Errors
    ///
    /// - [`Error::Decode`] / [`Error::UnknownTag`] for malformed bytes or cells
    /// - [`Error::MissingIdColumn`] when non-empty input lacks `"id"`
    /// - [`Error::SchemaMismatch`] naming the first column whose length
    ///   differs from the row-id count
    pub fn from_raw(table_id: impl Into<String>, raw: Option<&[u8]>) -> Result<Self> {
        let table_id = table_id.into();
        let bytes = match raw {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Ok(TableData::empty(table_id)),
        };

        let entries = match from_msgpack(bytes)? {
            WireValue::Map(entries) => entries,
            other => {
                return Err(Error::decode(format!(
                    "snapshot of table {} must be a map, got {}",
                    table_id,
                    other.type_name()
                )))
            }
        };

        let mut raw_columns = BTreeMap::new();
        for (key, value) in entries {
            let name = column_name(key)?;
            match value {
                WireValue::Array(cells) => {
                    raw_columns.insert(name, cells);
                }
                other => {
                    return Err(Error::decode(format!(
                        "column {} of table {} must be a sequence, got {}",
                        name,
                        table_id,
                        other.type_name()
                    )))
                }
            }
        }

        let row_ids = raw_columns
            .remove(ID_COLUMN)
            .ok_or_else(|| Error::MissingIdColumn {
                table: table_id.clone(),
            })?
            .into_iter()
            .map(|id| match id {
                WireValue::Int(id) => Ok(id),
                other => Err(Error::decode(format!(
                    "row id in table {} must be an integer, got {}",
                    table_id,
                    other.type_name()
                ))),
            })
            .collect::<Result<Vec<RowId>>>()?;

        for (name, cells) in &raw_columns {
            if cells.len() != row_ids.len() {
                return Err(Error::SchemaMismatch {
                    table: table_id,
                    column: name.clone(),
                    expected: row_ids.len(),
                    actual: cells.len(),
                });
            }
        }

        let columns = raw_columns
            .into_iter()
            .map(|(name, cells)| {
                let decoded = cells
                    .into_iter()
                    .map(codec::decode)
                    .collect::<Result<Vec<_>>>()?;
                Ok((name, decoded))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(TableData {
            table_id,
            row_ids,
            columns,
        })
    }

    /// Encode as snapshot bytes, `"id"` first, objects in tagged envelopes.
    pub fn to_raw(&self) -> Result<Vec<u8>> {
        self.check_lengths()?;
        let mut entries = Vec::with_capacity(self.columns.len() + 1);
        entries.push((WireValue::Text(ID_COLUMN.to_string()), self.row_ids_wire()));
        for (name, cells) in &self.columns {
            entries.push((WireValue::Text(name.clone()), encode_cells(cells)?));
        }
        to_msgpack(&WireValue::Map(entries))
    }

    /// The `["TableData", table_id, row_ids, {column: cells}]` form returned
    /// to the host.
    pub fn to_action_repr(&self) -> Result<WireValue> {
        let mut columns = Vec::with_capacity(self.columns.len());
        for (name, cells) in &self.columns {
            columns.push((WireValue::Text(name.clone()), encode_cells(cells)?));
        }
        Ok(WireValue::Array(vec![
            WireValue::Text(TABLE_DATA_ACTION.to_string()),
            WireValue::Text(self.table_id.clone()),
            self.row_ids_wire(),
            WireValue::Map(columns),
        ]))
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.row_ids.len()
    }

    /// Cells of one column
    pub fn column(&self, name: &str) -> Option<&[CellValue]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Position of a row id, if present
    pub fn row_index(&self, row_id: RowId) -> Option<usize> {
        self.row_ids.iter().position(|id| *id == row_id)
    }

    fn row_ids_wire(&self) -> WireValue {
        WireValue::Array(self.row_ids.iter().map(|id| WireValue::Int(*id)).collect())
    }

    fn check_lengths(&self) -> Result<()> {
        for (name, cells) in &self.columns {
            if cells.len() != self.row_ids.len() {
                return Err(Error::SchemaMismatch {
                    table: self.table_id.clone(),
                    column: name.clone(),
                    expected: self.row_ids.len(),
                    actual: cells.len(),
                });
            }
        }
        Ok(())
    }
}

fn column_name(key: WireValue) -> Result<String> {
    match key {
        WireValue::Text(name) => Ok(name),
        WireValue::Bytes(bytes) => String::from_utf8(bytes)
            .map_err(|e| Error::decode(format!("column key is not UTF-8: {}", e))),
        other => Err(Error::decode(format!(
            "column key must be a string, got {}",
            other.type_name()
        ))),
    }
}

fn encode_cells(cells: &[CellValue]) -> Result<WireValue> {
    cells
        .iter()
        .map(codec::encode)
        .collect::<Result<Vec<_>>>()
        .map(WireValue::Array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TaggedObject;
    use chrono::NaiveDate;

    fn key(name: &str) -> WireValue {
        WireValue::Bytes(name.as_bytes().to_vec())
    }

    fn ints(values: &[i64]) -> WireValue {
        WireValue::Array(values.iter().map(|v| WireValue::Int(*v)).collect())
    }

    fn snapshot(entries: Vec<(WireValue, WireValue)>) -> Vec<u8> {
        to_msgpack(&WireValue::Map(entries)).unwrap()
    }

    #[test]
    fn decodes_amount_example() {
        let raw = snapshot(vec![(key("id"), ints(&[1, 2])), (key("amount"), ints(&[10, 20]))]);
        let table = TableData::from_raw("Orders", Some(&raw)).unwrap();

        assert_eq!(table.table_id, "Orders");
        assert_eq!(table.row_ids, vec![1, 2]);
        assert_eq!(table.columns.len(), 1);
        assert_eq!(
            table.column("amount").unwrap(),
            &[CellValue::Int(10), CellValue::Int(20)]
        );
    }

    #[test]
    fn absent_and_empty_input_give_empty_table() {
        for raw in [None, Some(&[][..])] {
            let table = TableData::from_raw("Orders", raw).unwrap();
            assert_eq!(table, TableData::empty("Orders"));
            assert_eq!(table.num_rows(), 0);
            assert!(table.columns.is_empty());
        }
    }

    #[test]
    fn missing_id_column_is_rejected() {
        let raw = snapshot(vec![(key("amount"), ints(&[10, 20]))]);
        let err = TableData::from_raw("Orders", Some(&raw)).unwrap_err();
        assert_eq!(
            err,
            Error::MissingIdColumn {
                table: "Orders".into()
            }
        );

        // An empty map is non-empty input too
        let raw = snapshot(vec![]);
        assert!(TableData::from_raw("Orders", Some(&raw)).is_err());
    }

    #[test]
    fn length_mismatch_names_the_column() {
        let raw = snapshot(vec![
            (key("id"), ints(&[1, 2])),
            (key("amount"), ints(&[10, 20, 30])),
        ]);
        match TableData::from_raw("Orders", Some(&raw)).unwrap_err() {
            Error::SchemaMismatch {
                column,
                expected,
                actual,
                ..
            } => {
                assert_eq!(column, "amount");
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn text_keys_and_envelopes_are_decoded() {
        let envelope = to_msgpack(&WireValue::Array(vec![
            WireValue::Text("Reference".into()),
            WireValue::Text("People".into()),
            WireValue::Int(4),
        ]))
        .unwrap();
        let raw = snapshot(vec![
            (WireValue::Text("id".into()), ints(&[7])),
            (WireValue::Text("owner".into()), WireValue::Array(vec![WireValue::Bytes(envelope)])),
            (key("note"), WireValue::Array(vec![WireValue::Text("hello".into())])),
        ]);
        let table = TableData::from_raw("Tasks", Some(&raw)).unwrap();
        assert_eq!(
            table.column("owner").unwrap()[0],
            CellValue::Object(TaggedObject::Reference {
                table_id: "People".into(),
                row_id: 4
            })
        );
        assert_eq!(table.column("note").unwrap()[0], CellValue::Text("hello".into()));
    }

    #[test]
    fn bad_cell_fails_whole_snapshot() {
        let raw = snapshot(vec![
            (key("id"), ints(&[1])),
            (key("x"), WireValue::Array(vec![WireValue::Bytes(vec![0xc1])])),
        ]);
        assert!(TableData::from_raw("T", Some(&raw)).unwrap_err().is_decode_failure());
    }

    #[test]
    fn non_map_snapshot_is_rejected() {
        let raw = to_msgpack(&ints(&[1, 2])).unwrap();
        assert!(TableData::from_raw("T", Some(&raw)).is_err());
    }

    #[test]
    fn to_raw_round_trips() {
        let mut columns = BTreeMap::new();
        columns.insert(
            "due".to_string(),
            vec![
                CellValue::from(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
                CellValue::Null,
            ],
        );
        columns.insert(
            "title".to_string(),
            vec![CellValue::from("a"), CellValue::from("b")],
        );
        let table = TableData::new("Tasks", vec![3, 1], columns).unwrap();

        let raw = table.to_raw().unwrap();
        assert_eq!(TableData::from_raw("Tasks", Some(&raw)).unwrap(), table);
    }

    #[test]
    fn new_rejects_ragged_columns() {
        let mut columns = BTreeMap::new();
        columns.insert("a".to_string(), vec![CellValue::Null]);
        assert!(TableData::new("T", vec![1, 2], columns).is_err());
    }

    #[test]
    fn action_repr_shape() {
        let mut columns = BTreeMap::new();
        columns.insert("n".to_string(), vec![CellValue::Int(5)]);
        let table = TableData::new("T", vec![9], columns).unwrap();
        let repr = table.to_action_repr().unwrap();
        assert_eq!(
            repr,
            WireValue::Array(vec![
                WireValue::Text("TableData".into()),
                WireValue::Text("T".into()),
                ints(&[9]),
                WireValue::text_map([("n", ints(&[5]))]),
            ])
        );
    }
}
