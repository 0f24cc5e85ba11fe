//! Snapshot decoding through the public API.

use std::collections::BTreeMap;

use proptest::prelude::*;
use sandbox_bridge::{CellValue, CodecError, TableData, WireValue};

use crate::common::*;

fn raw(entries: Vec<(WireValue, WireValue)>) -> Vec<u8> {
    sandbox_core::to_msgpack(&WireValue::Map(entries)).unwrap()
}

#[test]
fn amount_snapshot_decodes_in_row_order() {
    let bytes = raw(vec![
        (WireValue::from("id"), ints(&[1, 2])),
        (WireValue::from("amount"), ints(&[10, 20])),
    ]);

    let table = TableData::from_raw("t", Some(&bytes)).unwrap();

    let mut columns = BTreeMap::new();
    columns.insert(
        "amount".to_string(),
        vec![CellValue::Int(10), CellValue::Int(20)],
    );
    assert_eq!(table, TableData::new("t", vec![1, 2], columns).unwrap());
}

#[test]
fn absent_or_empty_snapshot_is_an_empty_table() {
    for input in [None, Some(&[][..])] {
        let table = TableData::from_raw("Notes", input).unwrap();
        assert_eq!(table.table_id, "Notes");
        assert_eq!(table.num_rows(), 0);
        assert!(table.columns.is_empty());
    }
}

#[test]
fn binary_column_keys_become_text() {
    let bytes = raw(vec![
        (WireValue::Bytes(b"id".to_vec()), ints(&[7])),
        (WireValue::Bytes(b"name".to_vec()), texts(&["ann"])),
    ]);
    let table = TableData::from_raw("People", Some(&bytes)).unwrap();
    assert_eq!(table.row_ids, vec![7]);
    assert_eq!(table.column("name").unwrap(), &[CellValue::from("ann")]);
}

#[test]
fn snapshot_without_id_column_is_rejected() {
    let bytes = raw(vec![(WireValue::from("amount"), ints(&[1]))]);
    let err = TableData::from_raw("t", Some(&bytes)).unwrap_err();
    assert_eq!(err, CodecError::MissingIdColumn { table: "t".into() });
}

#[test]
fn short_column_names_the_column() {
    let bytes = raw(vec![
        (WireValue::from("id"), ints(&[1, 2])),
        (WireValue::from("amount"), ints(&[10, 20, 30])),
    ]);
    match TableData::from_raw("t", Some(&bytes)).unwrap_err() {
        CodecError::SchemaMismatch { table, column, .. } => {
            assert_eq!(table, "t");
            assert_eq!(column, "amount");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn load_table_reports_codec_failures_to_the_host() {
    let mut host = Host::new();
    let bad = snapshot(vec![("amount", ints(&[1]))]);
    let kind = host.fail(sandbox_bridge::Call::new(
        "load_table",
        vec!["t".into(), bad],
    ));
    assert_eq!(kind, "MissingIdColumn");

    let garbage = WireValue::Bytes(vec![0xc1]);
    let kind = host.fail(sandbox_bridge::Call::new(
        "load_table",
        vec!["t".into(), garbage],
    ));
    assert_eq!(kind, "DecodeError");
}

proptest! {
    #[test]
    fn every_column_has_one_value_per_row(
        ids in proptest::collection::btree_set(1i64..10_000, 0..40),
        seed in any::<i64>(),
    ) {
        let ids: Vec<i64> = ids.into_iter().collect();
        let amounts: Vec<i64> = ids.iter().map(|id| id.wrapping_mul(seed)).collect();
        let names: Vec<WireValue> = ids.iter().map(|id| WireValue::Text(format!("r{}", id))).collect();
        let bytes = raw(vec![
            (WireValue::from("id"), ints(&ids)),
            (WireValue::from("amount"), ints(&amounts)),
            (WireValue::from("name"), WireValue::Array(names)),
        ]);

        let table = TableData::from_raw("t", Some(&bytes)).unwrap();

        prop_assert_eq!(&table.row_ids, &ids);
        for cells in table.columns.values() {
            prop_assert_eq!(cells.len(), ids.len());
        }
        let decoded: Vec<i64> = table
            .column("amount")
            .unwrap()
            .iter()
            .map(|c| c.as_int().unwrap())
            .collect();
        prop_assert_eq!(decoded, amounts);
    }
}
