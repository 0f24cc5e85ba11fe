//! Cell values crossing the boundary.

use chrono::NaiveDate;
use sandbox_bridge::{codec, CellValue, TaggedObject, WireValue};

use crate::common::*;

#[test]
fn date_envelope_is_a_calendar_day_and_reencodes_identically() {
    let payload = rmp_serde::to_vec(&("Date", 18262)).unwrap();
    let wire = WireValue::Bytes(payload.clone());

    let cell = codec::decode(wire).unwrap();
    assert_eq!(
        cell,
        CellValue::Object(TaggedObject::Date(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        ))
    );
    assert_eq!(codec::encode(&cell).unwrap(), WireValue::Bytes(payload));
}

#[test]
fn unknown_tag_in_a_snapshot_fails_the_load() {
    let mut host = Host::new();
    let envelope = WireValue::Bytes(sandbox_core::to_msgpack(&object("Frobnicate", vec![])).unwrap());
    let data = snapshot(vec![
        ("id", ints(&[1])),
        ("value", WireValue::Array(vec![envelope])),
    ]);

    let kind = host.fail(sandbox_bridge::Call::new("load_table", vec!["t".into(), data]));
    assert_eq!(kind, "UnknownTag");
}

#[test]
fn structural_values_in_actions_come_back_as_envelopes() {
    let mut host = Host::new();
    host.ok(sandbox_bridge::Call::new(
        "load_table",
        vec!["Links".into(), snapshot(vec![("id", ints(&[]))])],
    ));

    let target = object("ReferenceList", vec!["People".into(), ints(&[3, 4])]);
    let when = object("DateTime", vec![WireValue::Float(1.5e9), "UTC".into()]);
    let add = object(
        "AddRecord",
        vec![
            "Links".into(),
            WireValue::Nil,
            WireValue::text_map([("target", target), ("when", when)]),
        ],
    );
    host.ok(sandbox_bridge::Call::new(
        "apply_user_actions",
        vec![WireValue::Array(vec![add])],
    ));

    let repr = host.ok(sandbox_bridge::Call::new("fetch_table", vec!["Links".into()]));
    let columns = match &repr {
        WireValue::Array(items) => items[3].clone(),
        other => panic!("unexpected {:?}", other),
    };
    let target = match columns.get("target") {
        Some(WireValue::Array(cells)) => cells[0].clone(),
        other => panic!("unexpected {:?}", other),
    };
    assert!(matches!(target, WireValue::Bytes(_)));
    assert_eq!(
        codec::decode(target).unwrap(),
        CellValue::Object(TaggedObject::ReferenceList {
            table_id: "People".into(),
            row_ids: vec![3, 4],
        })
    );
}

#[test]
fn formula_error_is_a_bare_tagged_object() {
    let exception = CellValue::exception("ValueError", "bad input");
    assert_eq!(
        codec::encode_structural(&exception),
        object("Exception", vec!["ValueError".into(), "bad input".into()])
    );
}
