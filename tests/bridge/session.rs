//! Whole host sessions served in one pass.

use sandbox_bridge::{Call, Reply, WireValue};

use crate::common::*;

fn meta_tables() -> WireValue {
    snapshot(vec![
        ("id", ints(&[1])),
        ("tableId", texts(&["Tasks"])),
    ])
}

fn meta_columns() -> WireValue {
    snapshot(vec![
        ("id", ints(&[1, 2])),
        ("parentId", ints(&[1, 1])),
        ("colId", texts(&["title", "done"])),
    ])
}

fn tasks() -> WireValue {
    snapshot(vec![
        ("id", ints(&[1, 2])),
        ("title", texts(&["write", "test"])),
        ("done", WireValue::Array(vec![WireValue::Bool(true), WireValue::Bool(false)])),
    ])
}

fn open_document() -> Vec<Call> {
    vec![
        Call::new("load_meta_tables", vec![meta_tables(), meta_columns()]),
        Call::new("load_table", vec!["Tasks".into(), tasks()]),
        Call::new("load_done", vec![]),
    ]
}

#[test]
fn open_document_then_read_it_back() {
    let mut host = Host::new();
    let mut calls = open_document();
    calls.push(Call::new("fetch_table_schema", vec![]));
    calls.push(Call::new("get_version", vec![]));

    let replies = host.send(&calls);

    assert_eq!(replies.len(), 5);
    assert!(replies[..3]
        .iter()
        .all(|r| *r == Reply::Data(WireValue::Nil)));
    assert_eq!(replies[3], Reply::Data("Tasks: done, title\n".into()));
    assert_eq!(replies[4], Reply::Data(WireValue::Int(1)));
    assert!(host.engine.is_loaded());
}

#[test]
fn fetch_meta_tables_returns_what_was_loaded() {
    let mut host = Host::new();
    host.send(&open_document());

    let meta = host.ok(Call::new("fetch_meta_tables", vec![]));
    let columns = meta.get("_grist_Tables_column").unwrap();
    match columns {
        WireValue::Array(items) => {
            assert_eq!(items[0], WireValue::from("TableData"));
            assert_eq!(items[1], WireValue::from("_grist_Tables_column"));
            assert_eq!(items[2], ints(&[1, 2]));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn user_actions_change_what_fetch_returns() {
    let mut host = Host::new();
    host.send(&open_document());

    let actions = WireValue::Array(vec![
        WireValue::Array(vec![
            "AddRecord".into(),
            "Tasks".into(),
            WireValue::Nil,
            WireValue::text_map([("title", WireValue::from("ship"))]),
        ]),
        WireValue::Array(vec![
            "UpdateRecord".into(),
            "Tasks".into(),
            WireValue::Int(2),
            WireValue::text_map([("done", WireValue::Bool(true))]),
        ]),
    ]);
    let result = host.ok(Call::new("apply_user_actions", vec![actions]));
    assert_eq!(
        result.get("retValues"),
        Some(&WireValue::Array(vec![WireValue::Int(3), WireValue::Nil]))
    );

    let query = WireValue::text_map([("done", WireValue::Array(vec![WireValue::Bool(true)]))]);
    let done = host.ok(Call::new("fetch_table", vec!["Tasks".into()]).kwarg("query", query));
    match done {
        WireValue::Array(items) => assert_eq!(items[2], ints(&[1, 2])),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn failures_do_not_end_the_session() {
    let mut host = Host::new();
    let mut calls = open_document();
    calls.push(Call::new("fetch_table", vec!["Nope".into()]));
    calls.push(Call::new("get_formula_error", vec!["Tasks".into(), "title".into(), WireValue::Int(1)]));
    calls.push(Call::new("no_such_method", vec![]));
    calls.push(Call::new("fetch_table", vec!["Tasks".into()]).kwarg("bogus", WireValue::Nil));
    calls.push(Call::new("get_version", vec![]));

    let replies = host.send(&calls);

    let kinds: Vec<&str> = replies[3..7]
        .iter()
        .map(|r| match r {
            Reply::Exc(f) => f.kind.as_str(),
            Reply::Data(_) => "ok",
        })
        .collect();
    assert_eq!(kinds, vec!["KeyError", "NotSupported", "UnknownMethod", "TypeError"]);
    assert_eq!(replies[7], Reply::Data(WireValue::Int(1)));
}

#[test]
fn failed_action_batch_is_not_applied() {
    let mut host = Host::new();
    host.send(&open_document());

    let actions = WireValue::Array(vec![
        WireValue::Array(vec!["RemoveRecord".into(), "Tasks".into(), WireValue::Int(1)]),
        WireValue::Array(vec!["RemoveRecord".into(), "Tasks".into(), WireValue::Int(42)]),
    ]);
    assert_eq!(host.fail(Call::new("apply_user_actions", vec![actions])), "KeyError");
    assert_eq!(host.engine.table("Tasks").unwrap().row_ids, vec![1, 2]);
}

#[test]
fn load_empty_starts_a_blank_document() {
    let mut host = Host::new();
    host.send(&open_document());
    host.ok(Call::new("load_empty", vec![]));

    assert_eq!(host.ok(Call::new("fetch_table_schema", vec![])), WireValue::from(""));
    assert_eq!(host.fail(Call::new("fetch_table", vec!["Tasks".into()])), "KeyError");
}

#[test]
fn migrations_and_autocomplete_are_empty() {
    let mut host = Host::new();
    let all_tables = WireValue::text_map([("Tasks", tasks())]);
    assert_eq!(
        host.ok(Call::new("create_migrations", vec![all_tables])),
        WireValue::Array(vec![])
    );
    assert_eq!(
        host.ok(Call::new(
            "autocomplete",
            vec!["$ti".into(), "Tasks".into(), "title".into(), WireValue::Nil]
        )),
        WireValue::Array(vec![])
    );
}
