// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use whinepad_app::{
    CollectionStorage, MemoryNavigator, RecordStore, Scalar, Session, SessionCommand,
    SessionOptions, StoreAction,
};
use whinepad_db::{DEFAULT_STORAGE_KEY, Store, validate_db_path};
use whinepad_testkit::{WineFaker, fixture_year, named_rows, temp_db_path, wine_schema};

fn open_store(path: &std::path::Path) -> Result<Store> {
    let store = Store::open(path)?;
    store.bootstrap()?;
    Ok(store)
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path(":memory:").is_ok());
    assert!(validate_db_path("/tmp/whinepad.db").is_ok());
}

#[test]
fn bootstrap_is_idempotent() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.bootstrap()?;
    assert_eq!(store.get(DEFAULT_STORAGE_KEY)?, None);
    Ok(())
}

#[test]
fn bootstrap_rejects_foreign_kv_table() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    rusqlite::Connection::open(&path)?
        .execute_batch("CREATE TABLE kv (key TEXT PRIMARY KEY, payload TEXT);")?;
    let store = Store::open(&path)?;
    let err = store.bootstrap().expect_err("missing columns");
    let message = err.to_string();
    assert!(message.contains("value"), "{message}");
    assert!(message.contains("updated_at"), "{message}");
    Ok(())
}

#[test]
fn put_overwrites_and_stamps_time() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    let store = open_store(&path)?;
    store.put("data", "[]")?;
    store.put("data", "[{}]")?;
    assert_eq!(store.get("data")?.as_deref(), Some("[{}]"));

    let stamp: String = rusqlite::Connection::open(&path)?.query_row(
        "SELECT updated_at FROM kv WHERE key = 'data'",
        [],
        |row| row.get(0),
    )?;
    assert!(time::OffsetDateTime::parse(&stamp, &Rfc3339).is_ok(), "{stamp}");
    Ok(())
}

#[test]
fn empty_store_loads_nothing() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;
    assert!(store.load_collection()?.is_none());

    store.put(DEFAULT_STORAGE_KEY, "null")?;
    assert!(store.load_collection()?.is_none());
    Ok(())
}

#[test]
fn malformed_document_is_a_load_error() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;
    store.put(DEFAULT_STORAGE_KEY, "{not json")?;
    let err = store.load_collection().expect_err("bad json");
    assert!(err.to_string().contains("not a JSON array of records"));
    Ok(())
}

#[test]
fn storage_key_must_not_be_blank() -> Result<()> {
    let mut store = Store::open_memory()?;
    assert!(store.set_storage_key("  ").is_err());
    store.set_storage_key("cellar")?;
    assert_eq!(store.storage_key(), "cellar");
    Ok(())
}

#[test]
fn collection_survives_reopen_in_order() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    let rows = WineFaker::new(5).rows(4);
    {
        let mut records = RecordStore::open(Arc::new(wine_schema()), open_store(&path)?)?;
        assert_eq!(records.snapshot().len(), 1);
        for fields in rows.iter().rev() {
            records.dispatch(StoreAction::InsertNew {
                fields: fields.clone(),
            })?;
        }
        let last = records.snapshot().id_at(4).expect("seed row");
        records.dispatch(StoreAction::Delete { id: last })?;
    }

    let mut reopened = open_store(&path)?;
    let loaded = reopened.load_collection()?.expect("stored rows");
    assert_eq!(loaded, rows);
    Ok(())
}

#[test]
fn separate_storage_keys_hold_separate_collections() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    let mut first = open_store(&path)?;
    first.set_storage_key("first")?;
    let mut records = RecordStore::open(Arc::new(wine_schema()), first)?;
    records.dispatch(StoreAction::InsertNew {
        fields: named_rows(&["only here"]).remove(0),
    })?;

    let mut second = open_store(&path)?;
    second.set_storage_key("second")?;
    assert!(second.load_collection()?.is_none());

    let mut first_again = open_store(&path)?;
    first_again.set_storage_key("first")?;
    let rows = first_again.load_collection()?.expect("rows");
    assert_eq!(rows[0]["name"], Scalar::from("only here"));
    Ok(())
}

#[test]
fn session_cell_edit_is_persisted_before_it_is_visible() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    let mut store = open_store(&path)?;
    store.put(
        DEFAULT_STORAGE_KEY,
        &serde_json::to_string(&named_rows(&["a", "b"]))?,
    )?;

    let mut session = Session::open(
        Arc::new(wine_schema()),
        store,
        MemoryNavigator::default(),
        SessionOptions {
            fallback_year: Some(fixture_year()),
            ..SessionOptions::default()
        },
    )?;
    session.dispatch(SessionCommand::BeginCellEdit {
        row: 1,
        column: "year".to_owned(),
    })?;
    session.dispatch(SessionCommand::CommitCellEdit("1999abc".to_owned()))?;

    let mut reader = open_store(&path)?;
    let rows = reader.load_collection()?.expect("rows");
    assert_eq!(rows[1]["year"], Scalar::Int(1999));
    assert_eq!(session.snapshot()[1].get("year"), Some(&Scalar::Int(1999)));
    Ok(())
}
