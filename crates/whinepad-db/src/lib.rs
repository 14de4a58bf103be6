// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use whinepad_app::{CollectionStorage, FieldMap, Record};

pub const APP_NAME: &str = "whinepad";
pub const DEFAULT_STORAGE_KEY: &str = "data";

const KV_TABLE: &str = "kv";
const KV_COLUMNS: [&str; 3] = ["key", "value", "updated_at"];
const SCHEMA_SQL: &str = "
    CREATE TABLE kv (
      key TEXT PRIMARY KEY,
      value TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );
";

/// A single-table key/value store. The whole collection lives under one key as a
/// JSON array, so every save overwrites the previous document.
pub struct Store {
    conn: Connection,
    storage_key: String,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
        })
    }

    pub fn bootstrap(&self) -> Result<()> {
        if table_exists(&self.conn, KV_TABLE)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(SCHEMA_SQL)
                .context("create schema")?;
        }
        Ok(())
    }

    pub fn set_storage_key(&mut self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            bail!("storage key must not be empty");
        }
        self.storage_key = key.to_owned();
        Ok(())
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read key {key}"))
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO kv (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert key {key}"))?;
        Ok(())
    }

}

impl CollectionStorage for Store {
    fn load_collection(&mut self) -> Result<Option<Vec<FieldMap>>> {
        let Some(raw) = self.get(&self.storage_key)? else {
            debug!(key = %self.storage_key, "no stored collection");
            return Ok(None);
        };
        let rows: Option<Vec<FieldMap>> = serde_json::from_str(&raw).with_context(|| {
            format!(
                "stored collection under key `{}` is not a JSON array of records; fix or remove it, or pick another storage_key",
                self.storage_key
            )
        })?;
        debug!(key = %self.storage_key, rows = rows.as_ref().map_or(0, Vec::len), "collection loaded");
        Ok(rows)
    }

    fn save_collection(&mut self, records: &[Record]) -> Result<()> {
        let rows: Vec<&FieldMap> = records.iter().map(|record| &record.fields).collect();
        let raw = serde_json::to_string(&rows).context("serialize collection")?;
        self.put(&self.storage_key, &raw)
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("WHINEPAD_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set WHINEPAD_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("whinepad.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn validate_schema(conn: &Connection) -> Result<()> {
    let columns = table_columns(conn, KV_TABLE)?;
    let missing: Vec<&str> = KV_COLUMNS
        .iter()
        .copied()
        .filter(|column| !columns.contains(*column))
        .collect();
    if !missing.is_empty() {
        bail!(
            "table `{KV_TABLE}` is missing required columns: {}; point db_path at a whinepad database",
            missing.join(", ")
        );
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
