// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::coerce::{FormValues, coerce_form, coerce_with_year, current_year};
use crate::ids::{IdAllocator, RecordId, SubscriberId};
use crate::model::sort_records;
use crate::{FieldMap, Record, Schema, Snapshot};

/// Durable home of the collection: one slot, read once, overwritten on every mutation.
pub trait CollectionStorage {
    fn load_collection(&mut self) -> Result<Option<Vec<FieldMap>>>;
    fn save_collection(&mut self, records: &[Record]) -> Result<()>;
}

impl<T: CollectionStorage + ?Sized> CollectionStorage for Box<T> {
    fn load_collection(&mut self) -> Result<Option<Vec<FieldMap>>> {
        (**self).load_collection()
    }

    fn save_collection(&mut self, records: &[Record]) -> Result<()> {
        (**self).save_collection(records)
    }
}

/// Process-local storage, for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    stored: Option<Vec<FieldMap>>,
    writes: usize,
}

impl MemoryStorage {
    pub fn with_rows(rows: Vec<FieldMap>) -> Self {
        Self {
            stored: Some(rows),
            writes: 0,
        }
    }

    pub fn stored(&self) -> Option<&[FieldMap]> {
        self.stored.as_deref()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl CollectionStorage for MemoryStorage {
    fn load_collection(&mut self) -> Result<Option<Vec<FieldMap>>> {
        Ok(self.stored.clone())
    }

    fn save_collection(&mut self, records: &[Record]) -> Result<()> {
        self.stored = Some(records.iter().map(|record| record.fields.clone()).collect());
        self.writes += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    Sort {
        column: String,
        descending: bool,
    },
    EditCell {
        id: RecordId,
        column: String,
        raw: String,
    },
    ReplaceFromForm {
        id: RecordId,
        form: FormValues,
    },
    Delete {
        id: RecordId,
    },
    InsertNew {
        fields: FieldMap,
    },
}

impl StoreAction {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sort { .. } => "sort",
            Self::EditCell { .. } => "edit_cell",
            Self::ReplaceFromForm { .. } => "replace_from_form",
            Self::Delete { .. } => "delete",
            Self::InsertNew { .. } => "insert_new",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub snapshot: Snapshot,
    /// False when the action referenced an unknown row or column and nothing changed.
    pub applied: bool,
}

type Subscriber = Box<dyn FnMut(&Snapshot)>;

/// Ordered record collection plus its mutation protocol.
///
/// Each applied action builds a new collection, persists it, and only then
/// commits and publishes it. A failed write leaves the previous snapshot in
/// place, so memory never drifts ahead of storage.
pub struct RecordStore<S> {
    schema: Arc<Schema>,
    storage: S,
    snapshot: Snapshot,
    ids: IdAllocator,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    fixed_year: Option<i32>,
}

impl<S: CollectionStorage> RecordStore<S> {
    pub fn open(schema: Arc<Schema>, storage: S) -> Result<Self> {
        let defaults = vec![schema.initial_record(current_year())];
        Self::open_with_defaults(schema, storage, defaults)
    }

    /// Loads the stored collection, or starts from `defaults` when storage is empty.
    pub fn open_with_defaults(
        schema: Arc<Schema>,
        mut storage: S,
        defaults: Vec<FieldMap>,
    ) -> Result<Self> {
        let rows = match storage
            .load_collection()
            .context("load stored collection")?
        {
            Some(rows) => rows,
            None => {
                debug!(rows = defaults.len(), "storage empty, using default rows");
                defaults
            }
        };

        let mut ids = IdAllocator::default();
        let records: Vec<Record> = rows
            .into_iter()
            .map(|fields| {
                if !schema.conforms(&fields) {
                    warn!(keys = ?fields.keys().collect::<Vec<_>>(), "stored row does not match schema");
                }
                Record::new(ids.next_record(), fields)
            })
            .collect();

        Ok(Self {
            schema,
            storage,
            snapshot: Snapshot::new(records),
            ids,
            subscribers: Vec::new(),
            fixed_year: None,
        })
    }

    /// Pins the year used when a year cell cannot be parsed.
    pub fn with_fallback_year(mut self, year: i32) -> Self {
        self.fixed_year = Some(year);
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&Snapshot) + 'static) -> SubscriberId {
        let id = self.ids.next_subscriber();
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        before != self.subscribers.len()
    }

    pub fn dispatch(&mut self, action: StoreAction) -> Result<Dispatched> {
        let name = action.name();
        let Some(next) = self.apply(action) else {
            debug!(action = name, "action ignored");
            return Ok(Dispatched {
                snapshot: self.snapshot.clone(),
                applied: false,
            });
        };

        self.storage
            .save_collection(&next)
            .with_context(|| format!("persist collection after {name}"))?;

        self.snapshot = Snapshot::new(next);
        debug!(action = name, rows = self.snapshot.len(), "collection committed");
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&self.snapshot);
        }

        Ok(Dispatched {
            snapshot: self.snapshot.clone(),
            applied: true,
        })
    }

    fn fallback_year(&self) -> i32 {
        self.fixed_year.unwrap_or_else(current_year)
    }

    fn apply(&mut self, action: StoreAction) -> Option<Vec<Record>> {
        match action {
            StoreAction::Sort { column, descending } => {
                self.schema.column(&column)?;
                let mut next = self.snapshot.to_vec();
                sort_records(&mut next, &column, descending);
                Some(next)
            }
            StoreAction::EditCell { id, column, raw } => {
                let kind = self.schema.column(&column)?.kind;
                let position = self.snapshot.position(id)?;
                let value = coerce_with_year(kind, &raw, self.fallback_year());
                let mut next = self.snapshot.to_vec();
                next[position].fields.insert(column, value);
                Some(next)
            }
            StoreAction::ReplaceFromForm { id, form } => {
                let position = self.snapshot.position(id)?;
                let coerced = coerce_form(&self.schema, &form, self.fallback_year());
                let mut next = self.snapshot.to_vec();
                next[position].fields.extend(coerced);
                Some(next)
            }
            StoreAction::Delete { id } => {
                let position = self.snapshot.position(id)?;
                let mut next = self.snapshot.to_vec();
                next.remove(position);
                Some(next)
            }
            StoreAction::InsertNew { fields } => {
                let fields = self.conform(fields);
                let mut next = Vec::with_capacity(self.snapshot.len() + 1);
                next.push(Record::new(self.ids.next_record(), fields));
                next.extend(self.snapshot.iter().cloned());
                Some(next)
            }
        }
    }

    /// Keeps exactly the schema's keys, filling gaps with the coercion of empty input.
    fn conform(&self, mut fields: FieldMap) -> FieldMap {
        let year = self.fallback_year();
        self.schema
            .columns()
            .iter()
            .map(|column| {
                let value = fields
                    .remove(&column.key)
                    .unwrap_or_else(|| coerce_with_year(column.kind, "", year));
                (column.key.clone(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectionStorage, MemoryStorage, RecordStore, StoreAction};
    use crate::{Column, ColumnKind, FieldMap, Record, RecordId, Scalar, Schema};
    use anyhow::{Result, bail};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(vec![
                Column::new("name", "Name", ColumnKind::Text)
                    .visible()
                    .samples(["$2 Chuck"]),
                Column::new("year", "Year", ColumnKind::Year)
                    .visible()
                    .samples([2015]),
                Column::new("rating", "Rating", ColumnKind::Rating)
                    .visible()
                    .samples([3]),
            ])
            .expect("valid schema"),
        )
    }

    fn row(name: &str, year: i64, rating: i64) -> FieldMap {
        [
            ("name".to_owned(), Scalar::from(name)),
            ("year".to_owned(), Scalar::Int(year)),
            ("rating".to_owned(), Scalar::Int(rating)),
        ]
        .into_iter()
        .collect()
    }

    fn store_with(rows: Vec<FieldMap>) -> Result<RecordStore<MemoryStorage>> {
        RecordStore::open(schema(), MemoryStorage::with_rows(rows))
    }

    fn names(store: &RecordStore<MemoryStorage>) -> Vec<String> {
        store
            .snapshot()
            .iter()
            .map(|record| record.display("name"))
            .collect()
    }

    struct BrokenStorage;

    impl CollectionStorage for BrokenStorage {
        fn load_collection(&mut self) -> Result<Option<Vec<FieldMap>>> {
            Ok(Some(vec![row("A", 2020, 1)]))
        }

        fn save_collection(&mut self, _records: &[Record]) -> Result<()> {
            bail!("disk full")
        }
    }

    #[test]
    fn empty_storage_starts_from_first_samples() -> Result<()> {
        let store = RecordStore::open(schema(), MemoryStorage::default())?;
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].display("name"), "$2 Chuck");
        assert_eq!(store.storage().writes(), 0);
        Ok(())
    }

    #[test]
    fn every_mutation_persists_before_publishing() -> Result<()> {
        let storage = MemoryStorage::with_rows(vec![row("A", 2020, 3), row("B", 2019, 5)]);
        let mut store = RecordStore::open(schema(), storage)?;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |snapshot| sink.borrow_mut().push(snapshot.len()));

        let id = store.snapshot().id_at(1).expect("second row");
        store.dispatch(StoreAction::Delete { id })?;

        assert_eq!(store.storage().writes(), 1);
        assert_eq!(store.storage().stored().map(<[FieldMap]>::len), Some(1));
        assert_eq!(*seen.borrow(), vec![1]);
        Ok(())
    }

    #[test]
    fn edit_cell_coerces_by_column_type() -> Result<()> {
        let mut store = store_with(vec![row("A", 2020, 3)])?
            .with_fallback_year(2031);
        let id = store.snapshot().id_at(0).expect("row");

        store.dispatch(StoreAction::EditCell {
            id,
            column: "year".to_owned(),
            raw: "1999".to_owned(),
        })?;
        assert_eq!(store.snapshot()[0].get("year"), Some(&Scalar::Int(1999)));

        store.dispatch(StoreAction::EditCell {
            id,
            column: "year".to_owned(),
            raw: String::new(),
        })?;
        assert_eq!(store.snapshot()[0].get("year"), Some(&Scalar::Int(2031)));
        Ok(())
    }

    #[test]
    fn edits_never_alias_earlier_snapshots() -> Result<()> {
        let mut store = store_with(vec![row("A", 2020, 3)])?;
        let before = store.snapshot();
        let id = before.id_at(0).expect("row");

        let after = store
            .dispatch(StoreAction::EditCell {
                id,
                column: "name".to_owned(),
                raw: "Z".to_owned(),
            })?
            .snapshot;

        assert_eq!(before[0].display("name"), "A");
        assert_eq!(after[0].display("name"), "Z");
        assert!(!before.shares_storage_with(&after));
        Ok(())
    }

    #[test]
    fn unknown_references_are_ignored_without_writing() -> Result<()> {
        let mut store = store_with(vec![row("A", 2020, 3)])?;
        let result = store.dispatch(StoreAction::Delete {
            id: RecordId::new(999),
        })?;
        assert!(!result.applied);

        let id = store.snapshot().id_at(0).expect("row");
        let result = store.dispatch(StoreAction::EditCell {
            id,
            column: "nope".to_owned(),
            raw: "x".to_owned(),
        })?;
        assert!(!result.applied);
        assert_eq!(store.storage().writes(), 0);
        Ok(())
    }

    #[test]
    fn replace_from_form_overwrites_submitted_fields() -> Result<()> {
        let mut store = store_with(vec![row("A", 2020, 3)])?;
        let id = store.snapshot().id_at(0).expect("row");
        let form = [
            ("name".to_owned(), "Renamed".to_owned()),
            ("rating".to_owned(), "5".to_owned()),
        ]
        .into_iter()
        .collect();

        store.dispatch(StoreAction::ReplaceFromForm { id, form })?;
        let record = &store.snapshot()[0];
        assert_eq!(record.display("name"), "Renamed");
        assert_eq!(record.get("rating"), Some(&Scalar::Int(5)));
        assert_eq!(record.get("year"), Some(&Scalar::Int(2020)));
        Ok(())
    }

    #[test]
    fn insert_prepends_and_conforms_to_schema() -> Result<()> {
        let mut store = store_with(vec![row("A", 2020, 3)])?
            .with_fallback_year(2026);
        let mut fields = FieldMap::new();
        fields.insert("name".to_owned(), Scalar::from("B"));
        fields.insert("stray".to_owned(), Scalar::from("x"));

        store.dispatch(StoreAction::InsertNew { fields })?;
        assert_eq!(names(&store), vec!["B", "A"]);
        let first = &store.snapshot()[0];
        assert_eq!(first.get("year"), Some(&Scalar::Int(2026)));
        assert_eq!(first.get("rating"), Some(&Scalar::Int(0)));
        assert!(first.get("stray").is_none());
        Ok(())
    }

    #[test]
    fn failed_write_keeps_previous_snapshot() -> Result<()> {
        let mut store = RecordStore::open(schema(), BrokenStorage)?;
        let id = store.snapshot().id_at(0).expect("row");

        let error = store
            .dispatch(StoreAction::Delete { id })
            .expect_err("write should fail");
        assert!(error.to_string().contains("persist collection after delete"));
        assert_eq!(store.snapshot().len(), 1);
        Ok(())
    }

    #[test]
    fn unsubscribe_stops_notifications() -> Result<()> {
        let mut store = store_with(vec![row("A", 2020, 3)])?;
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let id = store.subscribe(move |_| *counter.borrow_mut() += 1);

        store.dispatch(StoreAction::Sort {
            column: "name".to_owned(),
            descending: false,
        })?;
        assert!(store.unsubscribe(id));
        store.dispatch(StoreAction::Sort {
            column: "name".to_owned(),
            descending: true,
        })?;
        assert_eq!(*calls.borrow(), 1);
        Ok(())
    }
}
