// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use crate::ids::RecordId;

/// A stored cell value. Serialized untagged so the persisted form is a flat JSON map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    pub fn display(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    /// Natural ordering: integers numerically, text by code point, integers before text.
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(left), Self::Int(right)) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => left.cmp(right),
            (Self::Int(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Int(_)) => Ordering::Greater,
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

pub type FieldMap = BTreeMap<String, Scalar>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub fields: FieldMap,
}

impl Record {
    pub fn new(id: RecordId, fields: FieldMap) -> Self {
        Self { id, fields }
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.get(key)
    }

    pub fn display(&self, key: &str) -> String {
        self.get(key).map(Scalar::display).unwrap_or_default()
    }
}

/// Immutable view of the collection. Every committed mutation produces a new one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    records: Arc<Vec<Record>>,
}

impl Snapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn id_at(&self, index: usize) -> Option<RecordId> {
        self.records.get(index).map(|record| record.id)
    }

    pub fn to_vec(&self) -> Vec<Record> {
        self.records.as_ref().clone()
    }

    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

impl Deref for Snapshot {
    type Target = [Record];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortState {
    pub column: Option<String>,
    pub descending: bool,
}

impl SortState {
    /// Same column flips the direction, a new column starts ascending.
    pub fn toggled(&self, column: &str) -> Self {
        let descending = self.column.as_deref() == Some(column) && !self.descending;
        Self {
            column: Some(column.to_owned()),
            descending,
        }
    }

    pub fn marker_for(&self, column: &str) -> Option<&'static str> {
        if self.column.as_deref() != Some(column) {
            return None;
        }
        Some(if self.descending { " ↑" } else { " ↓" })
    }
}

/// Stable sort on one column. Records missing the column go last in both directions.
pub fn sort_records(records: &mut [Record], column: &str, descending: bool) {
    records.sort_by(|left, right| {
        match (left.get(column), right.get(column)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(left), Some(right)) => {
                let order = left.cmp_value(right);
                if descending { order.reverse() } else { order }
            }
        }
    });
}
