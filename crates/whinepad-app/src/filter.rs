// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{Record, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterScope {
    /// Every schema column, shown or not.
    #[default]
    All,
    Visible,
}

impl FilterScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Visible => "visible",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "visible" => Some(Self::Visible),
            _ => None,
        }
    }
}

/// Case-insensitive substring match against the text form of the record's schema fields.
/// An empty needle matches everything; fields absent from the record never match.
pub fn matches(schema: &Schema, scope: FilterScope, record: &Record, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let needle = needle.to_lowercase();
    schema
        .columns()
        .iter()
        .filter(|column| scope == FilterScope::All || column.visible)
        .filter_map(|column| record.get(&column.key))
        .any(|value| value.display().to_lowercase().contains(&needle))
}

/// Positions (in collection order) of the records that pass the filter.
pub fn matching_positions(
    schema: &Schema,
    scope: FilterScope,
    records: &[Record],
    needle: &str,
) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| matches(schema, scope, record, needle))
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FilterScope, matches, matching_positions};
    use crate::{Column, ColumnKind, FieldMap, Record, RecordId, Scalar, Schema};

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("name", "Name", ColumnKind::Text).visible(),
            Column::new("year", "Year", ColumnKind::Year).visible(),
            Column::new("comments", "Comments", ColumnKind::Textarea),
        ])
        .expect("valid schema")
    }

    fn record(id: u64, name: &str, year: i64, comments: &str) -> Record {
        let fields: FieldMap = [
            ("name".to_owned(), Scalar::from(name)),
            ("year".to_owned(), Scalar::Int(year)),
            ("comments".to_owned(), Scalar::from(comments)),
        ]
        .into_iter()
        .collect();
        Record::new(RecordId::new(id), fields)
    }

    #[test]
    fn empty_needle_matches_everything() {
        let schema = schema();
        assert!(matches(&schema, FilterScope::All, &record(0, "", 0, ""), ""));
    }

    #[test]
    fn match_is_case_insensitive_and_covers_numbers() {
        let schema = schema();
        let row = record(0, "Chateau React", 2013, "");
        assert!(matches(&schema, FilterScope::All, &row, "chATeau"));
        assert!(matches(&schema, FilterScope::All, &row, "201"));
        assert!(!matches(&schema, FilterScope::All, &row, "merlot"));
    }

    #[test]
    fn hidden_columns_only_count_for_all_scope() {
        let schema = schema();
        let row = record(0, "Vint.js", 2021, "Lodi? Again!");
        assert!(matches(&schema, FilterScope::All, &row, "lodi"));
        assert!(!matches(&schema, FilterScope::Visible, &row, "lodi"));
    }

    #[test]
    fn matching_positions_keep_collection_order() {
        let schema = schema();
        let rows = vec![
            record(0, "red one", 2000, ""),
            record(1, "white", 2001, ""),
            record(2, "Red two", 2002, ""),
        ];
        assert_eq!(
            matching_positions(&schema, FilterScope::All, &rows, "red"),
            vec![0, 2]
        );
        assert!(matching_positions(&schema, FilterScope::All, &rows, "rosé").is_empty());
    }
}
