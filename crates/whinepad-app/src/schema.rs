// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::coerce::coerce_with_year;
use crate::{FieldMap, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    #[serde(alias = "input")]
    Text,
    Year,
    Rating,
    Suggest,
    Textarea,
}

impl ColumnKind {
    pub const ALL: [Self; 5] = [
        Self::Text,
        Self::Year,
        Self::Rating,
        Self::Suggest,
        Self::Textarea,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Year => "year",
            Self::Rating => "rating",
            Self::Suggest => "suggest",
            Self::Textarea => "textarea",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" | "input" => Some(Self::Text),
            "year" => Some(Self::Year),
            "rating" => Some(Self::Rating),
            "suggest" => Some(Self::Suggest),
            "textarea" => Some(Self::Textarea),
            _ => None,
        }
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Year | Self::Rating)
    }

    /// The rating widget owns its value, so the grid never opens a text editor for it.
    pub const fn inline_editable(self) -> bool {
        !matches!(self, Self::Rating)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Right,
    #[default]
    Center,
}

impl Align {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: ColumnKind,
    #[serde(default, alias = "show")]
    pub visible: bool,
    #[serde(default)]
    pub align: Align,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub samples: Vec<Scalar>,
}

impl Column {
    pub fn new(key: &str, label: &str, kind: ColumnKind) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            kind,
            visible: false,
            align: Align::default(),
            options: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn visible(mut self) -> Self {
        self.visible = true;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn samples<I, V>(mut self, samples: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        self.samples = samples.into_iter().map(Into::into).collect();
        self
    }

    fn sample_or_default(&self, index: usize, fallback_year: i32) -> Scalar {
        self.samples
            .get(index)
            .cloned()
            .unwrap_or_else(|| coerce_with_year(self.kind, "", fallback_year))
    }
}

/// Ordered, immutable column set. Loaded once per process and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            bail!("schema needs at least one column");
        }

        let mut seen = BTreeSet::new();
        for column in &columns {
            if column.key.trim().is_empty() {
                bail!("schema column keys must not be empty");
            }
            if column.label.trim().is_empty() {
                bail!("schema column `{}` needs a label", column.key);
            }
            if !seen.insert(column.key.as_str()) {
                bail!("schema column `{}` is defined twice", column.key);
            }
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.key.as_str())
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|column| column.visible)
    }

    /// The column used to name a record in prompts.
    pub fn title_column(&self) -> &Column {
        &self.columns[0]
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// One record built from each column's first sample.
    pub fn initial_record(&self, fallback_year: i32) -> FieldMap {
        self.sample_row(0, fallback_year)
    }

    /// One record per sample index, for demo sessions.
    pub fn sample_records(&self, fallback_year: i32) -> Vec<FieldMap> {
        let rows = self
            .columns
            .iter()
            .map(|column| column.samples.len())
            .max()
            .unwrap_or(0)
            .max(1);
        (0..rows)
            .map(|index| self.sample_row(index, fallback_year))
            .collect()
    }

    fn sample_row(&self, index: usize, fallback_year: i32) -> FieldMap {
        self.columns
            .iter()
            .map(|column| {
                (
                    column.key.clone(),
                    column.sample_or_default(index, fallback_year),
                )
            })
            .collect()
    }

    /// True when `fields` carries exactly this schema's keys.
    pub fn conforms(&self, fields: &FieldMap) -> bool {
        fields.len() == self.columns.len() && self.keys().all(|key| fields.contains_key(key))
    }
}

const GRAPES: [&str; 16] = [
    "Barbera",
    "Bordeaux Blend",
    "Cabernet Franc",
    "Cabernet Sauvignon",
    "Chardonnay",
    "Chenin Blanc",
    "Grenache",
    "Malbec",
    "Merlot",
    "Nebbiolo",
    "Pinot Noir",
    "Riesling",
    "Sangiovese",
    "Sauvignon Blanc",
    "Syrah",
    "Zinfandel",
];

impl Schema {
    /// The built-in wine tasting log.
    pub fn wine() -> Self {
        Self {
            columns: vec![
                Column::new("name", "Name", ColumnKind::Text)
                    .visible()
                    .align(Align::Left)
                    .samples(["$2 Chuck", "Chateau React", "Vint.js"]),
                Column::new("year", "Year", ColumnKind::Year)
                    .visible()
                    .samples([2015, 2013, 2021]),
                Column::new("grape", "Grape", ColumnKind::Suggest)
                    .visible()
                    .align(Align::Left)
                    .options(GRAPES)
                    .samples(["Merlot", "Bordeaux Blend", "Zinfandel"]),
                Column::new("rating", "Rating", ColumnKind::Rating)
                    .visible()
                    .samples([3, 1, 5]),
                Column::new("comments", "Comments", ColumnKind::Textarea).samples([
                    "Nice for the price",
                    "XML in my JS, orly??!",
                    "Lodi? Again!",
                ]),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Align, Column, ColumnKind, Schema};
    use crate::Scalar;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("name", "Name", ColumnKind::Text)
                .visible()
                .align(Align::Left)
                .samples(["$2 Chuck", "Chateau React"]),
            Column::new("year", "Year", ColumnKind::Year)
                .visible()
                .samples([2015, 2013, 2021]),
            Column::new("comments", "Comments", ColumnKind::Textarea),
        ])
        .expect("valid schema")
    }

    #[test]
    fn rejects_duplicate_and_empty_definitions() {
        assert!(Schema::new(Vec::new()).is_err());

        let duplicate = Schema::new(vec![
            Column::new("name", "Name", ColumnKind::Text),
            Column::new("name", "Other", ColumnKind::Text),
        ])
        .expect_err("duplicate keys should fail");
        assert!(duplicate.to_string().contains("defined twice"));

        assert!(Schema::new(vec![Column::new("name", " ", ColumnKind::Text)]).is_err());
    }

    #[test]
    fn visible_columns_skip_hidden_ones() {
        let schema = schema();
        let keys: Vec<&str> = schema.visible_columns().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "year"]);
        assert_eq!(schema.keys().count(), 3);
    }

    #[test]
    fn initial_record_uses_first_samples_and_defaults() {
        let record = schema().initial_record(2030);
        assert_eq!(record["name"], Scalar::from("$2 Chuck"));
        assert_eq!(record["year"], Scalar::Int(2015));
        assert_eq!(record["comments"], Scalar::from(""));
    }

    #[test]
    fn sample_records_cover_longest_sample_list() {
        let rows = schema().sample_records(2030);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["year"], Scalar::Int(2021));
        assert_eq!(rows[2]["name"], Scalar::from(""));
    }

    #[test]
    fn column_kind_parse_accepts_input_alias() {
        assert_eq!(ColumnKind::parse("input"), Some(ColumnKind::Text));
        for kind in ColumnKind::ALL {
            assert_eq!(ColumnKind::parse(kind.as_str()), Some(kind));
        }
        assert!(!ColumnKind::Rating.inline_editable());
        assert!(ColumnKind::Year.is_numeric());
    }

    #[test]
    fn builtin_wine_schema_is_valid() {
        let wine = Schema::wine();
        let rebuilt = Schema::new(wine.columns().to_vec()).expect("wine schema validates");
        assert_eq!(rebuilt, wine);
        assert_eq!(wine.title_column().key, "name");
        assert_eq!(wine.sample_records(2030).len(), 3);
        assert!(
            wine.column("grape")
                .is_some_and(|c| c.options.iter().any(|o| o == "Merlot"))
        );
    }

    #[test]
    fn conforms_requires_exact_key_set() {
        let schema = schema();
        let mut record = schema.initial_record(2030);
        assert!(schema.conforms(&record));
        record.insert("extra".to_owned(), Scalar::Int(1));
        assert!(!schema.conforms(&record));
    }
}
