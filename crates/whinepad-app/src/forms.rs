// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::coerce::{FormValues, format_value};
use crate::{ColumnKind, Record, Schema};

/// Field values a dialog's form is holding until confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDraft {
    values: FormValues,
    readonly: bool,
}

impl FormDraft {
    /// Empty inputs: years start at `current_year`, ratings at zero.
    pub fn blank(schema: &Schema, current_year: i32) -> Self {
        let values = schema
            .columns()
            .iter()
            .map(|column| {
                let initial = match column.kind {
                    ColumnKind::Year => current_year.to_string(),
                    ColumnKind::Rating => "0".to_owned(),
                    ColumnKind::Text | ColumnKind::Textarea | ColumnKind::Suggest => String::new(),
                };
                (column.key.clone(), initial)
            })
            .collect();
        Self {
            values,
            readonly: false,
        }
    }

    pub fn prefilled(schema: &Schema, record: &Record) -> Self {
        let values = schema
            .columns()
            .iter()
            .map(|column| {
                let text = record
                    .get(&column.key)
                    .map(|value| format_value(column.kind, value))
                    .unwrap_or_default();
                (column.key.clone(), text)
            })
            .collect();
        Self {
            values,
            readonly: false,
        }
    }

    pub fn readonly(schema: &Schema, record: &Record) -> Self {
        Self {
            readonly: true,
            ..Self::prefilled(schema, record)
        }
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, schema: &Schema, key: &str, value: &str) -> Result<()> {
        if self.readonly {
            bail!("form is read-only -- open the edit dialog to change values");
        }
        if schema.column(key).is_none() {
            bail!("unknown field {key:?} -- use one of: {}", field_list(schema));
        }
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn into_values(self) -> FormValues {
        self.values
    }

    /// Label/value pairs in schema order. Read-only forms skip empty fields.
    pub fn rows<'a>(&'a self, schema: &'a Schema) -> Vec<(&'a str, &'a str)> {
        schema
            .columns()
            .iter()
            .filter_map(|column| {
                let value = self.get(&column.key).unwrap_or_default();
                let unset = value.is_empty() || (column.kind.is_numeric() && value == "0");
                if self.readonly && unset {
                    return None;
                }
                Some((column.label.as_str(), value))
            })
            .collect()
    }
}

fn field_list(schema: &Schema) -> String {
    schema.keys().collect::<Vec<_>>().join(", ")
}
