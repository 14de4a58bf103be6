// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::{ColumnKind, FieldMap, Scalar, Schema};

/// Raw text submitted by a form, keyed by column.
pub type FormValues = BTreeMap<String, String>;

pub fn current_year() -> i32 {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .year()
}

pub fn coerce(kind: ColumnKind, raw: &str) -> Scalar {
    coerce_with_year(kind, raw, current_year())
}

/// Never fails: unparseable years become `fallback_year`, unparseable ratings become 0.
pub fn coerce_with_year(kind: ColumnKind, raw: &str, fallback_year: i32) -> Scalar {
    match kind {
        ColumnKind::Text | ColumnKind::Textarea | ColumnKind::Suggest => Scalar::from(raw),
        ColumnKind::Year => {
            Scalar::Int(parse_leading_int(raw).unwrap_or_else(|| i64::from(fallback_year)))
        }
        ColumnKind::Rating => Scalar::Int(parse_leading_int(raw).unwrap_or(0)),
    }
}

/// Text form of a stored value, as a form or editor would prefill it.
pub fn format_value(kind: ColumnKind, value: &Scalar) -> String {
    match (kind, value) {
        (ColumnKind::Year | ColumnKind::Rating, Scalar::Text(raw)) => parse_leading_int(raw)
            .map(|value| value.to_string())
            .unwrap_or_default(),
        _ => value.display(),
    }
}

/// Leading-integer parse: optional whitespace and sign, then digits; trailing text is ignored.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .bytes()
        .position(|byte| !byte.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Coerces every schema column present in `form`. Columns the form omits are left out.
pub fn coerce_form(schema: &Schema, form: &FormValues, fallback_year: i32) -> FieldMap {
    schema
        .columns()
        .iter()
        .filter_map(|column| {
            form.get(&column.key).map(|raw| {
                (
                    column.key.clone(),
                    coerce_with_year(column.kind, raw, fallback_year),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{coerce, coerce_with_year, current_year, format_value, parse_leading_int};
    use crate::{ColumnKind, Scalar};

    #[test]
    fn year_parses_or_falls_back_to_current_year() {
        assert_eq!(coerce(ColumnKind::Year, "1999"), Scalar::Int(1999));
        assert_eq!(
            coerce(ColumnKind::Year, ""),
            Scalar::Int(i64::from(current_year()))
        );
        assert_eq!(
            coerce_with_year(ColumnKind::Year, "vintage", 2024),
            Scalar::Int(2024)
        );
    }

    #[test]
    fn rating_falls_back_to_zero_without_clamping() {
        assert_eq!(coerce(ColumnKind::Rating, "4"), Scalar::Int(4));
        assert_eq!(coerce(ColumnKind::Rating, "abc"), Scalar::Int(0));
        assert_eq!(coerce(ColumnKind::Rating, "9"), Scalar::Int(9));
    }

    #[test]
    fn text_kinds_are_identity() {
        for kind in [ColumnKind::Text, ColumnKind::Textarea, ColumnKind::Suggest] {
            assert_eq!(coerce(kind, " 12 "), Scalar::from(" 12 "));
        }
    }

    #[test]
    fn leading_int_ignores_trailing_text() {
        assert_eq!(parse_leading_int("  42abc"), Some(42));
        assert_eq!(parse_leading_int("-7"), Some(-7));
        assert_eq!(parse_leading_int("+3"), Some(3));
        assert_eq!(parse_leading_int("x1"), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("99999999999999999999"), None);
    }

    #[test]
    fn format_value_normalizes_numeric_text() {
        assert_eq!(format_value(ColumnKind::Year, &Scalar::Int(2015)), "2015");
        assert_eq!(format_value(ColumnKind::Rating, &Scalar::from("3 stars")), "3");
        assert_eq!(format_value(ColumnKind::Text, &Scalar::from("Merlot")), "Merlot");
    }
}
