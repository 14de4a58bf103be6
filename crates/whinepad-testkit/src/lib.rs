// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use whinepad_app::{CollectionStorage, FieldMap, Record, Scalar, Schema};

const GRAPES: [&str; 12] = [
    "Merlot",
    "Bordeaux Blend",
    "Zinfandel",
    "Pinot Noir",
    "Syrah",
    "Riesling",
    "Chardonnay",
    "Malbec",
    "Grenache",
    "Nebbiolo",
    "Sangiovese",
    "Tempranillo",
];

const ESTATE_PREFIXES: [&str; 10] = [
    "Chateau", "Domaine", "Bodega", "Casa", "Tenuta", "Quinta", "Weingut", "Clos", "Villa",
    "Cellars",
];
const ESTATE_NAMES: [&str; 14] = [
    "Rustacean",
    "Borrow",
    "Lifetime",
    "Cargo",
    "Trait",
    "Oxide",
    "Ferris",
    "Crate",
    "Tokio",
    "Serde",
    "Macro",
    "Iterator",
    "Closure",
    "Pattern",
];

const TASTING_WORDS: [&str; 24] = [
    "oaky",
    "bright",
    "jammy",
    "tannic",
    "smooth",
    "earthy",
    "crisp",
    "buttery",
    "peppery",
    "floral",
    "cherry",
    "plum",
    "vanilla",
    "leather",
    "tobacco",
    "mineral",
    "citrus",
    "finish",
    "nose",
    "palate",
    "balanced",
    "bold",
    "light",
    "again",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wine {
    pub name: String,
    pub year: i32,
    pub grape: String,
    pub rating: i32,
    pub comments: String,
}

impl Wine {
    /// Fields keyed by the built-in wine schema.
    pub fn fields(&self) -> FieldMap {
        FieldMap::from([
            ("name".to_owned(), Scalar::from(self.name.as_str())),
            ("year".to_owned(), Scalar::from(self.year)),
            ("grape".to_owned(), Scalar::from(self.grape.as_str())),
            ("rating".to_owned(), Scalar::from(self.rating)),
            ("comments".to_owned(), Scalar::from(self.comments.as_str())),
        ])
    }
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of plausible tasting-log rows.
#[derive(Debug, Clone)]
pub struct WineFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl WineFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn wine(&mut self) -> Wine {
        let name = format!(
            "{} {}",
            self.pick(&ESTATE_PREFIXES),
            self.pick(&ESTATE_NAMES)
        );
        Wine {
            name,
            year: self.int_range_i32(1990, 2024),
            grape: self.pick(&GRAPES).to_owned(),
            rating: self.int_range_i32(1, 5),
            comments: self.sentence(2, 6),
        }
    }

    pub fn rows(&mut self, count: usize) -> Vec<FieldMap> {
        (0..count).map(|_| self.wine().fields()).collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = i64::from(max) - i64::from(min) + 1;
        let offset = (self.rng.next_u64() % (span as u64)) as i64;
        (i64::from(min) + offset) as i32
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let count = self.int_range_i32(min_words as i32, max_words as i32) as usize;
        let mut sentence = (0..count)
            .map(|_| self.pick(&TASTING_WORDS))
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

/// Storage whose writes always fail, for checking that a failed save commits nothing.
#[derive(Debug, Clone, Default)]
pub struct FailingStorage {
    rows: Option<Vec<FieldMap>>,
    attempts: usize,
}

impl FailingStorage {
    pub fn with_rows(rows: Vec<FieldMap>) -> Self {
        Self {
            rows: Some(rows),
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl CollectionStorage for FailingStorage {
    fn load_collection(&mut self) -> Result<Option<Vec<FieldMap>>> {
        Ok(self.rows.clone())
    }

    fn save_collection(&mut self, _records: &[Record]) -> Result<()> {
        self.attempts += 1;
        bail!("disk full")
    }
}

pub fn wine_schema() -> Schema {
    Schema::wine()
}

/// Rows named by `names`, with the remaining wine columns filled from the first sample.
pub fn named_rows(names: &[&str]) -> Vec<FieldMap> {
    let schema = Schema::wine();
    names
        .iter()
        .map(|name| {
            let mut fields = schema.initial_record(fixture_year());
            fields.insert("name".to_owned(), Scalar::from(*name));
            fields
        })
        .collect()
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("whinepad.db");
    Ok((dir, db_path))
}

pub fn fixture_year() -> i32 {
    2026
}
