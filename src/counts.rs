//! Externally computed image counts per category id

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Images per category from the run that produced the published subset.
pub const SNAPSHOT_COUNTS: &[(u64, u64)] = &[
    (16, 10806),
    (17, 4768),
    (18, 5508),
    (19, 6587),
    (20, 9509),
    (21, 8147),
    (22, 5513),
    (23, 1294),
    (24, 5303),
    (25, 5131),
];

/// A single `ID=COUNT` entry as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountEntry {
    pub category_id: u64,
    pub count: u64,
}

impl FromStr for CountEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, count) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ID=COUNT, got {:?}", s))?;
        let category_id = id
            .trim()
            .parse()
            .map_err(|_| format!("invalid category id {:?}", id))?;
        let count = count
            .trim()
            .parse()
            .map_err(|_| format!("invalid count {:?}", count))?;
        Ok(Self { category_id, count })
    }
}

/// Externally computed number of images per category id.
///
/// Iteration follows insertion order. Inserting an id twice replaces the
/// earlier count without moving the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable {
    entries: Vec<(u64, u64)>,
}

impl CountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot() -> Self {
        SNAPSHOT_COUNTS.iter().copied().collect()
    }

    pub fn insert(&mut self, category_id: u64, count: u64) {
        match self.entries.iter_mut().find(|(id, _)| *id == category_id) {
            Some(entry) => entry.1 = count,
            None => self.entries.push((category_id, count)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a JSON object of the form `{"16": 10806, "17": 4768}`
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::InvalidCounts(format!("{}: {}", path.display(), e)))
    }
}

impl FromIterator<(u64, u64)> for CountTable {
    fn from_iter<I: IntoIterator<Item = (u64, u64)>>(iter: I) -> Self {
        let mut table = CountTable::new();
        for (id, count) in iter {
            table.insert(id, count);
        }
        table
    }
}

// JSON object keys are strings; ids are parsed while walking the object
impl<'de> Deserialize<'de> for CountTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CountTableVisitor;

        impl<'de> Visitor<'de> for CountTableVisitor {
            type Value = CountTable;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object mapping category ids to image counts")
            }

            fn visit_map<V>(self, mut map: V) -> Result<CountTable, V::Error>
            where
                V: MapAccess<'de>,
            {
                let mut table = CountTable::new();
                while let Some(key) = map.next_key::<String>()? {
                    let category_id = key.trim().parse::<u64>().map_err(|_| {
                        <V::Error as de::Error>::invalid_value(
                            de::Unexpected::Str(&key),
                            &"an integer id",
                        )
                    })?;
                    let count: u64 = map.next_value()?;
                    table.insert(category_id, count);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(CountTableVisitor)
    }
}
