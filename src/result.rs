//! Comparison results
//!
//! `info` carries everything learned during one comparison run; `errors` is
//! the subset that makes the two schemas differ. Both serialize to plain JSON
//! with string keys and can be dumped independently.

use crate::error::AppResult;
use crate::introspection::{Column, ForeignKey, Index, PrimaryKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// A value seen on both sides of the comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sides<T> {
    pub left: T,
    pub right: T,
}

/// Table names, as seen by each side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablesInfo {
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub left_only: Vec<String>,
    pub right_only: Vec<String>,
    pub common: Vec<String>,
}

/// The same element, defined differently on each side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementChange<T> {
    pub key: String,
    pub left: T,
    pub right: T,
}

/// Per-category comparison of one table's elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDiff<T> {
    pub left_only: Vec<T>,
    pub right_only: Vec<T>,
    pub common: Vec<T>,
    pub diff: Vec<ElementChange<T>>,
    /// Elements left out of the comparison by an ignore rule.
    #[serde(default)]
    pub ignored: Vec<String>,
}

impl<T> Default for ElementDiff<T> {
    fn default() -> Self {
        Self {
            left_only: Vec::new(),
            right_only: Vec::new(),
            common: Vec::new(),
            diff: Vec::new(),
            ignored: Vec::new(),
        }
    }
}

impl<T: Clone> ElementDiff<T> {
    pub fn has_mismatch(&self) -> bool {
        !(self.left_only.is_empty() && self.right_only.is_empty() && self.diff.is_empty())
    }

    fn mismatches(&self) -> Option<ElementErrors<T>> {
        self.has_mismatch().then(|| ElementErrors {
            left_only: self.left_only.clone(),
            right_only: self.right_only.clone(),
            diff: self.diff.clone(),
        })
    }
}

/// Everything compared for a table present on both sides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableData {
    pub pk: ElementDiff<PrimaryKey>,
    pub fk: ElementDiff<ForeignKey>,
    pub idx: ElementDiff<Index>,
    pub col: ElementDiff<Column>,
}

/// Diagnostic detail of one comparison run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uris: Option<Sides<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksums: Option<Sides<String>>,
    pub tables: TablesInfo,
    pub tables_data: BTreeMap<String, TableData>,
}

impl CompareInfo {
    /// Reduce the info to what actually differs.
    ///
    /// `left`, `right`, `common` and `ignored` are dropped, then every empty
    /// list, category and table. `uris` is kept only next to real mismatches.
    pub fn compile_errors(&self) -> CompareErrors {
        let tables = (!self.tables.left_only.is_empty() || !self.tables.right_only.is_empty())
            .then(|| TablesErrors {
                left_only: self.tables.left_only.clone(),
                right_only: self.tables.right_only.clone(),
            });

        let tables_data: BTreeMap<String, TableErrors> = self
            .tables_data
            .iter()
            .filter_map(|(name, data)| {
                let errors = TableErrors {
                    pk: data.pk.mismatches(),
                    fk: data.fk.mismatches(),
                    idx: data.idx.mismatches(),
                    col: data.col.mismatches(),
                };
                (!errors.is_empty()).then(|| (name.clone(), errors))
            })
            .collect();

        let mut errors = CompareErrors {
            uris: None,
            tables,
            tables_data,
        };
        if !errors.is_empty() {
            errors.uris = self.uris.clone();
        }
        errors
    }
}

/// Table presence mismatches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablesErrors {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub left_only: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub right_only: Vec<String>,
}

/// Mismatches within one category of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementErrors<T> {
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub left_only: Vec<T>,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub right_only: Vec<T>,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<ElementChange<T>>,
}

/// Mismatches of one table, by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableErrors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk: Option<ElementErrors<PrimaryKey>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk: Option<ElementErrors<ForeignKey>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idx: Option<ElementErrors<Index>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<ElementErrors<Column>>,
}

impl TableErrors {
    pub fn is_empty(&self) -> bool {
        self.pk.is_none() && self.fk.is_none() && self.idx.is_none() && self.col.is_none()
    }
}

/// Every unignored mismatch, nested by table then category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareErrors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uris: Option<Sides<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<TablesErrors>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tables_data: BTreeMap<String, TableErrors>,
}

impl CompareErrors {
    /// No mismatch at all. `uris` alone never counts as one.
    pub fn is_empty(&self) -> bool {
        self.tables.is_none() && self.tables_data.is_empty()
    }
}

/// Outcome of one comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareResult {
    pub info: CompareInfo,
    pub errors: CompareErrors,
}

impl CompareResult {
    pub fn new(info: CompareInfo, errors: CompareErrors) -> Self {
        Self { info, errors }
    }

    /// True iff no unignored structural divergence was found.
    pub fn is_match(&self) -> bool {
        self.errors.is_empty()
    }

    /// Write `info` as pretty JSON to `path`, creating or truncating it.
    pub fn dump_info(&self, path: impl AsRef<Path>) -> AppResult<()> {
        dump_to_file(&self.info, path.as_ref())
    }

    /// Write `errors` as pretty JSON to `path`, creating or truncating it.
    pub fn dump_errors(&self, path: impl AsRef<Path>) -> AppResult<()> {
        dump_to_file(&self.errors, path.as_ref())
    }

    pub fn write_info<W: Write>(&self, writer: W) -> AppResult<()> {
        write_json(&self.info, writer)
    }

    pub fn write_errors<W: Write>(&self, writer: W) -> AppResult<()> {
        write_json(&self.errors, writer)
    }
}

fn write_json<T: Serialize, W: Write>(value: &T, writer: W) -> AppResult<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn dump_to_file<T: Serialize>(value: &T, path: &Path) -> AppResult<()> {
    let file = File::create(path)?;
    write_json(value, file)?;
    debug!("Dumped comparison output to {}", path.display());
    Ok(())
}

/// Read back a document written by one of the dump functions.
pub fn load_dump<T: DeserializeOwned>(path: impl AsRef<Path>) -> AppResult<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
