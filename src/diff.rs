//! Schema Diff Engine
//!
//! Compares two schema snapshots category by category. Every comparison is
//! keyed (set semantics), so element order inside a snapshot never matters,
//! except for the column order of a primary key, which is part of its
//! definition.

use crate::error::AppResult;
use crate::ignore::{Identifier, IgnoreRuleSet};
use crate::introspection::{Column, ForeignKey, Index, PrimaryKey, SchemaSnapshot, Table};
use crate::result::{CompareInfo, CompareResult, ElementChange, ElementDiff, Sides, TableData, TablesInfo};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// An element compared by key within one category
trait Keyed: Clone {
    /// Identity of the element inside its table
    fn key(&self) -> String;

    /// Whether two elements sharing a key are defined the same way
    fn same_definition(&self, other: &Self) -> bool;
}

impl Keyed for Column {
    fn key(&self) -> String {
        self.name.clone()
    }

    fn same_definition(&self, other: &Self) -> bool {
        self.data_type == other.data_type && self.nullable == other.nullable
    }
}

/// Foreign keys are identified by what they constrain, never by their name;
/// the name only matters to ignore rules.
impl Keyed for ForeignKey {
    fn key(&self) -> String {
        self.signature()
    }

    fn same_definition(&self, _other: &Self) -> bool {
        true
    }
}

impl Keyed for Index {
    fn key(&self) -> String {
        self.name.clone()
    }

    fn same_definition(&self, other: &Self) -> bool {
        self.columns == other.columns && self.unique == other.unique
    }
}

/// The diff engine that compares schema snapshots
pub struct DiffEngine<'a> {
    rules: &'a IgnoreRuleSet,
    ignore_tables: BTreeSet<String>,
    uris: Option<Sides<String>>,
}

impl<'a> DiffEngine<'a> {
    pub fn new(rules: &'a IgnoreRuleSet) -> Self {
        Self {
            rules,
            ignore_tables: BTreeSet::new(),
            uris: None,
        }
    }

    /// Leave these tables out of the comparison entirely, on both sides.
    pub fn with_ignored_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_tables.extend(tables.into_iter().map(Into::into));
        self
    }

    /// Record where each snapshot came from in the result.
    pub fn with_uris(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.uris = Some(Sides {
            left: left.into(),
            right: right.into(),
        });
        self
    }

    /// Compare two snapshots.
    ///
    /// Mismatches are never errors. This only fails when a snapshot breaks
    /// the structural contract of [`SchemaSnapshot::validate`].
    pub fn compare(&self, left: &SchemaSnapshot, right: &SchemaSnapshot) -> AppResult<CompareResult> {
        left.validate()?;
        right.validate()?;

        let tables = self.tables_info(left, right);

        for table in self.rules.tables() {
            if !left.tables.contains_key(table) && !right.tables.contains_key(table) {
                warn!("Ignore rules target table '{}', which exists on neither side", table);
            }
        }

        let mut tables_data = BTreeMap::new();
        for name in &tables.common {
            // Both lookups hold: `common` is built from the two key sets
            if let (Some(l), Some(r)) = (left.tables.get(name), right.tables.get(name)) {
                tables_data.insert(name.clone(), self.diff_table(l, r));
            }
        }

        let info = CompareInfo {
            uris: self.uris.clone(),
            checksums: Some(Sides {
                left: left.checksum(),
                right: right.checksum(),
            }),
            tables,
            tables_data,
        };
        let errors = info.compile_errors();
        let result = CompareResult::new(info, errors);

        info!(
            "Compared {} left / {} right tables: {}",
            left.tables.len(),
            right.tables.len(),
            if result.is_match() { "match" } else { "mismatch" }
        );

        Ok(result)
    }

    /// Table presence on each side, minus the ignored tables.
    fn tables_info(&self, left: &SchemaSnapshot, right: &SchemaSnapshot) -> TablesInfo {
        let visible = |snapshot: &SchemaSnapshot| -> BTreeSet<String> {
            snapshot
                .tables
                .keys()
                .filter(|name| !self.ignore_tables.contains(*name))
                .cloned()
                .collect()
        };
        let left_keys = visible(left);
        let right_keys = visible(right);

        TablesInfo {
            left: left_keys.iter().cloned().collect(),
            right: right_keys.iter().cloned().collect(),
            left_only: left_keys.difference(&right_keys).cloned().collect(),
            right_only: right_keys.difference(&left_keys).cloned().collect(),
            common: left_keys.intersection(&right_keys).cloned().collect(),
        }
    }

    fn diff_table(&self, left: &Table, right: &Table) -> TableData {
        let table = left.name.as_str();
        debug!("Comparing table {}", table);

        let col = {
            let ignores = self.rules.get(table, Identifier::Col);
            let matcher = |c: &Column| ignores.iter().find(|n| **n == c.name).cloned();
            diff_keyed(&left.columns, &right.columns, matcher)
        };

        let fk = {
            let ignores = self.rules.get(table, Identifier::Fk);
            let matcher = |fk: &ForeignKey| {
                ignores
                    .iter()
                    .find(|n| fk.name.as_deref() == Some(n.as_str()) || fk.columns.contains(*n))
                    .cloned()
            };
            diff_keyed(&left.foreign_keys, &right.foreign_keys, matcher)
        };

        let idx = {
            let ignores = self.rules.get(table, Identifier::Idx);
            let matcher = |i: &Index| ignores.iter().find(|n| **n == i.name).cloned();
            diff_keyed(&left.indexes, &right.indexes, matcher)
        };

        let pk = diff_primary_keys(
            left.primary_key.as_ref(),
            right.primary_key.as_ref(),
            self.rules.get(table, Identifier::Pk),
        );

        let data = TableData { pk, fk, idx, col };

        for (identifier, ignored) in [
            (Identifier::Pk, &data.pk.ignored),
            (Identifier::Fk, &data.fk.ignored),
            (Identifier::Idx, &data.idx.ignored),
            (Identifier::Col, &data.col.ignored),
        ] {
            if !ignored.is_empty() {
                debug!("{}.{}: suppressed {:?}", table, identifier, ignored);
            }
        }

        data
    }
}

/// Key both sides, drop what the ignore matcher claims, then compare by key.
fn diff_keyed<T, F>(left: &[T], right: &[T], ignore_match: F) -> ElementDiff<T>
where
    T: Keyed,
    F: Fn(&T) -> Option<String>,
{
    let mut ignored = BTreeSet::new();
    let mut keep = |items: &[T]| -> BTreeMap<String, T> {
        items
            .iter()
            .filter(|item| match ignore_match(*item) {
                Some(rule) => {
                    ignored.insert(rule);
                    false
                }
                None => true,
            })
            .map(|item| (item.key(), item.clone()))
            .collect()
    };

    let left = keep(left);
    let right = keep(right);

    let mut diff = diff_maps(left, right);
    diff.ignored = ignored.into_iter().collect();
    diff
}

fn diff_maps<T: Keyed>(left: BTreeMap<String, T>, mut right: BTreeMap<String, T>) -> ElementDiff<T> {
    let mut result = ElementDiff::default();

    for (key, l) in left {
        match right.remove(&key) {
            None => result.left_only.push(l),
            Some(r) if l.same_definition(&r) => result.common.push(l),
            Some(r) => result.diff.push(ElementChange { key, left: l, right: r }),
        }
    }
    result.right_only.extend(right.into_values());

    result
}

/// Primary keys compare as a unit, on their ordered column list.
///
/// A rule naming the constraint drops the key altogether; a rule naming a
/// column drops that column from the key before comparing.
fn diff_primary_keys(
    left: Option<&PrimaryKey>,
    right: Option<&PrimaryKey>,
    ignores: &[String],
) -> ElementDiff<PrimaryKey> {
    let mut ignored = BTreeSet::new();
    let mut strip = |pk: &PrimaryKey| -> Option<PrimaryKey> {
        if let Some(name) = pk.name.as_ref().filter(|n| ignores.contains(*n)) {
            ignored.insert(name.clone());
            return None;
        }
        let columns: Vec<String> = pk
            .columns
            .iter()
            .filter(|c| {
                let skip = ignores.contains(*c);
                if skip {
                    ignored.insert((*c).clone());
                }
                !skip
            })
            .cloned()
            .collect();
        (!columns.is_empty()).then(|| PrimaryKey {
            name: pk.name.clone(),
            columns,
        })
    };

    let left = left.and_then(&mut strip);
    let right = right.and_then(&mut strip);

    let mut result = ElementDiff::default();
    match (left, right) {
        (None, None) => {}
        (Some(l), None) => result.left_only.push(l),
        (None, Some(r)) => result.right_only.push(r),
        (Some(l), Some(r)) if l.columns == r.columns => result.common.push(l),
        (Some(l), Some(r)) => {
            let key = l.name.clone().unwrap_or_else(|| l.columns.join(","));
            result.diff.push(ElementChange { key, left: l, right: r });
        }
    }
    result.ignored = ignored.into_iter().collect();
    result
}
