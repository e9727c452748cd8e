//! Ignore Rules
//!
//! Parses `table_name.identifier.name` clauses into a per-table index of
//! elements that must not trigger a mismatch.

use crate::error::IgnoreClauseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Category of schema element an ignore clause targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identifier {
    /// Primary key
    Pk,
    /// Foreign key
    Fk,
    /// Index
    Idx,
    /// Column
    Col,
}

impl Identifier {
    /// All categories, in the order used by error messages.
    pub const ALL: [Identifier; 4] = [Identifier::Pk, Identifier::Fk, Identifier::Idx, Identifier::Col];

    pub fn as_str(&self) -> &'static str {
        match self {
            Identifier::Pk => "pk",
            Identifier::Fk => "fk",
            Identifier::Idx => "idx",
            Identifier::Col => "col",
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Identifier {
    type Err = IgnoreClauseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| IgnoreClauseError::InvalidIdentifier(s.to_string()))
    }
}

/// Ignored names for one table, one ordered bucket per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIgnores {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pk: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fk: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub idx: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub col: Vec<String>,
}

impl TableIgnores {
    pub fn bucket(&self, identifier: Identifier) -> &[String] {
        match identifier {
            Identifier::Pk => &self.pk,
            Identifier::Fk => &self.fk,
            Identifier::Idx => &self.idx,
            Identifier::Col => &self.col,
        }
    }

    fn bucket_mut(&mut self, identifier: Identifier) -> &mut Vec<String> {
        match identifier {
            Identifier::Pk => &mut self.pk,
            Identifier::Fk => &mut self.fk,
            Identifier::Idx => &mut self.idx,
            Identifier::Col => &mut self.col,
        }
    }
}

/// A parsed, immutable set of ignore rules keyed by table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IgnoreRuleSet {
    tables: BTreeMap<String, TableIgnores>,
}

impl IgnoreRuleSet {
    /// Parse every clause, failing on the first invalid one.
    ///
    /// Nothing is returned unless all clauses are well formed, so a
    /// partially built set is never observable.
    pub fn parse<I, S>(clauses: I) -> Result<Self, IgnoreClauseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tables: BTreeMap<String, TableIgnores> = BTreeMap::new();

        for clause in clauses {
            let (table, identifier, name) = parse_clause(clause.as_ref())?;
            tables
                .entry(table)
                .or_default()
                .bucket_mut(identifier)
                .push(name);
        }

        Ok(Self { tables })
    }

    /// An empty rule set; nothing is ignored.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Names ignored for `(table, identifier)`, in clause order.
    pub fn get(&self, table: &str, identifier: Identifier) -> &[String] {
        self.tables
            .get(table)
            .map(|t| t.bucket(identifier))
            .unwrap_or(&[])
    }

    pub fn is_ignored(&self, table: &str, identifier: Identifier, name: &str) -> bool {
        self.get(table, identifier).iter().any(|n| n == name)
    }

    /// Per-table buckets, if the table has any rule.
    pub fn table(&self, table: &str) -> Option<&TableIgnores> {
        self.tables.get(table)
    }

    /// Tables that carry at least one rule.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

fn parse_clause(clause: &str) -> Result<(String, Identifier, String), IgnoreClauseError> {
    let malformed = || IgnoreClauseError::MalformedClause(clause.to_string());

    let segments: Vec<&str> = clause.split('.').map(str::trim).collect();
    let [table, identifier, name] = segments.as_slice() else {
        return Err(malformed());
    };

    if table.is_empty() || identifier.is_empty() || name.is_empty() {
        return Err(malformed());
    }

    let identifier: Identifier = identifier.parse()?;

    Ok((table.to_string(), identifier, name.to_string()))
}
