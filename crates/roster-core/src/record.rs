//! Student records, projections and row predicates.
//!
//! Records are schema-less: apart from the identifier every column is an
//! optional text value. A [`RecordSet`] is the tabular read model returned by
//! queries; a [`StudentRecord`] is the full detail of one student.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Well-known columns ──────────────────────────────────────────────────────

/// The primary-key column. Present on every record and never changed.
pub const IDENTIFIER: &str = "学号";

/// The column searched by the free-text name search.
pub const NAME_COLUMN: &str = "姓名";

/// Whether two column names refer to the same physical column.
///
/// SQLite resolves column names ASCII-case-insensitively, so the rest of the
/// system must as well.
pub fn same_column(a: &str, b: &str) -> bool { a.eq_ignore_ascii_case(b) }

/// Find the schema spelling of `name` in `columns`.
pub fn find_column<'a>(columns: &'a [String], name: &str) -> Option<&'a str> {
  columns
    .iter()
    .find(|c| same_column(c, name))
    .map(String::as_str)
}

/// Aliases SQLite gives the implicit row id. A user column with one of these
/// names would shadow it.
pub const RESERVED_COLUMNS: &[&str] = &["rowid", "oid", "_rowid_"];

/// Reject names that cannot become a column: blank, or a row-id alias.
pub fn check_column_name(name: &str) -> Result<()> {
  if name.trim().is_empty() || RESERVED_COLUMNS.iter().any(|r| same_column(r, name)) {
    return Err(Error::InvalidColumnName(name.to_owned()));
  }
  Ok(())
}

// ─── Columns ─────────────────────────────────────────────────────────────────

/// A column of the record table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
  pub name:       String,
  /// When an import first introduced the column. `None` for the identifier
  /// and for columns created outside the store.
  pub first_seen: Option<DateTime<Utc>>,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Column → value pairs supplied to an upsert. `None` writes NULL.
pub type Fields = BTreeMap<String, Option<String>>;

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Upserted {
  Inserted,
  Updated,
}

/// Every column of a single student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
  pub id:     String,
  /// All non-identifier columns, including null ones.
  pub fields: Fields,
}

impl StudentRecord {
  pub fn get(&self, column: &str) -> Option<&str> {
    self.fields.get(column).and_then(|v| v.as_deref())
  }
}

/// One row of a [`RecordSet`]. `values[i]` belongs to `columns[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
  pub id:     String,
  pub values: Vec<Option<String>>,
}

/// Records projected onto an ordered list of columns.
///
/// `columns[0]` is always [`IDENTIFIER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
  pub columns: Vec<String>,
  pub rows:    Vec<Row>,
}

impl RecordSet {
  pub fn empty(columns: Vec<String>) -> Self { Self { columns, rows: Vec::new() } }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn ids(&self) -> Vec<&str> { self.rows.iter().map(|r| r.id.as_str()).collect() }

  pub fn column_index(&self, column: &str) -> Option<usize> {
    self.columns.iter().position(|c| same_column(c, column))
  }

  /// The value of `column` in `row`, if the column is projected and non-null.
  pub fn value<'a>(&self, row: &'a Row, column: &str) -> Option<&'a str> {
    let idx = self.column_index(column)?;
    row.values.get(idx).and_then(|v| v.as_deref())
  }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

/// Row filter for [`crate::store::RosterStore::select`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
  All,
  /// `column` equals `value` exactly.
  Equals { column: String, value: String },
  /// `column` contains `needle`, ignoring case.
  Contains { column: String, needle: String },
}

impl Predicate {
  /// Free-text search over the name column.
  pub fn name_search(needle: impl Into<String>) -> Self {
    Self::Contains { column: NAME_COLUMN.to_owned(), needle: needle.into() }
  }

  pub fn column(&self) -> Option<&str> {
    match self {
      Self::All => None,
      Self::Equals { column, .. } | Self::Contains { column, .. } => Some(column),
    }
  }
}

/// Unicode case-insensitive substring test used by [`Predicate::Contains`].
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn row_id_aliases_are_not_column_names() {
    for name in ["rowid", "ROWID", "oid", "_RowId_", " ", ""] {
      assert!(matches!(check_column_name(name), Err(Error::InvalidColumnName(_))), "{name:?}");
    }
    assert!(check_column_name("rowid2").is_ok());
    assert!(check_column_name("姓名").is_ok());
  }

  #[test]
  fn contains_ignores_case_and_handles_cjk() {
    assert!(contains_ignore_case("李四", "四"));
    assert!(contains_ignore_case("Alice Liddell", "LIDD"));
    assert!(!contains_ignore_case("张三", "四"));
    assert!(contains_ignore_case("50%_done", "%_"));
  }

  #[test]
  fn record_set_value_lookup() {
    let set = RecordSet {
      columns: vec![IDENTIFIER.into(), "grade".into()],
      rows:    vec![Row {
        id:     "S001".into(),
        values: vec![Some("S001".into()), None],
      }],
    };
    let row = &set.rows[0];
    assert_eq!(set.value(row, IDENTIFIER), Some("S001"));
    assert_eq!(set.value(row, "GRADE"), None);
    assert_eq!(set.value(row, "missing"), None);
    assert_eq!(set.ids(), vec!["S001"]);
  }
}
