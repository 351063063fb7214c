//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are written as RFC 3339 strings. Databases from the earlier
//! desktop tool hold naive `YYYY-MM-DD HH:MM:SS` stamps; those are read as
//! UTC. Dynamic column names are always spliced into SQL through
//! [`quote_ident`].

use chrono::{DateTime, NaiveDateTime, Utc};
use roster_core::{category::Category, record::ColumnInfo};
use rusqlite::types::ValueRef;

use crate::{Error, Result};

const LEGACY_DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Quote a column or table name for interpolation into SQL.
pub fn quote_ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

/// Quote and comma-join a list of names.
pub fn quote_list<S: AsRef<str>>(names: &[S]) -> String {
  names
    .iter()
    .map(|n| quote_ident(n.as_ref()))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(s, LEGACY_DT_FORMAT)
    .map(|naive| naive.and_utc())
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Cells ───────────────────────────────────────────────────────────────────

/// Read a record cell as text. Columns are declared `TEXT`, but older files
/// may hold numbers; those are rendered rather than rejected.
pub fn cell_text(value: ValueRef<'_>) -> Option<String> {
  match value {
    ValueRef::Null => None,
    ValueRef::Integer(i) => Some(i.to_string()),
    ValueRef::Real(f) => Some(f.to_string()),
    ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
      Some(String::from_utf8_lossy(bytes).into_owned())
    }
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `column_categories` row.
pub struct RawCategory {
  pub name:       String,
  pub created_at: Option<String>,
}

impl RawCategory {
  pub fn into_category(self) -> Result<Category> {
    let created_at = self
      .created_at
      .as_deref()
      .map(decode_dt)
      .transpose()?
      .unwrap_or_default();
    Ok(Category { name: self.name, created_at })
  }
}

/// A `students` column joined with its `column_history` row.
pub struct RawColumn {
  pub name:       String,
  pub first_seen: Option<String>,
}

impl RawColumn {
  /// An unreadable first-seen stamp is dropped rather than failing the listing.
  pub fn into_column(self) -> ColumnInfo {
    let first_seen = self.first_seen.as_deref().and_then(|raw| match decode_dt(raw) {
      Ok(dt) => Some(dt),
      Err(error) => {
        tracing::warn!(column = %self.name, %error, "ignoring unreadable first-seen time");
        None
      }
    });
    ColumnInfo { name: self.name, first_seen }
  }
}
