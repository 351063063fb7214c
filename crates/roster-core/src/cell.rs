//! Spreadsheet cell values and their normalisation to stored text.
//!
//! The record table is text-only. Every value read from a spreadsheet passes
//! through [`CellValue::normalize`] before it is written:
//!
//! - dates and date-times become `YYYY-MM-DD`, times of day `HH:MM:SS`;
//! - empty cells, error cells and NA markers become NULL;
//! - integral numbers lose their fractional part (`90.0` → `"90"`);
//! - everything else keeps its natural string form.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Text that spreadsheet tools conventionally use for "no value".
pub const NA_MARKERS: &[&str] = &[
  "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
  "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// A single decoded spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
  Empty,
  Text(String),
  Int(i64),
  Float(f64),
  Bool(bool),
  Date(NaiveDate),
  DateTime(NaiveDateTime),
  /// A time of day with no date part.
  Time(NaiveTime),
  /// A formula error such as `#DIV/0!`.
  Error(String),
}

impl CellValue {
  /// The text stored for this cell, or `None` for NULL.
  pub fn normalize(&self) -> Option<String> {
    match self {
      Self::Empty | Self::Error(_) => None,
      Self::Text(s) if is_missing(s) => None,
      Self::Text(s) => Some(s.clone()),
      Self::Int(i) => Some(i.to_string()),
      Self::Float(f) if !f.is_finite() => None,
      Self::Float(f) => Some(format_number(*f)),
      Self::Bool(b) => Some(b.to_string()),
      Self::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
      Self::DateTime(dt) => Some(dt.date().format(DATE_FORMAT).to_string()),
      Self::Time(t) => Some(t.format(TIME_FORMAT).to_string()),
    }
  }

  /// The canonical primary-key form of this cell: normalised, then trimmed.
  /// `None` when the cell cannot identify a student.
  pub fn canonical_identifier(&self) -> Option<String> {
    self
      .normalize()
      .map(|s| s.trim().to_owned())
      .filter(|s| !s.is_empty())
  }
}

impl From<&str> for CellValue {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

/// Normalise a value typed into the detail editor: trimmed, blank → NULL.
pub fn edited_value(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn is_missing(s: &str) -> bool { s.trim().is_empty() || NA_MARKERS.contains(&s) }

fn format_number(f: f64) -> String {
  if f.fract() == 0.0 && f.abs() < 1e15 {
    format!("{}", f as i64)
  } else {
    f.to_string()
  }
}
