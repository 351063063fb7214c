//! Spreadsheet import: validation and dry-run planning.
//!
//! Importing is split in two so that the decision to overwrite data stays with
//! the caller:
//!
//! 1. [`crate::store::RosterStore::plan_import`] returns an [`ImportPlan`]
//!    describing new columns, overwritten columns and overwritten students.
//! 2. [`crate::store::RosterStore::commit_import`] applies the sheet, given an
//!    [`ImportApproval`] covering every kind of change the plan reported.
//!
//! This module holds the pure half of both steps.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{
  Error, IDENTIFIER, Result,
  cell::CellValue,
  record::{Fields, check_column_name, find_column, same_column},
};

static EMPTY_CELL: CellValue = CellValue::Empty;

/// How many overwritten identifiers a summary lists before eliding the rest.
pub const OVERWRITE_PREVIEW_LIMIT: usize = 10;

// ─── Sheet ───────────────────────────────────────────────────────────────────

/// A decoded worksheet: a header row and the data rows beneath it.
///
/// Rows may be shorter than the header; missing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
  pub columns: Vec<String>,
  pub rows:    Vec<Vec<CellValue>>,
}

impl Sheet {
  pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self { Self { columns, rows } }

  fn cell(row: &[CellValue], idx: usize) -> &CellValue { row.get(idx).unwrap_or(&EMPTY_CELL) }
}

// ─── Prepared rows ───────────────────────────────────────────────────────────

/// One sheet row, keyed and normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRow {
  pub id:     String,
  pub fields: Fields,
}

/// A sheet whose identifier column has been located and whose rows have been
/// normalised. Rows without an identifier are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImport {
  /// Declared non-identifier columns, in sheet order.
  pub columns:      Vec<String>,
  pub rows:         Vec<PreparedRow>,
  pub skipped_rows: usize,
}

impl PreparedImport {
  /// Fails with [`Error::MissingKeyColumn`], [`Error::InvalidColumnName`] or
  /// [`Error::NoValidRows`].
  pub fn from_sheet(sheet: &Sheet) -> Result<Self> {
    let key = sheet
      .columns
      .iter()
      .position(|c| c == IDENTIFIER)
      .ok_or(Error::MissingKeyColumn)?;

    let mut columns: Vec<(usize, String)> = Vec::new();
    for (idx, name) in sheet.columns.iter().enumerate() {
      if idx == key || same_column(name, IDENTIFIER) {
        continue;
      }
      check_column_name(name)?;
      if !columns.iter().any(|(_, c)| same_column(c, name)) {
        columns.push((idx, name.clone()));
      }
    }

    let mut rows = Vec::with_capacity(sheet.rows.len());
    let mut skipped_rows = 0;
    for row in &sheet.rows {
      let Some(id) = Sheet::cell(row, key).canonical_identifier() else {
        skipped_rows += 1;
        continue;
      };
      let fields = columns
        .iter()
        .map(|(idx, name)| (name.clone(), Sheet::cell(row, *idx).normalize()))
        .collect();
      rows.push(PreparedRow { id, fields });
    }

    if rows.is_empty() {
      return Err(Error::NoValidRows);
    }

    Ok(Self {
      columns: columns.into_iter().map(|(_, name)| name).collect(),
      rows,
      skipped_rows,
    })
  }

  /// Distinct identifiers in sheet order.
  pub fn ids(&self) -> Vec<String> {
    let mut seen = HashSet::new();
    self
      .rows
      .iter()
      .filter(|r| seen.insert(r.id.as_str()))
      .map(|r| r.id.clone())
      .collect()
  }

  /// Compare against the current schema and the identifiers already stored.
  pub fn plan(&self, existing_columns: &[String], existing_ids: &HashSet<String>) -> ImportPlan {
    let (overlapping_columns, new_columns): (Vec<String>, Vec<String>) = self
      .columns
      .iter()
      .cloned()
      .partition(|c| find_column(existing_columns, c).is_some());

    ImportPlan {
      valid_rows: self.rows.len(),
      skipped_rows: self.skipped_rows,
      new_columns,
      overlapping_columns,
      existing_ids: self
        .ids()
        .into_iter()
        .filter(|id| existing_ids.contains(id))
        .collect(),
    }
  }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// What committing an import would change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPlan {
  pub valid_rows:          usize,
  /// Rows dropped because their identifier cell was blank.
  pub skipped_rows:        usize,
  /// Columns the import will add to the schema.
  pub new_columns:         Vec<String>,
  /// Existing columns whose values the import will overwrite.
  pub overlapping_columns: Vec<String>,
  /// Incoming identifiers that are already stored.
  pub existing_ids:        Vec<String>,
}

impl ImportPlan {
  /// The approval that would let this plan through.
  pub fn required_approval(&self) -> ImportApproval {
    ImportApproval {
      add_new_columns:    !self.new_columns.is_empty(),
      overwrite_columns:  !self.overlapping_columns.is_empty(),
      overwrite_students: !self.existing_ids.is_empty(),
    }
  }

  /// Changes this plan makes that need confirmation, in prompt order.
  pub fn changes(&self) -> Vec<ChangeKind> {
    let required = self.required_approval();
    [
      (required.overwrite_columns, ChangeKind::OverwriteColumns),
      (required.add_new_columns, ChangeKind::NewColumns),
      (required.overwrite_students, ChangeKind::OverwriteStudents),
    ]
    .into_iter()
    .filter_map(|(needed, kind)| needed.then_some(kind))
    .collect()
  }

  /// Fail with [`Error::ImportDeclined`] for the first change `approval`
  /// does not cover.
  pub fn check(&self, approval: &ImportApproval) -> Result<()> {
    match self.changes().into_iter().find(|kind| !approval.allows(*kind)) {
      Some(kind) => Err(Error::ImportDeclined(kind)),
      None => Ok(()),
    }
  }

  /// Up to [`OVERWRITE_PREVIEW_LIMIT`] overwritten identifiers.
  pub fn existing_ids_preview(&self) -> &[String] {
    &self.existing_ids[..self.existing_ids.len().min(OVERWRITE_PREVIEW_LIMIT)]
  }
}

// ─── Approval ────────────────────────────────────────────────────────────────

/// A kind of change an import can make that needs the caller's consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
  NewColumns,
  OverwriteColumns,
  OverwriteStudents,
}

impl fmt::Display for ChangeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::NewColumns => "adding new columns",
      Self::OverwriteColumns => "overwriting existing columns",
      Self::OverwriteStudents => "overwriting existing students",
    })
  }
}

/// The caller's yes/no decision per [`ChangeKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportApproval {
  pub add_new_columns:    bool,
  pub overwrite_columns:  bool,
  pub overwrite_students: bool,
}

impl ImportApproval {
  pub fn all() -> Self {
    Self { add_new_columns: true, overwrite_columns: true, overwrite_students: true }
  }

  pub fn allows(&self, kind: ChangeKind) -> bool {
    match kind {
      ChangeKind::NewColumns => self.add_new_columns,
      ChangeKind::OverwriteColumns => self.overwrite_columns,
      ChangeKind::OverwriteStudents => self.overwrite_students,
    }
  }

  pub fn grant(&mut self, kind: ChangeKind) {
    match kind {
      ChangeKind::NewColumns => self.add_new_columns = true,
      ChangeKind::OverwriteColumns => self.overwrite_columns = true,
      ChangeKind::OverwriteStudents => self.overwrite_students = true,
    }
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Summary of a committed import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
  pub rows_imported:        usize,
  pub new_columns:          Vec<String>,
  pub overlapping_columns:  Vec<String>,
  pub overwritten_students: usize,
}
