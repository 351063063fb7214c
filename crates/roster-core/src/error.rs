//! Error types for `roster-core`.

use thiserror::Error;

use crate::import::ChangeKind;

#[derive(Debug, Error)]
pub enum Error {
  /// The imported sheet has no identifier column; nothing was written.
  #[error("the sheet has no \"{}\" column", crate::IDENTIFIER)]
  MissingKeyColumn,

  /// Every row of the imported sheet had a blank identifier.
  #[error("the sheet contains no rows with a student identifier")]
  NoValidRows,

  #[error("import declined: {0} not approved")]
  ImportDeclined(ChangeKind),

  /// A row failed mid-import. Rows before it remain committed.
  #[error("import stopped after {committed} of {attempted} rows: {cause}")]
  ImportInterrupted {
    committed: usize,
    attempted: usize,
    cause:     String,
  },

  #[error("category already exists: {0:?}")]
  DuplicateCategory(String),

  #[error("category not found: {0:?}")]
  CategoryNotFound(String),

  #[error("column not found: {0:?}")]
  ColumnNotFound(String),

  #[error("column {0:?} cannot be dropped or classified")]
  ProtectedColumn(String),

  #[error("student identifier must not be empty")]
  EmptyIdentifier,

  #[error("the student identifier cannot be changed")]
  ImmutableIdentifier,

  #[error("invalid column name: {0:?}")]
  InvalidColumnName(String),

  #[error("invalid category name: {0:?}")]
  InvalidCategoryName(String),

  #[error("no filter column selected")]
  NoColumnSelected,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
