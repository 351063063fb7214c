//! Error types for the roster-sheet codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unsupported spreadsheet format: {0:?}")]
  UnsupportedFormat(String),

  #[error("workbook has no worksheets")]
  NoWorksheet,

  #[error("workbook error: {0}")]
  Workbook(#[from] calamine::Error),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("XLSX write error: {0}")]
  XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

  #[error("{0} columns do not fit in a worksheet")]
  TooManyColumns(usize),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
