//! Spreadsheet codec for the student roster.
//!
//! Reads the first worksheet of an `.xlsx`/`.xlsm`/`.xlsb`/`.xls`/`.ods`
//! workbook, or a `.csv` file, into a [`roster_core::import::Sheet`], and
//! writes a [`roster_core::record::RecordSet`] to `.xlsx` or `.csv`. Pure
//! synchronous; no database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use roster_sheet::read_sheet;
//!
//! let sheet = read_sheet("students.xlsx".as_ref()).unwrap();
//! println!("{} columns, {} rows", sheet.columns.len(), sheet.rows.len());
//! ```

pub mod error;
mod format;
mod header;
mod read;
mod write;

pub use error::{Error, Result};
pub use format::SheetFormat;
pub use header::normalize_headers;
pub use read::read_sheet;
pub use write::write_records;
