//! File format detection by extension.

use std::path::Path;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
  Csv,
  Xlsx,
  Xlsm,
  Xlsb,
  Xls,
  Ods,
}

impl SheetFormat {
  /// Detect the format from `path`'s extension, case-insensitively.
  pub fn from_path(path: &Path) -> Result<Self> {
    let ext = path
      .extension()
      .and_then(|e| e.to_str())
      .map(str::to_ascii_lowercase)
      .unwrap_or_default();
    match ext.as_str() {
      "csv" => Ok(Self::Csv),
      "xlsx" => Ok(Self::Xlsx),
      "xlsm" => Ok(Self::Xlsm),
      "xlsb" => Ok(Self::Xlsb),
      "xls" => Ok(Self::Xls),
      "ods" => Ok(Self::Ods),
      _ => Err(Error::UnsupportedFormat(path.display().to_string())),
    }
  }

  /// Whether [`crate::write_records`] can produce this format.
  pub fn is_writable(self) -> bool { matches!(self, Self::Csv | Self::Xlsx) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn detects_by_extension() {
    assert_eq!(SheetFormat::from_path(Path::new("a.CSV")).unwrap(), SheetFormat::Csv);
    assert_eq!(SheetFormat::from_path(Path::new("dir/b.xlsx")).unwrap(), SheetFormat::Xlsx);
    assert!(!SheetFormat::Ods.is_writable());
    assert!(matches!(
      SheetFormat::from_path(Path::new("notes.txt")),
      Err(Error::UnsupportedFormat(_))
    ));
    assert!(SheetFormat::from_path(Path::new("no_extension")).is_err());
  }
}
