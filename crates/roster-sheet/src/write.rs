//! Writing a [`RecordSet`] out as a spreadsheet.

use std::{fs::File, io::Write as _, path::Path};

use roster_core::record::RecordSet;
use rust_xlsxwriter::{Format, Workbook};

use crate::{Error, Result, format::SheetFormat};

/// Lets spreadsheet tools detect UTF-8 when opening the CSV.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write `records` to `path`, header first. Nulls are written as empty
/// cells and every value as text.
pub fn write_records(path: &Path, records: &RecordSet) -> Result<()> {
  match SheetFormat::from_path(path)? {
    SheetFormat::Csv => write_csv(path, records)?,
    SheetFormat::Xlsx => write_xlsx(path, records)?,
    _ => return Err(Error::UnsupportedFormat(path.display().to_string())),
  }
  tracing::info!(
    path = %path.display(),
    rows = records.len(),
    columns = records.columns.len(),
    "exported records"
  );
  Ok(())
}

fn write_csv(path: &Path, records: &RecordSet) -> Result<()> {
  let mut file = File::create(path)?;
  file.write_all(UTF8_BOM)?;

  let mut writer = csv::Writer::from_writer(file);
  writer.write_record(&records.columns)?;
  for row in &records.rows {
    writer.write_record(row.values.iter().map(|v| v.as_deref().unwrap_or_default()))?;
  }
  writer.flush()?;
  Ok(())
}

fn write_xlsx(path: &Path, records: &RecordSet) -> Result<()> {
  let width = records.columns.len();
  if u16::try_from(width).is_err() {
    return Err(Error::TooManyColumns(width));
  }

  let mut workbook = Workbook::new();
  let bold = Format::new().set_bold();
  let sheet = workbook.add_worksheet();

  for (col, name) in (0u16..).zip(&records.columns) {
    sheet.write_string_with_format(0, col, name, &bold)?;
  }
  for (row_idx, row) in (1u32..).zip(&records.rows) {
    for (col, value) in (0u16..).zip(&row.values) {
      if let Some(value) = value {
        sheet.write_string(row_idx, col, value)?;
      }
    }
  }
  sheet.set_freeze_panes(1, 0)?;

  workbook.save(path)?;
  Ok(())
}
