//! Reading a worksheet into a [`Sheet`].

use std::{fs::File, io::BufReader, path::Path};

use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveTime;
use roster_core::{cell::CellValue, import::Sheet};

use crate::{
  Error, Result,
  format::SheetFormat,
  header::{header_text, normalize_headers},
};

const UTF8_BOM: char = '\u{feff}';
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Read the first worksheet of `path`. The first row is the header; rows
/// with no values at all are dropped.
pub fn read_sheet(path: &Path) -> Result<Sheet> {
  let grid = match SheetFormat::from_path(path)? {
    SheetFormat::Csv => read_csv(path)?,
    _ => read_workbook(path)?,
  };
  let sheet = into_sheet(grid);
  tracing::debug!(
    path = %path.display(),
    columns = sheet.columns.len(),
    rows = sheet.rows.len(),
    "read sheet"
  );
  Ok(sheet)
}

fn into_sheet(grid: Vec<Vec<CellValue>>) -> Sheet {
  let mut rows = grid.into_iter();
  let Some(header) = rows.next() else {
    return Sheet::default();
  };
  let columns = normalize_headers(header.iter().map(header_text));
  let rows = rows
    .filter(|row| !row.iter().all(|c| matches!(c, CellValue::Empty)))
    .collect();
  Sheet::new(columns, rows)
}

// ─── Workbooks ───────────────────────────────────────────────────────────────

fn read_workbook(path: &Path) -> Result<Vec<Vec<CellValue>>> {
  let mut workbook = open_workbook_auto(path)?;
  let range = workbook.worksheet_range_at(0).ok_or(Error::NoWorksheet)??;
  Ok(
    range
      .rows()
      .map(|row| row.iter().map(cell_from_data).collect())
      .collect(),
  )
}

fn cell_from_data(data: &Data) -> CellValue {
  match data {
    Data::Empty => CellValue::Empty,
    Data::String(s) => CellValue::Text(s.clone()),
    Data::Int(i) => CellValue::Int(*i),
    Data::Float(f) => CellValue::Float(*f),
    Data::Bool(b) => CellValue::Bool(*b),
    Data::DateTime(dt) if dt.is_duration() || dt.as_f64() < 1.0 => clock_cell(dt.as_f64()),
    Data::DateTime(dt) => match dt.as_datetime() {
      Some(ndt) if ndt.time() == NaiveTime::MIN => CellValue::Date(ndt.date()),
      Some(ndt) => CellValue::DateTime(ndt),
      None => CellValue::Float(dt.as_f64()),
    },
    Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    Data::Error(e) => CellValue::Error(e.to_string()),
  }
}

/// A time-only or duration serial. Durations past a day keep counting hours.
fn clock_cell(serial: f64) -> CellValue {
  if !serial.is_finite() || serial < 0.0 {
    return CellValue::Float(serial);
  }
  let total = (serial * SECONDS_PER_DAY).round() as u64;
  match u32::try_from(total)
    .ok()
    .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, 0))
  {
    Some(time) => CellValue::Time(time),
    None => CellValue::Text(format!(
      "{:02}:{:02}:{:02}",
      total / 3600,
      total / 60 % 60,
      total % 60
    )),
  }
}

// ─── CSV ─────────────────────────────────────────────────────────────────────

fn read_csv(path: &Path) -> Result<Vec<Vec<CellValue>>> {
  let mut reader = csv::ReaderBuilder::new()
    .has_headers(false)
    .flexible(true)
    .from_reader(BufReader::new(File::open(path)?));

  let mut grid = Vec::new();
  for (idx, record) in reader.records().enumerate() {
    let record = record?;
    let row = record
      .iter()
      .enumerate()
      .map(|(col, field)| {
        let field = if idx == 0 && col == 0 { field.trim_start_matches(UTF8_BOM) } else { field };
        if field.is_empty() { CellValue::Empty } else { CellValue::from(field) }
      })
      .collect();
    grid.push(row);
  }
  Ok(grid)
}
