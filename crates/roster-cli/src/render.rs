//! Plain-text and JSON output.
//!
//! Tables are tab-separated so they paste into a spreadsheet and pipe into
//! `cut`; nulls print as empty fields.

use std::collections::HashMap;

use roster_core::{
  category::{Bucket, Category, CategoryMap},
  import::{ImportOutcome, ImportPlan},
  record::{ColumnInfo, RecordSet, StudentRecord},
};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

pub fn print_records(records: &RecordSet) {
  println!("{}", records.columns.join("\t"));
  for row in &records.rows {
    let line = row
      .values
      .iter()
      .map(|v| v.as_deref().unwrap_or_default())
      .collect::<Vec<_>>()
      .join("\t");
    println!("{line}");
  }
  eprintln!("({} student(s))", records.len());
}

/// One student, field by field, under category headings.
pub fn print_record(record: &StudentRecord, groups: &[(Bucket, Vec<String>)]) {
  println!("{}: {}", roster_core::IDENTIFIER, record.id);
  for (bucket, columns) in groups {
    println!("\n[{bucket}]");
    for column in columns {
      println!("  {column}: {}", record.get(column).unwrap_or_default());
    }
  }
}

/// Columns under category headings, each with the date it first appeared.
pub fn print_column_groups(groups: &[(Bucket, Vec<String>)], columns: &[ColumnInfo]) {
  let first_seen: HashMap<&str, String> = columns
    .iter()
    .filter_map(|c| Some((c.name.as_str(), c.first_seen?.format("%Y-%m-%d").to_string())))
    .collect();

  for (bucket, names) in groups {
    println!("[{bucket}]");
    for name in names {
      match first_seen.get(name.as_str()) {
        Some(date) => println!("  {name}\t(since {date})"),
        None => println!("  {name}"),
      }
    }
  }
}

pub fn print_categories(categories: &[Category], mapping: &CategoryMap) {
  for category in categories {
    let count = mapping.columns_in(&category.name).count();
    println!(
      "{}\t{count} column(s)\tcreated {}",
      category.name,
      category.created_at.format("%Y-%m-%d")
    );
  }
}

/// The confirmation summary shown before an import is committed.
pub fn print_plan(plan: &ImportPlan) {
  println!("{} row(s) to import", plan.valid_rows);
  if plan.skipped_rows > 0 {
    println!(
      "{} row(s) without a {} will be skipped",
      plan.skipped_rows,
      roster_core::IDENTIFIER
    );
  }
  if !plan.new_columns.is_empty() {
    println!("new columns: {}", plan.new_columns.join(", "));
  }
  if !plan.overlapping_columns.is_empty() {
    println!("existing columns to overwrite: {}", plan.overlapping_columns.join(", "));
  }
  if !plan.existing_ids.is_empty() {
    let preview = plan.existing_ids_preview();
    let more = plan.existing_ids.len() - preview.len();
    let suffix = if more > 0 { format!(" and {more} more") } else { String::new() };
    println!(
      "{} existing student(s) will be overwritten: {}{suffix}",
      plan.existing_ids.len(),
      preview.join(", ")
    );
  }
}

pub fn print_outcome(outcome: &ImportOutcome) {
  println!(
    "imported {} row(s); {} new column(s), {} student(s) overwritten",
    outcome.rows_imported,
    outcome.new_columns.len(),
    outcome.overwritten_students
  );
}
