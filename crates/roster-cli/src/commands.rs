//! Subcommand implementations, generic over any [`RosterStore`].

use std::{collections::BTreeSet, path::Path};

use anyhow::{Context as _, Result, bail};
use clap::Args;
use roster_core::{
  IDENTIFIER,
  category::Bucket,
  cell::edited_value,
  filter::{ActiveFilter, CategoryScope, FilterState},
  import::{ChangeKind, ImportApproval, ImportPlan, PreparedImport},
  ordering::ColumnOrder,
  record::{Fields, RecordSet, Upserted},
  store::RosterStore,
  view::RosterView,
};
use roster_sheet::SheetFormat;

use crate::{prompt, render};

// ─── Filter arguments ────────────────────────────────────────────────────────

/// Either a category → column → value filter or a name search.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
  /// Only offer columns from this category.
  #[arg(long, requires = "column")]
  pub category: Option<String>,

  /// Column to match exactly.
  #[arg(long, requires = "value")]
  pub column: Option<String>,

  /// Value the column must equal.
  #[arg(long, requires = "column")]
  pub value: Option<String>,

  /// Case-insensitive substring of the student's name.
  #[arg(long, conflicts_with_all = ["category", "column", "value"])]
  pub name: Option<String>,
}

impl FilterArgs {
  pub fn resolve(&self, view: &RosterView) -> Result<ActiveFilter> {
    if let Some(needle) = &self.name {
      return Ok(ActiveFilter::NameSearch { needle: needle.clone() });
    }
    let (Some(column), Some(value)) = (&self.column, &self.value) else {
      return Ok(ActiveFilter::None);
    };

    let mut state = FilterState::new(view);
    if let Some(category) = &self.category {
      state.set_scope(CategoryScope::Only(category.clone()), view)?;
    }
    state.select_column(column)?;
    state.select_value(value.clone())?;
    Ok(state.active().unwrap_or_default())
  }
}

/// Parse `COLUMN=VALUE`. A blank value clears the field.
pub fn parse_assignment(s: &str) -> Result<(String, Option<String>), String> {
  let (column, value) = s
    .split_once('=')
    .ok_or_else(|| format!("expected COLUMN=VALUE, got {s:?}"))?;
  let column = column.trim();
  if column.is_empty() {
    return Err(format!("missing column name in {s:?}"));
  }
  Ok((column.to_owned(), edited_value(value)))
}

async fn query<S: RosterStore>(
  store: &S,
  view: &RosterView,
  filter: &ActiveFilter,
  columns: &[String],
) -> Result<RecordSet> {
  let columns = if columns.is_empty() { view.columns.clone() } else { columns.to_vec() };
  store
    .select(columns, filter.predicate())
    .await
    .with_context(|| format!("failed to select {}", filter.describe()))
}

// ─── Browsing ────────────────────────────────────────────────────────────────

pub async fn columns<S: RosterStore>(store: &S, order: &ColumnOrder, json: bool) -> Result<()> {
  let view = store.load_view(order).await.context("failed to load columns")?;
  let groups = view.groups(order);
  if json {
    return render::print_json(&groups);
  }
  let infos = store.list_columns().await.context("failed to load column history")?;
  render::print_column_groups(&groups, &infos);
  Ok(())
}

pub async fn show<S: RosterStore>(
  store: &S,
  order: &ColumnOrder,
  filter: &FilterArgs,
  columns: &[String],
  json: bool,
) -> Result<()> {
  let view = store.load_view(order).await.context("failed to load view")?;
  let active = filter.resolve(&view)?;
  let records = query(store, &view, &active, columns).await?;
  if json {
    return render::print_json(&records);
  }
  render::print_records(&records);
  Ok(())
}

/// Walk the filter cascade: list a scope's columns, or a column's values.
pub async fn filter<S: RosterStore>(
  store: &S,
  order: &ColumnOrder,
  category: Option<String>,
  column: Option<String>,
) -> Result<()> {
  let view = store.load_view(order).await.context("failed to load view")?;
  let mut state = FilterState::new(&view);
  if let Some(category) = category {
    state.set_scope(CategoryScope::Only(category), &view)?;
  }

  let Some(column) = column else {
    if state.selectable_columns().is_empty() {
      eprintln!("no columns in this category");
    }
    for column in state.selectable_columns() {
      println!("{column}");
    }
    return Ok(());
  };

  state.select_column(&column)?;
  let column = state.column().unwrap_or(&column).to_owned();
  let values = store
    .distinct_values(column.clone())
    .await
    .with_context(|| format!("failed to list values of {column:?}"))?;
  for value in values {
    println!("{value}");
  }
  Ok(())
}

pub async fn get<S: RosterStore>(store: &S, order: &ColumnOrder, id: &str, json: bool) -> Result<()> {
  let record = store
    .get(id.trim().to_owned())
    .await
    .with_context(|| format!("failed to load student {id:?}"))?
    .with_context(|| format!("no student with {IDENTIFIER} {id:?}"))?;
  if json {
    return render::print_json(&record);
  }
  let view = store.load_view(order).await.context("failed to load view")?;
  render::print_record(&record, &view.groups(order));
  Ok(())
}

// ─── Editing ─────────────────────────────────────────────────────────────────

pub async fn set<S: RosterStore>(
  store: &S,
  id: &str,
  assignments: Vec<(String, Option<String>)>,
) -> Result<()> {
  let fields: Fields = assignments.into_iter().collect();
  let upserted = store
    .upsert(id.to_owned(), fields)
    .await
    .with_context(|| format!("failed to save student {id:?}"))?;
  match upserted {
    Upserted::Inserted => println!("added student {}", id.trim()),
    Upserted::Updated => println!("updated student {}", id.trim()),
  }
  Ok(())
}

pub async fn delete<S: RosterStore>(store: &S, ids: Vec<String>, yes: bool) -> Result<()> {
  let ids: BTreeSet<String> = ids
    .into_iter()
    .map(|id| id.trim().to_owned())
    .filter(|id| !id.is_empty())
    .collect();
  if ids.is_empty() {
    bail!("no student identifiers given");
  }
  if !yes && !prompt::confirm(&format!("Delete {} student(s)? This cannot be undone.", ids.len()))? {
    println!("cancelled");
    return Ok(());
  }
  let removed = store.delete(ids).await.context("failed to delete students")?;
  println!("deleted {removed} student(s)");
  Ok(())
}

pub async fn add_column<S: RosterStore>(store: &S, name: String) -> Result<()> {
  let added = store
    .add_column(name.clone())
    .await
    .with_context(|| format!("failed to add column {name:?}"))?;
  if added {
    println!("added column {name}");
  } else {
    println!("column {name} already exists");
  }
  Ok(())
}

pub async fn drop_columns<S: RosterStore>(store: &S, names: Vec<String>, yes: bool) -> Result<()> {
  let names: BTreeSet<String> = names.into_iter().collect();
  let question = format!(
    "Drop column(s) {} and all their values? This cannot be undone.",
    names.iter().cloned().collect::<Vec<_>>().join(", ")
  );
  if !yes && !prompt::confirm(&question)? {
    println!("cancelled");
    return Ok(());
  }
  let dropped = store.drop_columns(names).await.context("failed to drop columns")?;
  if dropped.is_empty() {
    println!("no such columns");
  } else {
    println!("dropped {}", dropped.join(", "));
  }
  Ok(())
}

// ─── Import / export ─────────────────────────────────────────────────────────

fn confirmation_question(kind: ChangeKind, plan: &ImportPlan) -> String {
  match kind {
    ChangeKind::OverwriteColumns => format!(
      "Overwrite values in {} existing column(s)?",
      plan.overlapping_columns.len()
    ),
    ChangeKind::NewColumns => format!("Add {} new column(s)?", plan.new_columns.len()),
    ChangeKind::OverwriteStudents => format!(
      "Overwrite {} existing student(s)?",
      plan.existing_ids.len()
    ),
  }
}

pub async fn import<S: RosterStore>(store: &S, path: &Path, yes: bool, dry_run: bool) -> Result<()> {
  let sheet = roster_sheet::read_sheet(path)
    .with_context(|| format!("failed to read {}", path.display()))?;

  if let Err(roster_core::Error::NoValidRows) = PreparedImport::from_sheet(&sheet) {
    tracing::warn!(path = %path.display(), "no rows with an identifier");
    eprintln!("warning: {} has no rows with a {IDENTIFIER}; nothing imported", path.display());
    return Ok(());
  }

  let plan = store
    .plan_import(&sheet)
    .await
    .with_context(|| format!("failed to import {}", path.display()))?;
  render::print_plan(&plan);
  if dry_run {
    return Ok(());
  }

  let mut approval = ImportApproval::default();
  for kind in plan.changes() {
    if yes || prompt::confirm(&confirmation_question(kind, &plan))? {
      approval.grant(kind);
    } else {
      println!("import cancelled: {kind} not approved");
      return Ok(());
    }
  }

  let outcome = store
    .commit_import(sheet, approval)
    .await
    .with_context(|| format!("failed to import {}", path.display()))?;
  render::print_outcome(&outcome);
  Ok(())
}

pub async fn export<S: RosterStore>(
  store: &S,
  order: &ColumnOrder,
  path: &Path,
  filter: &FilterArgs,
  columns: &[String],
) -> Result<()> {
  if !SheetFormat::from_path(path)?.is_writable() {
    bail!("can only export to .xlsx or .csv, not {}", path.display());
  }

  let view = store.load_view(order).await.context("failed to load view")?;
  let active = filter.resolve(&view)?;
  let records = query(store, &view, &active, columns).await?;
  roster_sheet::write_records(path, &records)
    .with_context(|| format!("failed to write {}", path.display()))?;
  println!(
    "exported {} student(s) ({}) to {}",
    records.len(),
    active.describe(),
    path.display()
  );
  Ok(())
}

// ─── Categories ──────────────────────────────────────────────────────────────

pub async fn list_categories<S: RosterStore>(store: &S, order: &ColumnOrder, json: bool) -> Result<()> {
  let view = store.load_view(order).await.context("failed to load categories")?;
  if json {
    return render::print_json(&view.categories);
  }
  render::print_categories(&view.categories, &view.mapping);
  Ok(())
}

pub async fn create_category<S: RosterStore>(store: &S, name: String) -> Result<()> {
  let category = store
    .create_category(name.clone())
    .await
    .with_context(|| format!("failed to create category {name:?}"))?;
  println!("created category {}", category.name);
  Ok(())
}

pub async fn rename_category<S: RosterStore>(store: &S, old: String, new: String) -> Result<()> {
  store
    .rename_category(old.clone(), new.clone())
    .await
    .with_context(|| format!("failed to rename category {old:?}"))?;
  println!("renamed {old} to {new}");
  Ok(())
}

pub async fn delete_category<S: RosterStore>(store: &S, name: String, yes: bool) -> Result<()> {
  let question = format!("Delete category {name}? Its columns become unclassified.");
  if !yes && !prompt::confirm(&question)? {
    println!("cancelled");
    return Ok(());
  }
  let unmapped = store
    .delete_category(name.clone())
    .await
    .with_context(|| format!("failed to delete category {name:?}"))?;
  println!("deleted category {name}; {unmapped} column(s) now unclassified");
  Ok(())
}

pub async fn assign<S: RosterStore>(store: &S, column: String, category: Option<String>) -> Result<()> {
  let bucket = Bucket::from_option(category);
  store
    .set_mapping(column.clone(), bucket.clone())
    .await
    .with_context(|| format!("failed to classify column {column:?}"))?;
  println!("{column} → {bucket}");
  Ok(())
}
