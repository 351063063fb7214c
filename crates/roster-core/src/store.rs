//! The `RosterStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `roster-store-sqlite`).
//! Front-ends depend on this abstraction, not on any concrete backend.

use std::{collections::BTreeSet, future::Future};

use crate::{
  category::{Bucket, Category, CategoryMap},
  import::{ImportApproval, ImportOutcome, ImportPlan, Sheet},
  ordering::ColumnOrder,
  record::{ColumnInfo, Fields, Predicate, RecordSet, StudentRecord, Upserted},
  view::RosterView,
};

/// Abstraction over a roster store backend.
///
/// Every mutating method is atomic: it either applies completely or leaves
/// the store unchanged. The one documented exception is
/// [`commit_import`](Self::commit_import), which is atomic per row.
pub trait RosterStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Records ───────────────────────────────────────────────────────────

  /// Insert a student or overwrite the supplied fields of an existing one.
  /// Fields not supplied keep their values; on insert they are NULL.
  fn upsert(
    &self,
    id: String,
    fields: Fields,
  ) -> impl Future<Output = Result<Upserted, Self::Error>> + Send + '_;

  /// Every column of one student, or `None` if the identifier is unknown.
  fn get(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<StudentRecord>, Self::Error>> + Send + '_;

  /// Delete students by identifier. Returns how many rows were removed.
  fn delete(
    &self,
    ids: BTreeSet<String>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Records in insertion order, projected to the identifier followed by
  /// `columns`, and filtered by `predicate`.
  fn select(
    &self,
    columns: Vec<String>,
    predicate: Predicate,
  ) -> impl Future<Output = Result<RecordSet, Self::Error>> + Send + '_;

  // ── Columns ───────────────────────────────────────────────────────────

  /// Add a text column. Returns `false` if it already existed.
  fn add_column(
    &self,
    name: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove columns and their category mappings. Returns the names actually
  /// dropped. The identifier column can never be dropped.
  fn drop_columns(
    &self,
    names: BTreeSet<String>,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// The current schema, identifier included, in physical order.
  fn list_columns(&self) -> impl Future<Output = Result<Vec<ColumnInfo>, Self::Error>> + Send + '_;

  /// Sorted distinct non-empty values present in `column`.
  fn distinct_values(
    &self,
    column: String,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Categories ────────────────────────────────────────────────────────

  fn create_category(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// Rename a category, carrying its column mappings with it.
  fn rename_category(
    &self,
    old: String,
    new: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a category. Its columns become unclassified; the number of such
  /// columns is returned.
  fn delete_category(
    &self,
    name: String,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// All categories, sorted case-insensitively.
  fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  /// Assign a column to a category, or clear it with [`Bucket::Unclassified`].
  fn set_mapping(
    &self,
    column: String,
    bucket: Bucket,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn category_map(&self) -> impl Future<Output = Result<CategoryMap, Self::Error>> + Send + '_;

  // ── Import ────────────────────────────────────────────────────────────

  /// Dry run: validate `sheet` and describe what committing it would change.
  fn plan_import<'a>(
    &'a self,
    sheet: &'a Sheet,
  ) -> impl Future<Output = Result<ImportPlan, Self::Error>> + Send + 'a;

  /// Apply `sheet`. Fails without writing anything if the plan needs a
  /// change `approval` withholds.
  fn commit_import(
    &self,
    sheet: Sheet,
    approval: ImportApproval,
  ) -> impl Future<Output = Result<ImportOutcome, Self::Error>> + Send + '_;

  // ── View ──────────────────────────────────────────────────────────────

  /// Load the current view. A failure to read the category mapping degrades
  /// to an empty mapping rather than failing the call.
  fn load_view<'a>(
    &'a self,
    order: &'a ColumnOrder,
  ) -> impl Future<Output = Result<RosterView, Self::Error>> + Send + 'a;
}
