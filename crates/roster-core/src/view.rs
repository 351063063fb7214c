//! The current view: a snapshot of schema and classification state.
//!
//! Front-ends hold a [`RosterView`] instead of caching columns and categories
//! in scattered fields, and reload it after every mutation.

use serde::{Deserialize, Serialize};

use crate::{
  IDENTIFIER,
  category::{Bucket, Category, CategoryMap},
  filter::CategoryScope,
  ordering::ColumnOrder,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterView {
  /// Every column, identifier included, in canonical order.
  pub columns:    Vec<String>,
  /// Categories in listing order.
  pub categories: Vec<Category>,
  /// Mapping restricted to columns present in `columns`.
  pub mapping:    CategoryMap,
}

impl RosterView {
  /// Sort `columns` canonically and prune mapping entries for unknown columns.
  pub fn new(
    order: &ColumnOrder,
    columns: &[String],
    categories: Vec<Category>,
    mut mapping: CategoryMap,
  ) -> Self {
    let mut columns = order.sort_columns(columns);
    if !columns.iter().any(|c| c == IDENTIFIER) {
      columns.insert(0, IDENTIFIER.to_owned());
    }
    mapping.retain_columns(|c| columns.iter().any(|known| known == c));
    Self { columns, categories, mapping }
  }

  /// Columns other than the identifier.
  pub fn data_columns(&self) -> impl Iterator<Item = &str> {
    self
      .columns
      .iter()
      .map(String::as_str)
      .filter(|c| *c != IDENTIFIER)
  }

  pub fn has_category(&self, name: &str) -> bool {
    self.categories.iter().any(|c| c.name == name)
  }

  pub fn groups(&self, order: &ColumnOrder) -> Vec<(Bucket, Vec<String>)> {
    order.group_by_category(&self.columns, &self.mapping)
  }

  /// Columns offered by the filter for `scope`, in canonical order.
  pub fn selectable_columns(&self, scope: &CategoryScope) -> Vec<String> {
    self
      .data_columns()
      .filter(|c| match scope {
        CategoryScope::All => true,
        CategoryScope::Only(category) => self.mapping.category_of(c) == Some(category.as_str()),
      })
      .map(str::to_owned)
      .collect()
  }
}
