//! Categories and the column → category mapping.
//!
//! A column belongs to at most one category. Columns without a mapping fall
//! into [`Bucket::Unclassified`], which is a distinct variant rather than a
//! reserved name, so a user may create a category called "未分类" without
//! colliding with it.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display label for [`Bucket::Unclassified`].
pub const UNCLASSIFIED_LABEL: &str = "未分类";

/// A user-defined category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

/// The group a column is displayed and filtered under.
///
/// The derived ordering puts named buckets first (by name) and
/// `Unclassified` last, which is exactly the display order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Bucket {
  Named(String),
  Unclassified,
}

impl Bucket {
  pub fn named(name: impl Into<String>) -> Self { Self::Named(name.into()) }

  pub fn from_option(name: Option<String>) -> Self {
    name.map_or(Self::Unclassified, Self::Named)
  }

  pub fn label(&self) -> &str {
    match self {
      Self::Named(name) => name,
      Self::Unclassified => UNCLASSIFIED_LABEL,
    }
  }

  pub fn category(&self) -> Option<&str> {
    match self {
      Self::Named(name) => Some(name),
      Self::Unclassified => None,
    }
  }
}

impl fmt::Display for Bucket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

/// Column name → category name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMap(BTreeMap<String, String>);

impl CategoryMap {
  pub fn new() -> Self { Self::default() }

  pub fn bucket_of(&self, column: &str) -> Bucket {
    Bucket::from_option(self.0.get(column).cloned())
  }

  pub fn category_of(&self, column: &str) -> Option<&str> {
    self.0.get(column).map(String::as_str)
  }

  pub fn insert(&mut self, column: impl Into<String>, category: impl Into<String>) {
    self.0.insert(column.into(), category.into());
  }

  pub fn remove(&mut self, column: &str) -> Option<String> { self.0.remove(column) }

  /// Drop every entry whose column fails `keep`.
  pub fn retain_columns(&mut self, mut keep: impl FnMut(&str) -> bool) {
    self.0.retain(|column, _| keep(column));
  }

  /// Columns mapped to `category`, in name order.
  pub fn columns_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    self
      .0
      .iter()
      .filter(move |(_, c)| c.as_str() == category)
      .map(|(column, _)| column.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl FromIterator<(String, String)> for CategoryMap {
  fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// Sort categories the way the category manager lists them.
pub fn sort_categories(categories: &mut [Category]) {
  categories.sort_by(|a, b| {
    a.name
      .to_lowercase()
      .cmp(&b.name.to_lowercase())
      .then_with(|| a.name.cmp(&b.name))
  });
}
