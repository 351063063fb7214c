//! Canonical column ordering and category grouping.
//!
//! Both the record table and the per-category detail form are laid out by the
//! functions in this module, so the two views can never disagree.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
  IDENTIFIER,
  category::{Bucket, CategoryMap},
};

/// Field names that lead the column order, in this order. Columns not listed
/// follow in case-insensitive alphabetical order.
pub const DEFAULT_PREFERRED_ORDER: &[&str] = &[
  "学号",
  "姓名",
  "身份证号码",
  "出生日期",
  "电话号码",
  "母亲姓名",
  "母亲电话号码",
  "父亲姓名",
  "父亲电话号码",
  "最后一次谈话日期",
  "谈话内容",
  "红黄蓝情况简述",
  "中考名次",
  "中考成绩",
];

/// A preferred-order list and the sort it induces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
  preferred: Vec<String>,
  rank:      HashMap<String, usize>,
}

impl Default for ColumnOrder {
  fn default() -> Self { Self::new(DEFAULT_PREFERRED_ORDER.iter().copied()) }
}

impl ColumnOrder {
  /// Build from a priority list. A name listed twice keeps its first rank.
  pub fn new<I, S>(preferred: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let preferred: Vec<String> = preferred.into_iter().map(Into::into).collect();
    let mut rank = HashMap::with_capacity(preferred.len());
    for (idx, name) in preferred.iter().enumerate() {
      rank.entry(name.clone()).or_insert(idx);
    }
    Self { preferred, rank }
  }

  pub fn preferred(&self) -> &[String] { &self.preferred }

  /// Deduplicate `names` (first occurrence wins) and sort them: listed names
  /// by rank, then unlisted names by lowercase text, then by exact text.
  pub fn sort_columns<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    let mut unique = Vec::with_capacity(names.len());
    for name in names {
      let name = name.as_ref();
      if seen.insert(name) {
        unique.push(name.to_owned());
      }
    }

    let unlisted = self.preferred.len();
    unique.sort_by_cached_key(|name| {
      let rank = self.rank.get(name).copied().unwrap_or(unlisted);
      (rank, name.to_lowercase(), name.clone())
    });
    unique
  }

  /// Bucket the non-identifier `columns` by category. Each bucket keeps the
  /// [`sort_columns`](Self::sort_columns) order; buckets are ordered by name
  /// with [`Bucket::Unclassified`] last. Empty buckets are omitted.
  pub fn group_by_category<S: AsRef<str>>(
    &self,
    columns: &[S],
    mapping: &CategoryMap,
  ) -> Vec<(Bucket, Vec<String>)> {
    let mut groups: BTreeMap<Bucket, Vec<String>> = BTreeMap::new();
    for column in self.sort_columns(columns) {
      if column == IDENTIFIER {
        continue;
      }
      groups.entry(mapping.bucket_of(&column)).or_default().push(column);
    }
    groups.into_iter().collect()
  }
}

/// Columns for an export: the identifier first, then `selected` in the order
/// given, without duplicates.
pub fn export_columns<S: AsRef<str>>(selected: &[S]) -> Vec<String> {
  let mut out = vec![IDENTIFIER.to_owned()];
  for name in selected {
    let name = name.as_ref();
    if !out.iter().any(|c| c == name) {
      out.push(name.to_owned());
    }
  }
  out
}
