//! Filter state: category → column → value, or a name search.
//!
//! [`FilterState`] models the three cascading filter controls. Changing an
//! upstream control resets everything downstream of it, so a stale column or
//! value can never survive a category change that no longer offers it.
//! [`ActiveFilter`] is whichever filter was applied last; the value filter and
//! the name search never combine.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  record::{Predicate, find_column},
  view::RosterView,
};

/// Which category's columns the filter offers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum CategoryScope {
  #[default]
  All,
  Only(String),
}

/// The cascading category / column / value selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
  scope:      CategoryScope,
  selectable: Vec<String>,
  column:     Option<String>,
  value:      Option<String>,
}

impl FilterState {
  /// Start with every category in scope and the first column selected.
  pub fn new(view: &RosterView) -> Self {
    let mut state = Self::default();
    state.refresh(view);
    state
  }

  pub fn scope(&self) -> &CategoryScope { &self.scope }

  pub fn selectable_columns(&self) -> &[String] { &self.selectable }

  pub fn column(&self) -> Option<&str> { self.column.as_deref() }

  pub fn value(&self) -> Option<&str> { self.value.as_deref() }

  /// Change the category scope. Unknown categories are rejected.
  pub fn set_scope(&mut self, scope: CategoryScope, view: &RosterView) -> Result<()> {
    if let CategoryScope::Only(name) = &scope
      && !view.has_category(name)
    {
      return Err(Error::CategoryNotFound(name.clone()));
    }
    self.scope = scope;
    self.refresh(view);
    Ok(())
  }

  /// Recompute the selectable columns after `view` was reloaded.
  ///
  /// A column that is still selectable is kept along with its value;
  /// otherwise the first selectable column is chosen and the value cleared.
  /// With nothing selectable, column and value are both cleared.
  pub fn refresh(&mut self, view: &RosterView) {
    if let CategoryScope::Only(name) = &self.scope
      && !view.has_category(name)
    {
      self.scope = CategoryScope::All;
    }
    self.selectable = view.selectable_columns(&self.scope);

    let still_valid = self
      .column
      .as_ref()
      .is_some_and(|c| self.selectable.contains(c));
    if !still_valid {
      self.column = self.selectable.first().cloned();
      self.value = None;
    }
  }

  /// Choose the filter column, keeping the schema spelling. The value is
  /// cleared.
  pub fn select_column(&mut self, column: &str) -> Result<()> {
    let Some(actual) = find_column(&self.selectable, column) else {
      return Err(Error::ColumnNotFound(column.to_owned()));
    };
    self.column = Some(actual.to_owned());
    self.value = None;
    Ok(())
  }

  /// Choose the value to match in the selected column.
  pub fn select_value(&mut self, value: impl Into<String>) -> Result<()> {
    if self.column.is_none() {
      return Err(Error::NoColumnSelected);
    }
    self.value = Some(value.into());
    Ok(())
  }

  /// The filter to apply, once both column and value are chosen.
  pub fn active(&self) -> Option<ActiveFilter> {
    let column = self.column.clone()?;
    let value = self.value.clone()?;
    Some(ActiveFilter::Value { column, value })
  }
}

/// The filter currently applied to the record table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActiveFilter {
  #[default]
  None,
  Value { column: String, value: String },
  NameSearch { needle: String },
}

impl ActiveFilter {
  pub fn is_filtered(&self) -> bool { !matches!(self, Self::None) }

  pub fn predicate(&self) -> Predicate {
    match self {
      Self::None => Predicate::All,
      Self::Value { column, value } => Predicate::Equals {
        column: column.clone(),
        value:  value.clone(),
      },
      Self::NameSearch { needle } => Predicate::name_search(needle.clone()),
    }
  }

  /// Human-readable summary for status lines and export prompts.
  pub fn describe(&self) -> String {
    match self {
      Self::None => "all students".to_owned(),
      Self::Value { column, value } => format!("{column} = {value}"),
      Self::NameSearch { needle } => format!("name contains {needle:?}"),
    }
  }
}
