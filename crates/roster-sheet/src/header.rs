//! Header row normalisation.

use std::collections::{HashMap, HashSet};

use roster_core::cell::CellValue;

/// Turn raw header cells into unique column names.
///
/// A blank header at position `n` becomes `Unnamed: n`. A name seen before
/// gets the next free `.1`, `.2`, … suffix.
pub fn normalize_headers<I>(raw: I) -> Vec<String>
where
  I: IntoIterator<Item = Option<String>>,
{
  let mut used = HashSet::new();
  let mut suffixes: HashMap<String, usize> = HashMap::new();
  let mut names = Vec::new();

  for (idx, cell) in raw.into_iter().enumerate() {
    let base = match cell {
      Some(name) if !name.trim().is_empty() => name,
      _ => format!("Unnamed: {idx}"),
    };

    let mut name = base.clone();
    if used.contains(&name) {
      let n = suffixes.entry(base.clone()).or_insert(0);
      loop {
        *n += 1;
        let candidate = format!("{base}.{n}");
        if !used.contains(&candidate) {
          name = candidate;
          break;
        }
      }
    }
    used.insert(name.clone());
    names.push(name);
  }
  names
}

/// The text of a header cell. Unlike data cells, NA markers are kept.
pub(crate) fn header_text(cell: &CellValue) -> Option<String> {
  match cell {
    CellValue::Text(s) => Some(s.clone()),
    other => other.normalize(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn names(raw: &[Option<&str>]) -> Vec<String> {
    normalize_headers(raw.iter().map(|c| c.map(str::to_owned)))
  }

  #[test]
  fn blanks_become_unnamed() {
    assert_eq!(names(&[Some("学号"), None, Some("  ")]), ["学号", "Unnamed: 1", "Unnamed: 2"]);
  }

  #[test]
  fn repeats_get_numbered_suffixes() {
    assert_eq!(
      names(&[Some("grade"), Some("grade"), Some("grade.1"), Some("grade")]),
      ["grade", "grade.1", "grade.1.1", "grade.2"]
    );
  }

  #[test]
  fn header_cells_keep_na_like_text() {
    assert_eq!(header_text(&CellValue::from("NA")).as_deref(), Some("NA"));
    assert_eq!(header_text(&CellValue::Float(2024.0)).as_deref(), Some("2024"));
    assert_eq!(header_text(&CellValue::Empty), None);
  }
}
