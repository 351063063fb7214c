//! [`SqliteStore`], the SQLite implementation of [`RosterStore`].

use std::{
  collections::{BTreeSet, HashSet},
  path::Path,
};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, params, params_from_iter};

use roster_core::{
  IDENTIFIER,
  category::{Bucket, Category, CategoryMap, sort_categories},
  import::{ImportApproval, ImportOutcome, ImportPlan, PreparedImport, Sheet},
  ordering::{ColumnOrder, export_columns},
  record::{
    ColumnInfo, Fields, Predicate, RecordSet, Row, StudentRecord, Upserted, check_column_name,
    contains_ignore_case, find_column, same_column,
  },
  store::RosterStore,
  view::RosterView,
};

use crate::{
  Result,
  encode::{RawCategory, RawColumn, cell_text, encode_dt, quote_ident, quote_list},
  schema::{SCHEMA, STUDENTS, STUDENTS_REBUILD},
};

/// Outcome of a database call that may also fail a domain check.
type Checked<T> = std::result::Result<T, roster_core::Error>;

// ─── Statement helpers ───────────────────────────────────────────────────────
//
// These run on the connection thread, usually inside a transaction.

/// The physical columns of `students`, in declaration order.
fn table_columns(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
  stmt
    .query_map([STUDENTS], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()
}

fn category_exists(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM column_categories WHERE category_name = ?1",
        [name],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

fn student_exists(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<bool> {
  let sql = format!("SELECT 1 FROM {STUDENTS} WHERE {} = ?1", quote_ident(IDENTIFIER));
  Ok(conn.query_row(&sql, [id], |_| Ok(())).optional()?.is_some())
}

/// `ALTER TABLE … ADD COLUMN` plus the first-seen audit row.
fn insert_column(conn: &rusqlite::Connection, name: &str, seen_at: &str) -> rusqlite::Result<()> {
  conn.execute(
    &format!("ALTER TABLE {STUDENTS} ADD COLUMN {} TEXT", quote_ident(name)),
    [],
  )?;
  conn.execute(
    "INSERT OR IGNORE INTO column_history (column_name, first_upload_time) VALUES (?1, ?2)",
    params![name, seen_at],
  )?;
  Ok(())
}

/// Update the supplied fields of an existing student, or insert a new one.
/// Columns must already exist.
fn write_row(conn: &rusqlite::Connection, id: &str, fields: &Fields) -> rusqlite::Result<Upserted> {
  if student_exists(conn, id)? {
    if !fields.is_empty() {
      let assignments = fields
        .keys()
        .map(|c| format!("{} = ?", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
      let mut values: Vec<Option<&str>> = fields.values().map(|v| v.as_deref()).collect();
      values.push(Some(id));
      conn.execute(
        &format!(
          "UPDATE {STUDENTS} SET {assignments} WHERE {} = ?",
          quote_ident(IDENTIFIER)
        ),
        params_from_iter(values),
      )?;
    }
    return Ok(Upserted::Updated);
  }

  let mut columns = vec![IDENTIFIER];
  columns.extend(fields.keys().map(String::as_str));
  let placeholders = vec!["?"; columns.len()].join(", ");
  let mut values: Vec<Option<&str>> = vec![Some(id)];
  values.extend(fields.values().map(|v| v.as_deref()));
  conn.execute(
    &format!("INSERT INTO {STUDENTS} ({}) VALUES ({placeholders})", quote_list(&columns)),
    params_from_iter(values),
  )?;
  Ok(Upserted::Inserted)
}

/// [`write_row`] in its own transaction.
fn write_row_atomic(
  conn: &mut rusqlite::Connection,
  id: &str,
  fields: &Fields,
) -> rusqlite::Result<Upserted> {
  let tx = conn.transaction()?;
  let upserted = write_row(&tx, id, fields)?;
  tx.commit()?;
  Ok(upserted)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A student roster backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Current schema plus the subset of `ids` already stored.
  async fn existing(&self, ids: Vec<String>) -> Result<(Vec<String>, HashSet<String>)> {
    let found = self
      .conn
      .call(move |conn| {
        let columns = table_columns(conn)?;
        let mut stmt = conn.prepare(&format!(
          "SELECT 1 FROM {STUDENTS} WHERE {} = ?1",
          quote_ident(IDENTIFIER)
        ))?;
        let mut existing = HashSet::new();
        for id in ids {
          if stmt.exists([&id])? {
            existing.insert(id);
          }
        }
        Ok((columns, existing))
      })
      .await?;
    Ok(found)
  }

  async fn plan_prepared(&self, prepared: &PreparedImport) -> Result<ImportPlan> {
    let (columns, existing_ids) = self.existing(prepared.ids()).await?;
    Ok(prepared.plan(&columns, &existing_ids))
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Run arbitrary SQL, for fixtures the public API cannot express.
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RosterStore impl ────────────────────────────────────────────────────────

impl RosterStore for SqliteStore {
  type Error = crate::Error;

  // ── Records ───────────────────────────────────────────────────────────────

  async fn upsert(&self, id: String, fields: Fields) -> Result<Upserted> {
    let id = id.trim().to_owned();
    if id.is_empty() {
      return Err(roster_core::Error::EmptyIdentifier.into());
    }
    if fields.keys().any(|c| same_column(c, IDENTIFIER)) {
      return Err(roster_core::Error::ImmutableIdentifier.into());
    }

    let checked: Checked<Upserted> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let schema = table_columns(&tx)?;
        if let Some(unknown) = fields.keys().find(|c| find_column(&schema, c).is_none()) {
          return Ok(Err(roster_core::Error::ColumnNotFound(unknown.clone())));
        }
        let upserted = write_row(&tx, &id, &fields)?;
        tx.commit()?;
        tracing::debug!(%id, ?upserted, fields = fields.len(), "upserted student");
        Ok(Ok(upserted))
      })
      .await?;
    Ok(checked?)
  }

  async fn get(&self, id: String) -> Result<Option<StudentRecord>> {
    let id = id.trim().to_owned();
    let record = self
      .conn
      .call(move |conn| {
        let schema = table_columns(conn)?;
        let sql = format!(
          "SELECT {} FROM {STUDENTS} WHERE {} = ?1",
          quote_list(&schema),
          quote_ident(IDENTIFIER)
        );
        let record = conn
          .query_row(&sql, [&id], |row| {
            let mut fields = Fields::new();
            for (idx, name) in schema.iter().enumerate() {
              if name != IDENTIFIER {
                fields.insert(name.clone(), cell_text(row.get_ref(idx)?));
              }
            }
            Ok(StudentRecord { id: id.clone(), fields })
          })
          .optional()?;
        Ok(record)
      })
      .await?;
    Ok(record)
  }

  async fn delete(&self, ids: BTreeSet<String>) -> Result<usize> {
    let ids: BTreeSet<String> = ids.into_iter().map(|id| id.trim().to_owned()).collect();
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
          let mut stmt = tx.prepare(&format!(
            "DELETE FROM {STUDENTS} WHERE {} = ?1",
            quote_ident(IDENTIFIER)
          ))?;
          for id in &ids {
            removed += stmt.execute([id])?;
          }
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;
    tracing::info!(removed, "deleted students");
    Ok(removed)
  }

  async fn select(&self, columns: Vec<String>, predicate: Predicate) -> Result<RecordSet> {
    let requested = export_columns(&columns);

    let checked: Checked<RecordSet> = self
      .conn
      .call(move |conn| {
        let schema = table_columns(conn)?;

        let mut projection = Vec::with_capacity(requested.len());
        for name in &requested {
          match find_column(&schema, name) {
            Some(actual) => projection.push(actual.to_owned()),
            None => return Ok(Err(roster_core::Error::ColumnNotFound(name.clone()))),
          }
        }

        // A name search over a column nobody has imported yet matches nothing.
        let filter_column = match predicate.column() {
          None => None,
          Some(name) => match (find_column(&schema, name), &predicate) {
            (Some(actual), _) => Some(actual.to_owned()),
            (None, Predicate::Contains { .. }) => return Ok(Ok(RecordSet::empty(projection))),
            (None, _) => return Ok(Err(roster_core::Error::ColumnNotFound(name.to_owned()))),
          },
        };

        let mut select_list = projection.clone();
        let mut param = None;
        let mut needle = None;
        let where_clause = match (&predicate, filter_column) {
          (Predicate::Equals { value, .. }, Some(column)) => {
            param = Some(value.clone());
            format!("WHERE {} = ?1", quote_ident(&column))
          }
          (Predicate::Contains { needle: n, .. }, Some(column)) => {
            needle = Some(n.as_str());
            let clause = format!("WHERE {} IS NOT NULL", quote_ident(&column));
            select_list.push(column);
            clause
          }
          _ => String::new(),
        };

        let sql = format!(
          "SELECT {} FROM {STUDENTS} {where_clause} ORDER BY rowid",
          quote_list(&select_list)
        );
        let width = select_list.len();
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
          .query_map(params_from_iter(param.iter()), |row| {
            (0..width)
              .map(|idx| row.get_ref(idx).map(cell_text))
              .collect::<rusqlite::Result<Vec<_>>>()
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let rows = raw
          .into_iter()
          .filter_map(|mut values| {
            if let Some(needle) = needle {
              let haystack = values.pop().flatten();
              if !haystack.is_some_and(|h| contains_ignore_case(&h, needle)) {
                return None;
              }
            }
            let id = values.first().cloned().flatten().unwrap_or_default();
            Some(Row { id, values })
          })
          .collect();

        Ok(Ok(RecordSet { columns: projection, rows }))
      })
      .await?;
    Ok(checked?)
  }

  // ── Columns ───────────────────────────────────────────────────────────────

  async fn add_column(&self, name: String) -> Result<bool> {
    check_column_name(&name)?;
    let seen_at = encode_dt(Utc::now());

    let (added, name) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if find_column(&table_columns(&tx)?, &name).is_some() {
          return Ok((false, name));
        }
        insert_column(&tx, &name, &seen_at)?;
        tx.commit()?;
        Ok((true, name))
      })
      .await?;

    if added {
      tracing::info!(column = %name, "added column");
    }
    Ok(added)
  }

  async fn drop_columns(&self, names: BTreeSet<String>) -> Result<Vec<String>> {
    if let Some(protected) = names.iter().find(|n| same_column(n, IDENTIFIER)) {
      return Err(roster_core::Error::ProtectedColumn(protected.clone()).into());
    }

    let dropped = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let schema = table_columns(&tx)?;
        let (dropped, keep): (Vec<String>, Vec<String>) = schema
          .into_iter()
          .partition(|c| names.iter().any(|n| same_column(n, c)));
        if dropped.is_empty() {
          return Ok(dropped);
        }

        // Shadow-table rebuild: create, copy kept columns, drop, rename.
        let definitions = keep
          .iter()
          .map(|c| format!("{} TEXT", quote_ident(c)))
          .collect::<Vec<_>>()
          .join(", ");
        let kept = quote_list(&keep);
        tx.execute_batch(&format!(
          "DROP TABLE IF EXISTS {STUDENTS_REBUILD};
           CREATE TABLE {STUDENTS_REBUILD} ({definitions}, PRIMARY KEY ({}));
           INSERT INTO {STUDENTS_REBUILD} ({kept}) SELECT {kept} FROM {STUDENTS} ORDER BY rowid;
           DROP TABLE {STUDENTS};
           ALTER TABLE {STUDENTS_REBUILD} RENAME TO {STUDENTS};",
          quote_ident(IDENTIFIER)
        ))?;

        {
          let mut unmap = tx.prepare("DELETE FROM column_category_map WHERE column_name = ?1")?;
          let mut forget = tx.prepare("DELETE FROM column_history WHERE column_name = ?1")?;
          for column in &dropped {
            unmap.execute([column])?;
            forget.execute([column])?;
          }
        }

        tx.commit()?;
        Ok(dropped)
      })
      .await?;

    if !dropped.is_empty() {
      tracing::info!(columns = ?dropped, "dropped columns");
    }
    Ok(dropped)
  }

  async fn list_columns(&self) -> Result<Vec<ColumnInfo>> {
    let raws: Vec<RawColumn> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT p.name, h.first_upload_time
           FROM pragma_table_info(?1) AS p
           LEFT JOIN column_history AS h ON h.column_name = p.name
           ORDER BY p.cid",
        )?;
        let rows = stmt
          .query_map([STUDENTS], |row| {
            Ok(RawColumn {
              name:       row.get(0)?,
              first_seen: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawColumn::into_column).collect())
  }

  async fn distinct_values(&self, column: String) -> Result<Vec<String>> {
    let checked: Checked<Vec<String>> = self
      .conn
      .call(move |conn| {
        let schema = table_columns(conn)?;
        let Some(actual) = find_column(&schema, &column) else {
          return Ok(Err(roster_core::Error::ColumnNotFound(column)));
        };
        let quoted = quote_ident(actual);
        let mut stmt = conn.prepare(&format!(
          "SELECT DISTINCT {quoted} FROM {STUDENTS} WHERE {quoted} IS NOT NULL AND {quoted} != ''"
        ))?;
        let mut values: Vec<String> = stmt
          .query_map([], |row| row.get_ref(0).map(cell_text))?
          .collect::<rusqlite::Result<Vec<_>>>()?
          .into_iter()
          .flatten()
          .collect();
        values.sort();
        values.dedup();
        Ok(Ok(values))
      })
      .await?;
    Ok(checked?)
  }

  // ── Categories ────────────────────────────────────────────────────────────

  async fn create_category(&self, name: String) -> Result<Category> {
    if name.trim().is_empty() {
      return Err(roster_core::Error::InvalidCategoryName(name).into());
    }
    let created_at = Utc::now();
    let created_at_str = encode_dt(created_at);

    let checked: Checked<Category> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if category_exists(&tx, &name)? {
          return Ok(Err(roster_core::Error::DuplicateCategory(name)));
        }
        tx.execute(
          "INSERT INTO column_categories (category_name, created_at) VALUES (?1, ?2)",
          params![name, created_at_str],
        )?;
        tx.commit()?;
        Ok(Ok(Category { name, created_at }))
      })
      .await?;

    let category = checked?;
    tracing::info!(category = %category.name, "created category");
    Ok(category)
  }

  async fn rename_category(&self, old: String, new: String) -> Result<()> {
    if new.trim().is_empty() {
      return Err(roster_core::Error::InvalidCategoryName(new).into());
    }

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !category_exists(&tx, &old)? {
          return Ok(Err(roster_core::Error::CategoryNotFound(old)));
        }
        if old == new {
          return Ok(Ok(()));
        }
        if category_exists(&tx, &new)? {
          return Ok(Err(roster_core::Error::DuplicateCategory(new)));
        }
        tx.execute(
          "UPDATE column_categories SET category_name = ?1 WHERE category_name = ?2",
          params![new, old],
        )?;
        tx.execute(
          "UPDATE column_category_map SET category_name = ?1 WHERE category_name = ?2",
          params![new, old],
        )?;
        tx.commit()?;
        tracing::info!(from = %old, to = %new, "renamed category");
        Ok(Ok(()))
      })
      .await?;
    Ok(checked?)
  }

  async fn delete_category(&self, name: String) -> Result<usize> {
    let checked: Checked<usize> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !category_exists(&tx, &name)? {
          return Ok(Err(roster_core::Error::CategoryNotFound(name)));
        }
        let unmapped = tx.execute(
          "DELETE FROM column_category_map WHERE category_name = ?1",
          [&name],
        )?;
        tx.execute("DELETE FROM column_categories WHERE category_name = ?1", [&name])?;
        tx.commit()?;
        tracing::info!(category = %name, unmapped, "deleted category");
        Ok(Ok(unmapped))
      })
      .await?;
    Ok(checked?)
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let raws: Vec<RawCategory> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT category_name, created_at FROM column_categories")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCategory {
              name:       row.get(0)?,
              created_at: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut categories = raws
      .into_iter()
      .map(RawCategory::into_category)
      .collect::<Result<Vec<_>>>()?;
    sort_categories(&mut categories);
    Ok(categories)
  }

  async fn set_mapping(&self, column: String, bucket: Bucket) -> Result<()> {
    if same_column(&column, IDENTIFIER) {
      return Err(roster_core::Error::ProtectedColumn(column).into());
    }

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let schema = table_columns(&tx)?;
        let Some(actual) = find_column(&schema, &column).map(str::to_owned) else {
          return Ok(Err(roster_core::Error::ColumnNotFound(column)));
        };
        match &bucket {
          Bucket::Unclassified => {
            tx.execute("DELETE FROM column_category_map WHERE column_name = ?1", [&actual])?;
          }
          Bucket::Named(category) => {
            if !category_exists(&tx, category)? {
              return Ok(Err(roster_core::Error::CategoryNotFound(category.clone())));
            }
            tx.execute(
              "INSERT INTO column_category_map (column_name, category_name) VALUES (?1, ?2)
               ON CONFLICT(column_name) DO UPDATE SET category_name = excluded.category_name",
              params![actual, category],
            )?;
          }
        }
        tx.commit()?;
        tracing::debug!(column = %actual, bucket = %bucket, "set column category");
        Ok(Ok(()))
      })
      .await?;
    Ok(checked?)
  }

  async fn category_map(&self) -> Result<CategoryMap> {
    let mapping = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT column_name, category_name FROM column_category_map
           WHERE category_name IS NOT NULL",
        )?;
        let mapping = stmt
          .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
          .collect::<rusqlite::Result<CategoryMap>>()?;
        Ok(mapping)
      })
      .await?;
    Ok(mapping)
  }

  // ── Import ────────────────────────────────────────────────────────────────

  async fn plan_import(&self, sheet: &Sheet) -> Result<ImportPlan> {
    let prepared = PreparedImport::from_sheet(sheet)?;
    self.plan_prepared(&prepared).await
  }

  async fn commit_import(&self, sheet: Sheet, approval: ImportApproval) -> Result<ImportOutcome> {
    let prepared = PreparedImport::from_sheet(&sheet)?;
    let plan = self.plan_prepared(&prepared).await?;
    plan.check(&approval)?;

    for column in &plan.new_columns {
      self.add_column(column.clone()).await?;
    }

    let attempted = prepared.rows.len();
    let rows = prepared.rows;
    let (committed, failure) = self
      .conn
      .call(move |conn| {
        let mut committed = 0;
        for row in &rows {
          if let Err(e) = write_row_atomic(conn, &row.id, &row.fields) {
            return Ok((committed, Some(format!("student {:?}: {e}", row.id))));
          }
          committed += 1;
        }
        Ok((committed, None))
      })
      .await?;

    if let Some(cause) = failure {
      tracing::warn!(committed, attempted, %cause, "import interrupted");
      return Err(roster_core::Error::ImportInterrupted { committed, attempted, cause }.into());
    }

    tracing::info!(
      rows = committed,
      new_columns = plan.new_columns.len(),
      overwritten = plan.existing_ids.len(),
      "import committed"
    );
    Ok(ImportOutcome {
      rows_imported:        committed,
      new_columns:          plan.new_columns,
      overlapping_columns:  plan.overlapping_columns,
      overwritten_students: plan.existing_ids.len(),
    })
  }

  // ── View ──────────────────────────────────────────────────────────────────

  async fn load_view(&self, order: &ColumnOrder) -> Result<RosterView> {
    let columns: Vec<String> = self
      .list_columns()
      .await?
      .into_iter()
      .map(|c| c.name)
      .collect();
    let categories = self.list_categories().await?;
    let mapping = match self.category_map().await {
      Ok(mapping) => mapping,
      Err(error) => {
        tracing::warn!(%error, "could not load column categories; treating all as unclassified");
        CategoryMap::default()
      }
    };
    Ok(RosterView::new(order, &columns, categories, mapping))
  }
}
