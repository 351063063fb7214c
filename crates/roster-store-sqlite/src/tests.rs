//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use roster_core::{
  IDENTIFIER,
  category::{Bucket, CategoryMap},
  cell::CellValue,
  filter::{ActiveFilter, CategoryScope, FilterState},
  import::{ChangeKind, ImportApproval, Sheet},
  ordering::ColumnOrder,
  record::{Fields, Predicate, Upserted},
  store::RosterStore,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn sheet(columns: &[&str], rows: &[&[&str]]) -> Sheet {
  Sheet::new(
    columns.iter().map(|c| (*c).to_owned()).collect(),
    rows
      .iter()
      .map(|r| r.iter().map(|v| CellValue::from(*v)).collect())
      .collect(),
  )
}

fn fields(pairs: &[(&str, &str)]) -> Fields {
  pairs
    .iter()
    .map(|(k, v)| ((*k).to_owned(), Some((*v).to_owned())))
    .collect()
}

fn set<const N: usize>(items: [&str; N]) -> BTreeSet<String> {
  items.into_iter().map(str::to_owned).collect()
}

async fn column_names(s: &SqliteStore) -> Vec<String> {
  s.list_columns()
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.name)
    .collect()
}

/// The two-student roster used across several tests.
async fn seeded() -> SqliteStore {
  let s = store().await;
  s.commit_import(
    sheet(&["学号", "姓名", "grade"], &[&["S001", "张三", "90"], &["S002", "李四", "85"]]),
    ImportApproval::all(),
  )
  .await
  .unwrap();
  s
}

async fn ids_matching(s: &SqliteStore, predicate: Predicate) -> Vec<String> {
  s.select(vec![], predicate)
    .await
    .unwrap()
    .rows
    .into_iter()
    .map(|r| r.id)
    .collect()
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_store_has_only_the_identifier_column() {
  let s = store().await;
  assert_eq!(column_names(&s).await, [IDENTIFIER]);
  assert!(s.list_categories().await.unwrap().is_empty());
  assert!(s.category_map().await.unwrap().is_empty());
}

#[tokio::test]
async fn add_column_is_idempotent_and_records_first_seen() {
  let s = store().await;
  assert!(s.add_column("phone".into()).await.unwrap());
  assert!(!s.add_column("phone".into()).await.unwrap());
  assert!(!s.add_column("PHONE".into()).await.unwrap());

  let columns = s.list_columns().await.unwrap();
  assert_eq!(columns.len(), 2);
  assert_eq!(columns[1].name, "phone");
  assert!(columns[1].first_seen.is_some());

  assert!(s.add_column("  ".into()).await.is_err());
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_inserts_then_updates_without_duplicating() {
  let s = store().await;
  s.add_column("姓名".into()).await.unwrap();
  s.add_column("grade".into()).await.unwrap();

  let first = s
    .upsert("S001".into(), fields(&[("姓名", "张三"), ("grade", "80")]))
    .await
    .unwrap();
  assert_eq!(first, Upserted::Inserted);

  let second = s
    .upsert("S001".into(), fields(&[("grade", "95")]))
    .await
    .unwrap();
  assert_eq!(second, Upserted::Updated);

  let all = s.select(vec![], Predicate::All).await.unwrap();
  assert_eq!(all.len(), 1);

  let record = s.get("S001".into()).await.unwrap().unwrap();
  assert_eq!(record.get("grade"), Some("95"));
  assert_eq!(record.get("姓名"), Some("张三"));
}

#[tokio::test]
async fn upsert_rejects_bad_identifiers_and_unknown_columns() {
  let s = store().await;

  let err = s.upsert("  ".into(), Fields::new()).await.unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::EmptyIdentifier)));

  let err = s
    .upsert("S001".into(), fields(&[(IDENTIFIER, "S002")]))
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::ImmutableIdentifier)));

  let err = s
    .upsert("S001".into(), fields(&[("nope", "1")]))
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::ColumnNotFound(_))));
  assert!(s.get("S001".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn identifiers_are_trimmed_for_every_lookup() {
  let s = seeded().await;
  let record = s.get("  S001 ".into()).await.unwrap().unwrap();
  assert_eq!(record.id, "S001");

  assert_eq!(s.delete(set([" S002\t"])).await.unwrap(), 1);
  assert_eq!(ids_matching(&s, Predicate::All).await, ["S001"]);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = seeded().await;
  assert!(s.get("S999".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_removes_only_named_students() {
  let s = seeded().await;
  let removed = s.delete(set(["S001", "S404"])).await.unwrap();
  assert_eq!(removed, 1);
  assert_eq!(ids_matching(&s, Predicate::All).await, ["S002"]);
}

#[tokio::test]
async fn select_projects_identifier_first_in_insertion_order() {
  let s = seeded().await;
  s.upsert("S000".into(), fields(&[("姓名", "王五")])).await.unwrap();

  let set = s
    .select(vec!["grade".into(), IDENTIFIER.into()], Predicate::All)
    .await
    .unwrap();
  assert_eq!(set.columns, [IDENTIFIER, "grade"]);
  assert_eq!(set.ids(), ["S001", "S002", "S000"]);
  assert_eq!(set.value(&set.rows[0], "grade"), Some("90"));
  assert_eq!(set.value(&set.rows[2], "grade"), None);

  let err = s
    .select(vec!["nope".into()], Predicate::All)
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::ColumnNotFound(_))));
}

#[tokio::test]
async fn distinct_values_are_sorted_and_skip_blanks() {
  let s = seeded().await;
  s.upsert("S003".into(), fields(&[("grade", "90")])).await.unwrap();
  s.upsert("S004".into(), fields(&[("grade", "")])).await.unwrap();
  s.upsert("S005".into(), Fields::new()).await.unwrap();

  assert_eq!(s.distinct_values("grade".into()).await.unwrap(), ["85", "90"]);
}

// ─── Filtering ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn value_filter_and_name_search() {
  let s = seeded().await;

  let by_grade = ids_matching(&s, Predicate::Equals {
    column: "grade".into(),
    value:  "90".into(),
  })
  .await;
  assert_eq!(by_grade, ["S001"]);

  assert_eq!(ids_matching(&s, Predicate::name_search("四")).await, ["S002"]);
  assert!(
    ids_matching(&s, Predicate::name_search("%"))
      .await
      .is_empty()
  );
}

#[tokio::test]
async fn name_search_is_case_insensitive() {
  let s = store().await;
  s.commit_import(
    sheet(&["学号", "姓名"], &[&["S001", "Alice"], &["S002", "Bob"]]),
    ImportApproval::all(),
  )
  .await
  .unwrap();
  assert_eq!(ids_matching(&s, Predicate::name_search("ALI")).await, ["S001"]);
}

#[tokio::test]
async fn name_search_without_name_column_is_empty() {
  let s = store().await;
  s.upsert("S001".into(), Fields::new()).await.unwrap();
  assert!(ids_matching(&s, Predicate::name_search("a")).await.is_empty());
}

#[tokio::test]
async fn filter_state_drives_a_category_scoped_query() {
  let s = seeded().await;
  s.create_category("成绩".into()).await.unwrap();
  s.set_mapping("grade".into(), Bucket::named("成绩"))
    .await
    .unwrap();

  let view = s.load_view(&ColumnOrder::default()).await.unwrap();
  let mut state = FilterState::new(&view);
  state
    .set_scope(CategoryScope::Only("成绩".into()), &view)
    .unwrap();
  assert_eq!(state.selectable_columns(), ["grade"]);

  let values = s.distinct_values("grade".into()).await.unwrap();
  state.select_value(values[1].clone()).unwrap();
  let filter = state.active().unwrap();
  assert_eq!(filter, ActiveFilter::Value { column: "grade".into(), value: "90".into() });
  assert_eq!(ids_matching(&s, filter.predicate()).await, ["S001"]);
}

// ─── Columns ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn drop_columns_cascades_to_mapping_and_keeps_rows() {
  let s = seeded().await;
  s.create_category("成绩".into()).await.unwrap();
  s.set_mapping("grade".into(), Bucket::named("成绩"))
    .await
    .unwrap();

  let dropped = s.drop_columns(set(["grade", "missing"])).await.unwrap();
  assert_eq!(dropped, ["grade"]);
  assert_eq!(column_names(&s).await, [IDENTIFIER, "姓名"]);
  assert!(s.category_map().await.unwrap().is_empty());

  let record = s.get("S002".into()).await.unwrap().unwrap();
  assert_eq!(record.get("姓名"), Some("李四"));
  assert_eq!(ids_matching(&s, Predicate::All).await, ["S001", "S002"]);

  // The rebuilt table still rejects duplicate identifiers.
  s.upsert("S001".into(), fields(&[("姓名", "张三丰")])).await.unwrap();
  assert_eq!(ids_matching(&s, Predicate::All).await.len(), 2);
}

#[tokio::test]
async fn row_id_aliases_cannot_become_columns() {
  let s = seeded().await;
  for name in ["rowid", "OID", "_rowid_"] {
    let err = s.add_column(name.into()).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(roster_core::Error::InvalidColumnName(_))), "{name}");
  }

  let incoming = sheet(&["学号", "rowid"], &[&["S003", "zz"], &["S004", "aa"]]);
  let err = s.plan_import(&incoming).await.unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::InvalidColumnName(_))));
  let err = s
    .commit_import(incoming, ImportApproval::all())
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::InvalidColumnName(_))));

  assert_eq!(column_names(&s).await, [IDENTIFIER, "姓名", "grade"]);
  assert_eq!(ids_matching(&s, Predicate::All).await, ["S001", "S002"]);
}

#[tokio::test]
async fn identifier_column_cannot_be_dropped() {
  let s = seeded().await;
  let err = s
    .drop_columns(set([IDENTIFIER, "grade"]))
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::ProtectedColumn(_))));
  assert_eq!(column_names(&s).await, [IDENTIFIER, "姓名", "grade"]);
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn categories_are_unique_and_sorted() {
  let s = store().await;
  s.create_category("beta".into()).await.unwrap();
  s.create_category("Alpha".into()).await.unwrap();

  let err = s.create_category("beta".into()).await.unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::DuplicateCategory(_))));
  assert!(s.create_category(" ".into()).await.is_err());

  let names: Vec<_> = s
    .list_categories()
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.name)
    .collect();
  assert_eq!(names, ["Alpha", "beta"]);
}

#[tokio::test]
async fn rename_category_carries_mappings() {
  let s = seeded().await;
  s.create_category("成绩".into()).await.unwrap();
  s.create_category("家庭".into()).await.unwrap();
  s.set_mapping("grade".into(), Bucket::named("成绩"))
    .await
    .unwrap();

  let err = s
    .rename_category("成绩".into(), "家庭".into())
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::DuplicateCategory(_))));

  s.rename_category("成绩".into(), "学业".into())
    .await
    .unwrap();
  let mapping = s.category_map().await.unwrap();
  assert_eq!(mapping.category_of("grade"), Some("学业"));

  let err = s
    .rename_category("成绩".into(), "x".into())
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::CategoryNotFound(_))));
}

#[tokio::test]
async fn delete_category_leaves_columns_unclassified() {
  let s = seeded().await;
  s.create_category("成绩".into()).await.unwrap();
  s.set_mapping("grade".into(), Bucket::named("成绩"))
    .await
    .unwrap();

  assert_eq!(s.delete_category("成绩".into()).await.unwrap(), 1);
  assert!(s.list_categories().await.unwrap().is_empty());
  assert_eq!(column_names(&s).await, [IDENTIFIER, "姓名", "grade"]);

  let view = s.load_view(&ColumnOrder::default()).await.unwrap();
  assert_eq!(view.mapping, CategoryMap::new());
  let groups = view.groups(&ColumnOrder::default());
  assert_eq!(groups, [(Bucket::Unclassified, vec!["姓名".to_owned(), "grade".to_owned()])]);
}

#[tokio::test]
async fn set_mapping_validates_and_clears() {
  let s = seeded().await;
  s.create_category("成绩".into()).await.unwrap();

  let err = s
    .set_mapping(IDENTIFIER.into(), Bucket::named("成绩"))
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::ProtectedColumn(_))));

  let err = s
    .set_mapping("grade".into(), Bucket::named("nope"))
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::CategoryNotFound(_))));

  let err = s
    .set_mapping("nope".into(), Bucket::named("成绩"))
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::ColumnNotFound(_))));

  s.set_mapping("GRADE".into(), Bucket::named("成绩"))
    .await
    .unwrap();
  assert_eq!(s.category_map().await.unwrap().category_of("grade"), Some("成绩"));

  s.set_mapping("grade".into(), Bucket::Unclassified)
    .await
    .unwrap();
  assert!(s.category_map().await.unwrap().is_empty());
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn import_plan_reports_every_kind_of_change() {
  let s = seeded().await;
  let incoming = sheet(&["学号", "grade", "phone"], &[&["S001", "91", "123"], &["S003", "70", ""]]);

  let plan = s.plan_import(&incoming).await.unwrap();
  assert_eq!(plan.valid_rows, 2);
  assert_eq!(plan.new_columns, ["phone"]);
  assert_eq!(plan.overlapping_columns, ["grade"]);
  assert_eq!(plan.existing_ids, ["S001"]);
  assert_eq!(
    plan.changes(),
    [ChangeKind::OverwriteColumns, ChangeKind::NewColumns, ChangeKind::OverwriteStudents]
  );

  // Planning writes nothing.
  assert_eq!(column_names(&s).await, [IDENTIFIER, "姓名", "grade"]);
}

#[tokio::test]
async fn import_without_key_column_leaves_schema_unchanged() {
  let s = seeded().await;
  let err = s
    .commit_import(sheet(&["姓名", "phone"], &[&["王五", "1"]]), ImportApproval::all())
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::MissingKeyColumn)));
  assert_eq!(column_names(&s).await, [IDENTIFIER, "姓名", "grade"]);
}

#[tokio::test]
async fn import_with_only_blank_identifiers_is_rejected() {
  let s = store().await;
  let err = s
    .plan_import(&sheet(&["学号", "姓名"], &[&["", "王五"], &["  ", "赵六"]]))
    .await
    .unwrap_err();
  assert!(matches!(err.as_core(), Some(roster_core::Error::NoValidRows)));
}

#[tokio::test]
async fn withheld_approval_writes_nothing() {
  let s = seeded().await;
  let incoming = sheet(&["学号", "grade", "phone"], &[&["S001", "0", "123"]]);

  let approval = ImportApproval {
    add_new_columns:    true,
    overwrite_columns:  true,
    overwrite_students: false,
  };
  let err = s.commit_import(incoming, approval).await.unwrap_err();
  assert!(matches!(
    err.as_core(),
    Some(roster_core::Error::ImportDeclined(ChangeKind::OverwriteStudents))
  ));

  assert_eq!(column_names(&s).await, [IDENTIFIER, "姓名", "grade"]);
  let record = s.get("S001".into()).await.unwrap().unwrap();
  assert_eq!(record.get("grade"), Some("90"));
}

#[tokio::test]
async fn import_merges_by_identifier_and_preserves_other_columns() {
  let s = seeded().await;
  let outcome = s
    .commit_import(
      sheet(&["学号", "grade", "phone"], &[&["S001", "95", "123"], &["S003", "70", ""]]),
      ImportApproval::all(),
    )
    .await
    .unwrap();
  assert_eq!(outcome.rows_imported, 2);
  assert_eq!(outcome.new_columns, ["phone"]);
  assert_eq!(outcome.overwritten_students, 1);

  let s001 = s.get("S001".into()).await.unwrap().unwrap();
  assert_eq!(s001.get("姓名"), Some("张三"));
  assert_eq!(s001.get("grade"), Some("95"));
  assert_eq!(s001.get("phone"), Some("123"));

  let s003 = s.get("S003".into()).await.unwrap().unwrap();
  assert_eq!(s003.get("phone"), None);
  assert_eq!(s003.get("姓名"), None);

  assert_eq!(ids_matching(&s, Predicate::All).await, ["S001", "S002", "S003"]);
}

#[tokio::test]
async fn numeric_identifiers_are_canonicalised() {
  let s = store().await;
  s.commit_import(
    Sheet::new(vec!["学号".into(), "grade".into()], vec![vec![
      CellValue::Float(2024001.0),
      CellValue::Int(90),
    ]]),
    ImportApproval::all(),
  )
  .await
  .unwrap();

  let record = s.get("2024001".into()).await.unwrap().unwrap();
  assert_eq!(record.get("grade"), Some("90"));
}

#[tokio::test]
async fn duplicate_identifiers_in_one_sheet_keep_the_last_row() {
  let s = store().await;
  s.commit_import(
    sheet(&["学号", "grade"], &[&["S001", "60"], &["S001", "75"]]),
    ImportApproval::all(),
  )
  .await
  .unwrap();
  assert_eq!(ids_matching(&s, Predicate::All).await, ["S001"]);
  let record = s.get("S001".into()).await.unwrap().unwrap();
  assert_eq!(record.get("grade"), Some("75"));
}

// ─── View ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn load_view_orders_columns_and_groups_by_category() {
  let s = store().await;
  s.commit_import(
    sheet(&["学号", "zeta", "出生日期", "姓名", "alpha"], &[&["S001", "z", "2008-01-01", "张三", "a"]]),
    ImportApproval::all(),
  )
  .await
  .unwrap();
  s.create_category("基本".into()).await.unwrap();
  s.set_mapping("姓名".into(), Bucket::named("基本"))
    .await
    .unwrap();

  let order = ColumnOrder::default();
  let view = s.load_view(&order).await.unwrap();
  assert_eq!(view.columns, [IDENTIFIER, "姓名", "出生日期", "alpha", "zeta"]);
  assert_eq!(view.groups(&order), [
    (Bucket::named("基本"), vec!["姓名".to_owned()]),
    (Bucket::Unclassified, vec!["出生日期".to_owned(), "alpha".to_owned(), "zeta".to_owned()]),
  ]);
}

#[tokio::test]
async fn unreadable_first_seen_does_not_break_the_view() {
  let s = seeded().await;
  s.execute_raw("UPDATE column_history SET first_upload_time = '2024/01/01'")
    .await
    .unwrap();

  let view = s.load_view(&ColumnOrder::default()).await.unwrap();
  assert_eq!(view.columns, [IDENTIFIER, "姓名", "grade"]);
  let columns = s.list_columns().await.unwrap();
  assert!(columns.iter().all(|c| c.first_seen.is_none()));
}

#[tokio::test]
async fn export_then_import_into_a_fresh_store_roundtrips() {
  let s = seeded().await;
  s.commit_import(
    sheet(&["学号", "出生日期", "phone"], &[&["S001", "2008-01-01", ""], &["S003", "", "0123"]]),
    ImportApproval::all(),
  )
  .await
  .unwrap();

  let columns = column_names(&s).await;
  let exported = s.select(columns, Predicate::All).await.unwrap();

  let dir = tempfile::tempdir().unwrap();
  for file in ["roster.xlsx", "roster.csv"] {
    let path = dir.path().join(file);
    roster_sheet::write_records(&path, &exported).unwrap();

    let fresh = store().await;
    fresh
      .commit_import(roster_sheet::read_sheet(&path).unwrap(), ImportApproval::all())
      .await
      .unwrap();
    let reimported = fresh
      .select(column_names(&fresh).await, Predicate::All)
      .await
      .unwrap();
    assert_eq!(reimported, exported, "{file}");
  }
}

#[tokio::test]
async fn interrupted_import_keeps_earlier_rows() {
  let s = seeded().await;
  s.execute_raw(
    "CREATE TRIGGER reject_s004 BEFORE INSERT ON students
     WHEN NEW.\"学号\" = 'S004'
     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
  )
  .await
  .unwrap();

  let err = s
    .commit_import(
      sheet(&["学号", "grade"], &[&["S003", "70"], &["S004", "71"], &["S005", "72"]]),
      ImportApproval::all(),
    )
    .await
    .unwrap_err();
  match err.as_core() {
    Some(roster_core::Error::ImportInterrupted { committed, attempted, .. }) => {
      assert_eq!((*committed, *attempted), (1, 3));
    }
    other => panic!("unexpected error: {other:?}"),
  }

  assert_eq!(ids_matching(&s, Predicate::All).await, ["S001", "S002", "S003"]);
}
