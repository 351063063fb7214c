//! SQL schema for the roster SQLite store.
//!
//! Executed once at connection startup. Table names and shapes match
//! databases written by the earlier desktop tool, so those open unchanged.
//! Columns beyond the identifier are added to `students` at runtime.

/// Name of the dynamic record table.
pub const STUDENTS: &str = "students";

/// Scratch name used while rebuilding `students` without dropped columns.
pub const STUDENTS_REBUILD: &str = "students_rebuild";

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS students (
    \"学号\" TEXT PRIMARY KEY
);

-- One row per column ever introduced by an import or add-column.
CREATE TABLE IF NOT EXISTS column_history (
    column_name       TEXT PRIMARY KEY,
    first_upload_time TEXT
);

CREATE TABLE IF NOT EXISTS column_categories (
    category_name TEXT PRIMARY KEY,
    created_at    TEXT
);

-- Partial function column -> category. Unmapped columns are unclassified.
-- Kept consistent by explicit statements, not foreign keys.
CREATE TABLE IF NOT EXISTS column_category_map (
    column_name   TEXT PRIMARY KEY,
    category_name TEXT
);

CREATE INDEX IF NOT EXISTS column_category_map_category_idx
    ON column_category_map(category_name);

PRAGMA user_version = 1;
";
