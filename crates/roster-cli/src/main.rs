//! `roster`: command-line front-end for the student roster.
//!
//! # Usage
//!
//! ```text
//! roster import class.xlsx
//! roster show --category 成绩 --column 中考成绩 --value 600
//! roster search 张
//! roster export out.xlsx --columns 姓名,电话号码 --name 张
//! roster category assign 中考成绩 成绩
//! ```
//!
//! Settings come from `roster.toml` (or `--config`), overridden by `ROSTER_*`
//! environment variables, overridden by `--db`.

mod commands;
mod prompt;
mod render;
mod settings;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use commands::FilterArgs;
use roster_store_sqlite::SqliteStore;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "roster", version, about = "Student roster: import, classify, filter and export")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "roster.toml")]
  config: PathBuf,

  /// SQLite database file; overrides the configured one.
  #[arg(long, value_name = "FILE")]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List columns grouped by category.
  Columns {
    #[arg(long)]
    json: bool,
  },

  /// Show students, optionally filtered and projected.
  Show {
    #[command(flatten)]
    filter:  FilterArgs,
    /// Columns to show (the identifier is always first).
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
    #[arg(long)]
    json:    bool,
  },

  /// Search student names, case-insensitively.
  Search {
    needle: String,
    #[arg(long)]
    json:   bool,
  },

  /// List a category's columns, or the values present in a column.
  Filter {
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    column:   Option<String>,
  },

  /// Show every field of one student.
  Get {
    id:   String,
    #[arg(long)]
    json: bool,
  },

  /// Add a student or edit fields: `roster set S001 姓名=张三 电话号码=`.
  Set {
    id:          String,
    /// COLUMN=VALUE pairs; an empty value clears the field.
    #[arg(required = true, value_parser = commands::parse_assignment)]
    assignments: Vec<(String, Option<String>)>,
  },

  /// Delete students by identifier.
  Delete {
    #[arg(required = true)]
    ids: Vec<String>,
    /// Do not ask for confirmation.
    #[arg(short, long)]
    yes: bool,
  },

  /// Add an empty column.
  AddColumn { name: String },

  /// Drop columns and every value in them.
  DropColumn {
    #[arg(required = true)]
    names: Vec<String>,
    #[arg(short, long)]
    yes:   bool,
  },

  /// Merge a spreadsheet into the roster by identifier.
  Import {
    file:    PathBuf,
    /// Approve every change without asking.
    #[arg(short, long)]
    yes:     bool,
    /// Only report what the import would change.
    #[arg(long, conflicts_with = "yes")]
    dry_run: bool,
  },

  /// Write students to an .xlsx or .csv file.
  Export {
    file:    PathBuf,
    #[command(flatten)]
    filter:  FilterArgs,
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
  },

  /// Manage column categories.
  #[command(subcommand)]
  Category(CategoryCommand),
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
  List {
    #[arg(long)]
    json: bool,
  },
  Create {
    name: String,
  },
  Rename {
    old: String,
    new: String,
  },
  /// Delete a category; its columns become unclassified.
  Delete {
    name: String,
    #[arg(short, long)]
    yes:  bool,
  },
  /// Put a column in a category, or take it out with `--unclassified`.
  Assign {
    column:       String,
    #[arg(required_unless_present = "unclassified")]
    category:     Option<String>,
    #[arg(long, conflicts_with = "category")]
    unclassified: bool,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)?;
  if let Some(db) = cli.db {
    settings.database = db;
  }
  let order = settings.column_order();

  let store = SqliteStore::open(&settings.database)
    .await
    .with_context(|| format!("failed to open roster at {}", settings.database.display()))?;
  tracing::debug!(database = %settings.database.display(), "opened roster");

  match cli.command {
    Command::Columns { json } => commands::columns(&store, &order, json).await,
    Command::Show { filter, columns, json } => {
      commands::show(&store, &order, &filter, &columns, json).await
    }
    Command::Search { needle, json } => {
      let filter = FilterArgs { name: Some(needle), ..FilterArgs::default() };
      commands::show(&store, &order, &filter, &[], json).await
    }
    Command::Filter { category, column } => commands::filter(&store, &order, category, column).await,
    Command::Get { id, json } => commands::get(&store, &order, &id, json).await,
    Command::Set { id, assignments } => commands::set(&store, &id, assignments).await,
    Command::Delete { ids, yes } => commands::delete(&store, ids, yes).await,
    Command::AddColumn { name } => commands::add_column(&store, name).await,
    Command::DropColumn { names, yes } => commands::drop_columns(&store, names, yes).await,
    Command::Import { file, yes, dry_run } => commands::import(&store, &file, yes, dry_run).await,
    Command::Export { file, filter, columns } => {
      commands::export(&store, &order, &file, &filter, &columns).await
    }
    Command::Category(command) => match command {
      CategoryCommand::List { json } => commands::list_categories(&store, &order, json).await,
      CategoryCommand::Create { name } => commands::create_category(&store, name).await,
      CategoryCommand::Rename { old, new } => commands::rename_category(&store, old, new).await,
      CategoryCommand::Delete { name, yes } => commands::delete_category(&store, name, yes).await,
      CategoryCommand::Assign { column, category, .. } => {
        commands::assign(&store, column, category).await
      }
    },
  }
}
