//! Layered settings: defaults, then the TOML file, then `ROSTER_*` variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use roster_core::ordering::{ColumnOrder, DEFAULT_PREFERRED_ORDER};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
  /// SQLite file holding the roster. A leading `~/` is expanded.
  #[serde(default = "default_database")]
  pub database:        PathBuf,
  /// Columns that lead the display order.
  #[serde(default = "default_preferred_order")]
  pub preferred_order: Vec<String>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      database:        default_database(),
      preferred_order: default_preferred_order(),
    }
  }
}

fn default_database() -> PathBuf { PathBuf::from("roster.db") }

fn default_preferred_order() -> Vec<String> {
  DEFAULT_PREFERRED_ORDER
    .iter()
    .map(|s| (*s).to_owned())
    .collect()
}

impl Settings {
  /// Read `path` if it exists and overlay the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("ROSTER")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("preferred_order"),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut settings: Self = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.database = expand_tilde(&settings.database);
    Ok(settings)
  }

  pub fn column_order(&self) -> ColumnOrder { ColumnOrder::new(self.preferred_order.iter().cloned()) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
