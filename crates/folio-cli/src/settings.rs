//! Layered configuration: defaults, then `folio.toml`, then `FOLIO_*`
//! environment variables. Command-line flags are applied on top by `main`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use folio_import::{ImportConfig, StagingMode};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub store_path: PathBuf,
  pub archive:    PathBuf,
  pub staging:    StagingMode,
  pub batch_size: usize,
  pub workers:    usize,
  pub resume:     bool,
}

impl Settings {
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let defaults = ImportConfig::default();
    let settings = config::Config::builder()
      .set_default("store_path", "catalog.db")?
      .set_default("archive", "rdf-files.tar.zip")?
      .set_default("staging", "persistent")?
      .set_default("batch_size", defaults.batch_size as i64)?
      .set_default("workers", defaults.workers as i64)?
      .set_default("resume", defaults.resume)?
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::with_prefix("FOLIO").try_parsing(true))
      .build()
      .with_context(|| format!("failed to read config file {}", file.display()))?;

    let mut settings: Self = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    settings.archive = expand_tilde(&settings.archive);
    Ok(settings)
  }

  pub fn import_config(&self) -> ImportConfig {
    ImportConfig {
      batch_size: self.batch_size,
      workers:    self.workers,
      resume:     self.resume,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
