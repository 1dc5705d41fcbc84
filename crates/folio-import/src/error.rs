//! Error types for the import engine and document sources.

use std::path::PathBuf;

use thiserror::Error;

use crate::stats::FailureKind;

/// Failures that stop a run before any document is processed.
#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid import configuration: {0}")]
  InvalidConfig(String),

  #[error("document source unavailable: {0}")]
  Source(String),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("zip error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("directory walk error: {0}")]
  Walk(#[from] walkdir::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why one document did not reach the catalog. Recorded, never propagated.
#[derive(Debug, Error)]
pub enum DocumentError {
  #[error("{}: {source}", .path.display())]
  Parse {
    path:   PathBuf,
    #[source]
    source: folio_rdf::Error,
  },

  #[error("{}: extraction aborted: {reason}", .path.display())]
  Aborted { path: PathBuf, reason: String },

  #[error("{}: record has no ebook identifier", .path.display())]
  MissingIdentifier { path: PathBuf },

  #[error("record {ebook_id}: {source}")]
  Persist {
    ebook_id: String,
    #[source]
    source:   Box<dyn std::error::Error + Send + Sync>,
  },
}

impl DocumentError {
  pub fn kind(&self) -> FailureKind {
    match self {
      Self::Parse { .. } | Self::Aborted { .. } => FailureKind::Parse,
      Self::MissingIdentifier { .. } => FailureKind::MissingIdentifier,
      Self::Persist { .. } => FailureKind::Persist,
    }
  }
}
