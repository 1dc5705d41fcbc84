//! Error type for `folio-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] folio_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A record's transaction failed and was rolled back.
  #[error("failed to persist record {ebook_id}: {source}")]
  Persist {
    ebook_id: String,
    #[source]
    source:   rusqlite::Error,
  },

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
