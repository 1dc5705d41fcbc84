//! Error types for `folio-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The document decoded, but no numeric ebook identifier was found in its
  /// `rdf:about` URI.
  #[error("record has no ebook identifier")]
  MissingIdentifier,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
