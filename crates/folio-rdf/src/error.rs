//! Error types for the folio-rdf extractor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The content could not be decoded as an RDF document with an ebook
  /// element. Missing optional fields never produce this error.
  #[error("malformed document: {0}")]
  Malformed(String),

  #[error("failed to read document: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
