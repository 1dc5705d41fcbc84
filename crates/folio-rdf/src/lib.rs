//! RDF/XML metadata extractor for Folio.
//!
//! Turns one Project Gutenberg style RDF document into a
//! [`folio_core::Record`]. Pure and synchronous: no I/O beyond reading the
//! document handed in.
//!
//! # Quick start
//!
//! ```no_run
//! let rdf = std::fs::read_to_string("pg84.rdf").unwrap();
//! let record = folio_rdf::parse(&rdf).unwrap();
//! println!("{:?}: {:?}", record.ebook_id, record.title);
//! ```

pub mod error;
mod extract;
mod rules;
mod tree;

use std::path::Path;

pub use error::{Error, Result};
use folio_core::Record;
pub use rules::split_name;

/// Parse a record from an RDF/XML string.
pub fn parse(input: &str) -> Result<Record> { parse_bytes(input.as_bytes()) }

/// Parse a record from raw RDF/XML bytes.
///
/// Fails with [`Error::Malformed`] only when the content has no `RDF` root
/// with an `ebook` element; absent optional fields are left as `None`.
pub fn parse_bytes(input: &[u8]) -> Result<Record> {
  let root = tree::parse(input)?;
  extract::extract(&root)
}

/// Read and parse the document at `path`.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Record> {
  let bytes = std::fs::read(path)?;
  parse_bytes(&bytes)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
