//! Bulk import of RDF documents into a [`folio_core::CatalogStore`].
//!
//! A [`DocumentSource`] stages the documents, an [`Importer`] runs them
//! through the extractor and into the store, and [`ImportStats`] collects
//! the outcome of every document.

mod engine;
mod stats;

pub mod error;
pub mod source;

pub use engine::{ImportConfig, Importer};
pub use error::{DocumentError, Error, Result};
pub use source::{ArchiveSource, DirectorySource, DocumentSource, StagedDocuments, StagingMode};
pub use stats::{ERROR_RING_CAPACITY, FailureCounts, FailureKind, ImportStats, ImportSummary};

#[cfg(test)]
mod tests;
