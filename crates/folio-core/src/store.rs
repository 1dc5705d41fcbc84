//! The `CatalogStore` trait.
//!
//! Implemented by storage backends (e.g. `folio-store-sqlite`). The import
//! engine depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::record::Record;

/// Abstraction over a persistent catalog backend.
///
/// Backends serialize writes behind a single writer; callers must not assume
/// that concurrent calls execute in parallel.
///
/// All methods return `Send` futures so the trait can be driven from tasks on
/// a multi-threaded tokio runtime.
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether a record with `ebook_id` has been committed.
  fn exists<'a>(
    &'a self,
    ebook_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Insert or update `record` and all of its sub-entities atomically.
  ///
  /// On failure nothing of the record is persisted.
  fn upsert(
    &self,
    record: Record,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Upsert every record in `records`, each in its own transaction.
  ///
  /// The outer `Result` fails only when the backend itself is unusable; the
  /// inner results are in the same order as `records`.
  fn upsert_batch(
    &self,
    records: Vec<Record>,
  ) -> impl Future<Output = Result<Vec<Result<(), Self::Error>>, Self::Error>> + Send + '_;
}
