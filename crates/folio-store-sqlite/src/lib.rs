//! SQLite backend for the Folio catalog.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a single dedicated
//! thread without blocking the async runtime. That thread is the store's only
//! writer; concurrent callers are served one transaction at a time.

mod encode;
mod report;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use report::{CatalogReport, RecordSample, StoredRecord, TableCount};
pub use store::SqliteStore;
