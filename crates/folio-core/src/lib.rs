//! Core types and trait definitions for the Folio catalog importer.
//!
//! No XML or database dependencies live here. The extractor, the store
//! backends and the import engine all depend on it.

// Store impls use `async fn`; the trait spells out the `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod record;
pub mod store;

pub use error::{Error, Result};
pub use record::{Contributor, Format, Record};
pub use store::CatalogStore;
