//! docchat-text
//!
//! Tantivy-backed document store. One index holds every chunk of every
//! ingested page; the same handle serves ingestion (`index` module) and
//! passage retrieval (`search` module).
pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::TantivyStore;
