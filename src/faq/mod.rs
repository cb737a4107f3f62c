//! FAQ retrieval over policy documents.
//!
//! This module provides:
//! - `VectorStore`: storage contract for embedded documents
//! - `SqliteVectorStore`: the bundled SQLite implementation
//! - `FaqHandler`: CSV ingestion, top-k retrieval and grounded answers

mod handler;
mod ingest;
mod sqlite;
mod store;

pub use handler::{FaqHandler, IngestReport, NO_INFORMATION_REPLY};
pub use ingest::{read_faq_csv, FaqEntry};
pub use sqlite::SqliteVectorStore;
pub use store::{DocumentMatch, StoredDocument, VectorStore};
