//! Storage contract for embedded FAQ documents.
//!
//! The FAQ handler only needs "add documents with metadata under stable ids"
//! and "nearest documents for an embedding". The bundled implementation is
//! `SqliteVectorStore`; a hosted vector database can sit behind the same
//! trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored document with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Identifier, unique within its collection.
    pub id: String,
    /// The embedded text.
    pub document: String,
    /// Arbitrary metadata (JSON object).
    pub metadata: serde_json::Value,
}

/// Result of a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub document: StoredDocument,
    /// Similarity score (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn collection_exists(&self, collection: &str) -> Result<bool, ApiError>;

    /// Add documents, creating the collection if needed. Documents whose id
    /// is already present are left untouched. Returns how many were inserted.
    async fn add(
        &self,
        collection: &str,
        items: Vec<(StoredDocument, Vec<f32>)>,
    ) -> Result<usize, ApiError>;

    /// The `limit` documents closest to the query embedding.
    async fn query(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<DocumentMatch>, ApiError>;

    async fn count(&self, collection: &str) -> Result<usize, ApiError>;
}
