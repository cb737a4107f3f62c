use std::path::Path;
use std::sync::Arc;

use super::ingest::{read_faq_csv, FaqEntry};
use super::store::VectorStore;
use crate::core::config::settings::FaqSettings;
use crate::core::errors::ApiError;
use crate::llm::LlmService;

pub const NO_INFORMATION_REPLY: &str =
    "I'm sorry, I don't have that specific information. Would you like to speak to a human?";

/// Result of an ingestion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestReport {
    /// The collection already existed; nothing was read or embedded.
    Skipped,
    Ingested { entries: usize },
}

/// Answers policy questions from the FAQ collection.
pub struct FaqHandler {
    store: Arc<dyn VectorStore>,
    llm: LlmService,
    collection: String,
    source_label: String,
    top_k: usize,
    store_name: String,
}

impl FaqHandler {
    pub fn new(
        store: Arc<dyn VectorStore>,
        llm: LlmService,
        settings: &FaqSettings,
        store_name: &str,
    ) -> Self {
        Self {
            store,
            llm,
            collection: settings.collection.clone(),
            source_label: settings.source_label.clone(),
            top_k: settings.top_k.max(1),
            store_name: store_name.to_string(),
        }
    }

    /// Load the FAQ CSV into the vector store unless the collection exists.
    pub async fn ingest(&self, source: &Path) -> Result<IngestReport, ApiError> {
        if self.store.collection_exists(&self.collection).await? {
            tracing::info!("FAQ collection '{}' already exists, skipping ingestion", self.collection);
            return Ok(IngestReport::Skipped);
        }

        tracing::info!("Ingesting FAQ data from {}", source.display());
        let entries = read_faq_csv(source, &self.source_label)?;
        let questions: Vec<String> = entries.iter().map(|e| e.question.clone()).collect();
        let embeddings = self.llm.embed(&questions).await?;

        let items = entries
            .iter()
            .enumerate()
            .zip(embeddings)
            .map(|((row, entry), embedding)| (entry.to_document(row), embedding))
            .collect();

        let inserted = self.store.add(&self.collection, items).await?;
        tracing::info!(
            "FAQ data ingested into collection '{}' ({} entries)",
            self.collection,
            inserted
        );
        Ok(IngestReport::Ingested { entries: inserted })
    }

    /// The `k` FAQ entries nearest to the query.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<FaqEntry>, ApiError> {
        let embedding = self.llm.embed_one(query).await?;
        let matches = self.store.query(&self.collection, &embedding, k).await?;

        for m in &matches {
            tracing::debug!("FAQ match {} score={:.3}", m.document.id, m.score);
        }

        Ok(matches
            .iter()
            .map(|m| FaqEntry::from_document(&m.document))
            .collect())
    }

    pub async fn answer(&self, query: &str) -> Result<String, ApiError> {
        let entries = self.retrieve(query, self.top_k).await?;
        if entries.is_empty() {
            tracing::warn!("FAQ collection '{}' returned no entries", self.collection);
            return Ok(NO_INFORMATION_REPLY.to_string());
        }

        let context = build_context(&entries);
        let system = system_prompt(&self.store_name);
        let user = format!("Context:\n{}\n\nQuestion: {}\n\nFinal Answer:", context, query);

        self.llm.complete(&system, &user).await
    }

    pub async fn entry_count(&self) -> Result<usize, ApiError> {
        self.store.count(&self.collection).await
    }
}

fn build_context(entries: &[FaqEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "Source {} ({}): Q: {}\nA: {}",
                i + 1,
                entry.source,
                entry.question,
                entry.answer
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn system_prompt(store_name: &str) -> String {
    format!(
        "You are a {store} Customer Assistant. Use the provided context to answer the user's question.\n\n\
         Strict Rules:\n\
         1. Only use the information in the Context.\n\
         2. If the answer isn't there, say \"{fallback}\"\n\
         3. Be polite and professional.",
        store = store_name,
        fallback = NO_INFORMATION_REPLY
    )
}
