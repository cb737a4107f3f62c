use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize LLM service: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize FAQ vector store: {0}")]
    VectorStore(#[source] anyhow::Error),

    #[error("Failed to build intent router: {0}")]
    Router(#[source] anyhow::Error),

    #[error("Failed to open product catalog: {0}")]
    Catalog(#[source] anyhow::Error),
}
