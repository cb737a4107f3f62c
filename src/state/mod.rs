use std::sync::Arc;

use tokio::sync::Mutex;

use crate::chat::{Assistant, Conversation};
use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::faq::{FaqHandler, IngestReport, SqliteVectorStore};
use crate::llm::LlmService;
use crate::router::{default_intents, SemanticRouter};
use crate::sql::{import_products_csv, ProductCatalog, SqlHandler};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Everything is constructed once at startup and handed to the handlers;
/// the conversation log is the only mutable part.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<Settings>,
    pub llm: LlmService,
    pub assistant: Arc<Assistant>,
    pub conversation: Arc<Mutex<Conversation>>,
}

impl AppState {
    /// Load configuration and connect to the hosted services.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        let llm = LlmService::from_settings(&settings).map_err(|e| InitializationError::Llm(e.into()))?;

        Self::assemble(paths, config, settings, llm).await
    }

    /// Build every component around an already constructed LLM service.
    ///
    /// This process includes:
    /// 1. Opening the FAQ vector store and ingesting the FAQ CSV once
    /// 2. Seeding the product catalog from CSV if it is empty
    /// 3. Opening the catalog read-only
    /// 4. Embedding the intent anchors for the router
    pub async fn assemble(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: Settings,
        llm: LlmService,
    ) -> Result<Arc<Self>, InitializationError> {
        let store = SqliteVectorStore::with_path(paths.vector_db_path.clone())
            .await
            .map_err(|e| InitializationError::VectorStore(e.into()))?;
        let faq = FaqHandler::new(
            Arc::new(store),
            llm.clone(),
            &settings.faq,
            &settings.assistant.store_name,
        );

        let faq_csv = paths.resolve(&settings.faq.csv_path);
        match faq.ingest(&faq_csv).await {
            Ok(IngestReport::Ingested { entries }) => {
                tracing::info!("FAQ ready with {} new entries", entries)
            }
            Ok(IngestReport::Skipped) => {}
            Err(e) => tracing::warn!("FAQ ingestion failed, continuing without it: {}", e),
        }

        let catalog_path = paths.resolve(&settings.sql.db_path);
        if let Some(products_csv) = settings.sql.products_csv.as_deref() {
            let products_csv = paths.resolve(products_csv);
            if products_csv.exists() {
                if let Err(e) = import_products_csv(&catalog_path, &products_csv).await {
                    tracing::warn!("Failed to import {}: {}", products_csv.display(), e);
                }
            }
        }
        let catalog = ProductCatalog::open_read_only(&catalog_path, &settings.sql)
            .await
            .map_err(|e| InitializationError::Catalog(e.into()))?;
        let sql = SqlHandler::new(llm.clone(), Arc::new(catalog));

        let router = SemanticRouter::build(default_intents(), llm.clone(), &settings.router)
            .await
            .map_err(|e| InitializationError::Router(e.into()))?;

        let assistant = Assistant::new(router, faq, sql, &settings.assistant);

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            llm,
            assistant: Arc::new(assistant),
            conversation: Arc::new(Mutex::new(Conversation::new())),
        }))
    }
}
