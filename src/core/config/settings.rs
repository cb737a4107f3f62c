//! Typed view of the merged configuration.
//!
//! Every section falls back to its defaults, so an empty `config.yml` plus
//! the two credentials in the environment is a working setup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub completion: CompletionSettings,
    pub embedding: EmbeddingSettings,
    pub router: RouterSettings,
    pub faq: FaqSettings,
    pub sql: SqlSettings,
    pub assistant: AssistantSettings,
    pub server: ServerSettings,
}

/// Retry behaviour for calls to hosted services.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: i32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai".to_string(),
            api_key: None,
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl CompletionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            model: "all-minilm".to_string(),
            timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

/// How anchor similarities are combined into one score per intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Mean,
    Max,
    Sum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    pub threshold: f32,
    pub top_k: usize,
    pub aggregation: Aggregation,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            top_k: 5,
            aggregation: Aggregation::Mean,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqSettings {
    pub csv_path: String,
    pub collection: String,
    pub source_label: String,
    pub top_k: usize,
}

impl Default for FaqSettings {
    fn default() -> Self {
        Self {
            csv_path: "resources/faq_data.csv".to_string(),
            collection: "faqs".to_string(),
            source_label: "Flipkart Policy 2024".to_string(),
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlSettings {
    pub db_path: String,
    /// Seed file imported once when the catalog table is missing or empty.
    pub products_csv: Option<String>,
    pub max_rows: usize,
    pub query_timeout_secs: u64,
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self {
            db_path: "resources/db.sqlite".to_string(),
            products_csv: Some("resources/products.csv".to_string()),
            max_rows: 50,
            query_timeout_secs: 10,
        }
    }
}

impl SqlSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub store_name: String,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            store_name: "Flipkart".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub allowed_origins: Vec<String>,
}
