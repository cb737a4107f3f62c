use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::core::config::{RetryPolicy, Settings};
use crate::core::errors::ApiError;
use crate::llm::openai_compat::OpenAiCompatProvider;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{ChatMessage, ChatRequest};

/// Completion and embedding access shared by the router and handlers.
///
/// Both services sit behind [`LlmProvider`], carry their own model id and
/// retry policy, and every call is retried only on transient failures.
#[derive(Clone)]
pub struct LlmService {
    completion: Arc<dyn LlmProvider>,
    embedding: Arc<dyn LlmProvider>,
    completion_model: String,
    embedding_model: String,
    temperature: f64,
    max_tokens: i32,
    completion_retry: RetryPolicy,
    embedding_retry: RetryPolicy,
}

/// Reachability of the two hosted services.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ProviderHealth {
    pub completion: bool,
    pub embedding: bool,
}

impl LlmService {
    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        let completion = OpenAiCompatProvider::new(
            "completion",
            &settings.completion.base_url,
            settings.completion.api_key.clone(),
            settings.completion.timeout(),
        )?;
        let embedding = OpenAiCompatProvider::new(
            "embedding",
            &settings.embedding.base_url,
            settings.embedding.api_key.clone(),
            settings.embedding.timeout(),
        )?;

        Ok(Self::new(Arc::new(completion), Arc::new(embedding), settings))
    }

    pub fn new(
        completion: Arc<dyn LlmProvider>,
        embedding: Arc<dyn LlmProvider>,
        settings: &Settings,
    ) -> Self {
        Self {
            completion,
            embedding,
            completion_model: settings.completion.model.clone(),
            embedding_model: settings.embedding.model.clone(),
            temperature: settings.completion.temperature,
            max_tokens: settings.completion.max_tokens,
            completion_retry: settings.completion.retry_policy(),
            embedding_retry: settings.embedding.retry_policy(),
        }
    }

    /// System + user completion at the configured temperature.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, ApiError> {
        self.complete_with_limit(system, user, None).await
    }

    pub async fn complete_with_limit(
        &self,
        system: &str,
        user: &str,
        max_tokens: Option<i32>,
    ) -> Result<String, ApiError> {
        let request = ChatRequest::new(vec![ChatMessage::system(system), ChatMessage::user(user)])
            .with_temperature(self.temperature)
            .with_max_tokens(max_tokens);

        let provider = self.completion.clone();
        let model = self.completion_model.clone();
        let operation = format!("{} chat completion", provider.name());
        with_retry(self.completion_retry, &operation, || {
            let provider = provider.clone();
            let request = request.clone();
            let model = model.clone();
            async move { provider.chat(request, &model).await }
        })
        .await
    }

    /// Default output limit for completions that need one.
    pub fn max_tokens(&self) -> i32 {
        self.max_tokens
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let provider = self.embedding.clone();
        let model = self.embedding_model.clone();
        let operation = format!("{} embedding", provider.name());
        let vectors = with_retry(self.embedding_retry, &operation, || {
            let provider = provider.clone();
            let model = model.clone();
            let inputs = inputs.to_vec();
            async move { provider.embed(&inputs, &model).await }
        })
        .await?;

        if vectors.len() != inputs.len() {
            return Err(ApiError::Upstream(format!(
                "{}: expected {} vectors, got {}",
                self.embedding.name(),
                inputs.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::Upstream("embedding: empty response".to_string()))
    }

    pub async fn health(&self) -> ProviderHealth {
        let (completion, embedding) =
            tokio::join!(self.completion.health_check(), self.embedding.health_check());
        ProviderHealth {
            completion: completion.unwrap_or(false),
            embedding: embedding.unwrap_or(false),
        }
    }
}

async fn with_retry<T, F, Fut>(policy: RetryPolicy, operation: &str, mut call: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let delay = backoff_delay(policy.backoff, attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    operation,
                    attempt + 1,
                    policy.max_retries + 1,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponential = base.saturating_mul(1u32 << attempt.min(6));
    let jitter_cap = (base.as_millis() / 2) as u64;
    let jitter = if jitter_cap == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_cap)
    };
    exponential + Duration::from_millis(jitter)
}
