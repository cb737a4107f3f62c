//! Deterministic stand-ins for the hosted services used across unit tests.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, LlmProvider, LlmService};

const DIMS: usize = 32_768;

/// Bag-of-words hashing embedder plus a scripted chat endpoint.
///
/// Identical texts embed identically, texts without shared words are
/// orthogonal. Chat replies come from the script in order; once it is
/// exhausted the fallback reply is returned.
pub struct FakeProvider {
    script: Mutex<VecDeque<Result<String, ApiError>>>,
    fallback_reply: String,
    requests: Mutex<Vec<ChatRequest>>,
    chat_calls: AtomicUsize,
    embed_calls: AtomicUsize,
    embed_failure: Mutex<Option<ApiError>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback_reply: "fake reply".to_string(),
            requests: Mutex::new(Vec::new()),
            chat_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
            embed_failure: Mutex::new(None),
        }
    }

    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_script(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn with_script(self, script: Vec<Result<String, ApiError>>) -> Self {
        *self.script.lock().unwrap() = script.into();
        self
    }

    /// Make every later embedding call fail with `err`.
    pub fn fail_embeddings(&self, err: ApiError) {
        *self.embed_failure.lock().unwrap() = Some(err);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback_reply.clone()))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.embed_failure.lock().unwrap().as_ref() {
            return Err(match err {
                ApiError::ServiceUnavailable(msg) => ApiError::ServiceUnavailable(msg.clone()),
                other => ApiError::Upstream(other.to_string()),
            });
        }
        Ok(inputs.iter().map(|text| hash_embedding(text)).collect())
    }
}

pub fn hash_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMS];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        vector[(hasher.finish() % DIMS as u64) as usize] += 1.0;
    }
    vector
}

/// Settings with retries that do not sleep.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.completion.retry_backoff_ms = 0;
    settings.embedding.retry_backoff_ms = 0;
    settings
}

pub fn fake_llm(provider: Arc<FakeProvider>) -> LlmService {
    LlmService::new(provider.clone(), provider, &test_settings())
}

pub fn temp_db_path(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}.db", prefix, uuid::Uuid::new_v4()))
}
