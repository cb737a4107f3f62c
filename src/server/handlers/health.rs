use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let faq_entries = state.assistant.faq().entry_count().await.unwrap_or_else(|e| {
        tracing::warn!("Failed to count FAQ entries: {}", e);
        0
    });
    let products = match state.assistant.sql().catalog().product_count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Product catalog unreachable: {}", e);
            None
        }
    };
    let providers = state.llm.health().await;
    let turns = state.conversation.lock().await.len();

    Ok(Json(json!({
        "faq_entries": faq_entries,
        "catalog": {
            "reachable": products.is_some(),
            "products": products.unwrap_or(0)
        },
        "providers": providers,
        "degraded": !(providers.completion && providers.embedding && products.is_some()),
        "turns": turns,
        "store_name": state.settings.assistant.store_name
    })))
}
