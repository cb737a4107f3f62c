use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chat::render::{render_content, render_conversation, render_turn};
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let reply = state.assistant.respond(message).await;
    state
        .conversation
        .lock()
        .await
        .record(message, reply.turn.clone());

    let rendered = render_content(&reply.turn.content);
    Ok(Json(json!({
        "intent": reply.decision.map(|d| d.intent),
        "score": reply.decision.map(|d| d.score),
        "threshold": reply.decision.map(|d| d.threshold),
        "sql_stage": reply.sql_stage,
        "error": reply.error,
        "reply": reply.turn,
        "rendered": rendered
    })))
}

pub async fn get_history(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let conversation = state.conversation.lock().await;
    let turns: Vec<Value> = conversation
        .turns()
        .iter()
        .map(|turn| {
            json!({
                "turn": turn,
                "rendered": render_turn(turn)
            })
        })
        .collect();
    Ok(Json(json!({
        "turns": turns,
        "transcript": render_conversation(&conversation)
    })))
}

pub async fn clear_history(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let mut conversation = state.conversation.lock().await;
    let removed = conversation.len();
    conversation.clear();
    tracing::info!("Cleared {} conversation turns", removed);
    Ok(Json(json!({ "status": "success", "removed": removed })))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::core::config::{AppPaths, ConfigService};
    use crate::server::router::router;
    use crate::sql::PRODUCTS_CSV;
    use crate::test_support::{fake_llm, test_settings, FakeProvider};

    async fn test_state(provider: Arc<FakeProvider>) -> (Arc<AppState>, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        let resources = root.path().join("resources");
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::write(
            resources.join("faq_data.csv"),
            "question,answer\nWhat is the return policy?,30 days\n",
        )
        .unwrap();
        std::fs::write(resources.join("products.csv"), PRODUCTS_CSV).unwrap();

        let paths = Arc::new(AppPaths::with_dirs(
            root.path().to_path_buf(),
            root.path().join("data"),
        ));
        let config = ConfigService::new(paths.clone());
        let state = AppState::assemble(paths, config, test_settings(), fake_llm(provider))
            .await
            .unwrap();
        (state, root)
    }

    async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn chat_request(message: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "message": message }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn chat_routes_and_records_the_exchange() {
        let provider = Arc::new(FakeProvider::new());
        let (state, _root) = test_state(provider.clone()).await;

        let (status, body) = send(router(state.clone()), chat_request("Hello!")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "chitchat");
        assert!((body["threshold"].as_f64().unwrap() - 0.4).abs() < 1e-6);
        assert_eq!(body["reply"]["role"], "assistant");
        assert_eq!(
            body["rendered"],
            "Hello! I'm your Flipkart assistant. How can I help you shop today?"
        );
        assert_eq!(provider.chat_calls(), 0);

        let history = Request::builder().uri("/api/history").body(Body::empty()).unwrap();
        let (status, body) = send(router(state.clone()), history).await;
        assert_eq!(status, StatusCode::OK);
        let turns = body["turns"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["rendered"], "**You**: Hello!");
        assert_eq!(
            body["transcript"],
            "**You**: Hello!\n\n**Assistant**: Hello! I'm your Flipkart assistant. How can I help you shop today?"
        );
    }

    #[tokio::test]
    async fn empty_message_is_a_bad_request() {
        let (state, _root) = test_state(Arc::new(FakeProvider::new())).await;

        let (status, body) = send(router(state.clone()), chat_request("   ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");
        assert!(state.conversation.lock().await.is_empty());
    }

    #[tokio::test]
    async fn clearing_history_empties_the_log() {
        let (state, _root) = test_state(Arc::new(FakeProvider::new())).await;
        send(router(state.clone()), chat_request("zxqv plorb")).await;
        assert_eq!(state.conversation.lock().await.len(), 2);

        let clear = Request::builder()
            .method("DELETE")
            .uri("/api/history")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router(state.clone()), clear).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 2);
        assert!(state.conversation.lock().await.is_empty());
    }

    #[tokio::test]
    async fn status_reports_components() {
        let (state, _root) = test_state(Arc::new(FakeProvider::new())).await;

        let request = Request::builder().uri("/api/status").body(Body::empty()).unwrap();
        let (status, body) = send(router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["faq_entries"], 1);
        assert_eq!(body["catalog"]["products"], 4);
        assert_eq!(body["providers"]["completion"], true);
        assert_eq!(body["degraded"], false);
    }
}
