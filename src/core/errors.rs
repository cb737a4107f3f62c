use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// External dependency unreachable or overloaded; worth retrying.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// External dependency answered, but with something we cannot use.
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::ServiceUnavailable(_))
    }

    /// Classify a transport-level failure from the HTTP client.
    pub fn from_transport(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            ApiError::ServiceUnavailable(format!("{}: {}", service, err))
        } else {
            ApiError::Upstream(format!("{}: {}", service, err))
        }
    }

    /// Classify a non-success HTTP status returned by an external service.
    pub fn from_status(service: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("{} returned {}: {}", service, status, body.trim());
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            ApiError::ServiceUnavailable(message)
        } else {
            ApiError::Upstream(message)
        }
    }

    /// Short machine-readable label used in API payloads and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Upstream(_) => "upstream",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::ServiceUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "Upstream error".to_string()),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error".to_string(),
            ),
        };

        let body = Json(json!({ "error": message, "kind": self.kind() }));
        (status, body).into_response()
    }
}
