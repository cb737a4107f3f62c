use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(completion) = expect_optional_object(root, "completion")? {
        validate_optional_string_field(completion, "completion.base_url", "base_url")?;
        validate_optional_string_field(completion, "completion.api_key", "api_key")?;
        validate_optional_string_field(completion, "completion.model", "model")?;
        validate_f64_field(completion, "completion.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(completion, "completion.max_tokens", "max_tokens", 1, 32_768)?;
        validate_u64_field(completion, "completion.timeout_secs", "timeout_secs", 1, 600)?;
        validate_u64_field(completion, "completion.max_retries", "max_retries", 0, 10)?;
        validate_u64_field(
            completion,
            "completion.retry_backoff_ms",
            "retry_backoff_ms",
            0,
            60_000,
        )?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.api_key", "api_key")?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 600)?;
        validate_u64_field(embedding, "embedding.max_retries", "max_retries", 0, 10)?;
        validate_u64_field(
            embedding,
            "embedding.retry_backoff_ms",
            "retry_backoff_ms",
            0,
            60_000,
        )?;
    }

    if let Some(router) = expect_optional_object(root, "router")? {
        validate_f64_field(router, "router.threshold", "threshold", 0.0, 1.0)?;
        validate_u64_field(router, "router.top_k", "top_k", 1, 100)?;
        validate_enum_field(
            router,
            "router.aggregation",
            "aggregation",
            &["mean", "max", "sum"],
        )?;
    }

    if let Some(faq) = expect_optional_object(root, "faq")? {
        validate_optional_string_field(faq, "faq.csv_path", "csv_path")?;
        validate_non_empty_string_field(faq, "faq.collection", "collection")?;
        validate_optional_string_field(faq, "faq.source_label", "source_label")?;
        validate_u64_field(faq, "faq.top_k", "top_k", 1, 50)?;
    }

    if let Some(sql) = expect_optional_object(root, "sql")? {
        validate_non_empty_string_field(sql, "sql.db_path", "db_path")?;
        validate_optional_string_field(sql, "sql.products_csv", "products_csv")?;
        validate_u64_field(sql, "sql.max_rows", "max_rows", 1, 1_000)?;
        validate_u64_field(sql, "sql.query_timeout_secs", "query_timeout_secs", 1, 600)?;
    }

    if let Some(assistant) = expect_optional_object(root, "assistant")? {
        validate_non_empty_string_field(assistant, "assistant.store_name", "store_name")?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(server, "server.allowed_origins", "allowed_origins")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !(min..=max).contains(&number) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_default_shaped_config() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "completion": { "model": "llama-3.3-70b-versatile", "temperature": 0.2 },
            "router": { "threshold": 0.4, "top_k": 5, "aggregation": "mean" },
            "faq": { "collection": "faqs", "top_k": 3 },
            "server": { "port": 0 }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let err = validate_config(&json!({ "router": { "threshold": 1.5 } })).unwrap_err();
        assert!(err.to_string().contains("router.threshold"));
    }

    #[test]
    fn rejects_unknown_aggregation_and_wrong_types() {
        assert!(validate_config(&json!({ "router": { "aggregation": "median" } })).is_err());
        assert!(validate_config(&json!({ "faq": { "top_k": "three" } })).is_err());
        assert!(validate_config(&json!({ "sql": { "db_path": "  " } })).is_err());
        assert!(validate_config(&json!({ "completion": [] })).is_err());
    }
}
