use std::sync::LazyLock;

use regex::Regex;

use super::prompts::SQL_PROMPT;
use crate::core::errors::ApiError;
use crate::llm::LlmService;

static SQL_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<SQL>(.*?)</SQL>").unwrap());

/// What the model returned for a product question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSql {
    pub raw_response: String,
    /// Text between the first `<SQL>` and `</SQL>`, trimmed. `None` when the
    /// tags are missing or enclose nothing.
    pub statement: Option<String>,
}

/// Pull the query out of the first `<SQL>...</SQL>` block.
pub fn extract_sql(raw: &str) -> Option<String> {
    SQL_BLOCK_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|sql| !sql.is_empty())
}

pub async fn generate_sql(llm: &LlmService, question: &str) -> Result<GeneratedSql, ApiError> {
    let raw_response = llm
        .complete_with_limit(SQL_PROMPT, question, Some(llm.max_tokens()))
        .await?;
    let statement = extract_sql(&raw_response);

    match &statement {
        Some(sql) => tracing::debug!("Generated SQL: {}", sql),
        None => tracing::warn!(
            "Completion did not contain a <SQL> block: {}",
            raw_response.chars().take(200).collect::<String>()
        ),
    }

    Ok(GeneratedSql {
        raw_response,
        statement,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::{fake_llm, FakeProvider};

    #[test]
    fn extracts_and_trims_the_tagged_query() {
        assert_eq!(
            extract_sql("Sure!\n<SQL>\n  SELECT * FROM product\n</SQL>\nanything else").as_deref(),
            Some("SELECT * FROM product")
        );
    }

    #[test]
    fn tags_are_case_insensitive_and_first_block_wins() {
        assert_eq!(
            extract_sql("<sql>SELECT 1</sql> <SQL>SELECT 2</SQL>").as_deref(),
            Some("SELECT 1")
        );
    }

    #[test]
    fn missing_or_empty_tags_yield_nothing() {
        assert_eq!(extract_sql("SELECT * FROM product"), None);
        assert_eq!(extract_sql("<SQL>   </SQL>"), None);
        assert_eq!(extract_sql("<SQL>SELECT * FROM product"), None);
    }

    #[tokio::test]
    async fn generation_sends_the_schema_prompt_and_question() {
        let provider = Arc::new(
            FakeProvider::new().with_replies(["<SQL>SELECT * FROM product WHERE price < 500</SQL>"]),
        );
        let llm = fake_llm(provider.clone());

        let generated = generate_sql(&llm, "anything under 500?").await.unwrap();
        assert_eq!(
            generated.statement.as_deref(),
            Some("SELECT * FROM product WHERE price < 500")
        );

        let request = &provider.requests()[0];
        assert_eq!(request.content_of("system"), Some(SQL_PROMPT));
        assert_eq!(request.content_of("user"), Some("anything under 500?"));
        assert_eq!(request.max_tokens, Some(llm.max_tokens()));
    }
}
