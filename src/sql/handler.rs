use std::sync::Arc;

use serde::Serialize;

use super::catalog::{ExecutionFailure, ProductCatalog, ProductRecord, QueryRows};
use super::generator::generate_sql;
use super::guard::{validate, Rejection};
use super::prompts::COMPREHENSION_PROMPT;
use crate::core::errors::ApiError;
use crate::llm::LlmService;

pub const UNPARSED_REPLY: &str =
    "I couldn't find any products matching that specific request. Can you try phrasing it differently?";
pub const OUT_OF_STOCK_REPLY: &str =
    "I'm sorry, we don't have any products in stock that match those criteria right now.";
pub const QUERY_FAILED_REPLY: &str =
    "I couldn't run that product search. Can you try phrasing it differently?";
pub const CATALOG_UNAVAILABLE_REPLY: &str =
    "Our product catalog is temporarily unavailable. Please try again in a moment.";

/// Pipeline stages. The last five are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlStage {
    Received,
    SqlGenerated,
    Validated,
    Executed,
    /// The model answered without a `<SQL>` block.
    Unparsed,
    /// The statement failed validation and was never executed.
    Rejected,
    /// The statement ran and matched nothing.
    Empty,
    /// The statement could not be executed.
    Failed,
    /// Rows were found and summarized.
    Summarized,
}

#[derive(Debug, Clone)]
pub enum SqlOutcome {
    Unparsed {
        raw_response: String,
    },
    Rejected {
        sql: String,
        reason: Rejection,
    },
    Empty {
        sql: String,
    },
    Failed {
        sql: String,
        failure: ExecutionFailure,
    },
    Summarized {
        sql: String,
        rows: QueryRows,
        answer: String,
    },
}

impl SqlOutcome {
    pub fn stage(&self) -> SqlStage {
        match self {
            Self::Unparsed { .. } => SqlStage::Unparsed,
            Self::Rejected { .. } => SqlStage::Rejected,
            Self::Empty { .. } => SqlStage::Empty,
            Self::Failed { .. } => SqlStage::Failed,
            Self::Summarized { .. } => SqlStage::Summarized,
        }
    }

    /// Text shown to the shopper.
    pub fn reply(&self) -> String {
        match self {
            Self::Unparsed { .. } => UNPARSED_REPLY.to_string(),
            Self::Rejected { reason, .. } => reason.to_string(),
            Self::Empty { .. } => OUT_OF_STOCK_REPLY.to_string(),
            Self::Failed { failure, .. } if failure.is_transient() => {
                CATALOG_UNAVAILABLE_REPLY.to_string()
            }
            Self::Failed { .. } => QUERY_FAILED_REPLY.to_string(),
            Self::Summarized { answer, .. } => answer.clone(),
        }
    }

    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Unparsed { .. } => None,
            Self::Rejected { sql, .. }
            | Self::Empty { sql }
            | Self::Failed { sql, .. }
            | Self::Summarized { sql, .. } => Some(sql),
        }
    }

    pub fn products(&self) -> Vec<ProductRecord> {
        match self {
            Self::Summarized { rows, .. } => rows.products(),
            _ => Vec::new(),
        }
    }
}

/// Natural-language product search: generate, validate, execute, summarize.
pub struct SqlHandler {
    llm: LlmService,
    catalog: Arc<ProductCatalog>,
}

impl SqlHandler {
    pub fn new(llm: LlmService, catalog: Arc<ProductCatalog>) -> Self {
        Self { llm, catalog }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Turn the query rows into a shopper-facing answer.
    ///
    /// No rows means no completion call.
    pub async fn summarize(&self, question: &str, rows: &QueryRows) -> Result<String, ApiError> {
        if rows.is_empty() {
            return Ok(OUT_OF_STOCK_REPLY.to_string());
        }

        let data = serde_json::to_string(&rows.rows).map_err(ApiError::internal)?;
        let user = format!("QUESTION: {}. DATA: {}", question, data);
        self.llm.complete(COMPREHENSION_PROMPT, &user).await
    }

    /// Run the whole pipeline for one question.
    ///
    /// Completion failures propagate as errors; everything the pipeline
    /// itself decides (no SQL, rejected, nothing found, execution failure)
    /// comes back as an [`SqlOutcome`].
    pub async fn run(&self, question: &str) -> Result<SqlOutcome, ApiError> {
        let outcome = self.run_stages(question).await?;
        tracing::info!(stage = ?outcome.stage(), "Product search finished");
        Ok(outcome)
    }

    async fn run_stages(&self, question: &str) -> Result<SqlOutcome, ApiError> {
        enter(SqlStage::Received);
        let generated = generate_sql(&self.llm, question).await?;
        let Some(statement) = generated.statement else {
            return Ok(SqlOutcome::Unparsed {
                raw_response: generated.raw_response,
            });
        };
        enter(SqlStage::SqlGenerated);

        let validated = match validate(&statement) {
            Ok(validated) => validated,
            Err(reason) => {
                tracing::warn!("Rejected generated SQL ({}): {}", reason, statement);
                return Ok(SqlOutcome::Rejected {
                    sql: statement,
                    reason,
                });
            }
        };
        enter(SqlStage::Validated);

        let sql = validated.to_string();
        let rows = match self.catalog.execute(&validated).await {
            Ok(rows) => rows,
            Err(failure) => return Ok(SqlOutcome::Failed { sql, failure }),
        };
        enter(SqlStage::Executed);
        tracing::debug!("Catalog returned {} rows", rows.rows.len());

        if rows.is_empty() {
            return Ok(SqlOutcome::Empty { sql });
        }

        let answer = self.summarize(question, &rows).await?;
        Ok(SqlOutcome::Summarized { sql, rows, answer })
    }
}

fn enter(stage: SqlStage) {
    tracing::debug!(?stage, "Product search stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::SqlSettings;
    use crate::sql::catalog::tests::seeded_catalog;
    use crate::test_support::{fake_llm, FakeProvider};

    async fn handler(provider: Arc<FakeProvider>) -> SqlHandler {
        let catalog = seeded_catalog(&SqlSettings::default()).await;
        SqlHandler::new(fake_llm(provider), Arc::new(catalog))
    }

    #[tokio::test]
    async fn puma_shoes_under_3000_end_to_end() {
        let summary = "1. Title: Puma Smash Sneakers For Men, Price: Rs. 1299, Discount: 48%, Rating: 4.1, Link: https://shop.example/p/1\n\
                       2. Title: Puma Softride Running Shoes, Price: Rs. 2499, Discount: 50%, Rating: 4.3, Link: https://shop.example/p/2";
        let provider = Arc::new(FakeProvider::new().with_replies([
            "<SQL>SELECT product_link, title, brand, price, discount, avg_rating, total_ratings \
             FROM product WHERE brand LIKE '%puma%' AND price < 3000 ORDER BY price</SQL>",
            summary,
        ]));
        let handler = handler(provider.clone()).await;

        let outcome = handler.run("Show me Puma shoes under Rs. 3000").await.unwrap();
        assert_eq!(outcome.stage(), SqlStage::Summarized);
        assert_eq!(outcome.reply(), summary);
        assert_eq!(outcome.products().len(), 2);
        assert!(outcome.sql().unwrap().contains("'%puma%'"));

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].content_of("system"), Some(COMPREHENSION_PROMPT));
        let user = requests[1].content_of("user").unwrap();
        assert!(user.starts_with("QUESTION: Show me Puma shoes under Rs. 3000. DATA: ["));

        let (_, data) = user.split_once("DATA: ").unwrap();
        let data: Vec<serde_json::Value> = serde_json::from_str(data).unwrap();
        let expected = [
            ("https://shop.example/p/1", "Puma Smash Sneakers For Men", 1299.0, 0.48, 4.1),
            ("https://shop.example/p/2", "Puma Softride Running Shoes", 2499.0, 0.5, 4.3),
        ];
        assert_eq!(data.len(), expected.len());
        for (row, (link, title, price, discount, rating)) in data.iter().zip(expected) {
            assert_eq!(row["product_link"], link);
            assert_eq!(row["title"], title);
            assert_eq!(row["price"].as_f64(), Some(price));
            assert_eq!(row["discount"].as_f64(), Some(discount));
            assert_eq!(row["avg_rating"].as_f64(), Some(rating));
        }
    }

    #[tokio::test]
    async fn missing_tags_never_reach_the_catalog() {
        let provider = Arc::new(
            FakeProvider::new().with_replies(["SELECT * FROM product WHERE brand = 'Puma'"]),
        );
        let handler = handler(provider.clone()).await;

        let outcome = handler.run("puma shoes").await.unwrap();
        assert_eq!(outcome.stage(), SqlStage::Unparsed);
        assert_eq!(outcome.reply(), UNPARSED_REPLY);
        assert_eq!(outcome.sql(), None);
        assert_eq!(provider.chat_calls(), 1);
    }

    #[tokio::test]
    async fn destructive_sql_is_rejected_before_execution() {
        let provider =
            Arc::new(FakeProvider::new().with_replies(["<SQL>DELETE FROM product</SQL>"]));
        let handler = handler(provider.clone()).await;

        let outcome = handler.run("remove everything").await.unwrap();
        assert_eq!(outcome.stage(), SqlStage::Rejected);
        assert_eq!(
            outcome.reply(),
            "Security Block: Keyword 'DELETE' is not allowed."
        );
        assert_eq!(handler.catalog().product_count().await.unwrap(), 4);
        assert_eq!(provider.chat_calls(), 1);
    }

    #[tokio::test]
    async fn no_rows_means_out_of_stock_without_summary() {
        let provider = Arc::new(FakeProvider::new().with_replies([
            "<SQL>SELECT * FROM product WHERE brand LIKE '%gucci%'</SQL>",
        ]));
        let handler = handler(provider.clone()).await;

        let outcome = handler.run("gucci loafers").await.unwrap();
        assert_eq!(outcome.stage(), SqlStage::Empty);
        assert_eq!(outcome.reply(), OUT_OF_STOCK_REPLY);
        assert_eq!(provider.chat_calls(), 1);
    }

    #[tokio::test]
    async fn execution_errors_are_not_reported_as_out_of_stock() {
        let provider = Arc::new(
            FakeProvider::new().with_replies(["<SQL>SELECT colour FROM product</SQL>"]),
        );
        let handler = handler(provider).await;

        let outcome = handler.run("red shoes").await.unwrap();
        assert_eq!(outcome.stage(), SqlStage::Failed);
        assert_eq!(outcome.reply(), QUERY_FAILED_REPLY);
        assert_ne!(outcome.reply(), OUT_OF_STOCK_REPLY);
    }

    #[tokio::test]
    async fn summarize_skips_completion_for_empty_rows() {
        let provider = Arc::new(FakeProvider::new());
        let handler = handler(provider.clone()).await;

        let answer = handler.summarize("anything", &QueryRows::default()).await.unwrap();
        assert_eq!(answer, OUT_OF_STOCK_REPLY);
        assert_eq!(provider.chat_calls(), 0);
    }

    #[test]
    fn transient_failures_ask_to_retry_later() {
        let outcome = SqlOutcome::Failed {
            sql: "SELECT 1".to_string(),
            failure: ExecutionFailure::Transient("database is locked".to_string()),
        };
        assert_eq!(outcome.reply(), CATALOG_UNAVAILABLE_REPLY);
    }
}
