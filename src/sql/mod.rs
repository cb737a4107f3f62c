//! Natural-language product search over the SQLite catalog.
//!
//! A question becomes one SQL statement (`generator`), which must pass the
//! `guard` before it is run against the read-only `catalog`. Rows are then
//! summarized into a numbered product list (`handler`).

mod catalog;
mod generator;
mod guard;
mod handler;
mod prompts;

pub use catalog::{import_products_csv, ExecutionFailure, ProductCatalog, ProductRecord, QueryRows};
pub use generator::{extract_sql, generate_sql, GeneratedSql};
pub use guard::{validate, Rejection, ValidatedSql, FORBIDDEN_KEYWORDS};
pub use handler::{
    SqlHandler, SqlOutcome, SqlStage, CATALOG_UNAVAILABLE_REPLY, OUT_OF_STOCK_REPLY,
    QUERY_FAILED_REPLY, UNPARSED_REPLY,
};
pub use prompts::{COMPREHENSION_PROMPT, SQL_PROMPT};

#[cfg(test)]
pub(crate) use catalog::tests::{seeded_catalog, PRODUCTS_CSV};
