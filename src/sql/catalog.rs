//! Read-only access to the product catalog.
//!
//! Queries run on a connection opened with `SQLITE_OPEN_READONLY`, so even a
//! statement that slipped past the guard cannot change the catalog. The only
//! write path is [`import_products_csv`], which seeds an empty catalog at
//! startup over its own short-lived connection.

use std::path::Path;
use std::time::Duration;

use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use thiserror::Error;

use super::guard::ValidatedSql;
use crate::core::config::settings::SqlSettings;
use crate::core::errors::ApiError;

// SQLite primary result codes.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// One row of the `product` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_link: String,
    pub title: String,
    pub brand: String,
    pub price: i64,
    pub discount: f64,
    pub avg_rating: f64,
    pub total_ratings: i64,
}

impl ProductRecord {
    /// Rebuild a product from a generic result row. Rows that do not carry
    /// every product column (aggregates, partial projections) yield `None`.
    pub fn from_row(row: &Map<String, Value>) -> Option<Self> {
        let text = |key: &str| row.get(key)?.as_str().map(str::to_string);
        let int = |key: &str| {
            let value = row.get(key)?;
            value.as_i64().or_else(|| value.as_f64().map(|f| f.round() as i64))
        };
        let real = |key: &str| row.get(key)?.as_f64();

        Some(Self {
            product_link: text("product_link")?,
            title: text("title")?,
            brand: text("brand")?,
            price: int("price")?,
            discount: real("discount")?,
            avg_rating: real("avg_rating")?,
            total_ratings: int("total_ratings")?,
        })
    }
}

/// Rows returned by a catalog query, column names preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    /// More rows matched than the configured cap.
    pub truncated: bool,
}

impl QueryRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn products(&self) -> Vec<ProductRecord> {
        self.rows.iter().filter_map(ProductRecord::from_row).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionFailure {
    /// Busy, locked, timed out or unreachable. Retrying later may work.
    #[error("catalog temporarily unavailable: {0}")]
    Transient(String),
    /// The statement itself is broken (syntax, unknown column, ...).
    #[error("catalog query failed: {0}")]
    Fatal(String),
}

impl ExecutionFailure {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub struct ProductCatalog {
    pool: SqlitePool,
    max_rows: usize,
    query_timeout: Duration,
}

impl ProductCatalog {
    pub async fn open_read_only(db_path: &Path, settings: &SqlSettings) -> Result<Self, ApiError> {
        if !db_path.exists() {
            return Err(ApiError::NotFound(format!(
                "Product catalog not found: {}",
                db_path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(settings.query_timeout())
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        Ok(Self {
            pool,
            max_rows: settings.max_rows.max(1),
            query_timeout: settings.query_timeout(),
        })
    }

    /// Run a validated statement. At most `max_rows` rows are read.
    pub async fn execute(&self, sql: &ValidatedSql) -> Result<QueryRows, ExecutionFailure> {
        let max_rows = self.max_rows;
        let work = async {
            let mut stream = sqlx::query(sql.as_str()).fetch(&self.pool);
            let mut result = QueryRows::default();

            while let Some(row) = stream.try_next().await? {
                if result.rows.len() == max_rows {
                    result.truncated = true;
                    break;
                }
                if result.columns.is_empty() {
                    result.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                result.rows.push(decode_row(&row));
            }
            Ok::<_, sqlx::Error>(result)
        };

        match tokio::time::timeout(self.query_timeout, work).await {
            Ok(Ok(result)) => {
                if result.truncated {
                    tracing::info!("Catalog query truncated to {} rows", max_rows);
                }
                Ok(result)
            }
            Ok(Err(err)) => {
                let failure = classify(&err);
                tracing::warn!("Catalog query failed ({}): {}", failure, sql);
                Err(failure)
            }
            Err(_) => {
                tracing::warn!(
                    "Catalog query exceeded {:?}: {}",
                    self.query_timeout,
                    sql
                );
                Err(ExecutionFailure::Transient("query timed out".to_string()))
            }
        }
    }

    pub async fn product_count(&self) -> Result<i64, ApiError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM product")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)
    }
}

fn decode_row(row: &SqliteRow) -> Map<String, Value> {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), decode_value(row, column.ordinal())))
        .collect()
}

fn decode_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    let decoded = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(index).map(Value::from),
        "REAL" | "NUMERIC" => row.try_get::<f64, _>(index).map(Value::from),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(format!("<{} bytes>", bytes.len()))),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };
    decoded.unwrap_or(Value::Null)
}

fn classify(err: &sqlx::Error) -> ExecutionFailure {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            ExecutionFailure::Transient(err.to_string())
        }
        sqlx::Error::Io(_) => ExecutionFailure::Transient(err.to_string()),
        sqlx::Error::Database(db) => {
            let code = db
                .code()
                .and_then(|c| c.parse::<i32>().ok())
                .map(|c| c & 0xff);
            match code {
                Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => {
                    ExecutionFailure::Transient(db.message().to_string())
                }
                _ => ExecutionFailure::Fatal(db.message().to_string()),
            }
        }
        other => ExecutionFailure::Fatal(other.to_string()),
    }
}

/// Seed the catalog from a CSV export when the `product` table is empty.
///
/// Returns the number of rows inserted (zero when the catalog already had
/// products).
pub async fn import_products_csv(db_path: &Path, csv_path: &Path) -> Result<usize, ApiError> {
    if !csv_path.exists() {
        return Err(ApiError::NotFound(format!(
            "Product CSV not found: {}",
            csv_path.display()
        )));
    }
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(ApiError::internal)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(ApiError::internal)?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS product (
            product_link TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            brand TEXT NOT NULL,
            price INTEGER NOT NULL,
            discount REAL NOT NULL DEFAULT 0,
            avg_rating REAL NOT NULL DEFAULT 0,
            total_ratings INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(&pool)
    .await
    .map_err(ApiError::internal)?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
        .fetch_one(&pool)
        .await
        .map_err(ApiError::internal)?;
    if existing > 0 {
        tracing::info!(
            "Product catalog already has {} rows, skipping import",
            existing
        );
        pool.close().await;
        return Ok(0);
    }

    let products = read_products_csv(csv_path)?;
    let mut tx = pool.begin().await.map_err(ApiError::internal)?;
    let mut inserted = 0usize;
    for product in &products {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO product
                (product_link, title, brand, price, discount, avg_rating, total_ratings)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&product.product_link)
        .bind(&product.title)
        .bind(&product.brand)
        .bind(product.price)
        .bind(product.discount)
        .bind(product.avg_rating)
        .bind(product.total_ratings)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;
        inserted += result.rows_affected() as usize;
    }
    tx.commit().await.map_err(ApiError::internal)?;
    pool.close().await;

    tracing::info!(
        "Imported {} products from {} into {}",
        inserted,
        csv_path.display(),
        db_path.display()
    );
    Ok(inserted)
}

fn read_products_csv(path: &Path) -> Result<Vec<ProductRecord>, ApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ApiError::BadRequest(format!("Cannot open {}: {}", path.display(), e)))?;

    reader
        .deserialize::<ProductRecord>()
        .enumerate()
        .map(|(index, record)| {
            record.map_err(|e| {
                ApiError::BadRequest(format!(
                    "Invalid product row {} in {}: {}",
                    index + 1,
                    path.display(),
                    e
                ))
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;
    use crate::sql::guard::validate;
    use crate::test_support::temp_db_path;

    pub(crate) const PRODUCTS_CSV: &str = "\
product_link,title,brand,price,discount,avg_rating,total_ratings
https://shop.example/p/1,Puma Smash Sneakers For Men,Puma,1299,0.48,4.1,5210
https://shop.example/p/2,Puma Softride Running Shoes,Puma,2499,0.5,4.3,1802
https://shop.example/p/3,Nike Revolution 6 Running Shoes,Nike,2995,0.2,4.4,9120
https://shop.example/p/4,Campus Walking Shoes,Campus,899,0.55,3.9,15004
";

    /// A catalog seeded with four products, opened read-only.
    pub(crate) async fn seeded_catalog(settings: &SqlSettings) -> ProductCatalog {
        let mut csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        csv.write_all(PRODUCTS_CSV.as_bytes()).unwrap();
        let db_path = temp_db_path("shopbot-catalog");
        import_products_csv(&db_path, csv.path()).await.unwrap();
        ProductCatalog::open_read_only(&db_path, settings).await.unwrap()
    }

    #[tokio::test]
    async fn import_is_idempotent() {
        let mut csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        csv.write_all(PRODUCTS_CSV.as_bytes()).unwrap();
        let db_path = temp_db_path("shopbot-import");

        assert_eq!(import_products_csv(&db_path, csv.path()).await.unwrap(), 4);
        assert_eq!(import_products_csv(&db_path, csv.path()).await.unwrap(), 0);

        let catalog = ProductCatalog::open_read_only(&db_path, &SqlSettings::default())
            .await
            .unwrap();
        assert_eq!(catalog.product_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn execute_returns_typed_rows() {
        let catalog = seeded_catalog(&SqlSettings::default()).await;
        let sql = validate(
            "SELECT product_link, title, brand, price, discount, avg_rating, total_ratings \
             FROM product WHERE brand LIKE '%puma%' ORDER BY price",
        )
        .unwrap();

        let result = catalog.execute(&sql).await.unwrap();
        assert_eq!(result.columns[0], "product_link");
        assert_eq!(result.rows.len(), 2);
        assert!(!result.truncated);
        assert_eq!(result.rows[0]["price"], Value::from(1299));
        assert_eq!(result.rows[0]["avg_rating"], Value::from(4.1));

        let products = result.products();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].title, "Puma Smash Sneakers For Men");
        assert_eq!(products[1].total_ratings, 1802);
    }

    #[tokio::test]
    async fn aggregate_rows_are_kept_but_are_not_products() {
        let catalog = seeded_catalog(&SqlSettings::default()).await;
        let sql = validate("SELECT brand, COUNT(*) AS n FROM product GROUP BY brand").unwrap();

        let result = catalog.execute(&sql).await.unwrap();
        assert_eq!(result.rows.len(), 3);
        assert!(result.products().is_empty());
    }

    #[tokio::test]
    async fn rows_are_capped() {
        let settings = SqlSettings {
            max_rows: 2,
            ..SqlSettings::default()
        };
        let catalog = seeded_catalog(&settings).await;
        let sql = validate("SELECT * FROM product").unwrap();

        let result = catalog.execute(&sql).await.unwrap();
        assert_eq!(result.rows.len(), 2);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn broken_statements_are_fatal() {
        let catalog = seeded_catalog(&SqlSettings::default()).await;
        let sql = validate("SELECT colour FROM product").unwrap();

        let failure = catalog.execute(&sql).await.unwrap_err();
        assert!(matches!(failure, ExecutionFailure::Fatal(_)));
        assert!(!failure.is_transient());
    }

    #[tokio::test]
    async fn connection_refuses_writes() {
        let catalog = seeded_catalog(&SqlSettings::default()).await;
        let result = sqlx::query("DELETE FROM product").execute(&catalog.pool).await;
        assert!(result.is_err());
        assert_eq!(catalog.product_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn missing_catalog_is_not_found() {
        let err = ProductCatalog::open_read_only(
            Path::new("/nonexistent/catalog.sqlite"),
            &SqlSettings::default(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
