//! # Crawler State Repository
//!
//! Persistence for the crawler's own mutual-exclusion flag: a single row
//! per crawler name, outside the object-identity namespace.

use crate::models::{current_timestamp, CrawlState, CrawlerStatus};
use crate::Result;
use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

/// Repository trait for the crawl-state flag.
#[async_trait]
pub trait CrawlerStateRepository: Send + Sync {
    /// Current crawl state for a crawler, if one was ever recorded.
    async fn get(&self, name: &str) -> Result<Option<CrawlState>>;

    /// Record the crawl state for a crawler.
    async fn set(&self, name: &str, state: CrawlState) -> Result<()>;
}

/// SQLite implementation of [`CrawlerStateRepository`].
pub struct SqliteCrawlerStateRepository {
    pool: SqlitePool,
}

impl SqliteCrawlerStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Full state row, for inspection.
    pub async fn status(&self, name: &str) -> Result<Option<CrawlerStatus>> {
        let row = sqlx::query_as::<_, CrawlerStateRow>(
            "SELECT name, crawl_state, updated_at FROM crawler_state WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(CrawlerStatus {
                name: row.name,
                crawl_state: row.crawl_state.parse()?,
                updated_at: row.updated_at,
            })
        })
        .transpose()
    }
}

#[derive(Debug, FromRow)]
struct CrawlerStateRow {
    name: String,
    crawl_state: String,
    updated_at: i64,
}

#[async_trait]
impl CrawlerStateRepository for SqliteCrawlerStateRepository {
    async fn get(&self, name: &str) -> Result<Option<CrawlState>> {
        let state = sqlx::query_scalar::<_, String>(
            "SELECT crawl_state FROM crawler_state WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        state.map(|s| s.parse()).transpose()
    }

    async fn set(&self, name: &str, state: CrawlState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crawler_state (name, crawl_state, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                crawl_state = excluded.crawl_state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(state.as_str())
        .bind(current_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
