//! SQLite-backed [`SearchStore`] implementation.
//!
//! Snapshots live in the `search_results` table created by
//! [`migrate`](crate::migrate). Results are stored as one JSON document per
//! row and `created_at` as Unix milliseconds. The `UNIQUE(cache_key, day)`
//! constraint turns a lost same-day race into
//! [`InsertOutcome::AlreadyPresent`].

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use sqlx::{Row, SqlitePool};

use cesta_core::cache::{CacheKey, DayWindow};
use cesta_core::models::{SearchRecord, StoredBySource};
use cesta_core::store::{InsertOutcome, SearchStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SearchStore for SqliteStore {
    async fn find_in_window(&self, key: &CacheKey, window: &DayWindow) -> Result<Option<SearchRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, query, item, cache_key, day, results_json, created_at
            FROM search_results
            WHERE cache_key = ? AND created_at >= ? AND created_at <= ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(key.as_str())
        .bind(window.start.timestamp_millis())
        .bind(window.end.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.get("id");
        let results_json: String = row.get("results_json");
        let results: StoredBySource = serde_json::from_str(&results_json)
            .with_context(|| format!("Corrupt results_json for search result {}", id))?;
        let created_ms: i64 = row.get("created_at");
        let created_at = DateTime::from_timestamp_millis(created_ms)
            .ok_or_else(|| anyhow!("Invalid created_at {} for search result {}", created_ms, id))?;

        Ok(Some(SearchRecord {
            id,
            query: row.get("query"),
            item: row.get("item"),
            cache_key: row.get("cache_key"),
            day: row.get("day"),
            results,
            created_at,
        }))
    }

    async fn insert(&self, record: &SearchRecord) -> Result<InsertOutcome> {
        let results_json = serde_json::to_string(&record.results)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO search_results (id, query, item, cache_key, day, results_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(cache_key, day) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.query)
        .bind(&record.item)
        .bind(&record.cache_key)
        .bind(&record.day)
        .bind(&results_json)
        .bind(record.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            return Ok(InsertOutcome::Inserted);
        }

        let existing_id: String =
            sqlx::query_scalar("SELECT id FROM search_results WHERE cache_key = ? AND day = ?")
                .bind(&record.cache_key)
                .bind(&record.day)
                .fetch_one(&self.pool)
                .await?;

        Ok(InsertOutcome::AlreadyPresent { existing_id })
    }
}
