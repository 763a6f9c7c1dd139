use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database file and schema. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // One snapshot per cache key and local day
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_results (
            id TEXT PRIMARY KEY,
            query TEXT NOT NULL,
            item TEXT,
            cache_key TEXT NOT NULL,
            day TEXT NOT NULL,
            results_json TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(cache_key, day)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_search_results_created_at ON search_results(created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
