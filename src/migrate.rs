use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::error::Result;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Reviews table. The compound UNIQUE constraint is the deduplication
    // key; a repeated ingestion of the same (product_id, source, review_id)
    // updates the row instead of creating a duplicate.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id TEXT NOT NULL,
            source TEXT NOT NULL,
            review_id TEXT NOT NULL,
            author TEXT,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            title TEXT,
            body TEXT,
            created_at INTEGER,
            fetched_at INTEGER NOT NULL,
            verified_purchase INTEGER NOT NULL DEFAULT 0,
            flagged INTEGER NOT NULL DEFAULT 0,
            moderation_status TEXT NOT NULL DEFAULT 'approved'
                CHECK (moderation_status IN ('pending', 'approved', 'rejected')),
            revision INTEGER NOT NULL DEFAULT 0,
            UNIQUE(product_id, source, review_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Products table. Populated by the catalog service; read-only here.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            price REAL,
            category TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes backing the moderation queue and timeline queries
    for sql in [
        "CREATE INDEX IF NOT EXISTS idx_reviews_product ON reviews(product_id)",
        "CREATE INDEX IF NOT EXISTS idx_reviews_source ON reviews(source)",
        "CREATE INDEX IF NOT EXISTS idx_reviews_product_source ON reviews(product_id, source)",
        "CREATE INDEX IF NOT EXISTS idx_reviews_created_at ON reviews(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_reviews_fetched_at ON reviews(fetched_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_reviews_flagged ON reviews(flagged)",
        "CREATE INDEX IF NOT EXISTS idx_reviews_status ON reviews(moderation_status)",
    ] {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}
