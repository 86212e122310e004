//! Deduplicating review store.
//!
//! The persistence boundary for the ingestion pipeline. Upserts are a single
//! atomic `INSERT ... ON CONFLICT DO UPDATE` on the (product_id, source,
//! review_id) identity key — never a check-then-write — so two concurrent
//! ingestions of the same key cannot race into a duplicate row. The
//! `revision` counter starts at 0 and is bumped by the conflict arm, which
//! lets one statement report whether the row was newly created.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::error::Result;
use crate::models::{BatchOutcome, ModerationStatus, NewReview, Review};

/// Insert a review or refresh the existing row sharing its identity key.
///
/// Mutable fields (author, rating, title, body, verified_purchase) are
/// overwritten and `fetched_at` is bumped; moderation fields are never
/// touched. Returns `true` when a new row was created.
pub async fn upsert_review(pool: &SqlitePool, review: &NewReview) -> Result<bool> {
    let revision: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO reviews
            (product_id, source, review_id, author, rating, title, body,
             created_at, fetched_at, verified_purchase)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(product_id, source, review_id) DO UPDATE SET
            author = excluded.author,
            rating = excluded.rating,
            title = excluded.title,
            body = excluded.body,
            verified_purchase = excluded.verified_purchase,
            fetched_at = excluded.fetched_at,
            revision = revision + 1
        RETURNING revision
        "#,
    )
    .bind(&review.product_id)
    .bind(&review.source)
    .bind(&review.review_id)
    .bind(&review.author)
    .bind(review.rating)
    .bind(&review.title)
    .bind(&review.body)
    .bind(review.created_at)
    .bind(Utc::now().timestamp())
    .bind(review.verified_purchase as i64)
    .fetch_one(pool)
    .await?;

    Ok(revision == 0)
}

/// Upsert a batch of reviews, classifying each as inserted or duplicate.
///
/// A single record's write failure is logged and skipped — counted as
/// neither inserted nor duplicate — so one bad record cannot poison the
/// rest of the batch.
pub async fn upsert_batch(pool: &SqlitePool, reviews: &[NewReview]) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();

    for review in reviews {
        match upsert_review(pool, review).await {
            Ok(true) => {
                outcome.affected += 1;
                outcome.inserted += 1;
            }
            Ok(false) => {
                outcome.affected += 1;
                outcome.duplicates += 1;
            }
            Err(e) => {
                warn!(
                    product_id = %review.product_id,
                    source = %review.source,
                    review_id = %review.review_id,
                    "skipping review that failed to persist: {}",
                    e
                );
            }
        }
    }

    Ok(outcome)
}

/// List stored reviews for a product, most recently authored first.
/// Returns the page plus the total row count for pagination.
pub async fn list_by_product(
    pool: &SqlitePool,
    product_id: &str,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Review>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE product_id = ?")
        .bind(product_id)
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT id, product_id, source, review_id, author, rating, title, body,
               created_at, fetched_at, verified_purchase, flagged, moderation_status
        FROM reviews
        WHERE product_id = ?
        ORDER BY COALESCE(created_at, fetched_at) DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(product_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let reviews = rows
        .iter()
        .map(review_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok((reviews, total))
}

pub async fn count_by_product(pool: &SqlitePool, product_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE product_id = ?")
        .bind(product_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Administrative: remove every review stored for a product.
pub async fn delete_by_product(pool: &SqlitePool, product_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM reviews WHERE product_id = ?")
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Remove a single review by row id. Returns the number of rows deleted.
pub async fn delete_by_id(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Map a full review row into the model type.
pub(crate) fn review_from_row(row: &SqliteRow) -> Result<Review> {
    let status: String = row.get("moderation_status");
    Ok(Review {
        id: row.get("id"),
        product_id: row.get("product_id"),
        source: row.get("source"),
        review_id: row.get("review_id"),
        author: row.get("author"),
        rating: row.get("rating"),
        title: row.get("title"),
        body: row.get("body"),
        created_at: row.get("created_at"),
        fetched_at: row.get("fetched_at"),
        verified_purchase: row.get::<i64, _>("verified_purchase") != 0,
        flagged: row.get::<i64, _>("flagged") != 0,
        moderation_status: status.parse::<ModerationStatus>()?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::migrate;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    /// In-memory database with the full schema applied. A single connection
    /// keeps every query on the same :memory: instance.
    pub(crate) async fn test_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        pool
    }

    pub(crate) fn sample_review(product_id: &str, source: &str, review_id: &str) -> NewReview {
        NewReview {
            product_id: product_id.to_string(),
            source: source.to_string(),
            review_id: review_id.to_string(),
            author: Some("Ana".to_string()),
            rating: 4,
            title: Some("Solid".to_string()),
            body: Some("Works as described.".to_string()),
            created_at: 1_700_000_000,
            verified_purchase: false,
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let pool = test_pool().await;
        let review = sample_review("p1", "amazon", "r1");

        assert!(upsert_review(&pool, &review).await.unwrap());
        assert!(!upsert_review(&pool, &review).await.unwrap());
        assert_eq!(count_by_product(&pool, "p1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_repeat_upsert_refreshes_mutable_fields() {
        let pool = test_pool().await;
        let mut review = sample_review("p1", "amazon", "r1");
        upsert_review(&pool, &review).await.unwrap();

        review.rating = 2;
        review.author = Some("ana".to_string());
        upsert_review(&pool, &review).await.unwrap();

        let (rows, total) = list_by_product(&pool, "p1", 10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].rating, 2);
        assert_eq!(rows[0].author.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_upsert_preserves_moderation_fields() {
        let pool = test_pool().await;
        let review = sample_review("p1", "amazon", "r1");
        upsert_review(&pool, &review).await.unwrap();

        sqlx::query("UPDATE reviews SET flagged = 1, moderation_status = 'rejected'")
            .execute(&pool)
            .await
            .unwrap();

        // Re-ingesting the same key must not reset moderation state
        upsert_review(&pool, &review).await.unwrap();

        let (rows, _) = list_by_product(&pool, "p1", 10, 0).await.unwrap();
        assert!(rows[0].flagged);
        assert_eq!(rows[0].moderation_status, ModerationStatus::Rejected);
    }

    #[tokio::test]
    async fn test_batch_counts_inserted_and_duplicates() {
        let pool = test_pool().await;
        let batch = vec![
            sample_review("p1", "amazon", "r1"),
            sample_review("p1", "amazon", "r2"),
            sample_review("p1", "bestbuy", "r1"),
        ];

        let first = upsert_batch(&pool, &batch).await.unwrap();
        assert_eq!(first.inserted, 3);
        assert_eq!(first.duplicates, 0);

        let second = upsert_batch(&pool, &batch).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 3);
        assert_eq!(count_by_product(&pool, "p1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_by_product_and_id() {
        let pool = test_pool().await;
        upsert_review(&pool, &sample_review("p1", "amazon", "r1"))
            .await
            .unwrap();
        upsert_review(&pool, &sample_review("p2", "amazon", "r1"))
            .await
            .unwrap();

        assert_eq!(delete_by_product(&pool, "p1").await.unwrap(), 1);
        assert_eq!(count_by_product(&pool, "p1").await.unwrap(), 0);

        let (rows, _) = list_by_product(&pool, "p2", 10, 0).await.unwrap();
        assert_eq!(delete_by_id(&pool, rows[0].id).await.unwrap(), 1);
        assert_eq!(delete_by_id(&pool, rows[0].id).await.unwrap(), 0);
    }
}
