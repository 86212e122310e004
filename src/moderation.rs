//! Moderation engine.
//!
//! Governs the visibility state of stored reviews. Status transitions are
//! free-form and driven entirely by administrative action; the `flagged` bit
//! is an orthogonal attention signal that never changes status on its own.
//! One update call may set either field or both.

use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::models::{ModerationStatus, Review};
use crate::store::{self, review_from_row};

pub const DEFAULT_QUEUE_LIMIT: i64 = 25;
pub const MAX_QUEUE_LIMIT: i64 = 100;

/// Filters for the moderation queue. All optional; unset filters match all.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub status: Option<ModerationStatus>,
    pub flagged: Option<bool>,
    pub product_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Field changes applied by one moderation action.
#[derive(Debug, Clone, Default)]
pub struct ModerationUpdate {
    pub flagged: Option<bool>,
    pub status: Option<ModerationStatus>,
}

impl ModerationUpdate {
    pub fn is_empty(&self) -> bool {
        self.flagged.is_none() && self.status.is_none()
    }
}

/// Fetch a page of the moderation queue plus the total match count.
///
/// Ordered by `fetched_at` descending so the most recently ingested reviews
/// surface first.
pub async fn queue(pool: &SqlitePool, filter: &QueueFilter) -> Result<(Vec<Review>, i64)> {
    let mut conditions: Vec<&str> = Vec::new();
    if filter.status.is_some() {
        conditions.push("moderation_status = ?");
    }
    if filter.flagged.is_some() {
        conditions.push("flagged = ?");
    }
    if filter.product_id.is_some() {
        conditions.push("product_id = ?");
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM reviews {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(status) = filter.status {
        count_query = count_query.bind(status.as_str());
    }
    if let Some(flagged) = filter.flagged {
        count_query = count_query.bind(flagged as i64);
    }
    if let Some(ref product_id) = filter.product_id {
        count_query = count_query.bind(product_id.clone());
    }
    let total = count_query.fetch_one(pool).await?;

    let limit = filter
        .limit
        .unwrap_or(DEFAULT_QUEUE_LIMIT)
        .clamp(1, MAX_QUEUE_LIMIT);
    let offset = filter.offset.unwrap_or(0).max(0);

    let page_sql = format!(
        r#"
        SELECT id, product_id, source, review_id, author, rating, title, body,
               created_at, fetched_at, verified_purchase, flagged, moderation_status
        FROM reviews
        {}
        ORDER BY fetched_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_clause
    );

    let mut page_query = sqlx::query(&page_sql);
    if let Some(status) = filter.status {
        page_query = page_query.bind(status.as_str());
    }
    if let Some(flagged) = filter.flagged {
        page_query = page_query.bind(flagged as i64);
    }
    if let Some(ref product_id) = filter.product_id {
        page_query = page_query.bind(product_id.clone());
    }
    let rows = page_query.bind(limit).bind(offset).fetch_all(pool).await?;

    let reviews = rows
        .iter()
        .map(review_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok((reviews, total))
}

/// Apply a moderation update to one review.
///
/// Only the fields named in `changes` are written — updating status leaves
/// `flagged` untouched and vice versa. Returns the number of rows updated;
/// a missing review id is a `NotFound` error, never a silent no-op.
pub async fn update(pool: &SqlitePool, id: i64, changes: &ModerationUpdate) -> Result<u64> {
    if changes.is_empty() {
        return Err(Error::InvalidInput(
            "no moderation changes provided".to_string(),
        ));
    }

    let mut sets: Vec<&str> = Vec::new();
    if changes.flagged.is_some() {
        sets.push("flagged = ?");
    }
    if changes.status.is_some() {
        sets.push("moderation_status = ?");
    }

    let sql = format!("UPDATE reviews SET {} WHERE id = ?", sets.join(", "));
    let mut query = sqlx::query(&sql);
    if let Some(flagged) = changes.flagged {
        query = query.bind(flagged as i64);
    }
    if let Some(status) = changes.status {
        query = query.bind(status.as_str());
    }

    let result = query.bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("review {}", id)));
    }

    Ok(result.rows_affected())
}

/// Permanently delete one review, regardless of its moderation status.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    if store::delete_by_id(pool, id).await? == 0 {
        return Err(Error::NotFound(format!("review {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{sample_review, test_pool};
    use crate::store::upsert_review;

    async fn seeded_pool() -> SqlitePool {
        let pool = test_pool().await;
        for (product, source, id) in [("p1", "amazon", "r1"), ("p1", "bestbuy", "r1"), ("p2", "amazon", "r2")] {
            upsert_review(&pool, &sample_review(product, source, id))
                .await
                .unwrap();
        }
        pool
    }

    async fn first_id(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT id FROM reviews ORDER BY id LIMIT 1")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_queue_defaults_to_everything() {
        let pool = seeded_pool().await;
        let (items, total) = queue(&pool, &QueueFilter::default()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_pending_queue_is_empty_on_fresh_corpus() {
        // Reviews default to approved; moderation is exception-based.
        let pool = seeded_pool().await;
        let filter = QueueFilter {
            status: Some(ModerationStatus::Pending),
            ..Default::default()
        };
        let (items, total) = queue(&pool, &filter).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_flag_does_not_change_status_and_vice_versa() {
        let pool = seeded_pool().await;
        let id = first_id(&pool).await;

        // Flagging leaves the status alone
        update(
            &pool,
            id,
            &ModerationUpdate {
                flagged: Some(true),
                status: None,
            },
        )
        .await
        .unwrap();

        let filter = QueueFilter {
            flagged: Some(true),
            ..Default::default()
        };
        let (items, _) = queue(&pool, &filter).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].moderation_status, ModerationStatus::Approved);

        // Rejecting without mentioning flagged leaves the flag set
        update(
            &pool,
            id,
            &ModerationUpdate {
                flagged: None,
                status: Some(ModerationStatus::Rejected),
            },
        )
        .await
        .unwrap();

        let (items, _) = queue(&pool, &filter).await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].flagged);
        assert_eq!(items[0].moderation_status, ModerationStatus::Rejected);
    }

    #[tokio::test]
    async fn test_combined_update_sets_both_fields() {
        let pool = seeded_pool().await;
        let id = first_id(&pool).await;

        update(
            &pool,
            id,
            &ModerationUpdate {
                flagged: Some(true),
                status: Some(ModerationStatus::Pending),
            },
        )
        .await
        .unwrap();

        let filter = QueueFilter {
            status: Some(ModerationStatus::Pending),
            flagged: Some(true),
            ..Default::default()
        };
        let (items, total) = queue(&pool, &filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, id);
    }

    #[tokio::test]
    async fn test_queue_filters_by_product_and_paginates() {
        let pool = seeded_pool().await;
        let filter = QueueFilter {
            product_id: Some("p1".to_string()),
            limit: Some(1),
            offset: Some(0),
            ..Default::default()
        };
        let (items, total) = queue(&pool, &filter).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_review_is_not_found() {
        let pool = seeded_pool().await;
        let err = update(
            &pool,
            999_999,
            &ModerationUpdate {
                flagged: Some(true),
                status: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_update_is_invalid_input() {
        let pool = seeded_pool().await;
        let id = first_id(&pool).await;
        let err = update(&pool, id, &ModerationUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_is_permanent_and_distinguishes_missing() {
        let pool = seeded_pool().await;
        let id = first_id(&pool).await;

        delete(&pool, id).await.unwrap();
        let err = delete(&pool, id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let (_, total) = queue(&pool, &QueueFilter::default()).await.unwrap();
        assert_eq!(total, 2);
    }
}
