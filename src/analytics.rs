//! Review aggregation engine.
//!
//! Computes the per-product rollup (`product_stats`) and the catalog-wide
//! dashboard overview (`overview`) fresh from the review corpus on every
//! call. Nothing here mutates data or caches results; freshness is query
//! time. The rollup is issued as simple grouped queries (per-source,
//! per-rating, overall) combined in application code, which keeps the SQL
//! portable across storage engines.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::error::Result;

/// Trailing window applied to timeline and activity views, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 90;
const MIN_WINDOW_DAYS: i64 = 7;
const MAX_WINDOW_DAYS: i64 = 365;

/// Fixed size of the top-products ranking.
const TOP_PRODUCTS_LIMIT: i64 = 6;

/// Per-source review volume and mean rating.
#[derive(Debug, Clone, Serialize)]
pub struct SourceBreakdown {
    pub source: String,
    pub count: i64,
    pub average: f64,
}

/// Single-product rollup returned by `product_stats`.
#[derive(Debug, Clone, Serialize)]
pub struct ProductStats {
    pub total_reviews: i64,
    pub overall_average: f64,
    pub source_breakdown: Vec<SourceBreakdown>,
    /// Dense over ratings 1–5; buckets absent from the data are zero.
    pub rating_histogram: BTreeMap<i64, i64>,
}

/// Corpus-wide totals for the dashboard header.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewTotals {
    pub total_reviews: i64,
    pub products_with_reviews: i64,
    pub average_rating: f64,
    pub last_ingested_at: Option<i64>,
}

/// One calendar-day bucket of the review timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineBucket {
    pub date: String,
    pub count: i64,
    pub average_rating: f64,
}

/// One (source, day) cell of the activity matrix.
#[derive(Debug, Clone, Serialize)]
pub struct SourceActivity {
    pub source: String,
    pub date: String,
    pub count: i64,
}

/// One row of the top-products ranking.
#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub product_id: String,
    /// Product name from the catalog table, when the product is known there.
    pub name: Option<String>,
    pub review_count: i64,
    pub average_rating: f64,
    pub first_review_at: i64,
    pub last_review_at: i64,
}

/// Dashboard-facing analytics, recomputed per request.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsOverview {
    pub window_days: i64,
    pub totals: OverviewTotals,
    pub source_mix: Vec<SourceBreakdown>,
    pub rating_histogram: BTreeMap<i64, i64>,
    pub timeline: Vec<TimelineBucket>,
    pub activity_by_source: Vec<SourceActivity>,
    pub top_products: Vec<TopProduct>,
}

/// Clamp a requested window into the supported [7, 365] day range.
pub fn clamp_window_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_WINDOW_DAYS)
        .clamp(MIN_WINDOW_DAYS, MAX_WINDOW_DAYS)
}

/// Aggregate stats for a single product.
pub async fn product_stats(pool: &SqlitePool, product_id: &str) -> Result<ProductStats> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS total, ROUND(AVG(rating), 2) AS average
         FROM reviews WHERE product_id = ?",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    let total_reviews: i64 = row.get("total");
    let overall_average: f64 = row.get::<Option<f64>, _>("average").unwrap_or(0.0);

    let source_breakdown = source_breakdown(pool, Some(product_id)).await?;
    let rating_histogram = rating_histogram(pool, Some(product_id)).await?;

    Ok(ProductStats {
        total_reviews,
        overall_average,
        source_breakdown,
        rating_histogram,
    })
}

/// Catalog-wide analytics overview for the trailing `days` window.
pub async fn overview(pool: &SqlitePool, days: Option<i64>) -> Result<AnalyticsOverview> {
    let window_days = clamp_window_days(days);

    let summary = sqlx::query(
        "SELECT COUNT(*) AS total,
                COUNT(DISTINCT product_id) AS products,
                ROUND(AVG(rating), 2) AS average,
                MAX(fetched_at) AS last_ingested
         FROM reviews",
    )
    .fetch_one(pool)
    .await?;

    let totals = OverviewTotals {
        total_reviews: summary.get("total"),
        products_with_reviews: summary.get("products"),
        average_rating: summary.get::<Option<f64>, _>("average").unwrap_or(0.0),
        last_ingested_at: summary.get("last_ingested"),
    };

    let source_mix = source_breakdown(pool, None).await?;
    let histogram = rating_histogram(pool, None).await?;

    // Day buckets key on the authored date, falling back to fetch time for
    // rows whose provider omitted one.
    let timeline_rows = sqlx::query(
        r#"
        SELECT date(COALESCE(created_at, fetched_at), 'unixepoch') AS bucket,
               COUNT(*) AS count,
               ROUND(AVG(rating), 2) AS average
        FROM reviews
        WHERE date(COALESCE(created_at, fetched_at), 'unixepoch')
              >= date('now', '-' || ? || ' days')
        GROUP BY bucket
        ORDER BY bucket ASC
        "#,
    )
    .bind(window_days)
    .fetch_all(pool)
    .await?;

    let timeline = timeline_rows
        .iter()
        .map(|row| TimelineBucket {
            date: row.get("bucket"),
            count: row.get("count"),
            average_rating: row.get::<Option<f64>, _>("average").unwrap_or(0.0),
        })
        .collect();

    let activity_rows = sqlx::query(
        r#"
        SELECT source,
               date(COALESCE(created_at, fetched_at), 'unixepoch') AS bucket,
               COUNT(*) AS count
        FROM reviews
        WHERE date(COALESCE(created_at, fetched_at), 'unixepoch')
              >= date('now', '-' || ? || ' days')
        GROUP BY source, bucket
        ORDER BY bucket ASC, source ASC
        "#,
    )
    .bind(window_days)
    .fetch_all(pool)
    .await?;

    let activity_by_source = activity_rows
        .iter()
        .map(|row| SourceActivity {
            source: row.get("source"),
            date: row.get("bucket"),
            count: row.get("count"),
        })
        .collect();

    let top_rows = sqlx::query(
        r#"
        SELECT r.product_id,
               p.name,
               COUNT(*) AS review_count,
               ROUND(AVG(r.rating), 2) AS average,
               MIN(COALESCE(r.created_at, r.fetched_at)) AS first_review_at,
               MAX(COALESCE(r.created_at, r.fetched_at)) AS last_review_at
        FROM reviews r
        LEFT JOIN products p ON p.id = r.product_id
        GROUP BY r.product_id
        ORDER BY review_count DESC, average DESC
        LIMIT ?
        "#,
    )
    .bind(TOP_PRODUCTS_LIMIT)
    .fetch_all(pool)
    .await?;

    let top_products = top_rows
        .iter()
        .map(|row| TopProduct {
            product_id: row.get("product_id"),
            name: row.get("name"),
            review_count: row.get("review_count"),
            average_rating: row.get::<Option<f64>, _>("average").unwrap_or(0.0),
            first_review_at: row.get("first_review_at"),
            last_review_at: row.get("last_review_at"),
        })
        .collect();

    Ok(AnalyticsOverview {
        window_days,
        totals,
        source_mix,
        rating_histogram: histogram,
        timeline,
        activity_by_source,
        top_products,
    })
}

/// Per-source count and mean rating, ordered by volume descending.
async fn source_breakdown(
    pool: &SqlitePool,
    product_id: Option<&str>,
) -> Result<Vec<SourceBreakdown>> {
    let sql = match product_id {
        Some(_) => {
            "SELECT source, COUNT(*) AS count, ROUND(AVG(rating), 2) AS average
             FROM reviews WHERE product_id = ? GROUP BY source ORDER BY count DESC"
        }
        None => {
            "SELECT source, COUNT(*) AS count, ROUND(AVG(rating), 2) AS average
             FROM reviews GROUP BY source ORDER BY count DESC"
        }
    };

    let mut query = sqlx::query(sql);
    if let Some(id) = product_id {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    Ok(rows
        .iter()
        .map(|row| SourceBreakdown {
            source: row.get("source"),
            count: row.get("count"),
            average: row.get::<Option<f64>, _>("average").unwrap_or(0.0),
        })
        .collect())
}

/// Rating histogram, always dense over buckets 1–5.
async fn rating_histogram(
    pool: &SqlitePool,
    product_id: Option<&str>,
) -> Result<BTreeMap<i64, i64>> {
    let sql = match product_id {
        Some(_) => {
            "SELECT rating, COUNT(*) AS count FROM reviews WHERE product_id = ? GROUP BY rating"
        }
        None => "SELECT rating, COUNT(*) AS count FROM reviews GROUP BY rating",
    };

    let mut query = sqlx::query(sql);
    if let Some(id) = product_id {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    let mut histogram: BTreeMap<i64, i64> = (1..=5).map(|r| (r, 0)).collect();
    for row in &rows {
        let rating: i64 = row.get("rating");
        if let Some(bucket) = histogram.get_mut(&rating) {
            *bucket = row.get("count");
        }
    }

    Ok(histogram)
}
