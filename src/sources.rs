//! Source listing and health overview.
//!
//! Reports every configured provider alongside what the store currently
//! holds for it: stored review count and last fetch time. Sources present
//! in the data but no longer configured are listed too, so stale
//! configuration is visible at a glance. Used by `rvf sources` and
//! `GET /sources`.

use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::error::Result;
use crate::providers::ProviderRegistry;

/// Configured-vs-stored status of one source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub source: String,
    pub kind: String,
    pub review_count: i64,
    pub last_fetched_at: Option<i64>,
}

/// Merge the provider registry with per-source counts from the store.
pub async fn source_statuses(
    pool: &SqlitePool,
    registry: &ProviderRegistry,
) -> Result<Vec<SourceStatus>> {
    let mut statuses: Vec<SourceStatus> = registry
        .providers()
        .iter()
        .map(|p| SourceStatus {
            source: p.name().to_string(),
            kind: p.kind().to_string(),
            review_count: 0,
            last_fetched_at: None,
        })
        .collect();

    let rows = sqlx::query(
        "SELECT source, COUNT(*) AS count, MAX(fetched_at) AS last_fetched
         FROM reviews GROUP BY source ORDER BY count DESC",
    )
    .fetch_all(pool)
    .await?;

    for row in &rows {
        let source: String = row.get("source");
        match statuses.iter_mut().find(|s| s.source == source) {
            Some(status) => {
                status.review_count = row.get("count");
                status.last_fetched_at = row.get("last_fetched");
            }
            None => statuses.push(SourceStatus {
                source,
                kind: "unconfigured".to_string(),
                review_count: row.get("count"),
                last_fetched_at: row.get("last_fetched"),
            }),
        }
    }

    Ok(statuses)
}

/// CLI entry point — prints the source table.
pub async fn run_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let registry = ProviderRegistry::from_config(config);
    let statuses = source_statuses(&pool, &registry).await?;

    println!(
        "{:<16} {:<14} {:>8}   {}",
        "SOURCE", "KIND", "REVIEWS", "LAST FETCH"
    );
    for status in &statuses {
        let last_fetch = match status.last_fetched_at {
            Some(ts) => format_ts(ts),
            None => "never".to_string(),
        };
        println!(
            "{:<16} {:<14} {:>8}   {}",
            status.source, status.kind, status.review_count, last_fetch
        );
    }

    pool.close().await;
    Ok(())
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
