//! Ingestion pipeline orchestration.
//!
//! Coordinates one ingestion run: fan-out across the requested sources (one
//! task per source), fan-in of the settled results, normalization into a
//! single batch, and chunked hand-off to the deduplicating store. Failure is
//! isolated at every stage — a source that times out or a chunk that fails
//! to persist is recorded in the report and never aborts the rest of the run.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{IngestionReport, NewReview, RawReviewPayload, SourceError};
use crate::normalize::normalize;
use crate::providers::ProviderRegistry;
use crate::store;

/// Run one ingestion for a product across the given sources.
///
/// When `sources` is empty the configured `[ingest].default_sources` are
/// used. Provider errors are retried zero times within a single call; the
/// caller re-invokes to retry.
pub async fn run_ingest(
    config: &Config,
    pool: &SqlitePool,
    registry: &ProviderRegistry,
    product_id: &str,
    sources: &[String],
) -> crate::error::Result<IngestionReport> {
    let sources: Vec<String> = if sources.is_empty() {
        config.ingest.default_sources.clone()
    } else {
        sources.to_vec()
    };

    let mut errors: Vec<SourceError> = Vec::new();
    let mut handles = Vec::new();

    for source in &sources {
        match registry.find(source) {
            Some(provider) => {
                let pid = product_id.to_string();
                handles.push((
                    source.clone(),
                    tokio::spawn(async move { provider.fetch(&pid).await }),
                ));
            }
            None => {
                warn!(source = %source, "no provider configured for source");
                errors.push(SourceError {
                    source: source.clone(),
                    message: "no provider configured for this source".to_string(),
                });
            }
        }
    }

    // Fan-in: each source settles independently. A failed fetch becomes an
    // error entry; sibling tasks keep their results.
    let mut fetched: Vec<(String, Vec<RawReviewPayload>)> = Vec::new();
    for (source, handle) in handles {
        match handle.await {
            Ok(Ok(payloads)) => {
                info!(source = %source, count = payloads.len(), "fetched reviews");
                fetched.push((source, payloads));
            }
            Ok(Err(e)) => {
                warn!(source = %source, "fetch failed: {}", e);
                errors.push(SourceError {
                    source,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                warn!(source = %source, "fetch task aborted: {}", e);
                errors.push(SourceError {
                    source,
                    message: format!("fetch task aborted: {}", e),
                });
            }
        }
    }

    // One shared "now" for the whole batch so retried records missing an
    // authored date stamp identically.
    let now = Utc::now();
    let batch: Vec<NewReview> = fetched
        .iter()
        .flat_map(|(source, payloads)| {
            payloads
                .iter()
                .map(|raw| normalize(raw, product_id, source, now, config.ingest.fallback_rating))
        })
        .collect();

    let total_fetched = batch.len() as u64;

    if batch.is_empty() {
        warn!(product_id, "no reviews fetched from any source");
        return Ok(IngestionReport {
            product_id: product_id.to_string(),
            sources,
            total_fetched: 0,
            inserted: 0,
            duplicates: 0,
            errors,
            success: false,
        });
    }

    // Bound the size of any single write unit. A chunk that fails wholesale
    // is recorded and skipped; later chunks still run.
    let mut inserted = 0u64;
    let mut duplicates = 0u64;
    for chunk in batch.chunks(config.ingest.chunk_size) {
        match store::upsert_batch(pool, chunk).await {
            Ok(outcome) => {
                inserted += outcome.inserted;
                duplicates += outcome.duplicates;
            }
            Err(e) => {
                warn!("failed to persist a chunk of {} reviews: {}", chunk.len(), e);
                errors.push(SourceError {
                    source: "storage".to_string(),
                    message: format!("failed to persist {} reviews: {}", chunk.len(), e),
                });
            }
        }
    }

    let success = inserted + duplicates > 0;
    info!(
        product_id,
        total_fetched,
        inserted,
        duplicates,
        failed_sources = errors.len(),
        "ingestion finished"
    );

    Ok(IngestionReport {
        product_id: product_id.to_string(),
        sources,
        total_fetched,
        inserted,
        duplicates,
        errors,
        success,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DbConfig, IngestConfig, ServerConfig};
    use crate::error::{Error, Result};
    use crate::providers::Provider;
    use crate::store::tests::test_pool;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Provider stub returning a fixed number of payloads, or failing.
    struct StubProvider {
        name: String,
        payloads: Vec<RawReviewPayload>,
        fail: bool,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            &self.name
        }
        fn kind(&self) -> &str {
            "stub"
        }
        fn description(&self) -> &str {
            "test stub"
        }
        async fn fetch(&self, _product_id: &str) -> Result<Vec<RawReviewPayload>> {
            if self.fail {
                return Err(Error::provider(&self.name, "connection refused"));
            }
            Ok(self.payloads.clone())
        }
    }

    fn stub(name: &str, ratings: &[f64]) -> Arc<dyn Provider> {
        Arc::new(StubProvider {
            name: name.to_string(),
            payloads: ratings
                .iter()
                .enumerate()
                .map(|(i, &r)| RawReviewPayload {
                    id: Some(format!("{}-{}", name, i)),
                    rating: Some(r),
                    body: Some("body".to_string()),
                    ..Default::default()
                })
                .collect(),
            fail: false,
        })
    }

    fn failing_stub(name: &str) -> Arc<dyn Provider> {
        Arc::new(StubProvider {
            name: name.to_string(),
            payloads: Vec::new(),
            fail: true,
        })
    }

    fn test_config() -> Config {
        Config {
            db: DbConfig {
                path: ":memory:".into(),
            },
            ingest: IngestConfig::default(),
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
            providers: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_one_failing_source_does_not_abort_the_run() {
        let pool = test_pool().await;
        let config = test_config();

        let mut registry = ProviderRegistry::new();
        registry.register(stub("a", &[5.0, 5.0]));
        registry.register(failing_stub("b"));
        registry.register(stub("c", &[1.0]));

        let sources: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let report = run_ingest(&config, &pool, &registry, "p1", &sources)
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].source, "b");
        assert_eq!(report.total_fetched, 3);
        assert_eq!(report.inserted, 3);
        assert_eq!(store::count_by_product(&pool, "p1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_rerun_reports_duplicates_not_inserts() {
        let pool = test_pool().await;
        let config = test_config();

        let mut registry = ProviderRegistry::new();
        registry.register(stub("a", &[4.0, 3.0, 5.0]));

        let sources: Vec<String> = vec!["a".into()];
        let first = run_ingest(&config, &pool, &registry, "p1", &sources)
            .await
            .unwrap();
        assert_eq!((first.inserted, first.duplicates), (3, 0));

        let second = run_ingest(&config, &pool, &registry, "p1", &sources)
            .await
            .unwrap();
        assert_eq!((second.inserted, second.duplicates), (0, 3));
        assert!(second.success);
        assert_eq!(store::count_by_product(&pool, "p1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_not_success() {
        let pool = test_pool().await;
        let config = test_config();

        let mut registry = ProviderRegistry::new();
        registry.register(failing_stub("a"));
        registry.register(failing_stub("b"));

        let sources: Vec<String> = vec!["a".into(), "b".into()];
        let report = run_ingest(&config, &pool, &registry, "p1", &sources)
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.total_fetched, 0);
    }

    #[tokio::test]
    async fn test_unknown_source_recorded_as_error() {
        let pool = test_pool().await;
        let config = test_config();

        let mut registry = ProviderRegistry::new();
        registry.register(stub("a", &[5.0]));

        let sources: Vec<String> = vec!["a".into(), "mystery".into()];
        let report = run_ingest(&config, &pool, &registry, "p1", &sources)
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].source, "mystery");
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn test_large_batches_are_chunked() {
        let pool = test_pool().await;
        let mut config = test_config();
        config.ingest.chunk_size = 10;

        let ratings: Vec<f64> = (0..35).map(|i| ((i % 5) + 1) as f64).collect();
        let mut registry = ProviderRegistry::new();
        registry.register(stub("a", &ratings));

        let sources: Vec<String> = vec!["a".into()];
        let report = run_ingest(&config, &pool, &registry, "p1", &sources)
            .await
            .unwrap();

        assert_eq!(report.inserted, 35);
        assert_eq!(store::count_by_product(&pool, "p1").await.unwrap(), 35);
    }
}
