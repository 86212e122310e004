//! Fixture review provider.
//!
//! Reads review payloads from a local JSON file instead of the network.
//! Used for development and integration testing, where it stands in for an
//! upstream service while exercising the full normalize → dedup pipeline.
//!
//! The file holds a bare array of payloads or the same `{"data": [...]}` /
//! `{"reviews": [...]}` envelope the HTTP services return.

use async_trait::async_trait;

use crate::config::FixtureProviderConfig;
use crate::error::{Error, Result};
use crate::models::RawReviewPayload;
use crate::providers::{parse_envelope, Provider};

pub struct FixtureProvider {
    name: String,
    config: FixtureProviderConfig,
}

impl FixtureProvider {
    pub fn new(name: String, config: FixtureProviderConfig) -> Self {
        Self { name, config }
    }
}

#[async_trait]
impl Provider for FixtureProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "fixture"
    }

    fn description(&self) -> &str {
        "Read reviews from a local JSON fixture file"
    }

    async fn fetch(&self, _product_id: &str) -> Result<Vec<RawReviewPayload>> {
        let content = std::fs::read_to_string(&self.config.path).map_err(|e| {
            Error::provider(
                &self.name,
                format!("failed to read {}: {}", self.config.path.display(), e),
            )
        })?;

        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| Error::provider(&self.name, format!("invalid fixture JSON: {}", e)))?;

        parse_envelope(&self.name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_fetch_reads_fixture_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"data": [{{"id": "f1", "rating": 5, "content": "Great"}}]}}"#
        )
        .unwrap();

        let provider = FixtureProvider::new(
            "sample".to_string(),
            FixtureProviderConfig {
                path: file.path().to_path_buf(),
            },
        );

        let payloads = provider.fetch("p1").await.unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].body.as_deref(), Some("Great"));
    }

    #[tokio::test]
    async fn test_missing_file_is_provider_error() {
        let provider = FixtureProvider::new(
            "sample".to_string(),
            FixtureProviderConfig {
                path: "/nonexistent/reviews.json".into(),
            },
        );

        let err = provider.fetch("p1").await.unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}
