//! Provider abstraction for upstream review sources.
//!
//! A [`Provider`] fetches raw review payloads for one named source (e.g.
//! `"amazon"`). Providers know nothing about other sources or about storage;
//! the ingestion orchestrator fans out across them and merges the results.
//!
//! Built-in kinds:
//!
//! | Kind | Module | Purpose |
//! |------|--------|---------|
//! | `http` | [`provider_http`](crate::provider_http) | Fetch JSON from an upstream scraping service |
//! | `fixture` | [`provider_fixture`](crate::provider_fixture) | Read payloads from a local JSON file |
//!
//! All configured instances are resolved into a [`ProviderRegistry`] at
//! startup; the requested source names of an ingestion run are looked up
//! there by name.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::RawReviewPayload;

/// A single upstream review source.
///
/// # Contract
///
/// `fetch` returns every review payload the source currently exposes for the
/// product, within the provider's own timeout. An empty list is a valid
/// success. Failures (timeout, non-success response, malformed payload) are
/// reported as [`Error::Provider`]; the provider performs no local mutation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Source label used on stored reviews (e.g. `"amazon"`).
    fn name(&self) -> &str;

    /// Provider kind identifier (`"http"`, `"fixture"`).
    fn kind(&self) -> &str;

    /// One-line description shown in `rvf sources` output.
    fn description(&self) -> &str;

    /// Fetch all raw review payloads for a product.
    async fn fetch(&self, product_id: &str) -> Result<Vec<RawReviewPayload>>;
}

/// Registry of configured providers, looked up by source name.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Resolve every configured provider instance from the TOML config.
    pub fn from_config(config: &Config) -> Self {
        use crate::provider_fixture::FixtureProvider;
        use crate::provider_http::HttpProvider;

        let mut registry = Self::new();

        for (name, cfg) in &config.providers.http {
            registry.register(Arc::new(HttpProvider::new(name.clone(), cfg.clone())));
        }
        for (name, cfg) in &config.providers.fixture {
            registry.register(Arc::new(FixtureProvider::new(name.clone(), cfg.clone())));
        }

        registry
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    /// Find a provider by source name, cloning the handle for task spawning.
    pub fn find(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(Arc::clone)
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Unwrap the payload envelope an upstream service returns.
///
/// Accepts a bare JSON array, `{"data": [...]}`, or `{"reviews": [...]}` —
/// the shapes real scraping services produce.
pub(crate) fn parse_envelope(source: &str, value: serde_json::Value) -> Result<Vec<RawReviewPayload>> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => {
            match map.remove("data").or_else(|| map.remove("reviews")) {
                Some(serde_json::Value::Array(items)) => items,
                _ => {
                    return Err(Error::provider(
                        source,
                        "unexpected payload format: no data/reviews array",
                    ))
                }
            }
        }
        _ => {
            return Err(Error::provider(
                source,
                "unexpected payload format: expected array or object",
            ))
        }
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<RawReviewPayload>(item)
                .map_err(|e| Error::provider(source, format!("malformed review payload: {}", e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_accepts_bare_array() {
        let value = serde_json::json!([{"id": "r1", "rating": 5}]);
        let items = parse_envelope("amazon", value).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_envelope_accepts_data_and_reviews_keys() {
        for key in ["data", "reviews"] {
            let value = serde_json::json!({ key: [{"rating": 3}, {"rating": 4}] });
            let items = parse_envelope("amazon", value).unwrap();
            assert_eq!(items.len(), 2);
        }
    }

    #[test]
    fn test_envelope_rejects_non_list_payload() {
        let value = serde_json::json!({"message": "rate limited"});
        assert!(parse_envelope("amazon", value).is_err());

        let value = serde_json::json!("oops");
        assert!(parse_envelope("amazon", value).is_err());
    }
}
