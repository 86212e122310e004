//! HTTP review provider.
//!
//! Fetches review payloads for a product from an upstream scraping service
//! over JSON: `GET {base_url}/{product_id}?source={name}`. Each instance
//! carries its own request timeout; a timeout or error on one instance never
//! affects sibling sources in the same ingestion run.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::HttpProviderConfig;
use crate::error::{Error, Result};
use crate::models::RawReviewPayload;
use crate::providers::{parse_envelope, Provider};

pub struct HttpProvider {
    /// Source label (e.g. `"amazon"`).
    name: String,
    config: HttpProviderConfig,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(name: String, config: HttpProviderConfig) -> Self {
        Self {
            name,
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "http"
    }

    fn description(&self) -> &str {
        "Fetch reviews from an upstream HTTP scraping service"
    }

    async fn fetch(&self, product_id: &str) -> Result<Vec<RawReviewPayload>> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            product_id
        );

        let resp = self
            .client
            .get(&url)
            .query(&[("source", self.name.as_str())])
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::provider(&self.name, "request timed out")
                } else {
                    Error::provider(&self.name, format!("request failed: {}", e))
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(
                &self.name,
                format!(
                    "upstream returned HTTP {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            ));
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::provider(&self.name, format!("invalid JSON response: {}", e)))?;

        parse_envelope(&self.name, value)
    }
}
