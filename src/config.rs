use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Upper bound on the number of reviews handed to the store in one
    /// write unit. Larger batches are split before persistence.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Rating assigned to records whose provider rating is missing or
    /// unparseable. Partial data is common from scraping-style sources.
    #[serde(default = "default_fallback_rating")]
    pub fallback_rating: i64,
    /// Sources ingested when the caller does not name any.
    #[serde(default = "default_sources")]
    pub default_sources: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            fallback_rating: default_fallback_rating(),
            default_sources: default_sources(),
        }
    }
}

fn default_chunk_size() -> usize {
    100
}
fn default_fallback_rating() -> i64 {
    1
}
fn default_sources() -> Vec<String> {
    vec![
        "amazon".to_string(),
        "bestbuy".to_string(),
        "walmart".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub http: HashMap<String, HttpProviderConfig>,
    #[serde(default)]
    pub fixture: HashMap<String, FixtureProviderConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpProviderConfig {
    /// Endpoint prefix; the product id is appended as a path segment.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct FixtureProviderConfig {
    /// JSON file holding an array of raw review payloads (or an object
    /// with a `data`/`reviews` array, as upstream services return).
    pub path: PathBuf,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.ingest.chunk_size == 0 {
        anyhow::bail!("ingest.chunk_size must be > 0");
    }

    if !(1..=5).contains(&config.ingest.fallback_rating) {
        anyhow::bail!("ingest.fallback_rating must be in [1, 5]");
    }

    for (name, http) in &config.providers.http {
        if http.base_url.trim().is_empty() {
            anyhow::bail!("providers.http.{}.base_url must not be empty", name);
        }
        if http.timeout_secs == 0 {
            anyhow::bail!("providers.http.{}.timeout_secs must be > 0", name);
        }
    }

    Ok(config)
}
