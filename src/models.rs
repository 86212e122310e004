//! Core data models used throughout Reviewflow.
//!
//! These types represent the raw provider payloads, normalized reviews, and
//! ingestion results that flow through the fetch → normalize → store pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// Raw review payload as returned by a provider, before normalization.
///
/// Providers are scraping-style services, so every field is optional and
/// common naming variants are accepted (`id`/`review_id`, `content`/`body`,
/// `date`/`date_published`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReviewPayload {
    #[serde(default, alias = "review_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "content", alias = "text")]
    pub body: Option<String>,
    #[serde(default, alias = "date_published")]
    pub date: Option<String>,
    #[serde(default)]
    pub verified_purchase: Option<bool>,
}

/// Accept a rating as a JSON number or a numeric string ("4.0").
fn lenient_rating<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// A normalized review ready for storage.
///
/// `created_at` is always populated — the normalizer substitutes the batch's
/// shared "now" when the provider omits an authored date.
#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub product_id: String,
    pub source: String,
    pub review_id: String,
    pub author: Option<String>,
    pub rating: i64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub created_at: i64,
    pub verified_purchase: bool,
}

/// A stored review row.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: i64,
    pub product_id: String,
    pub source: String,
    pub review_id: String,
    pub author: Option<String>,
    pub rating: i64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub created_at: Option<i64>,
    pub fetched_at: i64,
    pub verified_purchase: bool,
    pub flagged: bool,
    pub moderation_status: ModerationStatus,
}

/// Moderation lifecycle state of a stored review.
///
/// Reviews are visible by default; moderation is exception-based. Transitions
/// are free-form and driven only by administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "rejected" => Ok(ModerationStatus::Rejected),
            other => Err(Error::InvalidInput(format!(
                "invalid moderation status: '{}' (expected pending, approved, or rejected)",
                other
            ))),
        }
    }
}

/// A per-source failure recorded during an ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceError {
    pub source: String,
    pub message: String,
}

/// Outcome of one ingestion run. Returned to the caller, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub product_id: String,
    pub sources: Vec<String>,
    pub total_fetched: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub errors: Vec<SourceError>,
    pub success: bool,
}

/// Counts returned by a batch upsert.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BatchOutcome {
    pub affected: u64,
    pub inserted: u64,
    pub duplicates: u64,
}

/// A catalog product referenced by reviews.
///
/// Owned by the catalog service — this crate only resolves product identity
/// and never mutates product rows.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_field_aliases() {
        let json = r#"{"review_id": "r1", "content": "great", "date_published": "2024-03-01"}"#;
        let payload: RawReviewPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.id.as_deref(), Some("r1"));
        assert_eq!(payload.body.as_deref(), Some("great"));
        assert_eq!(payload.date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn test_rating_accepts_number_or_string() {
        let a: RawReviewPayload = serde_json::from_str(r#"{"rating": 4}"#).unwrap();
        assert_eq!(a.rating, Some(4.0));

        let b: RawReviewPayload = serde_json::from_str(r#"{"rating": "3.5"}"#).unwrap();
        assert_eq!(b.rating, Some(3.5));

        let c: RawReviewPayload = serde_json::from_str(r#"{"rating": "n/a"}"#).unwrap();
        assert_eq!(c.rating, None);
    }

    #[test]
    fn test_moderation_status_round_trip() {
        for s in ["pending", "approved", "rejected"] {
            let status: ModerationStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!("published".parse::<ModerationStatus>().is_err());
    }
}
