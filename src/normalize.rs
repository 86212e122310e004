//! Review normalization.
//!
//! Maps an arbitrary provider payload into a canonical [`NewReview`] and
//! computes its identity key. When the provider omits an external review id,
//! a stable one is synthesized from the payload's content so repeated
//! fetches of the same underlying review collapse to the same key instead of
//! piling up duplicates.

use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};

use crate::models::{NewReview, RawReviewPayload};

/// Number of hex digits kept from the synthesized id digest. A heuristic
/// collision-avoidance width, not a cryptographic identity guarantee.
const SYNTH_ID_HEX_LEN: usize = 16;

/// Normalize one raw payload into a storable review.
///
/// `now` is shared across the whole batch so that records missing an
/// authored date are stamped identically within one ingestion run.
/// A missing or unparseable rating falls back to `fallback_rating`;
/// out-of-range ratings are clamped into [1, 5].
pub fn normalize(
    raw: &RawReviewPayload,
    product_id: &str,
    source: &str,
    now: DateTime<Utc>,
    fallback_rating: i64,
) -> NewReview {
    let rating = match raw.rating {
        Some(r) if r.is_finite() => (r.round() as i64).clamp(1, 5),
        _ => fallback_rating,
    };

    let created_at = raw
        .date
        .as_deref()
        .and_then(parse_authored_date)
        .unwrap_or_else(|| now.timestamp());

    let review_id = match raw.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => synthesize_review_id(raw, source),
    };

    NewReview {
        product_id: product_id.to_string(),
        source: source.to_string(),
        review_id,
        author: raw.author.clone(),
        rating,
        title: raw.title.clone(),
        body: raw.body.clone(),
        created_at,
        verified_purchase: raw.verified_purchase.unwrap_or(false),
    }
}

/// Parse an authored date as RFC 3339 or plain `YYYY-MM-DD`.
fn parse_authored_date(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// Build a stable id for payloads whose provider supplied none.
///
/// Hashes the fields that identify a review to a human (author, date, text,
/// rating), so the same upstream review keeps the same key across retries.
fn synthesize_review_id(raw: &RawReviewPayload, source: &str) -> String {
    let base = format!(
        "{}|{}|{}|{}",
        raw.author.as_deref().unwrap_or("anonymous"),
        raw.date.as_deref().unwrap_or(""),
        raw.body
            .as_deref()
            .or(raw.title.as_deref())
            .unwrap_or(""),
        raw.rating.map(|r| r.to_string()).unwrap_or_default(),
    );

    let mut hasher = Sha256::new();
    hasher.update(base.as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{}-{}", source, &digest[..SYNTH_ID_HEX_LEN])
}
