//! JSON HTTP server.
//!
//! Exposes the review engine to the catalog and admin frontends: ingestion
//! triggers, stored-review reads, per-product rollups, the moderation queue,
//! and the dashboard analytics overview.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/products/{id}/ingest` | Fetch + store reviews (`?sources=a,b`) |
//! | `GET`  | `/products/{id}/reviews` | Paginated stored reviews |
//! | `GET`  | `/products/{id}/stats` | Per-product aggregate rollup |
//! | `GET`  | `/moderation/reviews` | Filterable moderation queue |
//! | `PATCH` | `/moderation/reviews/{id}` | Update flagged/status |
//! | `DELETE` | `/moderation/reviews/{id}` | Permanently delete a review |
//! | `GET`  | `/analytics/overview` | Dashboard analytics (`?days=N`) |
//! | `GET`  | `/sources` | Configured sources and stored counts |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid moderation status" } }
//! ```
//!
//! Codes: `bad_request` (400), `not_found` (404), `upstream_failed` (502),
//! `internal` (500). Ingestion returns 200 with a per-source breakdown even
//! under partial failure; only a run that fetched nothing and wrote nothing
//! maps to 502.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::analytics;
use crate::catalog;
use crate::config::Config;
use crate::db;
use crate::error::Error;
use crate::ingest;
use crate::models::{IngestionReport, ModerationStatus, Review};
use crate::moderation::{self, ModerationUpdate, QueueFilter};
use crate::providers::ProviderRegistry;
use crate::sources::{self, SourceStatus};
use crate::store;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: sqlx::SqlitePool,
    registry: Arc<ProviderRegistry>,
}

/// Start the HTTP server on the configured bind address.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;
    let registry = Arc::new(ProviderRegistry::from_config(config));

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        registry,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/products/{id}/ingest", post(handle_ingest))
        .route("/products/{id}/reviews", get(handle_list_reviews))
        .route("/products/{id}/stats", get(handle_product_stats))
        .route("/moderation/reviews", get(handle_moderation_queue))
        .route(
            "/moderation/reviews/{id}",
            patch(handle_moderation_update).delete(handle_moderation_delete),
        )
        .route("/analytics/overview", get(handle_overview))
        .route("/sources", get(handle_sources))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!("review server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(_) => not_found(err.to_string()),
            Error::InvalidInput(_) => bad_request(err.to_string()),
            Error::Provider { .. } => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream_failed".to_string(),
                message: err.to_string(),
            },
            _ => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal".to_string(),
                message: err.to_string(),
            },
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /products/{id}/ingest ============

#[derive(Deserialize)]
struct IngestParams {
    /// Comma-separated source names; defaults to the configured sources.
    sources: Option<String>,
}

#[derive(Serialize)]
struct IngestResponse {
    success: bool,
    message: String,
    data: IngestionReport,
}

/// Trigger an ingestion run. Synchronous from the caller's perspective:
/// the response carries the full per-source breakdown.
async fn handle_ingest(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<IngestParams>,
) -> Result<Response, AppError> {
    // Validate product identity before fanning out to providers
    if catalog::resolve_product(&state.pool, &id).await?.is_none() {
        return Err(not_found(format!("product {}", id)));
    }

    let sources: Vec<String> = params
        .sources
        .as_deref()
        .map(|s| {
            s.split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let report = ingest::run_ingest(&state.config, &state.pool, &state.registry, &id, &sources).await?;

    let message = if report.success {
        format!(
            "stored {} new review(s), {} duplicate(s)",
            report.inserted, report.duplicates
        )
    } else {
        "failed to fetch reviews from any source".to_string()
    };

    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    let body = IngestResponse {
        success: report.success,
        message,
        data: report,
    };

    Ok((status, Json(body)).into_response())
}

// ============ GET /products/{id}/reviews ============

#[derive(Deserialize)]
struct PageParams {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Serialize)]
struct ReviewPage {
    items: Vec<Review>,
    total: i64,
    limit: i64,
    offset: i64,
}

async fn handle_list_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<ReviewPage>, AppError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);

    let (items, total) = store::list_by_product(&state.pool, &id, limit, offset).await?;

    Ok(Json(ReviewPage {
        items,
        total,
        limit,
        offset,
    }))
}

// ============ GET /products/{id}/stats ============

async fn handle_product_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<analytics::ProductStats>, AppError> {
    let stats = analytics::product_stats(&state.pool, &id).await?;
    Ok(Json(stats))
}

// ============ GET /moderation/reviews ============

#[derive(Deserialize)]
struct ModerationQueryParams {
    status: Option<String>,
    flagged: Option<String>,
    product_id: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Serialize)]
struct ModerationPage {
    items: Vec<Review>,
    total: i64,
}

async fn handle_moderation_queue(
    State(state): State<AppState>,
    Query(params): Query<ModerationQueryParams>,
) -> Result<Json<ModerationPage>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<ModerationStatus>)
        .transpose()?;

    let flagged = match params.flagged.as_deref() {
        None => None,
        Some("1") | Some("true") => Some(true),
        Some("0") | Some("false") => Some(false),
        Some(other) => {
            return Err(bad_request(format!(
                "invalid flagged filter: '{}' (expected true or false)",
                other
            )))
        }
    };

    let filter = QueueFilter {
        status,
        flagged,
        product_id: params.product_id,
        limit: params.limit,
        offset: params.offset,
    };

    let (items, total) = moderation::queue(&state.pool, &filter).await?;
    Ok(Json(ModerationPage { items, total }))
}

// ============ PATCH /moderation/reviews/{id} ============

#[derive(Deserialize)]
struct ModerationPatch {
    flagged: Option<bool>,
    status: Option<String>,
}

#[derive(Serialize)]
struct ModerationUpdated {
    updated: u64,
}

async fn handle_moderation_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ModerationPatch>,
) -> Result<Json<ModerationUpdated>, AppError> {
    let status = patch
        .status
        .as_deref()
        .map(str::parse::<ModerationStatus>)
        .transpose()?;

    let changes = ModerationUpdate {
        flagged: patch.flagged,
        status,
    };

    let updated = moderation::update(&state.pool, id, &changes).await?;
    Ok(Json(ModerationUpdated { updated }))
}

// ============ DELETE /moderation/reviews/{id} ============

#[derive(Serialize)]
struct ModerationDeleted {
    deleted: u64,
}

async fn handle_moderation_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ModerationDeleted>, AppError> {
    moderation::delete(&state.pool, id).await?;
    Ok(Json(ModerationDeleted { deleted: 1 }))
}

// ============ GET /analytics/overview ============

#[derive(Deserialize)]
struct OverviewParams {
    days: Option<i64>,
}

async fn handle_overview(
    State(state): State<AppState>,
    Query(params): Query<OverviewParams>,
) -> Result<Json<analytics::AnalyticsOverview>, AppError> {
    let view = analytics::overview(&state.pool, params.days).await?;
    Ok(Json(view))
}

// ============ GET /sources ============

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<SourceStatus>,
}

async fn handle_sources(
    State(state): State<AppState>,
) -> Result<Json<SourcesResponse>, AppError> {
    let statuses = sources::source_statuses(&state.pool, &state.registry).await?;
    Ok(Json(SourcesResponse { sources: statuses }))
}
