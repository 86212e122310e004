//! # Reviewflow
//!
//! A multi-source product review ingestion, deduplication, and analytics
//! engine.
//!
//! Reviewflow pulls customer reviews for catalog products from heterogeneous
//! upstream providers, persists them durably without duplication, exposes
//! moderation controls over the stored corpus, and computes dashboard-facing
//! analytics on demand.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │  Providers   │──▶│  Normalize   │──▶│  SQLite    │
//! │ http/fixture │   │  + identity  │   │  (upsert)  │
//! └──────────────┘   └──────────────┘   └─────┬─────┘
//!                                             │
//!                      ┌──────────────┬───────┤
//!                      ▼              ▼       ▼
//!                 ┌──────────┐  ┌──────────┐ ┌──────────┐
//!                 │Moderation│  │Analytics │ │   CLI    │
//!                 │  queue   │  │ overview │ │  + HTTP  │
//!                 └──────────┘  └──────────┘ └──────────┘
//! ```
//!
//! Ingestion fans out one task per requested source, tolerates per-source
//! failure, and hands the merged batch to an idempotent upsert keyed on
//! (product_id, source, review_id). Re-running an unchanged ingestion writes
//! zero new rows.
//!
//! ## Quick Start
//!
//! ```bash
//! rvf init                          # create database
//! rvf ingest prod-1                 # fetch + store from configured sources
//! rvf stats prod-1                  # per-product rollup
//! rvf overview --days 30            # dashboard analytics
//! rvf moderation list --flagged     # review queue
//! rvf serve                         # start the JSON HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`providers`] | Provider trait and registry |
//! | [`provider_http`] | HTTP upstream provider |
//! | [`provider_fixture`] | Local JSON fixture provider |
//! | [`normalize`] | Payload normalization and identity keys |
//! | [`ingest`] | Fan-out/fan-in ingestion orchestration |
//! | [`store`] | Deduplicating review store |
//! | [`moderation`] | Moderation queue and state changes |
//! | [`analytics`] | Per-product rollups and dashboard overview |
//! | [`catalog`] | Product identity resolution |
//! | [`sources`] | Source listing and health |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod analytics;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod moderation;
pub mod normalize;
pub mod provider_fixture;
pub mod provider_http;
pub mod providers;
pub mod server;
pub mod sources;
pub mod store;
