//! # Reviewflow CLI (`rvf`)
//!
//! The `rvf` binary is the administrative interface for Reviewflow. It
//! provides commands for database initialization, review ingestion, stored
//! review reads, aggregation, moderation, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! rvf --config ./config/rvf.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rvf init` | Create the SQLite database and run schema migrations |
//! | `rvf sources` | List configured providers and stored counts |
//! | `rvf ingest <product>` | Fetch reviews from providers and store them |
//! | `rvf reviews <product>` | List stored reviews for a product |
//! | `rvf stats <product>` | Per-product aggregate rollup |
//! | `rvf overview` | Catalog-wide dashboard analytics |
//! | `rvf moderation <action>` | Moderation queue, updates, and deletion |
//! | `rvf purge <product>` | Delete all reviews stored for a product |
//! | `rvf serve` | Start the JSON HTTP server |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reviewflow::models::ModerationStatus;
use reviewflow::moderation::{ModerationUpdate, QueueFilter};
use reviewflow::providers::ProviderRegistry;
use reviewflow::{analytics, config, db, ingest, migrate, moderation, server, sources, store};

/// Reviewflow CLI — a multi-source product review ingestion, deduplication,
/// and analytics engine.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rvf.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rvf",
    about = "Reviewflow — multi-source review ingestion, deduplication, and analytics",
    version,
    long_about = "Reviewflow pulls customer reviews for catalog products from multiple upstream \
    providers, deduplicates them against previously stored rows, exposes moderation controls, \
    and computes dashboard analytics on demand."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rvf.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, the reviews and products tables,
    /// and all indexes. Idempotent — running it multiple times is safe.
    Init,

    /// List configured providers and what the store holds for each.
    Sources,

    /// Fetch reviews for a product from its providers and store them.
    ///
    /// Fans out one fetch per source in parallel; a failing source is
    /// reported in the summary and never aborts the others. Re-running
    /// against unchanged upstream data stores zero new rows.
    Ingest {
        /// Product id to ingest reviews for.
        product: String,

        /// Comma-separated source names (defaults to `[ingest].default_sources`).
        #[arg(long, value_delimiter = ',')]
        sources: Vec<String>,
    },

    /// List stored reviews for a product, most recent first.
    Reviews {
        /// Product id.
        product: String,

        /// Maximum number of reviews to print.
        #[arg(long, default_value_t = 25)]
        limit: i64,

        /// Number of reviews to skip.
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Aggregate rating statistics for a single product.
    Stats {
        /// Product id.
        product: String,
    },

    /// Catalog-wide analytics overview (volume, sources, trends).
    Overview {
        /// Trailing window in days for timeline views (clamped to 7–365).
        #[arg(long)]
        days: Option<i64>,
    },

    /// Moderation queue and state changes.
    Moderation {
        #[command(subcommand)]
        action: ModerationAction,
    },

    /// Delete every review stored for a product.
    Purge {
        /// Product id.
        product: String,
    },

    /// Start the JSON HTTP server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

/// Moderation subcommands.
#[derive(Subcommand)]
enum ModerationAction {
    /// List the moderation queue with optional filters.
    List {
        /// Filter by status: pending, approved, or rejected.
        #[arg(long)]
        status: Option<String>,

        /// Only show flagged reviews.
        #[arg(long)]
        flagged: bool,

        /// Filter by product id.
        #[arg(long)]
        product: Option<String>,

        /// Maximum number of reviews to print.
        #[arg(long, default_value_t = 25)]
        limit: i64,

        /// Number of reviews to skip.
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Update a review's moderation status and/or flagged bit.
    Update {
        /// Review row id.
        id: i64,

        /// New status: pending, approved, or rejected.
        #[arg(long)]
        status: Option<String>,

        /// Set the flagged bit.
        #[arg(long, conflicts_with = "unflag")]
        flag: bool,

        /// Clear the flagged bit.
        #[arg(long)]
        unflag: bool,
    },

    /// Permanently delete a review.
    Delete {
        /// Review row id.
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reviewflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            sources::run_list(&cfg).await?;
        }
        Commands::Ingest { product, sources } => {
            let pool = db::connect(&cfg).await?;
            let registry = ProviderRegistry::from_config(&cfg);
            let report = ingest::run_ingest(&cfg, &pool, &registry, &product, &sources).await?;
            pool.close().await;

            println!("ingest {}", product);
            println!("  sources: {}", report.sources.join(", "));
            println!("  fetched: {}", report.total_fetched);
            println!("  inserted: {}", report.inserted);
            println!("  duplicates: {}", report.duplicates);
            for err in &report.errors {
                println!("  error [{}]: {}", err.source, err.message);
            }
            if report.success {
                println!("ok");
            } else {
                println!("failed");
                std::process::exit(1);
            }
        }
        Commands::Reviews {
            product,
            limit,
            offset,
        } => {
            let pool = db::connect(&cfg).await?;
            let (items, total) = store::list_by_product(&pool, &product, limit, offset).await?;
            pool.close().await;

            println!("reviews for {} ({} total)", product, total);
            for review in &items {
                println!(
                    "  #{} [{}] {}/5 {} — {}",
                    review.id,
                    review.source,
                    review.rating,
                    review.title.as_deref().unwrap_or("(untitled)"),
                    review.author.as_deref().unwrap_or("anonymous"),
                );
            }
        }
        Commands::Stats { product } => {
            let pool = db::connect(&cfg).await?;
            let stats = analytics::product_stats(&pool, &product).await?;
            pool.close().await;

            println!("stats for {}", product);
            println!("  reviews: {}", stats.total_reviews);
            println!("  average: {:.2}", stats.overall_average);
            println!("  by source:");
            for entry in &stats.source_breakdown {
                println!(
                    "    {:<16} {:>5} reviews, avg {:.2}",
                    entry.source, entry.count, entry.average
                );
            }
            println!("  histogram:");
            for (rating, count) in &stats.rating_histogram {
                println!("    {}: {}", rating, count);
            }
        }
        Commands::Overview { days } => {
            let pool = db::connect(&cfg).await?;
            let view = analytics::overview(&pool, days).await?;
            pool.close().await;

            println!("analytics overview (last {} days)", view.window_days);
            println!("  reviews: {}", view.totals.total_reviews);
            println!("  products with reviews: {}", view.totals.products_with_reviews);
            println!("  average rating: {:.2}", view.totals.average_rating);
            println!("  source mix:");
            for entry in &view.source_mix {
                println!(
                    "    {:<16} {:>5} reviews, avg {:.2}",
                    entry.source, entry.count, entry.average
                );
            }
            println!("  histogram:");
            for (rating, count) in &view.rating_histogram {
                println!("    {}: {}", rating, count);
            }
            println!("  timeline ({} days):", view.timeline.len());
            for bucket in &view.timeline {
                println!(
                    "    {} {:>5} reviews, avg {:.2}",
                    bucket.date, bucket.count, bucket.average_rating
                );
            }
            println!("  top products:");
            for top in &view.top_products {
                println!(
                    "    {:<16} {:>5} reviews, avg {:.2}",
                    top.name.as_deref().unwrap_or(&top.product_id),
                    top.review_count,
                    top.average_rating
                );
            }
        }
        Commands::Moderation { action } => match action {
            ModerationAction::List {
                status,
                flagged,
                product,
                limit,
                offset,
            } => {
                let status = status
                    .as_deref()
                    .map(str::parse::<ModerationStatus>)
                    .transpose()?;
                let filter = QueueFilter {
                    status,
                    flagged: if flagged { Some(true) } else { None },
                    product_id: product,
                    limit: Some(limit),
                    offset: Some(offset),
                };

                let pool = db::connect(&cfg).await?;
                let (items, total) = moderation::queue(&pool, &filter).await?;
                pool.close().await;

                println!("moderation queue ({} total)", total);
                for review in &items {
                    println!(
                        "  #{} [{}] {} {} product={} {}/5",
                        review.id,
                        review.source,
                        review.moderation_status,
                        if review.flagged { "flagged" } else { "-" },
                        review.product_id,
                        review.rating,
                    );
                }
            }
            ModerationAction::Update {
                id,
                status,
                flag,
                unflag,
            } => {
                let status = status
                    .as_deref()
                    .map(str::parse::<ModerationStatus>)
                    .transpose()?;
                let flagged = if flag {
                    Some(true)
                } else if unflag {
                    Some(false)
                } else {
                    None
                };

                let pool = db::connect(&cfg).await?;
                let updated =
                    moderation::update(&pool, id, &ModerationUpdate { flagged, status }).await?;
                pool.close().await;
                println!("updated {} review(s)", updated);
            }
            ModerationAction::Delete { id } => {
                let pool = db::connect(&cfg).await?;
                moderation::delete(&pool, id).await?;
                pool.close().await;
                println!("deleted review {}", id);
            }
        },
        Commands::Purge { product } => {
            let pool = db::connect(&cfg).await?;
            let deleted = store::delete_by_product(&pool, &product).await?;
            pool.close().await;
            println!("deleted {} review(s) for {}", deleted, product);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
