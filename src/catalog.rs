//! Product identity resolution.
//!
//! Catalog CRUD lives in an external service; this module only reads the
//! `products` table to validate that a product exists before server-side
//! ingestion and to label the top-products ranking. Product rows are never
//! mutated here.

use sqlx::{Row, SqlitePool};

use crate::error::Result;
use crate::models::Product;

/// Look up a product by id. `None` when the catalog does not know it.
pub async fn resolve_product(pool: &SqlitePool, product_id: &str) -> Result<Option<Product>> {
    let row = sqlx::query("SELECT id, name, price, category, created_at FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Product {
        id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
        category: row.get("category"),
        created_at: row.get("created_at"),
    }))
}
