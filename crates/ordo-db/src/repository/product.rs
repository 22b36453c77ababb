//! # Product Repository
//!
//! Catalog access as the order engine sees it. Order creation goes through
//! [`find_active_by_ids`](ProductRepository::find_active_by_ids); the other
//! methods serve catalog management (seeding, stock top-ups, soft deletes).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use ordo_core::Product;

use crate::error::{DbError, DbResult};

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new active product with the given stock on hand.
    pub async fn create(&self, name: &str, price_cents: i64, stock: i64) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            price_cents,
            stock_available: stock,
            stock_reserved: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, price_cents, stock_available, stock_reserved,
                 is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock_available)
        .bind(product.stock_reserved)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Fetches a product by ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Fetches the active products among `ids`, in no particular order.
    ///
    /// Missing and inactive IDs are silently absent from the result; the
    /// caller compares lengths to detect them. An empty input returns an
    /// empty vec without touching the database.
    pub async fn find_active_by_ids(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // sqlx has no array binding for SQLite, so the placeholder list is
        // built by hand. Values still go through bind(), never the SQL text.
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT * FROM products WHERE is_active = 1 AND id IN ({placeholders})"
        );

        let mut query = sqlx::query_as::<_, Product>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Lists all products, active first, newest first within each group.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        Ok(sqlx::query_as::<_, Product>(
            "SELECT * FROM products ORDER BY is_active DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Adjusts available stock by a relative delta (restock or correction).
    ///
    /// Guarded so a negative correction can never take `stock_available`
    /// below zero.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_available = stock_available + ?,
                updated_at = ?
            WHERE id = ? AND stock_available + ? >= 0
            "#,
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(id)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either the product is missing or the correction would go
            // negative; re-read to tell which.
            self.get_by_id(id).await?;
            return Err(DbError::conflict("Product", id));
        }

        debug!(id = %id, delta, "Stock adjusted");
        Ok(())
    }

    /// Deactivates a product so new orders can no longer reference it.
    ///
    /// Rows are never deleted while order items point at them; pending
    /// reservations of a deactivated product still release or consume
    /// normally.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id = %id, "Product deactivated");
        Ok(())
    }

    /// Total number of products, active or not.
    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
