//! # Stock Reservation Operations
//!
//! The three moves stock can make, always as relative deltas inside the
//! caller's transaction:
//!
//! ```text
//!              reserve                  consume
//!   available ─────────▶ reserved ─────────────▶ (gone, sold)
//!   available ◀───────── reserved
//!              release
//! ```
//!
//! `reserve` is the only guarded move that can fail on business grounds:
//! its conditional `UPDATE ... WHERE stock_available >= ?` matches no row
//! when stock is short, and the caller's transaction rolls back without any
//! read-modify-write window. `release` and `consume` can only fail if the
//! ledger is already out of balance, which the `CHECK` constraints and the
//! one-transition-one-transaction rule make unreachable in normal operation.
//!
//! All functions take `&mut SqliteConnection` rather than a pool so that a
//! state transition and its stock deltas commit or roll back together:
//!
//! ```rust,ignore
//! let mut tx = pool.begin().await?;
//! reservation::reserve(&mut *tx, now, &lines).await?;
//! // ... order writes on the same tx ...
//! tx.commit().await?;
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// One product/quantity pair in a stock movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub product_id: String,
    pub quantity: i64,
}

impl StockLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        StockLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Moves stock from `available` to `reserved` for every line, all or
/// nothing.
///
/// Each line is a single conditional update; if any line finds the product
/// missing, inactive, or short on stock, the error propagates and the
/// caller's transaction rolls back, leaving earlier lines untouched.
pub async fn reserve(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
    lines: &[StockLine],
) -> DbResult<()> {
    for line in lines {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_available = stock_available - ?,
                stock_reserved = stock_reserved + ?,
                updated_at = ?
            WHERE id = ? AND is_active = 1 AND stock_available >= ?
            "#,
        )
        .bind(line.quantity)
        .bind(line.quantity)
        .bind(now)
        .bind(&line.product_id)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(reserve_failure(conn, line).await?);
        }

        debug!(
            product_id = %line.product_id,
            quantity = line.quantity,
            "Stock reserved"
        );
    }

    Ok(())
}

/// Diagnoses why a guarded reserve matched no row.
///
/// Re-reads the product on the same connection (still inside the caller's
/// transaction, so the view is consistent) to tell "missing or inactive"
/// apart from "not enough stock".
async fn reserve_failure(conn: &mut SqliteConnection, line: &StockLine) -> DbResult<DbError> {
    let row: Option<(String, i64, bool)> =
        sqlx::query_as("SELECT name, stock_available, is_active FROM products WHERE id = ?")
            .bind(&line.product_id)
            .fetch_optional(conn)
            .await?;

    Ok(match row {
        Some((name, available, true)) => DbError::InsufficientStock {
            product_id: line.product_id.clone(),
            name,
            available,
            requested: line.quantity,
        },
        // Inactive products are invisible to the order engine.
        Some((_, _, false)) | None => DbError::not_found("Product", &line.product_id),
    })
}

/// Moves stock back from `reserved` to `available` (order cancelled or
/// expired).
pub async fn release(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
    lines: &[StockLine],
) -> DbResult<()> {
    for line in lines {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_available = stock_available + ?,
                stock_reserved = stock_reserved - ?,
                updated_at = ?
            WHERE id = ? AND stock_reserved >= ?
            "#,
        )
        .bind(line.quantity)
        .bind(line.quantity)
        .bind(now)
        .bind(&line.product_id)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            // Reserved stock can only come from a committed reservation, so
            // this means the ledger is out of balance.
            return Err(DbError::Internal(format!(
                "release found less than {} reserved units of product {}",
                line.quantity, line.product_id
            )));
        }

        debug!(
            product_id = %line.product_id,
            quantity = line.quantity,
            "Stock released"
        );
    }

    Ok(())
}

/// Removes stock from `reserved` permanently (order paid).
pub async fn consume(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
    lines: &[StockLine],
) -> DbResult<()> {
    for line in lines {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_reserved = stock_reserved - ?,
                updated_at = ?
            WHERE id = ? AND stock_reserved >= ?
            "#,
        )
        .bind(line.quantity)
        .bind(now)
        .bind(&line.product_id)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Internal(format!(
                "consume found less than {} reserved units of product {}",
                line.quantity, line.product_id
            )));
        }

        debug!(
            product_id = %line.product_id,
            quantity = line.quantity,
            "Stock consumed"
        );
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
