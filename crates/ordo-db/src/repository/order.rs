//! # Order Repository
//!
//! Reads plus one transaction per state-machine transition:
//!
//! ```text
//!   create_order   counter bump → reserve stock → insert order + items
//!   pay            guard pending → stamp paid_at → consume stock
//!   close          guard pending → stamp cancelled_at → release stock
//! ```
//!
//! The guard is a conditional `UPDATE ... WHERE status = 'pending'`; when
//! it matches no row another transaction won the race and the caller gets
//! [`DbError::Conflict`] with nothing written. Terminal states are never
//! left: there is no SQL path out of `paid`, `cancelled` or `expired`
//! except the unguarded admin write [`set_status`](OrderRepository::set_status).

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use ordo_core::order_number::{day_key, format_order_number};
use ordo_core::{Order, OrderDetail, OrderItem, OrderStatus};

use crate::error::{DbError, DbResult};
use crate::repository::reservation::{self, StockLine};

// =============================================================================
// Write Models
// =============================================================================

/// Everything needed to persist a priced order. The caller has already
/// validated the request and run pricing; the repository assigns the ID and
/// the order number.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub subtotal_cents: i64,
    pub tax_rate_bps: i64,
    pub tax_amount_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub items: Vec<NewOrderItem>,
}

/// One priced line of a [`NewOrder`], carrying the product snapshot.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub subtotal_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order persistence and state transitions.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Creates an order: bumps the day counter, reserves stock for every
    /// line and inserts the order with its items, all in one transaction.
    ///
    /// The counter bump takes a write lock on the day's row, so two
    /// concurrent creations serialize and can never share an order number.
    pub async fn create_order(&self, new: NewOrder) -> DbResult<OrderDetail> {
        let mut tx = self.pool.begin().await?;

        let day = new.created_at.date_naive();
        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_counters (day, seq) VALUES (?, 1)
            ON CONFLICT(day) DO UPDATE SET seq = seq + 1
            RETURNING seq
            "#,
        )
        .bind(day_key(day))
        .fetch_one(&mut *tx)
        .await?;
        let order_number = format_order_number(day, seq);

        let lines: Vec<StockLine> = new
            .items
            .iter()
            .map(|item| StockLine::new(item.product_id.clone(), item.quantity))
            .collect();
        reservation::reserve(&mut tx, new.created_at, &lines).await?;

        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_number,
            user_id: new.user_id,
            status: OrderStatus::Pending,
            subtotal_cents: new.subtotal_cents,
            tax_rate_bps: new.tax_rate_bps,
            tax_amount_cents: new.tax_amount_cents,
            total_cents: new.total_cents,
            created_at: new.created_at,
            expires_at: new.expires_at,
            paid_at: None,
            cancelled_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO orders
                (id, order_number, user_id, status, subtotal_cents,
                 tax_rate_bps, tax_amount_cents, total_cents,
                 created_at, expires_at, paid_at, cancelled_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.user_id)
        .bind(order.status)
        .bind(order.subtotal_cents)
        .bind(order.tax_rate_bps)
        .bind(order.tax_amount_cents)
        .bind(order.total_cents)
        .bind(order.created_at)
        .bind(order.expires_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(new.items.len());
        for item in new.items {
            let row = OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                product_id: item.product_id,
                product_name: item.product_name,
                unit_price_cents: item.unit_price_cents,
                quantity: item.quantity,
                subtotal_cents: item.subtotal_cents,
                created_at: new.created_at,
            };

            sqlx::query(
                r#"
                INSERT INTO order_items
                    (id, order_id, product_id, product_name,
                     unit_price_cents, quantity, subtotal_cents, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&row.id)
            .bind(&row.order_id)
            .bind(&row.product_id)
            .bind(&row.product_name)
            .bind(row.unit_price_cents)
            .bind(row.quantity)
            .bind(row.subtotal_cents)
            .bind(row.created_at)
            .execute(&mut *tx)
            .await?;

            items.push(row);
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total_cents = order.total_cents,
            "Order created"
        );

        Ok(OrderDetail { order, items })
    }

    /// Marks a pending order paid and consumes its stock reservation.
    ///
    /// Returns [`DbError::Conflict`] if the order is no longer pending and
    /// [`DbError::NotFound`] if it does not exist; the caller re-reads the
    /// order to translate a conflict into a domain error.
    pub async fn pay(&self, order_id: &str, now: DateTime<Utc>) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET status = ?, paid_at = ? WHERE id = ? AND status = ?",
        )
        .bind(OrderStatus::Paid)
        .bind(now)
        .bind(order_id)
        .bind(OrderStatus::Pending)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.transition_failure(&mut tx, order_id).await?);
        }

        let lines = self.stock_lines(&mut tx, order_id).await?;
        reservation::consume(&mut tx, now, &lines).await?;

        let order = self.fetch_in_tx(&mut tx, order_id).await?;
        tx.commit().await?;

        info!(order_id = %order.id, order_number = %order.order_number, "Order paid");
        Ok(order)
    }

    /// Closes a pending order as `Cancelled` or `Expired` and releases its
    /// stock reservation. Same guard semantics as [`pay`](Self::pay).
    pub async fn close(
        &self,
        order_id: &str,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<Order> {
        debug_assert!(matches!(
            status,
            OrderStatus::Cancelled | OrderStatus::Expired
        ));

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET status = ?, cancelled_at = ? WHERE id = ? AND status = ?",
        )
        .bind(status)
        .bind(now)
        .bind(order_id)
        .bind(OrderStatus::Pending)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.transition_failure(&mut tx, order_id).await?);
        }

        let lines = self.stock_lines(&mut tx, order_id).await?;
        reservation::release(&mut tx, now, &lines).await?;

        let order = self.fetch_in_tx(&mut tx, order_id).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            status = %order.status,
            "Order closed"
        );
        Ok(order)
    }

    /// Writes an order's status directly, without guards, timestamps or
    /// stock movement. Administrative escape hatch only; every normal
    /// transition goes through `create_order` / `pay` / `close`.
    pub async fn set_status(&self, order_id: &str, status: OrderStatus) -> DbResult<Order> {
        let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(status)
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        debug!(order_id = %order_id, status = %status, "Order status overwritten");
        self.find_by_id(order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Fetches an order by ID.
    pub async fn find_by_id(&self, order_id: &str) -> DbResult<Option<Order>> {
        Ok(
            sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Fetches an order's line items in insertion order.
    pub async fn items_for(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        Ok(sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ? ORDER BY rowid",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Fetches an order together with its items.
    pub async fn detail(&self, order_id: &str) -> DbResult<Option<OrderDetail>> {
        let Some(order) = self.find_by_id(order_id).await? else {
            return Ok(None);
        };
        let items = self.items_for(order_id).await?;
        Ok(Some(OrderDetail { order, items }))
    }

    /// Lists a user's orders, newest first.
    pub async fn list_by_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        Ok(sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Lists every order, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Order>> {
        Ok(
            sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Pending orders whose reservation window has elapsed at `now`.
    ///
    /// Served by the `(status, expires_at)` index; oldest first so the
    /// sweeper works through the backlog in order.
    pub async fn find_due_for_expiry(&self, now: DateTime<Utc>) -> DbResult<Vec<Order>> {
        Ok(sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE status = ? AND expires_at <= ? ORDER BY expires_at",
        )
        .bind(OrderStatus::Pending)
        .bind(now)
        .fetch_all(&self.pool)
        .await?)
    }

    // -------------------------------------------------------------------------
    // Transaction helpers
    // -------------------------------------------------------------------------

    /// Diagnoses a guard update that matched no row: the order is either
    /// missing or already in a terminal state.
    async fn transition_failure(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        order_id: &str,
    ) -> DbResult<DbError> {
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(match exists {
            Some(_) => DbError::conflict("Order", order_id),
            None => DbError::not_found("Order", order_id),
        })
    }

    async fn stock_lines(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        order_id: &str,
    ) -> DbResult<Vec<StockLine>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT product_id, quantity FROM order_items WHERE order_id = ?")
                .bind(order_id)
                .fetch_all(&mut **tx)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, quantity)| StockLine {
                product_id,
                quantity,
            })
            .collect())
    }

    async fn fetch_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        order_id: &str,
    ) -> DbResult<Order> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use ordo_core::Product;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        db.products().create(name, price_cents, stock).await.unwrap()
    }

    fn new_order_for(product: &Product, quantity: i64, user_id: &str) -> NewOrder {
        let now = Utc::now();
        let subtotal = product.price_cents * quantity;
        let tax = subtotal * 2000 / 10_000;
        NewOrder {
            user_id: user_id.to_string(),
            subtotal_cents: subtotal,
            tax_rate_bps: 2000,
            tax_amount_cents: tax,
            total_cents: subtotal + tax,
            created_at: now,
            expires_at: now + Duration::minutes(30),
            items: vec![NewOrderItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                unit_price_cents: product.price_cents,
                quantity,
                subtotal_cents: subtotal,
            }],
        }
    }

    async fn stock_of(db: &Database, id: &str) -> (i64, i64) {
        sqlx::query_as("SELECT stock_available, stock_reserved FROM products WHERE id = ?")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_assigns_sequential_order_numbers() {
        let db = test_db().await;
        let product = seed_product(&db, "Mug", 1200, 50).await;

        let first = db
            .orders()
            .create_order(new_order_for(&product, 1, "u1"))
            .await
            .unwrap();
        let second = db
            .orders()
            .create_order(new_order_for(&product, 1, "u1"))
            .await
            .unwrap();

        let day = day_key(first.order.created_at.date_naive());
        assert_eq!(first.order.order_number, format!("ORD-{day}-0001"));
        assert_eq!(second.order.order_number, format!("ORD-{day}-0002"));
    }

    #[tokio::test]
    async fn create_reserves_stock_and_snapshots_items() {
        let db = test_db().await;
        let product = seed_product(&db, "Mug", 1200, 50).await;

        let detail = db
            .orders()
            .create_order(new_order_for(&product, 3, "u1"))
            .await
            .unwrap();

        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].product_name, "Mug");
        assert_eq!(detail.items[0].unit_price_cents, 1200);
        assert_eq!(detail.items[0].subtotal_cents, 3600);
        assert_eq!(stock_of(&db, &product.id).await, (47, 3));
    }

    #[tokio::test]
    async fn create_rolls_back_on_insufficient_stock() {
        let db = test_db().await;
        let product = seed_product(&db, "Mug", 1200, 2).await;

        let err = db
            .orders()
            .create_order(new_order_for(&product, 5, "u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::InsufficientStock { .. }));
        assert_eq!(stock_of(&db, &product.id).await, (2, 0));
        assert_eq!(db.orders().list_all().await.unwrap().len(), 0);

        // The counter bump rolled back too: the next order gets 0001.
        let detail = db
            .orders()
            .create_order(new_order_for(&product, 1, "u1"))
            .await
            .unwrap();
        assert!(detail.order.order_number.ends_with("-0001"));
    }

    #[tokio::test]
    async fn pay_consumes_stock_and_stamps_paid_at() {
        let db = test_db().await;
        let product = seed_product(&db, "Mug", 1200, 10).await;
        let detail = db
            .orders()
            .create_order(new_order_for(&product, 4, "u1"))
            .await
            .unwrap();

        let paid = db.orders().pay(&detail.order.id, Utc::now()).await.unwrap();

        assert_eq!(paid.status, OrderStatus::Paid);
        assert!(paid.paid_at.is_some());
        assert!(paid.cancelled_at.is_none());
        assert_eq!(stock_of(&db, &product.id).await, (6, 0));
    }

    #[tokio::test]
    async fn pay_twice_is_a_conflict() {
        let db = test_db().await;
        let product = seed_product(&db, "Mug", 1200, 10).await;
        let detail = db
            .orders()
            .create_order(new_order_for(&product, 1, "u1"))
            .await
            .unwrap();

        db.orders().pay(&detail.order.id, Utc::now()).await.unwrap();
        let err = db.orders().pay(&detail.order.id, Utc::now()).await.unwrap_err();

        assert!(matches!(err, DbError::Conflict { .. }));
        // Stock was consumed exactly once.
        assert_eq!(stock_of(&db, &product.id).await, (9, 0));
    }

    #[tokio::test]
    async fn pay_missing_order_is_not_found() {
        let db = test_db().await;
        let err = db.orders().pay("nope", Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn close_releases_stock_and_stamps_cancelled_at() {
        let db = test_db().await;
        let product = seed_product(&db, "Mug", 1200, 10).await;
        let detail = db
            .orders()
            .create_order(new_order_for(&product, 4, "u1"))
            .await
            .unwrap();

        let closed = db
            .orders()
            .close(&detail.order.id, OrderStatus::Cancelled, Utc::now())
            .await
            .unwrap();

        assert_eq!(closed.status, OrderStatus::Cancelled);
        assert!(closed.cancelled_at.is_some());
        assert!(closed.paid_at.is_none());
        assert_eq!(stock_of(&db, &product.id).await, (10, 0));
    }

    #[tokio::test]
    async fn close_after_pay_is_a_conflict() {
        let db = test_db().await;
        let product = seed_product(&db, "Mug", 1200, 10).await;
        let detail = db
            .orders()
            .create_order(new_order_for(&product, 1, "u1"))
            .await
            .unwrap();

        db.orders().pay(&detail.order.id, Utc::now()).await.unwrap();
        let err = db
            .orders()
            .close(&detail.order.id, OrderStatus::Cancelled, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn find_due_for_expiry_only_matches_past_due_pending() {
        let db = test_db().await;
        let product = seed_product(&db, "Mug", 1200, 50).await;
        let orders = db.orders();

        let fresh = orders
            .create_order(new_order_for(&product, 1, "u1"))
            .await
            .unwrap();
        let stale = orders
            .create_order(new_order_for(&product, 1, "u1"))
            .await
            .unwrap();
        let paid = orders
            .create_order(new_order_for(&product, 1, "u1"))
            .await
            .unwrap();
        orders.pay(&paid.order.id, Utc::now()).await.unwrap();

        // Backdate one pending order past its window.
        let past = Utc::now() - Duration::minutes(31);
        sqlx::query("UPDATE orders SET expires_at = ? WHERE id = ?")
            .bind(past)
            .bind(&stale.order.id)
            .execute(db.pool())
            .await
            .unwrap();

        let due = orders.find_due_for_expiry(Utc::now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, stale.order.id);
        assert_ne!(due[0].id, fresh.order.id);
    }

    #[tokio::test]
    async fn list_by_user_is_scoped_and_newest_first() {
        let db = test_db().await;
        let product = seed_product(&db, "Mug", 1200, 50).await;
        let orders = db.orders();

        orders
            .create_order(new_order_for(&product, 1, "alice"))
            .await
            .unwrap();
        orders
            .create_order(new_order_for(&product, 1, "bob"))
            .await
            .unwrap();
        orders
            .create_order(new_order_for(&product, 2, "alice"))
            .await
            .unwrap();

        let mine = orders.list_by_user("alice").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|o| o.user_id == "alice"));
        assert!(mine[0].created_at >= mine[1].created_at);

        assert_eq!(orders.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn set_status_overwrites_without_guards() {
        let db = test_db().await;
        let product = seed_product(&db, "Mug", 1200, 10).await;
        let detail = db
            .orders()
            .create_order(new_order_for(&product, 1, "u1"))
            .await
            .unwrap();
        db.orders().pay(&detail.order.id, Utc::now()).await.unwrap();

        let updated = db
            .orders()
            .set_status(&detail.order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Cancelled);
    }
}
