//! # Order Service
//!
//! The order state machine. Every public method is one complete operation:
//! validation in `ordo-core`, the transition as a single `ordo-db`
//! transaction, then event publication after commit.
//!
//! ## Concurrency
//! The service holds no locks. Two racing transitions on the same order are
//! resolved by the conditional status guard inside the transaction; the
//! loser gets `DbError::Conflict`, which this module translates by
//! re-reading the order - into [`OrderError::OrderExpired`] on the pay path
//! when the sweeper won, [`OrderError::InvalidTransition`] otherwise. Stock
//! is never mutated twice for one order.
//!
//! ## Ownership masking
//! Read and write methods take `requesting_user: Option<&str>`. `Some(uid)`
//! restricts the operation to that user's own orders and reports a foreign
//! order as [`OrderError::OrderNotFound`], so callers cannot probe for order
//! IDs they don't own. `None` means the caller may touch any order (the
//! dispatch layer passes `None` only for admins).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use ordo_core::pricing::{self, OrderSummary};
use ordo_core::{validation, Order, OrderDetail, OrderItemRequest, OrderStatus, Product};
use ordo_db::{Database, DbError, NewOrder, NewOrderItem};

use crate::config::EngineConfig;
use crate::error::{OrderError, OrderResult};
use crate::events::{EventSink, OrderEvent};

/// Drives orders through their lifecycle.
///
/// Cheap to clone; clones share the database pool and the event sink.
#[derive(Clone)]
pub struct OrderService {
    db: Database,
    config: EngineConfig,
    sink: Arc<dyn EventSink>,
}

impl OrderService {
    pub fn new(db: Database, config: EngineConfig, sink: Arc<dyn EventSink>) -> Self {
        OrderService { db, config, sink }
    }

    /// The engine configuration this service runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Creates an order: prices the request, reserves stock and persists the
    /// order with its item snapshots, all atomically.
    ///
    /// The returned order is `Pending` with `expires_at` one reservation TTL
    /// in the future.
    pub async fn create_order(
        &self,
        user_id: &str,
        items: &[OrderItemRequest],
    ) -> OrderResult<OrderDetail> {
        validation::validate_user_id(user_id)?;
        validation::validate_order_items(items)?;

        let products = self.resolve_products(items).await?;
        let lines: Vec<(&Product, i64)> = items
            .iter()
            .map(|item| (&products[&item.product_id], item.quantity))
            .collect();
        let summary = pricing::price_order(&lines, self.config.tax_rate());

        let now = Utc::now();
        let new = NewOrder {
            user_id: user_id.to_string(),
            subtotal_cents: summary.subtotal_cents,
            tax_rate_bps: summary.tax_rate_bps as i64,
            tax_amount_cents: summary.tax_amount_cents,
            total_cents: summary.total_cents,
            created_at: now,
            expires_at: now + self.config.reservation_ttl(),
            items: summary
                .items
                .into_iter()
                .map(|line| NewOrderItem {
                    product_id: line.product_id,
                    product_name: line.product_name,
                    unit_price_cents: line.unit_price_cents,
                    quantity: line.quantity,
                    subtotal_cents: line.subtotal_cents,
                })
                .collect(),
        };

        let detail = self.db.orders().create_order(new).await?;

        self.sink.publish(OrderEvent::Created {
            order_id: detail.order.id.clone(),
            order_number: detail.order.order_number.clone(),
            user_id: detail.order.user_id.clone(),
            total_cents: detail.order.total_cents,
        });

        Ok(detail)
    }

    /// Pays a pending order, consuming its stock reservation.
    ///
    /// A pay attempt past `expires_at` drives the expiry transition instead
    /// (stock released, `Expired` event published) and fails with
    /// [`OrderError::OrderExpired`].
    pub async fn pay_order(
        &self,
        order_id: &str,
        requesting_user: Option<&str>,
    ) -> OrderResult<Order> {
        let order = self.require_order(order_id, requesting_user).await?;
        if order.status.is_terminal() {
            return Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                status: order.status,
            });
        }

        let now = Utc::now();
        if order.is_expired_at(now) {
            // The window elapsed but the sweeper hasn't run yet; expire the
            // order here rather than taking money for a dead reservation.
            match self.db.orders().close(order_id, OrderStatus::Expired, now).await {
                Ok(expired) => self.publish_closed(&expired),
                Err(DbError::Conflict { .. }) => {
                    debug!(order_id, "Order transitioned concurrently during expiry");
                }
                Err(e) => return Err(e.into()),
            }
            return Err(OrderError::OrderExpired(order_id.to_string()));
        }

        match self.db.orders().pay(order_id, now).await {
            Ok(paid) => {
                self.sink.publish(OrderEvent::Paid {
                    order_id: paid.id.clone(),
                    order_number: paid.order_number.clone(),
                    user_id: paid.user_id.clone(),
                    total_cents: paid.total_cents,
                });
                Ok(paid)
            }
            Err(DbError::Conflict { .. }) => {
                let status = self.status_after_race(order_id).await?;
                if status == OrderStatus::Expired {
                    Err(OrderError::OrderExpired(order_id.to_string()))
                } else {
                    Err(OrderError::InvalidTransition {
                        order_id: order_id.to_string(),
                        status,
                    })
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Cancels a pending order, releasing its stock reservation.
    pub async fn cancel_order(
        &self,
        order_id: &str,
        requesting_user: Option<&str>,
    ) -> OrderResult<Order> {
        let order = self.require_order(order_id, requesting_user).await?;
        if order.status.is_terminal() {
            return Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                status: order.status,
            });
        }

        match self
            .db
            .orders()
            .close(order_id, OrderStatus::Cancelled, Utc::now())
            .await
        {
            Ok(cancelled) => {
                self.publish_closed(&cancelled);
                Ok(cancelled)
            }
            Err(DbError::Conflict { .. }) => {
                let status = self.status_after_race(order_id).await?;
                Err(OrderError::InvalidTransition {
                    order_id: order_id.to_string(),
                    status,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Administrative status override.
    ///
    /// A target of `Paid`, `Cancelled` or `Expired` on a pending order drives
    /// the corresponding transition, stock movement and event included; the
    /// pay path here skips the `expires_at` check, so an admin can honor a
    /// late payment. Un-cancelling nothing: `Paid` orders can never be
    /// rewritten to `Cancelled`, since the consumed stock cannot come back.
    /// Any other combination is a plain status write with no stock effect
    /// and no event.
    pub async fn update_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> OrderResult<Order> {
        let order = self.require_order(order_id, None).await?;

        if order.status == OrderStatus::Paid && status == OrderStatus::Cancelled {
            return Err(OrderError::InvalidTransition {
                order_id: order_id.to_string(),
                status: order.status,
            });
        }

        if order.status != OrderStatus::Pending || status == OrderStatus::Pending {
            if order.status == status {
                return Ok(order);
            }
            warn!(
                order_id,
                from = %order.status,
                to = %status,
                "Status overwritten without a transition"
            );
            return Ok(self.db.orders().set_status(order_id, status).await?);
        }

        let now = Utc::now();
        let result = match status {
            OrderStatus::Paid => self.db.orders().pay(order_id, now).await,
            OrderStatus::Cancelled | OrderStatus::Expired => {
                self.db.orders().close(order_id, status, now).await
            }
            OrderStatus::Pending => unreachable!("handled above"),
        };

        match result {
            Ok(updated) => {
                match updated.status {
                    OrderStatus::Paid => self.sink.publish(OrderEvent::Paid {
                        order_id: updated.id.clone(),
                        order_number: updated.order_number.clone(),
                        user_id: updated.user_id.clone(),
                        total_cents: updated.total_cents,
                    }),
                    _ => self.publish_closed(&updated),
                }
                Ok(updated)
            }
            Err(DbError::Conflict { .. }) => {
                let current = self.status_after_race(order_id).await?;
                Err(OrderError::InvalidTransition {
                    order_id: order_id.to_string(),
                    status: current,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Expires every pending order whose reservation window has elapsed.
    ///
    /// Returns the number of orders actually expired. A failure on one order
    /// is logged and skipped; it never aborts the rest of the batch, and an
    /// order another transaction transitioned first simply doesn't count.
    pub async fn expire_due_orders(&self) -> OrderResult<usize> {
        let now = Utc::now();
        let due = self.db.orders().find_due_for_expiry(now).await?;
        if due.is_empty() {
            return Ok(0);
        }

        debug!(count = due.len(), "Found orders past their reservation window");

        let mut expired = 0;
        for order in due {
            match self
                .db
                .orders()
                .close(&order.id, OrderStatus::Expired, now)
                .await
            {
                Ok(closed) => {
                    self.publish_closed(&closed);
                    expired += 1;
                }
                Err(DbError::Conflict { .. }) => {
                    debug!(
                        order_number = %order.order_number,
                        "Order transitioned concurrently, skipping"
                    );
                }
                Err(e) => {
                    warn!(
                        order_number = %order.order_number,
                        error = %e,
                        "Failed to expire order, will retry next sweep"
                    );
                }
            }
        }

        if expired > 0 {
            info!(expired, "Expired overdue orders");
        }
        Ok(expired)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Fetches an order with its items, subject to ownership masking.
    pub async fn get_order(
        &self,
        order_id: &str,
        requesting_user: Option<&str>,
    ) -> OrderResult<OrderDetail> {
        self.require_order(order_id, requesting_user).await?;
        self.db
            .orders()
            .detail(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    /// Lists a user's orders with items, newest first.
    pub async fn get_user_orders(&self, user_id: &str) -> OrderResult<Vec<OrderDetail>> {
        let orders = self.db.orders().list_by_user(user_id).await?;
        self.with_items(orders).await
    }

    /// Lists every order with items, newest first.
    pub async fn get_all_orders(&self) -> OrderResult<Vec<OrderDetail>> {
        let orders = self.db.orders().list_all().await?;
        self.with_items(orders).await
    }

    /// Prices a candidate order without creating it or touching stock.
    ///
    /// Validates the same things creation would: active products and, with
    /// quantities summed per product across lines, sufficient available
    /// stock. The figures returned are exactly what [`create_order`] would
    /// persist for the same request.
    ///
    /// [`create_order`]: Self::create_order
    pub async fn calculate_summary(
        &self,
        items: &[OrderItemRequest],
    ) -> OrderResult<OrderSummary> {
        validation::validate_order_items(items)?;

        let products = self.resolve_products(items).await?;

        let mut requested: HashMap<&str, i64> = HashMap::new();
        for item in items {
            *requested.entry(item.product_id.as_str()).or_default() += item.quantity;
        }
        for (product_id, quantity) in requested {
            let product = &products[product_id];
            if product.stock_available < quantity {
                return Err(OrderError::InsufficientStock {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    available: product.stock_available,
                    requested: quantity,
                });
            }
        }

        let lines: Vec<(&Product, i64)> = items
            .iter()
            .map(|item| (&products[&item.product_id], item.quantity))
            .collect();
        Ok(pricing::price_order(&lines, self.config.tax_rate()))
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Resolves every requested product id to an active product, keyed by id.
    async fn resolve_products(
        &self,
        items: &[OrderItemRequest],
    ) -> OrderResult<HashMap<String, Product>> {
        let mut ids: Vec<String> = Vec::new();
        for item in items {
            if !ids.contains(&item.product_id) {
                ids.push(item.product_id.clone());
            }
        }

        let products = self.db.products().find_active_by_ids(&ids).await?;

        if products.len() != ids.len() {
            let missing: Vec<String> = ids
                .into_iter()
                .filter(|id| !products.iter().any(|p| &p.id == id))
                .collect();
            return Err(OrderError::ProductUnavailable(missing));
        }

        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    /// Fetches an order, applying the ownership mask.
    async fn require_order(
        &self,
        order_id: &str,
        requesting_user: Option<&str>,
    ) -> OrderResult<Order> {
        let order = self
            .db
            .orders()
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;

        if let Some(user_id) = requesting_user {
            // A foreign order looks exactly like a missing one.
            if order.user_id != user_id {
                return Err(OrderError::OrderNotFound(order_id.to_string()));
            }
        }

        Ok(order)
    }

    /// Re-reads an order's status after a lost guard race.
    async fn status_after_race(&self, order_id: &str) -> OrderResult<OrderStatus> {
        let order = self
            .db
            .orders()
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
        Ok(order.status)
    }

    /// Publishes the event for a closed (cancelled or expired) order.
    fn publish_closed(&self, order: &Order) {
        let event = match order.status {
            OrderStatus::Expired => OrderEvent::Expired {
                order_id: order.id.clone(),
                order_number: order.order_number.clone(),
                user_id: order.user_id.clone(),
            },
            _ => OrderEvent::Cancelled {
                order_id: order.id.clone(),
                order_number: order.order_number.clone(),
                user_id: order.user_id.clone(),
            },
        };
        self.sink.publish(event);
    }

    async fn with_items(&self, orders: Vec<Order>) -> OrderResult<Vec<OrderDetail>> {
        let repo = self.db.orders();
        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let items = repo.items_for(&order.id).await?;
            details.push(OrderDetail { order, items });
        }
        Ok(details)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use chrono::Duration;
    use ordo_db::DbConfig;

    async fn setup() -> (OrderService, Database, Arc<RecordingSink>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sink = Arc::new(RecordingSink::default());
        let service = OrderService::new(db.clone(), EngineConfig::default(), sink.clone());
        (service, db, sink)
    }

    async fn seed(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        db.products().create(name, price_cents, stock).await.unwrap()
    }

    fn request(product: &Product, quantity: i64) -> OrderItemRequest {
        OrderItemRequest {
            product_id: product.id.clone(),
            quantity,
        }
    }

    async fn stock_of(db: &Database, id: &str) -> (i64, i64) {
        sqlx::query_as("SELECT stock_available, stock_reserved FROM products WHERE id = ?")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn backdate_expiry(db: &Database, order_id: &str) {
        let past = Utc::now() - Duration::minutes(1);
        sqlx::query("UPDATE orders SET expires_at = ? WHERE id = ?")
            .bind(past)
            .bind(order_id)
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn full_lifecycle_create_then_pay() {
        let (service, db, sink) = setup().await;
        let product = seed(&db, "Widget", 2_500, 10).await;

        let detail = service
            .create_order("alice", &[request(&product, 4)])
            .await
            .unwrap();

        // subtotal 100.00, 20% tax 20.00, total 120.00
        assert_eq!(detail.order.subtotal_cents, 10_000);
        assert_eq!(detail.order.tax_amount_cents, 2_000);
        assert_eq!(detail.order.total_cents, 12_000);
        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert!(detail.order.expires_at > detail.order.created_at);
        assert_eq!(stock_of(&db, &product.id).await, (6, 4));

        let paid = service.pay_order(&detail.order.id, Some("alice")).await.unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(stock_of(&db, &product.id).await, (6, 0));

        assert_eq!(sink.kinds(), vec!["created", "paid"]);
    }

    #[tokio::test]
    async fn create_rejects_unknown_and_inactive_products() {
        let (service, db, sink) = setup().await;
        let active = seed(&db, "Widget", 100, 10).await;
        let retired = seed(&db, "Old Widget", 100, 10).await;
        db.products().soft_delete(&retired.id).await.unwrap();

        let err = service
            .create_order("alice", &[request(&active, 1), request(&retired, 1)])
            .await
            .unwrap_err();

        match err {
            OrderError::ProductUnavailable(ids) => assert_eq!(ids, vec![retired.id.clone()]),
            other => panic!("expected ProductUnavailable, got {other:?}"),
        }
        assert_eq!(stock_of(&db, &active.id).await, (10, 0));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_insufficient_stock_atomically() {
        let (service, db, sink) = setup().await;
        let plenty = seed(&db, "Plenty", 100, 50).await;
        let scarce = seed(&db, "Scarce", 100, 2).await;

        let err = service
            .create_order("alice", &[request(&plenty, 5), request(&scarce, 3)])
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InsufficientStock { available: 2, requested: 3, .. }));
        assert_eq!(stock_of(&db, &plenty.id).await, (50, 0));
        assert_eq!(stock_of(&db, &scarce.id).await, (2, 0));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn create_validates_before_touching_state() {
        let (service, _db, sink) = setup().await;

        assert!(matches!(
            service.create_order("alice", &[]).await.unwrap_err(),
            OrderError::Validation(_)
        ));
        assert!(matches!(
            service
                .create_order(
                    "",
                    &[OrderItemRequest {
                        product_id: "p".into(),
                        quantity: 1
                    }]
                )
                .await
                .unwrap_err(),
            OrderError::Validation(_)
        ));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn cancel_releases_stock_and_publishes() {
        let (service, db, sink) = setup().await;
        let product = seed(&db, "Widget", 2_500, 10).await;

        let detail = service
            .create_order("alice", &[request(&product, 4)])
            .await
            .unwrap();
        let cancelled = service
            .cancel_order(&detail.order.id, Some("alice"))
            .await
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&db, &product.id).await, (10, 0));
        assert_eq!(sink.kinds(), vec!["created", "cancelled"]);
    }

    #[tokio::test]
    async fn terminal_states_reject_further_transitions() {
        let (service, db, _sink) = setup().await;
        let product = seed(&db, "Widget", 100, 10).await;

        let detail = service
            .create_order("alice", &[request(&product, 1)])
            .await
            .unwrap();
        service.pay_order(&detail.order.id, Some("alice")).await.unwrap();

        let err = service
            .cancel_order(&detail.order.id, Some("alice"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                status: OrderStatus::Paid,
                ..
            }
        ));

        let err = service
            .pay_order(&detail.order.id, Some("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        // Paying twice consumed stock exactly once.
        assert_eq!(stock_of(&db, &product.id).await, (9, 0));
    }

    #[tokio::test]
    async fn pay_after_window_expires_the_order() {
        let (service, db, sink) = setup().await;
        let product = seed(&db, "Widget", 100, 10).await;

        let detail = service
            .create_order("alice", &[request(&product, 3)])
            .await
            .unwrap();
        backdate_expiry(&db, &detail.order.id).await;

        let err = service
            .pay_order(&detail.order.id, Some("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderExpired(_)));

        let after = service.get_order(&detail.order.id, None).await.unwrap();
        assert_eq!(after.order.status, OrderStatus::Expired);
        assert_eq!(stock_of(&db, &product.id).await, (10, 0));
        assert_eq!(sink.kinds(), vec!["created", "expired"]);
    }

    #[tokio::test]
    async fn expire_due_orders_sweeps_only_overdue_pending() {
        let (service, db, sink) = setup().await;
        let product = seed(&db, "Widget", 100, 10).await;

        let fresh = service
            .create_order("alice", &[request(&product, 1)])
            .await
            .unwrap();
        let stale = service
            .create_order("bob", &[request(&product, 2)])
            .await
            .unwrap();
        backdate_expiry(&db, &stale.order.id).await;

        assert_eq!(service.expire_due_orders().await.unwrap(), 1);
        // Idempotent: nothing left to sweep.
        assert_eq!(service.expire_due_orders().await.unwrap(), 0);

        let fresh_after = service.get_order(&fresh.order.id, None).await.unwrap();
        assert_eq!(fresh_after.order.status, OrderStatus::Pending);
        let stale_after = service.get_order(&stale.order.id, None).await.unwrap();
        assert_eq!(stale_after.order.status, OrderStatus::Expired);

        // Only the stale order's 2 units came back; the fresh hold remains.
        assert_eq!(stock_of(&db, &product.id).await, (9, 1));
        assert_eq!(sink.kinds(), vec!["created", "created", "expired"]);
    }

    #[tokio::test]
    async fn ownership_masks_foreign_orders() {
        let (service, db, _sink) = setup().await;
        let product = seed(&db, "Widget", 100, 10).await;

        let detail = service
            .create_order("alice", &[request(&product, 1)])
            .await
            .unwrap();
        let id = &detail.order.id;

        // Bob sees nothing, can change nothing.
        assert!(matches!(
            service.get_order(id, Some("bob")).await.unwrap_err(),
            OrderError::OrderNotFound(_)
        ));
        assert!(matches!(
            service.pay_order(id, Some("bob")).await.unwrap_err(),
            OrderError::OrderNotFound(_)
        ));
        assert!(matches!(
            service.cancel_order(id, Some("bob")).await.unwrap_err(),
            OrderError::OrderNotFound(_)
        ));

        // Unmasked access still works.
        assert!(service.get_order(id, None).await.is_ok());
        assert!(service.get_order(id, Some("alice")).await.is_ok());
    }

    #[tokio::test]
    async fn summary_prices_without_reserving() {
        let (service, db, sink) = setup().await;
        let product = seed(&db, "Widget", 2_500, 10).await;

        let summary = service
            .calculate_summary(&[request(&product, 4)])
            .await
            .unwrap();
        assert_eq!(summary.subtotal_cents, 10_000);
        assert_eq!(summary.tax_amount_cents, 2_000);
        assert_eq!(summary.total_cents, 12_000);

        // No reservation, no event.
        assert_eq!(stock_of(&db, &product.id).await, (10, 0));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn summary_checks_stock_across_duplicate_lines() {
        let (service, db, _sink) = setup().await;
        let product = seed(&db, "Widget", 100, 5).await;

        // 3 + 3 of the same product exceeds the 5 available.
        let err = service
            .calculate_summary(&[request(&product, 3), request(&product, 3)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn concurrent_creates_for_last_unit() {
        let (service, db, _sink) = setup().await;
        let product = seed(&db, "Last One", 100, 1).await;

        let items_a = [request(&product, 1)];
        let items_b = [request(&product, 1)];
        let a = service.create_order("alice", &items_a);
        let b = service.create_order("bob", &items_b);
        let (ra, rb) = tokio::join!(a, b);

        // Exactly one of the two racing creations wins the unit.
        let oks = [ra.is_ok(), rb.is_ok()].iter().filter(|&&ok| ok).count();
        assert_eq!(oks, 1);
        for result in [ra, rb] {
            if let Err(err) = result {
                assert!(matches!(err, OrderError::InsufficientStock { .. }));
            }
        }
        assert_eq!(stock_of(&db, &product.id).await, (0, 1));
    }

    #[tokio::test]
    async fn admin_override_pays_past_the_window() {
        let (service, db, sink) = setup().await;
        let product = seed(&db, "Widget", 100, 10).await;

        let detail = service
            .create_order("alice", &[request(&product, 2)])
            .await
            .unwrap();
        backdate_expiry(&db, &detail.order.id).await;

        // update_status skips the expiry check, honoring a late payment.
        let paid = service
            .update_status(&detail.order.id, OrderStatus::Paid)
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(stock_of(&db, &product.id).await, (8, 0));
        assert_eq!(sink.kinds(), vec!["created", "paid"]);
    }

    #[tokio::test]
    async fn admin_override_never_cancels_a_paid_order() {
        let (service, db, sink) = setup().await;
        let product = seed(&db, "Widget", 100, 10).await;

        let detail = service
            .create_order("alice", &[request(&product, 2)])
            .await
            .unwrap();
        service.pay_order(&detail.order.id, None).await.unwrap();

        let err = service
            .update_status(&detail.order.id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                status: OrderStatus::Paid,
                ..
            }
        ));
        assert_eq!(stock_of(&db, &product.id).await, (8, 0));
        assert_eq!(sink.kinds(), vec!["created", "paid"]);
    }

    #[tokio::test]
    async fn admin_override_pass_through_writes() {
        let (service, db, sink) = setup().await;
        let product = seed(&db, "Widget", 100, 10).await;

        let detail = service
            .create_order("alice", &[request(&product, 2)])
            .await
            .unwrap();
        service.cancel_order(&detail.order.id, None).await.unwrap();

        // Writing the current status back is a no-op.
        let same = service
            .update_status(&detail.order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(same.status, OrderStatus::Cancelled);

        // Other overrides on a closed order are plain writes: no stock
        // movement, no event.
        let reopened = service
            .update_status(&detail.order.id, OrderStatus::Expired)
            .await
            .unwrap();
        assert_eq!(reopened.status, OrderStatus::Expired);
        assert_eq!(stock_of(&db, &product.id).await, (10, 0));
        assert_eq!(sink.kinds(), vec!["created", "cancelled"]);
    }

    #[tokio::test]
    async fn read_models_scope_and_sort() {
        let (service, db, _sink) = setup().await;
        let product = seed(&db, "Widget", 100, 50).await;

        service
            .create_order("alice", &[request(&product, 1)])
            .await
            .unwrap();
        service
            .create_order("bob", &[request(&product, 1)])
            .await
            .unwrap();
        service
            .create_order("alice", &[request(&product, 2)])
            .await
            .unwrap();

        let mine = service.get_user_orders("alice").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|d| d.order.user_id == "alice"));
        assert!(mine.iter().all(|d| !d.items.is_empty()));

        let all = service.get_all_orders().await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].order.created_at >= all[2].order.created_at);
    }
}
