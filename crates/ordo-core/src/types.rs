//! # Domain Types
//!
//! Core domain types for the order engine.
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: `order_number` - human-readable,
//!   date-scoped, shown to users
//!
//! ## Snapshot Pattern
//! `OrderItem` freezes the product name and unit price at order time, so a
//! later catalog edit never retroactively changes a placed order's figures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{Money, TaxRate};

// =============================================================================
// Product
// =============================================================================

/// A catalog product, as seen by the order engine.
///
/// The catalog owns these rows; the engine only ever mutates
/// `stock_available` / `stock_reserved`, and only as relative deltas inside
/// a transaction. The invariant `stock_available >= 0 && stock_reserved >= 0`
/// holds at all times - stock moves between the two fields, it is never
/// invented or destroyed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, snapshotted onto order items at creation.
    pub name: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Units free to reserve.
    pub stock_available: i64,

    /// Units held by pending orders.
    pub stock_reserved: i64,

    /// Soft-delete flag. The catalog deactivates products instead of
    /// deleting them while orders still reference them.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle state of an order.
///
/// `Pending` is the only non-terminal state; `Paid`, `Cancelled` and
/// `Expired` are terminal - no transition ever leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, stock reserved, awaiting payment.
    Pending,
    /// Paid; the reservation was consumed permanently.
    Paid,
    /// Cancelled by the user or an admin; reservation released.
    Cancelled,
    /// Reservation window elapsed; swept, reservation released.
    Expired,
}

impl OrderStatus {
    /// Returns true for states no transition can leave.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Database/text representation (matches the sqlx `lowercase` mapping).
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "expired" => Ok(OrderStatus::Expired),
            other => Err(format!("unknown order status: '{other}'")),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order and its priced totals.
///
/// Invariants:
/// - exactly one of `paid_at` / `cancelled_at` is set once the order leaves
///   `Pending` (expiry stamps `cancelled_at`)
/// - a `Pending` order always has `expires_at` in the future until swept
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    /// Human-readable, date-scoped business number: `ORD-YYYYMMDD-NNNN`.
    pub order_number: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub tax_rate_bps: i64,
    pub tax_amount_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    /// End of the reservation window, `created_at + 30 minutes`.
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn tax_amount(&self) -> Money {
        Money::from_cents(self.tax_amount_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps as u32)
    }

    /// Whether the reservation window has elapsed at `now`.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item: immutable snapshot of a product at order time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at order time (frozen).
    pub product_name: String,
    /// Unit price in cents at order time (frozen).
    pub unit_price_cents: i64,
    /// Quantity ordered (positive).
    pub quantity: i64,
    /// `unit_price * quantity`, exact.
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Requests & Read Models
// =============================================================================

/// One requested line in a create-order or preview call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// An order together with its line items - the shape every read-side
/// operation returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_terminality() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Cancelled,
            OrderStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn order_expiry_check() {
        let now = Utc::now();
        let order = Order {
            id: "o1".into(),
            order_number: "ORD-20260828-0001".into(),
            user_id: "u1".into(),
            status: OrderStatus::Pending,
            subtotal_cents: 10_000,
            tax_rate_bps: 2000,
            tax_amount_cents: 2_000,
            total_cents: 12_000,
            created_at: now,
            expires_at: now + Duration::minutes(30),
            paid_at: None,
            cancelled_at: None,
        };

        assert!(!order.is_expired_at(now));
        assert!(order.is_expired_at(now + Duration::minutes(30)));
        assert!(order.is_expired_at(now + Duration::minutes(31)));
    }
}
