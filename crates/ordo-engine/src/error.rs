//! # Engine Error Types
//!
//! The error taxonomy callers of the engine see. Database errors are
//! translated at this boundary: the variants the transactions produce on
//! business grounds (`InsufficientStock`, missing products) become their
//! domain counterparts, everything else passes through as [`OrderError::Db`].
//!
//! [`DbError::Conflict`] is deliberately not mapped here: a lost status race
//! needs the order re-read to decide between `InvalidTransition` and
//! `OrderExpired`, which only the service can do.

use thiserror::Error;

use ordo_core::{OrderStatus, ValidationError};
use ordo_db::DbError;

/// Errors produced by order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Request rejected before touching any state.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One or more requested products do not exist or are inactive.
    #[error("products not found or inactive: {}", .0.join(", "))]
    ProductUnavailable(Vec<String>),

    /// Not enough available stock to reserve.
    #[error("insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// No such order (or not visible to the caller).
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// The order is in a state the requested transition cannot leave.
    #[error("order {order_id} cannot transition out of status '{status}'")]
    InvalidTransition {
        order_id: String,
        status: OrderStatus,
    },

    /// Payment attempted after the reservation window elapsed; the order
    /// was expired and its stock released.
    #[error("order {0} has expired")]
    OrderExpired(String),

    /// The caller's role does not permit this operation.
    #[error("operation not permitted for this caller")]
    Forbidden,

    /// Underlying database failure.
    #[error("database error: {0}")]
    Db(DbError),
}

impl From<DbError> for OrderError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => OrderError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            },

            // A product that vanished between the catalog read and the
            // reservation guard; surfaces the same way as never existing.
            DbError::NotFound { ref entity, ref id } if entity == "Product" => {
                OrderError::ProductUnavailable(vec![id.clone()])
            }

            DbError::NotFound { ref entity, ref id } if entity == "Order" => {
                OrderError::OrderNotFound(id.clone())
            }

            other => OrderError::Db(other),
        }
    }
}

/// Result type for order operations.
pub type OrderResult<T> = Result<T, OrderError>;
