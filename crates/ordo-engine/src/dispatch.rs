//! # Command / Query Dispatch
//!
//! The single entry point a host wires its transport to. Callers are
//! identified by `{user_id, role}`; this layer decides what the role
//! unlocks and which ownership mask the service sees, then forwards to
//! [`OrderService`].
//!
//! ## Role rules
//! ```text
//!                          CUSTOMER            ADMIN
//!   Create / Pay / Cancel  own orders only     any order
//!   UpdateStatus           Forbidden           any order
//!   Get                    own orders only     any order
//!   ListMine / Preview     yes                 yes
//!   ListAll                Forbidden           yes
//! ```
//!
//! Denials are decided here, before the service runs, so a `Forbidden`
//! request has touched no state.

use serde::{Deserialize, Serialize};
use tracing::debug;

use ordo_core::pricing::OrderSummary;
use ordo_core::{Order, OrderDetail, OrderItemRequest, OrderStatus};

use crate::error::{OrderError, OrderResult};
use crate::service::OrderService;

// =============================================================================
// Caller Identity
// =============================================================================

/// What a caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May act on their own orders only.
    Customer,
    /// May act on any order, list all orders and override statuses.
    Admin,
}

/// The authenticated identity a host hands in with each request.
///
/// Authentication itself happens upstream; the engine trusts this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn customer(user_id: impl Into<String>) -> Self {
        Caller {
            user_id: user_id.into(),
            role: Role::Customer,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Caller {
            user_id: user_id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The ownership mask the service should apply for this caller: admins
    /// see every order, customers only their own.
    fn mask(&self) -> Option<&str> {
        match self.role {
            Role::Admin => None,
            Role::Customer => Some(&self.user_id),
        }
    }
}

// =============================================================================
// Commands & Queries
// =============================================================================

/// State-changing requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OrderCommand {
    Create { items: Vec<OrderItemRequest> },
    Pay { order_id: String },
    Cancel { order_id: String },
    /// Admin only.
    UpdateStatus {
        order_id: String,
        status: OrderStatus,
    },
}

/// Read-only requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum OrderQuery {
    Get { order_id: String },
    ListMine,
    /// Admin only.
    ListAll,
    Preview { items: Vec<OrderItemRequest> },
}

/// What a command produced.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    /// Creation returns the full order with items.
    Detail(OrderDetail),
    /// Transitions return the updated order.
    Order(Order),
}

/// What a query produced.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Detail(OrderDetail),
    Orders(Vec<OrderDetail>),
    Summary(OrderSummary),
}

// =============================================================================
// Dispatch
// =============================================================================

impl OrderService {
    /// Executes a command on behalf of `caller`.
    pub async fn dispatch_command(
        &self,
        caller: &Caller,
        command: OrderCommand,
    ) -> OrderResult<CommandResult> {
        debug!(user_id = %caller.user_id, role = ?caller.role, ?command, "Dispatching command");

        match command {
            OrderCommand::Create { items } => self
                .create_order(&caller.user_id, &items)
                .await
                .map(CommandResult::Detail),

            OrderCommand::Pay { order_id } => self
                .pay_order(&order_id, caller.mask())
                .await
                .map(CommandResult::Order),

            OrderCommand::Cancel { order_id } => self
                .cancel_order(&order_id, caller.mask())
                .await
                .map(CommandResult::Order),

            OrderCommand::UpdateStatus { order_id, status } => {
                if !caller.is_admin() {
                    return Err(OrderError::Forbidden);
                }
                self.update_status(&order_id, status)
                    .await
                    .map(CommandResult::Order)
            }
        }
    }

    /// Executes a query on behalf of `caller`.
    pub async fn dispatch_query(
        &self,
        caller: &Caller,
        query: OrderQuery,
    ) -> OrderResult<QueryResult> {
        debug!(user_id = %caller.user_id, role = ?caller.role, ?query, "Dispatching query");

        match query {
            OrderQuery::Get { order_id } => self
                .get_order(&order_id, caller.mask())
                .await
                .map(QueryResult::Detail),

            OrderQuery::ListMine => self
                .get_user_orders(&caller.user_id)
                .await
                .map(QueryResult::Orders),

            OrderQuery::ListAll => {
                if !caller.is_admin() {
                    return Err(OrderError::Forbidden);
                }
                self.get_all_orders().await.map(QueryResult::Orders)
            }

            OrderQuery::Preview { items } => self
                .calculate_summary(&items)
                .await
                .map(QueryResult::Summary),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
