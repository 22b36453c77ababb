//! # ordo-engine: Order State Machine for Ordo
//!
//! The lifecycle layer: drives orders through their state machine, enforces
//! who may do what, publishes lifecycle events and sweeps expired
//! reservations in the background.
//!
//! ## State Machine
//! ```text
//!                       ┌──────────────────────────────────────────┐
//!                       │                 PENDING                  │
//!                       │   stock reserved, 30 minute window       │
//!                       └──────┬──────────────┬──────────────┬─────┘
//!                         Pay  │      Cancel  │      window  │ elapsed
//!                              ▼              ▼              ▼
//!                       ┌──────────┐   ┌───────────┐   ┌──────────┐
//!                       │   PAID   │   │ CANCELLED │   │ EXPIRED  │
//!                       │ consume  │   │  release  │   │ release  │
//!                       └──────────┘   └───────────┘   └──────────┘
//!
//!   Terminal states are never left. Every arrow is one database
//!   transaction: the status change and the stock movement commit together.
//! ```
//!
//! ## Module Organization
//!
//! - [`service`] - `OrderService`: the transitions and read-side queries
//! - [`dispatch`] - command/query dispatch with role enforcement
//! - [`events`] - lifecycle events and the `EventSink` seam
//! - [`sweeper`] - background task expiring overdue reservations
//! - [`config`] - engine configuration
//! - [`error`] - the `OrderError` taxonomy

pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod service;
pub mod sweeper;

pub use config::EngineConfig;
pub use dispatch::{Caller, CommandResult, OrderCommand, OrderQuery, QueryResult, Role};
pub use error::{OrderError, OrderResult};
pub use events::{EventSink, NoOpSink, OrderEvent, TracingSink};
pub use service::OrderService;
pub use sweeper::{ExpirationSweeper, SweeperHandle};
