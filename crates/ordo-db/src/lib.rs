//! # ordo-db: Database Layer for Ordo
//!
//! SQLite persistence for the order engine, built on sqlx.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories (product, order) and the stock
//!   reservation operations
//!
//! ## Transaction Discipline
//!
//! Every order state transition is exactly one transaction: the status
//! guard, the stock deltas, and the order/item writes commit or roll back
//! together. Nothing in this crate holds an in-process lock across an
//! await; correctness under concurrency comes from the database.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ordo_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/ordo.db")).await?;
//! let order = db.orders().find_by_id("some-uuid").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::order::{NewOrder, NewOrderItem, OrderRepository};
pub use repository::product::ProductRepository;
pub use repository::reservation::StockLine;
