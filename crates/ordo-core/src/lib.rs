//! # ordo-core: Pure Business Logic for Ordo
//!
//! This crate is the heart of the order engine. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ordo-engine (state machine)                  │
//! │    create / pay / cancel / expire, dispatch, events, sweeper    │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────▼───────────────────────────────────┐
//! │                 ★ ordo-core (THIS CRATE) ★                      │
//! │                                                                 │
//! │   types      money       pricing      order_number   validation │
//! │   Product    Money       line/order   ORD-YYYYMMDD   pre-store  │
//! │   Order      TaxRate     totals, tax  -NNNN format   checks     │
//! │                                                                 │
//! │   NO I/O • NO DATABASE • NO CLOCK READS • PURE FUNCTIONS        │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────▼───────────────────────────────────┐
//! │                    ordo-db (SQLite layer)                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output; callers pass in `now`
//!    and snapshots instead of this crate reading clocks or stores
//! 2. **Integer money**: all monetary values are cents (i64), all tax
//!    rates basis points - binary floating point never touches money
//! 3. **Explicit errors**: typed errors via `thiserror`, never strings
//!    or panics

pub mod error;
pub mod money;
pub mod order_number;
pub mod pricing;
pub mod types;
pub mod validation;

pub use error::ValidationError;
pub use money::{Money, TaxRate};
pub use types::*;

/// Tax rate applied to every order, in basis points (2000 = 20%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 2000;

/// How long a created order holds its stock reservation, in minutes.
pub const RESERVATION_TTL_MINUTES: i64 = 30;

/// Maximum number of distinct line items in a single order.
///
/// Prevents runaway requests; generous compared to any real cart.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single item per order line.
///
/// Prevents accidental over-ordering (e.g. typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;
