//! # Repository Module
//!
//! Database repositories for Ordo.
//!
//! ## Layout
//!
//! - [`product`] - catalog surface the order engine consumes: active
//!   product lookup, inserts, catalog-level stock adjustment, soft delete
//! - [`reservation`] - the stock reservation operations (`reserve`,
//!   `release`, `consume`); these run on a caller-supplied transaction so
//!   a state transition and its stock deltas always commit together
//! - [`order`] - order reads plus one transaction per state-machine
//!   transition (create / pay / close / plain status write)
//!
//! Repositories own a pool clone and isolate all SQL; callers never build
//! queries themselves.

pub mod order;
pub mod product;
pub mod reservation;
