//! # Pricing Calculator
//!
//! Pure price/tax computation for an order: per-line subtotals, the order
//! subtotal, a flat tax, and the grand total.
//!
//! ## Rounding Policy
//! Line subtotals and the order subtotal are exact integer-cent arithmetic;
//! the one and only rounding step is the tax amount, which rounds half up to
//! the nearest cent (see [`Money::tax`]). The total is then `subtotal + tax`,
//! again exact. Rounding once at the end avoids compounding error across
//! lines.
//!
//! Used by both the order-preview query (no stock mutation) and actual
//! order creation, so the preview a user sees is exactly what the order
//! will cost.

use serde::{Deserialize, Serialize};

use crate::money::{Money, TaxRate};
use crate::types::Product;

/// One priced line of a summary: the product snapshot plus its subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub subtotal_cents: i64,
}

/// Full priced summary of a candidate order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub items: Vec<SummaryLine>,
    pub subtotal_cents: i64,
    pub tax_rate_bps: u32,
    pub tax_amount_cents: i64,
    pub total_cents: i64,
}

impl OrderSummary {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Prices an order from resolved (product, quantity) pairs.
///
/// Deterministic and side-effect free. Callers resolve product snapshots and
/// validate quantities first; this function only does arithmetic. Line order
/// is preserved.
pub fn price_order(lines: &[(&Product, i64)], rate: TaxRate) -> OrderSummary {
    let mut items = Vec::with_capacity(lines.len());
    let mut subtotal = Money::zero();

    for (product, quantity) in lines {
        let line_subtotal = product.price().times(*quantity);
        subtotal += line_subtotal;

        items.push(SummaryLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity: *quantity,
            subtotal_cents: line_subtotal.cents(),
        });
    }

    let tax_amount = subtotal.tax(rate);
    let total = subtotal + tax_amount;

    OrderSummary {
        items,
        subtotal_cents: subtotal.cents(),
        tax_rate_bps: rate.bps(),
        tax_amount_cents: tax_amount.cents(),
        total_cents: total.cents(),
    }
}
