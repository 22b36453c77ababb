//! # Money Module
//!
//! Monetary values as integer cents.
//!
//! ## Why Integer Money?
//! ```text
//! In floating point:  0.1 + 0.2 = 0.30000000000000004   WRONG
//! In integer cents:   10 + 20   = 30                    exact
//! ```
//! Every price, subtotal, tax amount and total in the system flows through
//! this type. Intermediate sums stay exact; rounding happens once, at the
//! tax computation, with round-half-up semantics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1 bps = 0.01%, so 2000 = 20%).
///
/// Basis points keep the rate an integer while still expressing rates like
/// 8.25% (825 bps) exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Money
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Single-field tuple struct over `i64`: zero-cost, totally ordered, exact.
/// Signed so refund-style arithmetic stays representable, though the order
/// engine itself only ever produces non-negative amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major-unit portion (e.g. dollars).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor-unit portion, always 0-99.
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a line quantity. Uses i128 internally so a pathological
    /// price x quantity cannot silently wrap.
    #[inline]
    pub fn times(&self, qty: i64) -> Self {
        Money((self.0 as i128 * qty as i128) as i64)
    }

    /// Computes tax on this amount, rounding half up to the nearest cent.
    ///
    /// Integer formula: `(cents * bps + 5000) / 10000`. The +5000 is half of
    /// the 10000 divisor, which rounds .5 and above up. This is the single
    /// rounding step in the pricing pipeline - everything upstream is exact.
    ///
    /// ```
    /// use ordo_core::money::{Money, TaxRate};
    ///
    /// let subtotal = Money::from_cents(10_000); // 100.00
    /// let tax = subtotal.tax(TaxRate::from_bps(2000)); // 20%
    /// assert_eq!(tax.cents(), 2_000); // 20.00
    /// ```
    pub fn tax(&self, rate: TaxRate) -> Money {
        // i128 to prevent overflow on large amounts
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money(tax_cents as i64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cents_roundtrip() {
        let m = Money::from_cents(1099);
        assert_eq!(m.cents(), 1099);
        assert_eq!(m.major(), 10);
        assert_eq!(m.minor(), 99);
    }

    #[test]
    fn display_format() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!(a.times(3).cents(), 3000);
    }

    #[test]
    fn tax_twenty_percent_exact() {
        // 100.00 at 20% = 20.00, no rounding involved
        let tax = Money::from_cents(10_000).tax(TaxRate::from_bps(2000));
        assert_eq!(tax.cents(), 2_000);
    }

    #[test]
    fn tax_rounds_half_up() {
        // 0.13 at 20% = 2.6 cents -> 3
        assert_eq!(Money::from_cents(13).tax(TaxRate::from_bps(2000)).cents(), 3);
        // 0.27 at 20% = 5.4 cents -> 5
        assert_eq!(Money::from_cents(27).tax(TaxRate::from_bps(2000)).cents(), 5);
        // 10.00 at 8.25% = 82.5 cents -> 83 (the half case)
        assert_eq!(Money::from_cents(1000).tax(TaxRate::from_bps(825)).cents(), 83);
    }

    #[test]
    fn tax_rate_display() {
        assert_eq!(format!("{}", TaxRate::from_bps(2000)), "20.00%");
        assert_eq!(format!("{}", TaxRate::from_bps(825)), "8.25%");
    }

    #[test]
    fn zero_checks() {
        assert!(Money::zero().is_zero());
        assert!(!Money::from_cents(1).is_zero());
        assert!(Money::from_cents(-1).is_negative());
    }
}
