//! # Order Number Formatting
//!
//! Order numbers are human-readable and date-scoped: `ORD-YYYYMMDD-NNNN`,
//! where `NNNN` is a zero-padded daily sequence starting at 1.
//!
//! This module only formats; the daily sequence itself is allocated by the
//! database inside the order-creation transaction (see
//! `ordo_db::repository::order`), which is what makes same-day numbers
//! unique under concurrent creation.

use chrono::NaiveDate;

/// Prefix of every order number.
pub const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Formats an order number from a calendar day and a daily sequence value.
///
/// ```
/// use chrono::NaiveDate;
/// use ordo_core::order_number::format_order_number;
///
/// let day = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
/// assert_eq!(format_order_number(day, 7), "ORD-20260828-0007");
/// ```
pub fn format_order_number(day: NaiveDate, seq: i64) -> String {
    format!("{}-{}-{:04}", ORDER_NUMBER_PREFIX, day.format("%Y%m%d"), seq)
}

/// Counter key for a calendar day (`YYYYMMDD`), shared with the
/// `order_counters` table.
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(format_order_number(day(), 1), "ORD-20260105-0001");
        assert_eq!(format_order_number(day(), 42), "ORD-20260105-0042");
        assert_eq!(format_order_number(day(), 9999), "ORD-20260105-9999");
    }

    #[test]
    fn sequence_past_padding_still_unique() {
        // The pad is cosmetic; five-digit sequences are still valid numbers.
        assert_eq!(format_order_number(day(), 10000), "ORD-20260105-10000");
    }

    #[test]
    fn day_key_matches_number_date_part() {
        assert_eq!(day_key(day()), "20260105");
        assert!(format_order_number(day(), 1).contains(&day_key(day())));
    }

    #[test]
    fn same_day_numbers_sort_in_sequence_order() {
        let a = format_order_number(day(), 12);
        let b = format_order_number(day(), 13);
        assert!(a < b);
    }
}
