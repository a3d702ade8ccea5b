//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use vitrine_core::Price;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Renders a 0-5 rating as filled and empty stars.
///
/// Usage in templates: `{{ review.rating|stars }}`
#[askama::filter_fn]
pub fn stars(rating: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(star_string(&rating.to_string()))
}

/// Formats a bare decimal amount as money, like [`Price`] does.
///
/// Usage in templates: `{{ coupon.min_purchase_amount|money }}`
#[askama::filter_fn]
pub fn money(amount: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(money_string(&amount.to_string()))
}

/// Trims a displayed `DateTime<Utc>` down to the minute.
///
/// Usage in templates: `{{ created_at|short_date }}`
#[askama::filter_fn]
pub fn short_date(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(short_date_string(&value.to_string()))
}

fn short_date_string(value: &str) -> String {
    let naive = value.trim().trim_end_matches(" UTC");
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f")
        .map_or_else(|_| value.to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}

fn money_string(amount: &str) -> String {
    amount
        .trim()
        .parse::<Decimal>()
        .map_or_else(|_| amount.to_string(), |d| Price::new(d).to_string())
}

fn star_string(rating: &str) -> String {
    let filled = rating.trim().parse::<usize>().unwrap_or(0).min(5);
    let mut out = "\u{2605}".repeat(filled);
    out.push_str(&"\u{2606}".repeat(5 - filled));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_money_string() {
        assert_eq!(money_string("12.5"), "$12.50");
        assert_eq!(money_string("-3"), "$0.00");
        assert_eq!(money_string("n/a"), "n/a");
    }

    #[test]
    fn test_short_date_string() {
        use chrono::{TimeZone, Utc};
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 5, 42).unwrap();
        assert_eq!(short_date_string(&at.to_string()), "2026-10-19 08:05");
        assert_eq!(short_date_string("soon"), "soon");
    }

    #[test]
    fn test_star_string() {
        assert_eq!(star_string("3"), "\u{2605}\u{2605}\u{2605}\u{2606}\u{2606}");
        assert_eq!(star_string("9"), "\u{2605}".repeat(5));
        assert_eq!(star_string("n/a"), "\u{2606}".repeat(5));
    }
}
