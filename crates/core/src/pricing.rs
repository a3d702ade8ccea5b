//! Order totals.
//!
//! `total = subtotal - discount + shipping`, where the discount never exceeds
//! the subtotal and a free-shipping coupon zeroes the shipping line. The
//! backend recomputes the same figures when the order is placed; these are the
//! numbers shown on the cart and checkout pages.

use serde::Serialize;

use crate::types::{CategoryId, Price, ProductId};

/// Flat shipping charged on every order unless a coupon waives it (10.00).
pub const DEFAULT_SHIPPING_CENTS: i64 = 1000;

/// The default flat shipping fee.
#[must_use]
pub fn default_shipping() -> Price {
    Price::from_cents(DEFAULT_SHIPPING_CENTS)
}

/// One cart line as far as pricing is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: ProductId,
    pub category_id: Option<CategoryId>,
    pub unit_price: Price,
    pub quantity: u32,
}

impl LineItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Sum of every line's unit price times quantity.
#[must_use]
pub fn subtotal(lines: &[LineItem]) -> Price {
    lines.iter().map(LineItem::line_total).sum()
}

/// What a coupon takes off an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Discount {
    pub amount: Price,
    pub free_shipping: bool,
}

impl Discount {
    /// No discount at all.
    pub const NONE: Self = Self {
        amount: Price::ZERO,
        free_shipping: false,
    };

    #[must_use]
    pub const fn amount(amount: Price) -> Self {
        Self {
            amount,
            free_shipping: false,
        }
    }

    #[must_use]
    pub const fn free_shipping() -> Self {
        Self {
            amount: Price::ZERO,
            free_shipping: true,
        }
    }
}

/// The four figures of an order summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Price,
    pub discount: Price,
    pub shipping: Price,
    pub total: Price,
}

impl OrderTotals {
    /// Combine a subtotal, a shipping fee and an optional discount.
    #[must_use]
    pub fn compute(subtotal: Price, shipping: Price, discount: Discount) -> Self {
        let discount_amount = discount.amount.min(subtotal);
        let shipping = if discount.free_shipping {
            Price::ZERO
        } else {
            shipping
        };
        let total = subtotal.saturating_sub(discount_amount) + shipping;

        Self {
            subtotal,
            discount: discount_amount.rounded(),
            shipping,
            total: total.rounded(),
        }
    }

    /// Totals for a list of cart lines.
    #[must_use]
    pub fn for_lines(lines: &[LineItem], shipping: Price, discount: Discount) -> Self {
        Self::compute(subtotal(lines), shipping, discount)
    }

    /// Totals for an empty cart: nothing to ship, nothing to pay.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            subtotal: Price::ZERO,
            discount: Price::ZERO,
            shipping: Price::ZERO,
            total: Price::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product: i64, cents: i64, quantity: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(product),
            category_id: None,
            unit_price: Price::from_cents(cents),
            quantity,
        }
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let lines = [line(1, 1250, 2), line(2, 499, 1)];
        assert_eq!(subtotal(&lines), Price::from_cents(2999));
    }

    #[test]
    fn test_totals_without_discount() {
        let totals = OrderTotals::for_lines(&[line(1, 2000, 1)], default_shipping(), Discount::NONE);
        assert_eq!(totals.subtotal, Price::from_cents(2000));
        assert_eq!(totals.shipping, Price::from_cents(1000));
        assert_eq!(totals.total, Price::from_cents(3000));
    }

    #[test]
    fn test_discount_is_clamped_to_subtotal() {
        let totals = OrderTotals::compute(
            Price::from_cents(500),
            default_shipping(),
            Discount::amount(Price::from_cents(2000)),
        );
        assert_eq!(totals.discount, Price::from_cents(500));
        assert_eq!(totals.total, Price::from_cents(1000));
    }

    #[test]
    fn test_free_shipping_zeroes_shipping() {
        let totals =
            OrderTotals::compute(Price::from_cents(4200), default_shipping(), Discount::free_shipping());
        assert_eq!(totals.shipping, Price::ZERO);
        assert_eq!(totals.total, Price::from_cents(4200));
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        assert_eq!(OrderTotals::empty().total, Price::ZERO);
    }
}
