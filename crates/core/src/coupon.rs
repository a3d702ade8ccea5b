//! Coupon eligibility and discount computation.
//!
//! Mirrors the checks the backend runs when an order carries a coupon code, in
//! the same order, so the checkout page can preview the discount (or the
//! reason there is none) before the order is placed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::pricing::{Discount, LineItem, subtotal};
use crate::types::{CategoryId, DiscountType, Price, ProductId};

/// Why a coupon cannot be applied to a cart.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    #[error("Your cart is empty.")]
    EmptyCart,
    #[error("Coupon has expired.")]
    Expired,
    #[error("Coupon has reached its usage limit.")]
    UsageLimitReached,
    #[error("Order total does not meet the minimum purchase amount for this coupon ({minimum}).")]
    BelowMinimum { minimum: Price },
    #[error("This coupon is for first-time customers only.")]
    FirstOrderOnly,
    #[error("This coupon is not valid for the items in your cart.")]
    NotApplicable,
}

/// The restrictions and value of a single coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponRules {
    pub code: String,
    pub discount_type: DiscountType,
    /// Percentage points for `Percentage`, an amount for `FixedAmount`.
    pub discount_value: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
    pub min_purchase: Option<Price>,
    /// Zero means unlimited.
    pub usage_limit: u32,
    pub times_used: u32,
    pub first_time_only: bool,
    pub applicable_products: Vec<ProductId>,
    pub applicable_categories: Vec<CategoryId>,
}

impl CouponRules {
    /// A coupon with no restrictions.
    #[must_use]
    pub fn new(code: impl Into<String>, discount_type: DiscountType, discount_value: Decimal) -> Self {
        Self {
            code: code.into(),
            discount_type,
            discount_value,
            expires_at: None,
            min_purchase: None,
            usage_limit: 0,
            times_used: 0,
            first_time_only: false,
            applicable_products: Vec::new(),
            applicable_categories: Vec::new(),
        }
    }

    fn is_restricted(&self) -> bool {
        !self.applicable_products.is_empty() || !self.applicable_categories.is_empty()
    }

    fn applies_to(&self, line: &LineItem) -> bool {
        if !self.is_restricted() {
            return true;
        }
        self.applicable_products.contains(&line.product_id)
            || line
                .category_id
                .is_some_and(|category| self.applicable_categories.contains(&category))
    }

    /// Subtotal of the lines this coupon covers (the whole cart when unrestricted).
    #[must_use]
    pub fn applicable_subtotal(&self, lines: &[LineItem]) -> Price {
        lines
            .iter()
            .filter(|line| self.applies_to(line))
            .map(LineItem::line_total)
            .sum()
    }

    /// Check the coupon against a cart and compute its discount.
    ///
    /// `first_order` is whether the customer has never ordered before.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponRejection`] that applies.
    pub fn evaluate(
        &self,
        lines: &[LineItem],
        now: DateTime<Utc>,
        first_order: bool,
    ) -> Result<Discount, CouponRejection> {
        if lines.is_empty() {
            return Err(CouponRejection::EmptyCart);
        }
        if self.expires_at.is_some_and(|expiry| expiry < now) {
            return Err(CouponRejection::Expired);
        }
        if self.usage_limit > 0 && self.times_used >= self.usage_limit {
            return Err(CouponRejection::UsageLimitReached);
        }
        if let Some(minimum) = self.min_purchase
            && subtotal(lines) < minimum
        {
            return Err(CouponRejection::BelowMinimum { minimum });
        }
        if self.first_time_only && !first_order {
            return Err(CouponRejection::FirstOrderOnly);
        }
        if !lines.iter().any(|line| self.applies_to(line)) {
            return Err(CouponRejection::NotApplicable);
        }

        let discount = match self.discount_type {
            DiscountType::FixedAmount => Discount::amount(Price::new(self.discount_value)),
            DiscountType::Percentage => {
                let base = self.applicable_subtotal(lines).amount();
                Discount::amount(Price::new(base * self.discount_value / Decimal::ONE_HUNDRED))
            }
            DiscountType::FreeShipping => Discount::free_shipping(),
        };
        Ok(discount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn line(product: i64, category: i64, cents: i64, quantity: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(product),
            category_id: Some(CategoryId::new(category)),
            unit_price: Price::from_cents(cents),
            quantity,
        }
    }

    fn cart() -> Vec<LineItem> {
        vec![line(1, 10, 4000, 1), line(2, 20, 1000, 2)]
    }

    #[test]
    fn test_percentage_on_whole_cart() {
        let rules = CouponRules::new("SAVE10", DiscountType::Percentage, Decimal::TEN);
        let discount = rules.evaluate(&cart(), Utc::now(), true).unwrap();
        assert_eq!(discount.amount, Price::from_cents(600));
        assert!(!discount.free_shipping);
    }

    #[test]
    fn test_percentage_only_on_applicable_lines() {
        let mut rules = CouponRules::new("SHOES", DiscountType::Percentage, Decimal::from(50));
        rules.applicable_categories = vec![CategoryId::new(20)];
        let discount = rules.evaluate(&cart(), Utc::now(), true).unwrap();
        assert_eq!(discount.amount, Price::from_cents(1000));
    }

    #[test]
    fn test_fixed_amount() {
        let rules = CouponRules::new("FIVE", DiscountType::FixedAmount, Decimal::from(5));
        let discount = rules.evaluate(&cart(), Utc::now(), false).unwrap();
        assert_eq!(discount.amount, Price::from_cents(500));
    }

    #[test]
    fn test_free_shipping() {
        let rules = CouponRules::new("SHIP", DiscountType::FreeShipping, Decimal::ZERO);
        let discount = rules.evaluate(&cart(), Utc::now(), false).unwrap();
        assert_eq!(discount, Discount::free_shipping());
    }

    #[test]
    fn test_rejections_in_order() {
        let now = Utc::now();
        let mut rules = CouponRules::new("X", DiscountType::FixedAmount, Decimal::ONE);

        assert_eq!(rules.evaluate(&[], now, true), Err(CouponRejection::EmptyCart));

        rules.expires_at = Some(now - Duration::days(1));
        assert_eq!(rules.evaluate(&cart(), now, true), Err(CouponRejection::Expired));
        rules.expires_at = Some(now + Duration::days(1));

        rules.usage_limit = 3;
        rules.times_used = 3;
        assert_eq!(rules.evaluate(&cart(), now, true), Err(CouponRejection::UsageLimitReached));
        rules.times_used = 2;

        rules.min_purchase = Some(Price::from_cents(10_000));
        assert!(matches!(
            rules.evaluate(&cart(), now, true),
            Err(CouponRejection::BelowMinimum { .. })
        ));
        rules.min_purchase = Some(Price::from_cents(6000));

        rules.first_time_only = true;
        assert_eq!(rules.evaluate(&cart(), now, false), Err(CouponRejection::FirstOrderOnly));

        rules.applicable_products = vec![ProductId::new(99)];
        assert_eq!(rules.evaluate(&cart(), now, true), Err(CouponRejection::NotApplicable));

        rules.applicable_products = vec![ProductId::new(1)];
        assert!(rules.evaluate(&cart(), now, true).is_ok());
    }

    #[test]
    fn test_unlimited_usage_when_limit_is_zero() {
        let mut rules = CouponRules::new("ANY", DiscountType::FixedAmount, Decimal::ONE);
        rules.times_used = 1_000;
        assert!(rules.evaluate(&cart(), Utc::now(), true).is_ok());
    }

    #[test]
    fn test_rejection_message_shows_minimum() {
        let err = CouponRejection::BelowMinimum {
            minimum: Price::from_cents(5000),
        };
        assert!(err.to_string().contains("$50.00"));
    }
}
