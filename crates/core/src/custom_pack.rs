//! Custom pack builder rules.
//!
//! The shopper picks between `min_items` and `max_items` products from the
//! packable catalog. A fixed-price pack costs its fixed price whatever is
//! picked; a dynamic pack costs the picked products' subtotal minus a
//! discount rate given as a fraction (`0.2` is 20% off).

use rust_decimal::Decimal;

use crate::types::{Price, ProductId};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CustomPackError {
    #[error("You can select a maximum of {0} items.")]
    TooMany(u32),
    #[error("You must select at least {0} items.")]
    TooFew(u32),
}

/// How a custom pack is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pricing {
    Fixed(Price),
    /// Fraction taken off the subtotal, clamped to `0..=1`.
    Dynamic(Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomPackRules {
    pub min_items: u32,
    pub max_items: u32,
    pub pricing: Pricing,
}

impl CustomPackRules {
    /// Add the product if absent, remove it if present.
    ///
    /// Returns whether the product is selected afterwards.
    ///
    /// # Errors
    ///
    /// [`CustomPackError::TooMany`] when adding would exceed `max_items`.
    pub fn toggle(
        &self,
        selection: &mut Vec<ProductId>,
        product_id: ProductId,
    ) -> Result<bool, CustomPackError> {
        if let Some(position) = selection.iter().position(|id| *id == product_id) {
            selection.remove(position);
            return Ok(false);
        }
        if selection.len() >= self.max_items as usize {
            return Err(CustomPackError::TooMany(self.max_items));
        }
        selection.push(product_id);
        Ok(true)
    }

    /// Check a selection is ready to go in the cart.
    ///
    /// # Errors
    ///
    /// Fails when the selection is outside `min_items..=max_items`.
    pub fn validate(&self, selection: &[ProductId]) -> Result<(), CustomPackError> {
        if selection.len() < self.min_items as usize {
            return Err(CustomPackError::TooFew(self.min_items));
        }
        if selection.len() > self.max_items as usize {
            return Err(CustomPackError::TooMany(self.max_items));
        }
        Ok(())
    }

    /// Price of the pack given the unit prices of the selected products.
    #[must_use]
    pub fn price(&self, selected_prices: &[Price]) -> Price {
        match self.pricing {
            Pricing::Fixed(price) => price,
            Pricing::Dynamic(rate) => {
                let rate = rate.clamp(Decimal::ZERO, Decimal::ONE);
                let subtotal: Price = selected_prices.iter().copied().sum();
                Price::new(subtotal.amount() - subtotal.amount() * rate).rounded()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn rules(pricing: Pricing) -> CustomPackRules {
        CustomPackRules {
            min_items: 2,
            max_items: 3,
            pricing,
        }
    }

    #[test]
    fn test_toggle_adds_and_removes() {
        let rules = rules(Pricing::Fixed(Price::from_cents(9900)));
        let mut selection = Vec::new();
        assert!(rules.toggle(&mut selection, ProductId::new(1)).unwrap());
        assert!(rules.toggle(&mut selection, ProductId::new(2)).unwrap());
        assert!(!rules.toggle(&mut selection, ProductId::new(1)).unwrap());
        assert_eq!(selection, vec![ProductId::new(2)]);
    }

    #[test]
    fn test_toggle_respects_maximum() {
        let rules = rules(Pricing::Fixed(Price::ZERO));
        let mut selection = vec![ProductId::new(1), ProductId::new(2), ProductId::new(3)];
        let err = rules.toggle(&mut selection, ProductId::new(4)).unwrap_err();
        assert_eq!(err.to_string(), "You can select a maximum of 3 items.");
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn test_validate_minimum() {
        let rules = rules(Pricing::Fixed(Price::ZERO));
        assert_eq!(
            rules.validate(&[ProductId::new(1)]),
            Err(CustomPackError::TooFew(2))
        );
        assert!(rules.validate(&[ProductId::new(1), ProductId::new(2)]).is_ok());
    }

    #[test]
    fn test_fixed_price_ignores_selection() {
        let rules = rules(Pricing::Fixed(Price::from_cents(9900)));
        assert_eq!(rules.price(&[Price::from_cents(100)]), Price::from_cents(9900));
    }

    #[test]
    fn test_dynamic_price_applies_rate() {
        let rate = Decimal::from_str("0.2").unwrap();
        let rules = rules(Pricing::Dynamic(rate));
        let price = rules.price(&[Price::from_cents(3000), Price::from_cents(2000)]);
        assert_eq!(price, Price::from_cents(4000));
    }

    #[test]
    fn test_dynamic_rate_is_clamped() {
        let rules = rules(Pricing::Dynamic(Decimal::from(3)));
        assert_eq!(rules.price(&[Price::from_cents(3000)]), Price::ZERO);
    }
}
