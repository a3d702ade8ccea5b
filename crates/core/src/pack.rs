//! Pack customisation.
//!
//! A pack is a bundle of slots. Each slot ships with a default product and may
//! offer variation products the shopper can swap in. The pack price is set for
//! the default line-up; swapping a product moves the price by the difference
//! between the chosen product and the slot's default, and never below zero.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::types::{PackItemId, Price, ProductId};

/// A product that can fill a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOption {
    pub product_id: ProductId,
    pub price: Price,
}

/// One slot of a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSlot {
    pub item_id: PackItemId,
    pub default: PackOption,
    pub variations: Vec<PackOption>,
}

impl PackSlot {
    /// The default product followed by every distinct variation.
    pub fn options(&self) -> impl Iterator<Item = &PackOption> {
        std::iter::once(&self.default).chain(
            self.variations
                .iter()
                .filter(|option| option.product_id != self.default.product_id),
        )
    }

    fn option(&self, product_id: ProductId) -> Option<&PackOption> {
        self.options().find(|option| option.product_id == product_id)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PackSelectionError {
    #[error("pack has no item {0}")]
    UnknownSlot(PackItemId),
    #[error("product {product} is not an option for pack item {item}")]
    NotAnOption { item: PackItemId, product: ProductId },
}

/// The product chosen for every slot, keyed by slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackSelection(BTreeMap<PackItemId, ProductId>);

impl PackSelection {
    /// The product chosen for a slot.
    #[must_use]
    pub fn chosen(&self, item_id: PackItemId) -> Option<ProductId> {
        self.0.get(&item_id).copied()
    }

    /// `(slot, product)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (PackItemId, ProductId)> + '_ {
        self.0.iter().map(|(item, product)| (*item, *product))
    }
}

/// A pack's slots and base price, with the operations of the customisation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackConfigurator {
    base_price: Price,
    slots: Vec<PackSlot>,
}

impl PackConfigurator {
    #[must_use]
    pub const fn new(base_price: Price, slots: Vec<PackSlot>) -> Self {
        Self { base_price, slots }
    }

    #[must_use]
    pub fn slots(&self) -> &[PackSlot] {
        &self.slots
    }

    fn slot(&self, item_id: PackItemId) -> Option<&PackSlot> {
        self.slots.iter().find(|slot| slot.item_id == item_id)
    }

    /// Every slot on its default product.
    #[must_use]
    pub fn default_selection(&self) -> PackSelection {
        PackSelection(
            self.slots
                .iter()
                .map(|slot| (slot.item_id, slot.default.product_id))
                .collect(),
        )
    }

    /// Swap the product of one slot.
    ///
    /// # Errors
    ///
    /// Fails if the slot does not belong to this pack or the product is neither
    /// the slot's default nor one of its variations.
    pub fn select(
        &self,
        selection: &mut PackSelection,
        item_id: PackItemId,
        product_id: ProductId,
    ) -> Result<(), PackSelectionError> {
        let slot = self
            .slot(item_id)
            .ok_or(PackSelectionError::UnknownSlot(item_id))?;
        if slot.option(product_id).is_none() {
            return Err(PackSelectionError::NotAnOption {
                item: item_id,
                product: product_id,
            });
        }
        selection.0.insert(item_id, product_id);
        Ok(())
    }

    /// Build a selection from submitted pairs; slots not mentioned keep their default.
    ///
    /// # Errors
    ///
    /// Fails on the first pair [`select`](Self::select) rejects.
    pub fn selection_from<I>(&self, pairs: I) -> Result<PackSelection, PackSelectionError>
    where
        I: IntoIterator<Item = (PackItemId, ProductId)>,
    {
        let mut selection = self.default_selection();
        for (item_id, product_id) in pairs {
            self.select(&mut selection, item_id, product_id)?;
        }
        Ok(selection)
    }

    /// Pack price for a selection.
    #[must_use]
    pub fn price(&self, selection: &PackSelection) -> Price {
        let adjustment: Decimal = self
            .slots
            .iter()
            .filter_map(|slot| {
                let chosen = slot.option(selection.chosen(slot.item_id)?)?;
                Some(chosen.price.amount() - slot.default.price.amount())
            })
            .sum();
        Price::new(self.base_price.amount() + adjustment)
    }

    /// Products to put in the cart, one per slot, in slot order.
    #[must_use]
    pub fn products(&self, selection: &PackSelection) -> Vec<ProductId> {
        self.slots
            .iter()
            .map(|slot| {
                selection
                    .chosen(slot.item_id)
                    .unwrap_or(slot.default.product_id)
            })
            .collect()
    }
}

/// Pixel dimensions of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Placement of one image in the composite strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub width: u32,
}

/// Images laid out side by side at a common height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeLayout {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<Tile>,
}

/// Lay images out left to right, each scaled to `height` (or to the first
/// image's height) while keeping its aspect ratio.
///
/// Returns `None` when there is nothing to lay out.
#[must_use]
pub fn composite_layout(sizes: &[ImageSize], height: Option<u32>) -> Option<CompositeLayout> {
    let height = height.or_else(|| sizes.first().map(|size| size.height))?;
    if height == 0 {
        return None;
    }

    let mut x = 0_u32;
    let tiles = sizes
        .iter()
        .map(|size| {
            let scaled =
                u64::from(size.width) * u64::from(height) / u64::from(size.height.max(1));
            let width = u32::try_from(scaled).unwrap_or(u32::MAX);
            let tile = Tile { x, width };
            x = x.saturating_add(width);
            tile
        })
        .collect();

    Some(CompositeLayout {
        width: x,
        height,
        tiles,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn option(product: i64, cents: i64) -> PackOption {
        PackOption {
            product_id: ProductId::new(product),
            price: Price::from_cents(cents),
        }
    }

    fn configurator() -> PackConfigurator {
        PackConfigurator::new(
            Price::from_cents(5000),
            vec![
                PackSlot {
                    item_id: PackItemId::new(1),
                    default: option(10, 2000),
                    variations: vec![option(11, 2500), option(12, 1500)],
                },
                PackSlot {
                    item_id: PackItemId::new(2),
                    default: option(20, 3000),
                    variations: vec![option(21, 100)],
                },
            ],
        )
    }

    #[test]
    fn test_defaults_keep_base_price() {
        let pack = configurator();
        let selection = pack.default_selection();
        assert_eq!(selection.chosen(PackItemId::new(1)), Some(ProductId::new(10)));
        assert_eq!(pack.price(&selection), Price::from_cents(5000));
        assert_eq!(pack.products(&selection), vec![ProductId::new(10), ProductId::new(20)]);
    }

    #[test]
    fn test_swap_adjusts_price() {
        let pack = configurator();
        let mut selection = pack.default_selection();
        pack.select(&mut selection, PackItemId::new(1), ProductId::new(11))
            .unwrap();
        assert_eq!(pack.price(&selection), Price::from_cents(5500));
        pack.select(&mut selection, PackItemId::new(1), ProductId::new(12))
            .unwrap();
        assert_eq!(pack.price(&selection), Price::from_cents(4500));
        assert_eq!(pack.products(&selection)[0], ProductId::new(12));
    }

    #[test]
    fn test_price_never_negative() {
        let pack = PackConfigurator::new(
            Price::from_cents(100),
            vec![PackSlot {
                item_id: PackItemId::new(1),
                default: option(1, 5000),
                variations: vec![option(2, 0)],
            }],
        );
        let selection = pack
            .selection_from([(PackItemId::new(1), ProductId::new(2))])
            .unwrap();
        assert_eq!(pack.price(&selection), Price::ZERO);
    }

    #[test]
    fn test_rejects_foreign_products_and_slots() {
        let pack = configurator();
        let mut selection = pack.default_selection();
        assert_eq!(
            pack.select(&mut selection, PackItemId::new(1), ProductId::new(21)),
            Err(PackSelectionError::NotAnOption {
                item: PackItemId::new(1),
                product: ProductId::new(21),
            })
        );
        assert_eq!(
            pack.select(&mut selection, PackItemId::new(9), ProductId::new(10)),
            Err(PackSelectionError::UnknownSlot(PackItemId::new(9)))
        );
        assert_eq!(selection, pack.default_selection());
    }

    #[test]
    fn test_composite_scales_to_first_height() {
        let layout = composite_layout(
            &[
                ImageSize { width: 400, height: 400 },
                ImageSize { width: 300, height: 600 },
                ImageSize { width: 800, height: 200 },
            ],
            None,
        )
        .unwrap();
        assert_eq!(layout.height, 400);
        assert_eq!(
            layout.tiles,
            vec![
                Tile { x: 0, width: 400 },
                Tile { x: 400, width: 200 },
                Tile { x: 600, width: 1600 },
            ]
        );
        assert_eq!(layout.width, 2200);
    }

    #[test]
    fn test_composite_empty() {
        assert!(composite_layout(&[], None).is_none());
        assert!(composite_layout(&[], Some(100)).unwrap().tiles.is_empty());
    }
}
