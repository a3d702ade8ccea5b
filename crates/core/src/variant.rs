//! Product variants.
//!
//! A product with variants declares option types (`Size: S, M, L`) and a list
//! of priced, stocked combinations of those options (`Size=M, Color=Red`).
//! The backend rejects malformed variants; [`validate_variants`] applies the
//! same rules first so the admin form can answer without a round trip.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Price;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    #[error("Variant type name cannot be empty")]
    EmptyTypeName,
    #[error("Variant type '{0}' is listed twice")]
    DuplicateType(String),
    #[error("Variant type '{0}' must have at least one option")]
    NoOptions(String),
    #[error("All variants must have a valid positive price")]
    InvalidPrice,
    #[error("Variant stock cannot be negative")]
    NegativeStock,
    #[error("All variants must have variant attributes defined")]
    NoAttributes,
    #[error("'{0}' is not a variant type of this product")]
    UnknownType(String),
    #[error("'{option}' is not an option of {variant_type}")]
    UnknownOption {
        variant_type: String,
        option: String,
    },
}

/// An option axis such as size or colour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariantType {
    pub name: String,
    pub options: Vec<String>,
}

impl VariantType {
    /// Build from a name and a comma separated option list.
    ///
    /// Options are trimmed; blanks and repeats are dropped, first spelling wins.
    #[must_use]
    pub fn from_list(name: &str, options: &str) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for option in options.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            if !unique.iter().any(|existing| existing == option) {
                unique.push(option.to_string());
            }
        }
        Self {
            name: name.trim().to_string(),
            options: unique,
        }
    }

    /// Options joined back into the form's comma separated input.
    #[must_use]
    pub fn options_list(&self) -> String {
        self.options.join(", ")
    }
}

/// One sellable combination of options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductVariant {
    /// Variant type name to chosen option.
    pub variant_map: BTreeMap<String, String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
}

impl ProductVariant {
    #[must_use]
    pub fn price(&self) -> Price {
        Price::new(self.price)
    }

    /// `Size: M / Color: Red`, in variant type name order.
    #[must_use]
    pub fn label(&self) -> String {
        self.variant_map
            .iter()
            .map(|(name, option)| format!("{name}: {option}"))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Check variant types and variants the way the backend does.
///
/// # Errors
///
/// Returns the first problem found: types are checked before variants.
pub fn validate_variants(
    types: &[VariantType],
    variants: &[ProductVariant],
) -> Result<(), VariantError> {
    for (index, variant_type) in types.iter().enumerate() {
        if variant_type.name.trim().is_empty() {
            return Err(VariantError::EmptyTypeName);
        }
        if types
            .iter()
            .take(index)
            .any(|earlier| earlier.name == variant_type.name)
        {
            return Err(VariantError::DuplicateType(variant_type.name.clone()));
        }
        if variant_type.options.is_empty() {
            return Err(VariantError::NoOptions(variant_type.name.clone()));
        }
    }

    for variant in variants {
        if variant.price <= Decimal::ZERO {
            return Err(VariantError::InvalidPrice);
        }
        if variant.stock < 0 {
            return Err(VariantError::NegativeStock);
        }
        if variant.variant_map.is_empty() {
            return Err(VariantError::NoAttributes);
        }
        for (name, option) in &variant.variant_map {
            let variant_type = types
                .iter()
                .find(|t| &t.name == name)
                .ok_or_else(|| VariantError::UnknownType(name.clone()))?;
            if !variant_type.options.contains(option) {
                return Err(VariantError::UnknownOption {
                    variant_type: name.clone(),
                    option: option.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sizes() -> VariantType {
        VariantType::from_list("Size", "S, M, ,L, M")
    }

    fn variant(pairs: &[(&str, &str)], cents: i64, stock: i32) -> ProductVariant {
        ProductVariant {
            variant_map: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            price: Decimal::new(cents, 2),
            stock,
            image_url: None,
        }
    }

    #[test]
    fn test_options_are_trimmed_and_deduplicated() {
        let sizes = sizes();
        assert_eq!(sizes.options, vec!["S", "M", "L"]);
        assert_eq!(sizes.options_list(), "S, M, L");
    }

    #[test]
    fn test_valid_variants_pass() {
        let types = [sizes(), VariantType::from_list("Color", "Red,Blue")];
        let variants = [
            variant(&[("Size", "M"), ("Color", "Red")], 2500, 3),
            variant(&[("Size", "L")], 2700, 0),
        ];
        assert_eq!(validate_variants(&types, &variants), Ok(()));
        assert_eq!(variants[0].label(), "Color: Red / Size: M");
    }

    #[test]
    fn test_type_rules() {
        assert_eq!(
            validate_variants(&[VariantType::from_list(" ", "S")], &[]),
            Err(VariantError::EmptyTypeName)
        );
        assert_eq!(
            validate_variants(&[VariantType::from_list("Size", " , ")], &[]),
            Err(VariantError::NoOptions("Size".to_string()))
        );
        assert_eq!(
            validate_variants(&[sizes(), sizes()], &[]),
            Err(VariantError::DuplicateType("Size".to_string()))
        );
    }

    #[test]
    fn test_variant_rules() {
        let types = [sizes()];
        let check = |v: ProductVariant| validate_variants(&types, &[v]).unwrap_err();
        assert_eq!(check(variant(&[("Size", "M")], 0, 1)), VariantError::InvalidPrice);
        assert_eq!(check(variant(&[("Size", "M")], 100, -1)), VariantError::NegativeStock);
        assert_eq!(check(variant(&[], 100, 1)), VariantError::NoAttributes);
        assert_eq!(
            check(variant(&[("Color", "Red")], 100, 1)),
            VariantError::UnknownType("Color".to_string())
        );
        assert_eq!(
            check(variant(&[("Size", "XL")], 100, 1)).to_string(),
            "'XL' is not an option of Size"
        );
    }

    #[test]
    fn test_variant_wire_format() {
        let variant: ProductVariant = serde_json::from_str(
            r#"{"variantMap": {"Size": "M"}, "price": 25.5, "stock": 4}"#,
        )
        .unwrap();
        assert_eq!(variant.price(), Price::from_cents(2550));
        assert_eq!(variant.image_url, None);
        let json = serde_json::to_value(&variant).unwrap();
        assert_eq!(json["variantMap"]["Size"], "M");
        assert_eq!(json["price"], 25.5);
    }
}
