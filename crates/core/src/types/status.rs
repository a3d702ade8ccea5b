//! Enums shared with the backend.
//!
//! Every enum serializes to the backend's SCREAMING_SNAKE_CASE wire names and
//! parses back from the same strings (form posts carry them verbatim).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a wire name does not match any variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire name used by the backend.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            /// Human-readable label.
            #[must_use]
            pub const fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_owned() }),
                }
            }
        }
    };
}

wire_enum! {
    /// Order fulfillment status. New orders start in `Preparing`.
    OrderStatus ("order status") {
        Preparing => "PREPARING", "Preparing",
        Delivering => "DELIVERING", "Delivering",
        Delivered => "DELIVERED", "Delivered",
        Canceled => "CANCELED", "Canceled",
    }
}

wire_enum! {
    /// Account role. Only `Admin` may open the back office.
    UserRole ("user role") {
        User => "USER", "Customer",
        Admin => "ADMIN", "Administrator",
    }
}

wire_enum! {
    /// Target audience of a product.
    ProductType ("product type") {
        Men => "MEN", "Men",
        Women => "WOMEN", "Women",
        Both => "BOTH", "Unisex",
    }
}

wire_enum! {
    /// How a coupon reduces the order.
    DiscountType ("discount type") {
        Percentage => "PERCENTAGE", "Percentage",
        FixedAmount => "FIXED_AMOUNT", "Fixed amount",
        FreeShipping => "FREE_SHIPPING", "Free shipping",
    }
}

wire_enum! {
    /// Who a coupon was issued for.
    CouponType ("coupon type") {
        Influencer => "INFLUENCER", "Influencer",
        User => "USER", "Customer",
    }
}

wire_enum! {
    /// Custom pack pricing model.
    PricingType ("pricing type") {
        Fixed => "FIXED", "Fixed price",
        Dynamic => "DYNAMIC", "Discounted total",
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Preparing
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::User
    }
}

impl Default for DiscountType {
    fn default() -> Self {
        Self::Percentage
    }
}

impl Default for ProductType {
    fn default() -> Self {
        Self::Both
    }
}

impl Default for CouponType {
    fn default() -> Self {
        Self::User
    }
}

impl Default for PricingType {
    fn default() -> Self {
        Self::Fixed
    }
}

impl OrderStatus {
    /// Whether the order can no longer change state.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::Canceled)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_roundtrip_through_serde() {
        let json = serde_json::to_string(&DiscountType::FreeShipping).unwrap();
        assert_eq!(json, "\"FREE_SHIPPING\"");
        let parsed: DiscountType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, DiscountType::FreeShipping);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("delivering".parse::<OrderStatus>().unwrap(), OrderStatus::Delivering);
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "SHIPPED".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid order status: SHIPPED");
    }

    #[test]
    fn test_defaults_match_backend() {
        assert_eq!(OrderStatus::default(), OrderStatus::Preparing);
        assert_eq!(CouponType::default(), CouponType::User);
        assert_eq!(UserRole::default(), UserRole::User);
    }

    #[test]
    fn test_all_lists_every_variant() {
        assert_eq!(OrderStatus::ALL.len(), 4);
        assert!(OrderStatus::Canceled.is_final());
        assert!(!OrderStatus::Preparing.is_final());
    }
}
