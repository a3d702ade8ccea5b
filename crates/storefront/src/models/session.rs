//! Session-related types.
//!
//! Everything that must survive between requests lives here: the bearer
//! token of the logged-in user, a guest's cart and a one-shot flash message.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use vitrine_core::pricing::LineItem;
use vitrine_core::{CategoryId, Price, ProductId, UserRole};

use crate::api::GuestCartItem;

/// Session-stored user identity.
///
/// The token is forwarded to the backend on every authenticated call.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub token: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("token", &"[REDACTED]")
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// One line of a guest cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
}

/// Cart kept in the session until a guest checks out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCart {
    pub lines: Vec<GuestCartLine>,
}

impl GuestCart {
    /// Add a line, merging quantities with an existing line for the same product.
    pub fn add(&mut self, line: GuestCartLine) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
            return;
        }
        self.lines.push(line);
    }

    /// Remove every unit of a product. Returns whether anything was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn line_items(&self) -> Vec<LineItem> {
        self.lines
            .iter()
            .map(|l| LineItem {
                product_id: l.product_id,
                category_id: l.category_id,
                unit_price: l.unit_price,
                quantity: l.quantity,
            })
            .collect()
    }

    /// Lines in the shape the guest order endpoint expects.
    #[must_use]
    pub fn order_items(&self) -> Vec<GuestCartItem> {
        self.lines
            .iter()
            .map(|l| GuestCartItem {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect()
    }
}

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the guest cart.
    pub const GUEST_CART: &str = "guest_cart";

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";

    /// Key for the coupon code entered at checkout.
    pub const COUPON_CODE: &str = "coupon_code";
}

/// Queue a flash message for the next page.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_flash(session: &Session, flash: Flash) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::FLASH, flash).await
}

/// Take the pending flash message, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session.remove::<Flash>(keys::FLASH).await.ok().flatten()
}

/// Load the guest cart, empty if none was saved.
pub async fn guest_cart(session: &Session) -> GuestCart {
    session
        .get::<GuestCart>(keys::GUEST_CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_guest_cart(
    session: &Session,
    cart: &GuestCart,
) -> Result<(), tower_sessions::session::Error> {
    if cart.is_empty() {
        session.remove::<GuestCart>(keys::GUEST_CART).await?;
        return Ok(());
    }
    session.insert(keys::GUEST_CART, cart).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, cents: i64, quantity: u32) -> GuestCartLine {
        GuestCartLine {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: Price::from_cents(cents),
            quantity,
            image_url: None,
            category_id: None,
        }
    }

    #[test]
    fn test_guest_cart_merges_same_product() {
        let mut cart = GuestCart::default();
        cart.add(line(1, 1500, 1));
        cart.add(line(2, 900, 2));
        cart.add(line(1, 1500, 3));

        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.lines[0].quantity, 4);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_guest_cart_remove() {
        let mut cart = GuestCart::default();
        cart.add(line(1, 1500, 1));
        assert!(!cart.remove(ProductId::new(9)));
        assert!(cart.remove(ProductId::new(1)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_guest_cart_order_items() {
        let mut cart = GuestCart::default();
        cart.add(line(3, 1000, 2));
        let items = cart.order_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, ProductId::new(3));
        assert_eq!(items[0].quantity, 2);
        assert_eq!(cart.line_items()[0].line_total(), Price::from_cents(2000));
    }

    #[test]
    fn test_current_user_debug_redacts_token() {
        let user = CurrentUser {
            token: "secret-token".to_string(),
            email: "amina@example.ma".to_string(),
            full_name: "Amina".to_string(),
            role: UserRole::Admin,
        };
        let debug = format!("{user:?}");
        assert!(!debug.contains("secret-token"));
        assert!(user.is_admin());
    }

    #[test]
    fn test_flash_serializes_kind_lowercase() {
        let json = serde_json::to_string(&Flash::error("nope")).unwrap_or_default();
        assert_eq!(json, r#"{"kind":"error","message":"nope"}"#);
    }
}
