//! View data shared by every page.
//!
//! Handlers build a [`PageContext`] for the layout (user menu, cart badge,
//! flash message, announcement bar, countdown, tracking ids) and a
//! [`CartContents`] wherever the cart is shown.

use chrono::{DateTime, Utc};
use tower_sessions::Session;
use tracing::warn;

use vitrine_core::pricing::{Discount, LineItem, OrderTotals};
use vitrine_core::promo::{
    BannerStyle, DEFAULT_COUNTDOWN_BACKGROUND, DEFAULT_COUNTDOWN_TEXT, HexColor, Remaining,
};
use vitrine_core::{CategoryId, Price, ProductId};

use crate::api::{Announcement, ApiError, BackendClient, Cart, Countdown, FACEBOOK_PIXEL_KEY};
use crate::error::AppError;
use crate::models::session::{guest_cart, take_flash};
use crate::models::{CurrentUser, Flash, GuestCart, session_keys};
use crate::state::AppState;

/// Announcement bar as the layout draws it.
#[derive(Debug, Clone)]
pub struct BannerView {
    pub text: String,
    pub class: String,
    pub style: String,
    pub marquee: bool,
}

impl BannerView {
    /// `None` when the announcement is disabled or blank.
    #[must_use]
    pub fn from_announcement(announcement: &Announcement) -> Option<Self> {
        if !announcement.enabled || announcement.text.trim().is_empty() {
            return None;
        }
        let style = BannerStyle::new(
            &announcement.background_color,
            &announcement.text_color,
            announcement.animation_type,
        );
        Some(Self {
            text: announcement.text.clone(),
            class: style.class.unwrap_or_default(),
            style: style.style,
            marquee: style.marquee,
        })
    }
}

/// Countdown timer as the layout draws it; the script keeps it ticking.
#[derive(Debug, Clone)]
pub struct CountdownView {
    pub title: String,
    /// RFC 3339 end instant for the client-side ticker.
    pub ends_at: String,
    pub style: String,
    pub remaining: Remaining,
}

impl CountdownView {
    /// `None` when disabled, undated or already over.
    #[must_use]
    pub fn from_countdown(countdown: &Countdown, now: DateTime<Utc>) -> Option<Self> {
        if !countdown.enabled {
            return None;
        }
        let end = countdown.end_date?;
        let remaining = Remaining::until(end, now)?;
        let background =
            HexColor::parse_or(&countdown.background_color, DEFAULT_COUNTDOWN_BACKGROUND);
        let text = HexColor::parse_or(&countdown.text_color, DEFAULT_COUNTDOWN_TEXT);
        Some(Self {
            title: countdown.title.clone(),
            ends_at: end.to_rfc3339(),
            style: format!("background-color: {background}; color: {text};"),
            remaining,
        })
    }
}

/// An `<option>` or checkbox, with its selection worked out up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    #[must_use]
    pub fn new(value: impl ToString, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
            selected,
        }
    }
}

/// Layout data every page template embeds as `page`.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub title: String,
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub flash: Option<Flash>,
    pub banner: Option<BannerView>,
    pub countdown: Option<CountdownView>,
    pub meta_pixel_id: Option<String>,
    pub ga4_measurement_id: Option<String>,
}

impl PageContext {
    /// Gather layout data. Widget failures only cost the widget.
    pub async fn load(state: &AppState, session: &Session, title: impl Into<String>) -> Self {
        let api = state.api();
        let mut user = current_user(session).await;
        let flash = take_flash(session).await;

        let (announcement, countdown, settings, count) = tokio::join!(
            api.announcement(),
            api.countdown(),
            api.settings(),
            cart_count(api, session, user.as_ref()),
        );

        let cart_count = match count {
            Ok(count) => count,
            Err(ApiError::Unauthorized) => {
                // Token expired on the backend side.
                if let Err(e) = session.remove::<CurrentUser>(session_keys::CURRENT_USER).await {
                    warn!(error = %e, "Failed to drop expired user from session");
                }
                user = None;
                0
            }
            Err(e) => {
                warn!(error = %e, "Failed to load cart count");
                0
            }
        };

        let banner = announcement
            .inspect_err(|e| warn!(error = %e, "Failed to load announcement"))
            .ok()
            .and_then(|a| BannerView::from_announcement(&a));
        let countdown = countdown
            .inspect_err(|e| warn!(error = %e, "Failed to load countdown"))
            .ok()
            .and_then(|c| CountdownView::from_countdown(&c, Utc::now()));
        let meta_pixel_id = settings
            .ok()
            .and_then(|mut s| s.remove(FACEBOOK_PIXEL_KEY))
            .filter(|id| !id.trim().is_empty())
            .or_else(|| state.config().analytics.meta_pixel_id.clone());

        Self {
            title: title.into(),
            user,
            cart_count,
            flash,
            banner,
            countdown,
            meta_pixel_id,
            ga4_measurement_id: state.config().analytics.ga4_measurement_id.clone(),
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }
}

/// The logged-in user, if any.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

async fn cart_count(
    api: &BackendClient,
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<u32, ApiError> {
    match user {
        Some(user) => Ok(api
            .cart(&user.token)
            .await?
            .items
            .iter()
            .map(|i| i.quantity)
            .sum()),
        None => Ok(guest_cart(session).await.item_count()),
    }
}

/// A cart line ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
    pub category_id: Option<CategoryId>,
}

/// Cart lines plus the totals shown under them.
#[derive(Debug, Clone)]
pub struct CartContents {
    pub lines: Vec<CartLineView>,
    pub totals: OrderTotals,
}

impl CartContents {
    /// Build from line views, with the flat shipping fee and no discount.
    #[must_use]
    pub fn new(lines: Vec<CartLineView>, shipping: Price) -> Self {
        let mut contents = Self {
            lines,
            totals: OrderTotals::empty(),
        };
        contents.apply(shipping, Discount::NONE);
        contents
    }

    #[must_use]
    pub fn from_backend(cart: &Cart, shipping: Price) -> Self {
        let lines = cart
            .items
            .iter()
            .map(|item| {
                let unit_price = Price::new(item.price);
                CartLineView {
                    product_id: item.product_id,
                    name: item.product_name.clone(),
                    image_url: item.image_url.clone(),
                    unit_price,
                    quantity: item.quantity,
                    line_total: unit_price.times(item.quantity),
                    category_id: None,
                }
            })
            .collect();
        Self::new(lines, shipping)
    }

    #[must_use]
    pub fn from_guest(cart: &GuestCart, shipping: Price) -> Self {
        let lines = cart
            .lines
            .iter()
            .map(|line| CartLineView {
                product_id: line.product_id,
                name: line.name.clone(),
                image_url: line.image_url.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                line_total: line.unit_price.times(line.quantity),
                category_id: line.category_id,
            })
            .collect();
        Self::new(lines, shipping)
    }

    /// Load the cart of whoever is browsing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cart cannot be fetched.
    pub async fn load(
        state: &AppState,
        session: &Session,
        user: Option<&CurrentUser>,
    ) -> Result<Self, AppError> {
        let shipping = state.config().shipping_cost;
        match user {
            Some(user) => {
                let cart = state.api().cart(&user.token).await?;
                Ok(Self::from_backend(&cart, shipping))
            }
            None => Ok(Self::from_guest(&guest_cart(session).await, shipping)),
        }
    }

    /// Fill in missing category ids from the product catalog.
    ///
    /// Backend cart lines do not carry categories, which category-scoped
    /// coupons need.
    pub async fn resolve_categories(&mut self, api: &BackendClient) {
        for line in self.lines.iter_mut().filter(|l| l.category_id.is_none()) {
            match api.product(line.product_id).await {
                Ok(product) => line.category_id = product.category_id,
                Err(e) => warn!(product_id = %line.product_id, error = %e, "Category lookup failed"),
            }
        }
    }

    /// Recompute totals with a discount applied.
    pub fn apply(&mut self, shipping: Price, discount: Discount) {
        self.totals = if self.lines.is_empty() {
            OrderTotals::empty()
        } else {
            OrderTotals::for_lines(&self.line_items(), shipping, discount)
        };
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

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use vitrine_core::promo::AnimationType;

    use super::*;
    use crate::api::CartItem;

    #[test]
    fn test_disabled_announcement_has_no_banner() {
        let announcement = Announcement {
            text: "Free delivery this week".to_string(),
            enabled: false,
            ..Announcement::default()
        };
        assert!(BannerView::from_announcement(&announcement).is_none());
    }

    #[test]
    fn test_banner_uses_animation_class() {
        let announcement = Announcement {
            text: "Summer sale".to_string(),
            enabled: true,
            background_color: "#112233".to_string(),
            text_color: "not a colour".to_string(),
            animation_type: AnimationType::Pulse,
        };
        let banner = BannerView::from_announcement(&announcement).unwrap();
        assert_eq!(banner.class, "animate-pulse-custom");
        assert!(banner.style.contains("#112233"));
        assert!(banner.style.contains("#ffffff"));
        assert!(!banner.marquee);
    }

    #[test]
    fn test_expired_countdown_is_hidden() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut countdown = Countdown {
            title: "Ends soon".to_string(),
            end_date: Some(now - chrono::Duration::minutes(1)),
            enabled: true,
            ..Countdown::default()
        };
        assert!(CountdownView::from_countdown(&countdown, now).is_none());

        countdown.end_date = Some(now + chrono::Duration::hours(26));
        let view = CountdownView::from_countdown(&countdown, now).unwrap();
        assert_eq!(view.remaining.days, 1);
        assert_eq!(view.remaining.hours, 2);
    }

    #[test]
    fn test_backend_cart_totals_include_shipping() {
        let cart = Cart {
            id: Some(1),
            items: vec![
                CartItem {
                    id: None,
                    product_id: ProductId::new(1),
                    product_name: "Argan oil".to_string(),
                    price: Decimal::new(12_50, 2),
                    quantity: 2,
                    image_url: None,
                },
                CartItem {
                    id: None,
                    product_id: ProductId::new(2),
                    product_name: "Black soap".to_string(),
                    price: Decimal::new(5_00, 2),
                    quantity: 1,
                    image_url: None,
                },
            ],
        };
        let contents = CartContents::from_backend(&cart, Price::from_cents(1000));
        assert_eq!(contents.item_count(), 3);
        assert_eq!(contents.totals.subtotal, Price::from_cents(3000));
        assert_eq!(contents.totals.total, Price::from_cents(4000));
    }

    #[test]
    fn test_empty_cart_has_zero_total() {
        let contents = CartContents::from_guest(&GuestCart::default(), Price::from_cents(1000));
        assert!(contents.is_empty());
        assert_eq!(contents.totals.total, Price::ZERO);
    }
}
