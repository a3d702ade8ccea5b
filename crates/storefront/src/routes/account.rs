//! Profile page with order history.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::Price;

use crate::api::{Order, User};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;
use crate::views::PageContext;

/// An order as listed on the profile page.
pub struct OrderView {
    pub order: Order,
    pub items_total: Price,
    pub total: Price,
}

impl OrderView {
    pub(crate) fn new(order: Order) -> Self {
        let items_total = order.items_total();
        let discount = order.discount_amount.map(Price::new).unwrap_or_default();
        let shipping = order.shipping_cost.map(Price::new).unwrap_or_default();
        Self {
            total: items_total.saturating_sub(discount) + shipping,
            items_total,
            order,
        }
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub profile: User,
    pub orders: Vec<OrderView>,
}

/// Display the profile page.
#[instrument(skip(state, session, user))]
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let (profile, orders) = tokio::join!(
        state.api().profile(&user.token),
        state.api().user_orders(&user.token)
    );
    let mut orders = orders?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(ProfileTemplate {
        page: PageContext::load(&state, &session, "My Profile").await,
        profile: profile?,
        orders: orders.into_iter().map(OrderView::new).collect(),
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use vitrine_core::ProductId;

    use super::*;
    use crate::api::OrderItem;

    #[test]
    fn test_order_total_applies_discount_and_shipping() {
        let order = Order {
            order_items: vec![OrderItem {
                id: None,
                product_id: ProductId::new(1),
                product_name: "Rose water".to_string(),
                quantity: 2,
                price: Decimal::from(20),
            }],
            discount_amount: Some(Decimal::from(5)),
            shipping_cost: Some(Decimal::from(10)),
            ..Order::default()
        };
        let view = OrderView::new(order);
        assert_eq!(view.items_total, Price::from_cents(4000));
        assert_eq!(view.total, Price::from_cents(4500));
    }
}
