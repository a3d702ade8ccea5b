//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::{OrderStatus, Price};

use super::{AdminNav, admin_page};
use crate::api::{Order, ProductQuery};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::state::AppState;
use crate::views::PageContext;

/// Orders listed under "Recent orders".
const RECENT_ORDERS: usize = 5;

/// Headline figures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub order_count: usize,
    pub pending_orders: usize,
    /// Line totals of every order that was not canceled.
    pub revenue: Price,
    pub product_count: u64,
    pub user_count: usize,
    pub pending_reviews: usize,
}

impl DashboardStats {
    fn from_orders(orders: &[Order]) -> Self {
        Self {
            order_count: orders.len(),
            pending_orders: orders
                .iter()
                .filter(|o| matches!(o.status, OrderStatus::Preparing | OrderStatus::Delivering))
                .count(),
            revenue: orders
                .iter()
                .filter(|o| o.status != OrderStatus::Canceled)
                .map(Order::items_total)
                .sum(),
            ..Self::default()
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub stats: DashboardStats,
    pub recent_orders: Vec<Order>,
}

/// Dashboard handler.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
) -> impl IntoResponse {
    let api = state.api();
    let count_query = ProductQuery {
        size: Some(1),
        ..ProductQuery::default()
    };
    let (orders, products, users, reviews) = tokio::join!(
        api.orders(&user.token),
        api.products(&count_query),
        api.users(&user.token),
        api.pending_reviews(&user.token),
    );

    let mut orders = orders.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to fetch orders");
        Vec::new()
    });
    let mut stats = DashboardStats::from_orders(&orders);
    stats.product_count = products.map(|p| p.total_elements).unwrap_or_default();
    stats.user_count = users.map(|u| u.len()).unwrap_or_default();
    stats.pending_reviews = reviews.map(|r| r.len()).unwrap_or_default();

    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders.truncate(RECENT_ORDERS);

    DashboardTemplate {
        page: admin_page(&state, &session, "Dashboard").await,
        nav: AdminNav::new("/admin"),
        stats,
        recent_orders: orders,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use vitrine_core::ProductId;

    use super::*;
    use crate::api::OrderItem;

    fn order(status: OrderStatus, price: i64) -> Order {
        Order {
            status,
            order_items: vec![OrderItem {
                product_id: ProductId::new(1),
                quantity: 1,
                price: Decimal::from(price),
                ..OrderItem::default()
            }],
            ..Order::default()
        }
    }

    #[test]
    fn test_stats_skip_canceled_revenue() {
        let stats = DashboardStats::from_orders(&[
            order(OrderStatus::Preparing, 10),
            order(OrderStatus::Delivered, 25),
            order(OrderStatus::Canceled, 100),
        ]);
        assert_eq!(stats.order_count, 3);
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.revenue, Price::from_cents(3500));
    }
}
