//! Order management: status changes, the soft-delete bin and CSV export.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::{OrderId, OrderStatus};

use super::{AdminNav, SelectOption, admin_page, finish, reject};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::account::OrderView;
use crate::state::AppState;
use crate::views::PageContext;

/// File name offered for the CSV download.
const EXPORT_FILE_NAME: &str = "orders.csv";

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: OrderStatus,
}

/// An order row with its status picker.
pub struct OrderRow {
    pub view: OrderView,
    pub statuses: Vec<SelectOption>,
}

impl OrderRow {
    fn new(view: OrderView) -> Self {
        let current = view.order.status;
        Self {
            statuses: OrderStatus::ALL
                .iter()
                .map(|s| SelectOption::new(s.as_str(), s.label(), *s == current))
                .collect(),
            view,
        }
    }
}

/// Orders template, shared by the active list and the bin.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders/index.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub orders: Vec<OrderRow>,
    pub deleted: bool,
}

/// Active orders, or the bin with `?deleted=true`.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse> {
    let mut orders = if query.deleted {
        state.api().deleted_orders(&user.token).await?
    } else {
        state.api().orders(&user.token).await?
    };
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let title = if query.deleted { "Deleted orders" } else { "Orders" };
    Ok(OrdersTemplate {
        page: admin_page(&state, &session, title).await,
        nav: AdminNav::new("/admin/orders"),
        orders: orders
            .into_iter()
            .map(|order| OrderRow::new(OrderView::new(order)))
            .collect(),
        deleted: query.deleted,
    })
}

#[instrument(skip(state, session, user, form))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let outcome = state
        .api()
        .update_order_status(&user.token, id, form.status)
        .await;
    let message = format!("Order #{id} marked as {}.", form.status.label());
    finish(&session, outcome, &message, "/admin/orders").await
}

/// Move an order to the bin.
#[instrument(skip(state, session, user))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let outcome = state.api().delete_order(&user.token, id).await;
    finish(&session, outcome, "Order moved to deleted orders.", "/admin/orders").await
}

/// Take an order back out of the bin.
#[instrument(skip(state, session, user))]
pub async fn restore(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let outcome = state.api().restore_order(&user.token, id).await;
    finish(&session, outcome, "Order restored.", "/admin/orders?deleted=true").await
}

#[instrument(skip(state, session, user))]
pub async fn delete_all(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
) -> Result<Response> {
    let outcome = state.api().delete_all_orders(&user.token).await;
    finish(&session, outcome, "All orders moved to deleted orders.", "/admin/orders").await
}

/// Download every order as CSV.
#[instrument(skip(state, session, user))]
pub async fn export(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
) -> Result<Response> {
    match state.api().export_orders(&user.token).await {
        Ok(csv) => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
                ),
            ],
            csv,
        )
            .into_response()),
        Err(e) => {
            tracing::error!(error = %e, "Order export failed");
            reject(&session, "Failed to export orders.", "/admin/orders").await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::Order;

    #[test]
    fn test_status_picker_marks_current_status() {
        let row = OrderRow::new(OrderView::new(Order {
            status: OrderStatus::Delivering,
            ..Order::default()
        }));
        let selected: Vec<_> = row
            .statuses
            .iter()
            .filter(|s| s.selected)
            .map(|s| s.value.as_str())
            .collect();
        assert_eq!(selected, vec!["DELIVERING"]);
        assert_eq!(row.statuses.len(), OrderStatus::ALL.len());
    }

    #[test]
    fn test_status_form_reads_wire_name() {
        let form: StatusForm =
            serde_json::from_value(serde_json::json!({ "status": "CANCELED" })).unwrap();
        assert_eq!(form.status, OrderStatus::Canceled);
    }
}
