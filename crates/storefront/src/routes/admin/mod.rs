//! Back office route handlers.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin), so
//! only users whose session role is `ADMIN` get past the extractor. The
//! backend checks the token's role again on every mutation.
//!
//! # Route Structure
//!
//! ```text
//! GET  /admin                               - Dashboard
//! GET  /admin/products                      - Product list
//! GET  /admin/products/new                  - New product form
//! POST /admin/products                      - Create product (multipart)
//! GET  /admin/products/{id}/edit            - Edit product form
//! POST /admin/products/{id}                 - Update product (multipart)
//! POST /admin/products/{id}/delete          - Delete product
//! POST /admin/products/description-image    - Upload a description image (multipart)
//! GET  /admin/categories                    - Category list and create form
//! POST /admin/categories                    - Create category (multipart)
//! GET  /admin/categories/{id}/edit          - Edit category form
//! POST /admin/categories/{id}               - Update category (multipart)
//! POST /admin/categories/{id}/delete        - Delete category
//! GET  /admin/orders                        - Active orders (?deleted=true for the bin)
//! POST /admin/orders/{id}/status            - Change status
//! POST /admin/orders/{id}/delete            - Soft delete
//! POST /admin/orders/{id}/restore           - Restore
//! POST /admin/orders/delete-all             - Soft delete every order
//! GET  /admin/orders/export                 - CSV export
//! GET  /admin/users                         - Users
//! POST /admin/users/{id}/role               - Change role
//! POST /admin/users/{id}/delete             - Delete user
//! GET  /admin/reviews                       - Pending reviews
//! POST /admin/reviews/{id}/approve          - Approve review
//! POST /admin/reviews/{id}/delete           - Delete review
//! GET  /admin/packs                         - Pack list
//! GET  /admin/packs/new                     - New pack form
//! POST /admin/packs                         - Create pack (multipart)
//! GET  /admin/packs/{id}/edit               - Edit pack form
//! POST /admin/packs/{id}                    - Update pack (multipart)
//! POST /admin/packs/{id}/delete             - Delete pack
//! GET  /admin/custom-packs                  - Custom pack list
//! GET  /admin/custom-packs/new              - New custom pack form
//! POST /admin/custom-packs                  - Create custom pack
//! GET  /admin/custom-packs/{id}/edit        - Edit custom pack form
//! POST /admin/custom-packs/{id}             - Update custom pack
//! POST /admin/custom-packs/{id}/delete      - Delete custom pack
//! GET  /admin/coupons                       - Coupons, create form, usage chart
//! POST /admin/coupons                       - Create coupon
//! GET  /admin/coupons/{id}                  - Daily usage of one coupon
//! POST /admin/coupons/{id}/delete           - Delete coupon
//! GET  /admin/announcement                  - Announcement bar form
//! POST /admin/announcement                  - Save announcement
//! GET  /admin/countdown                     - Countdown form
//! POST /admin/countdown                     - Save countdown
//! GET  /admin/visitor-counter               - Visitor counter form
//! POST /admin/visitor-counter               - Save visitor counter
//! GET  /admin/settings                      - Store settings form
//! POST /admin/settings                      - Save settings
//! GET  /admin/hero                          - Hero section form
//! POST /admin/hero                          - Save hero (multipart)
//! ```

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::api::ApiError;
use crate::error::Result;
use crate::models::Flash;
use crate::models::session::set_flash;
use crate::state::AppState;
use crate::views::PageContext;

pub use crate::views::SelectOption;

pub mod categories;
pub mod coupons;
pub mod custom_packs;
pub mod dashboard;
pub mod orders;
pub mod packs;
pub mod products;
pub mod promotions;
pub mod reviews;
pub mod settings;
pub mod users;

/// Sidebar entries: `(path, label)`.
pub const NAV: &[(&str, &str)] = &[
    ("/admin", "Dashboard"),
    ("/admin/hero", "Hero Section"),
    ("/admin/products", "Products"),
    ("/admin/categories", "Categories"),
    ("/admin/packs", "Packs"),
    ("/admin/custom-packs", "Custom Packs"),
    ("/admin/orders", "Orders"),
    ("/admin/users", "Users"),
    ("/admin/reviews", "Reviews"),
    ("/admin/coupons", "Coupons"),
    ("/admin/announcement", "Announcement"),
    ("/admin/countdown", "Countdown"),
    ("/admin/visitor-counter", "Visitor Counter"),
    ("/admin/settings", "Settings"),
];

/// A sidebar entry.
pub struct NavLink {
    pub path: &'static str,
    pub label: &'static str,
    pub current: bool,
}

/// Sidebar state for back office pages.
pub struct AdminNav {
    pub links: Vec<NavLink>,
}

impl AdminNav {
    /// Sidebar with the section at `current_path` highlighted.
    #[must_use]
    pub fn new(current_path: &str) -> Self {
        Self {
            links: NAV
                .iter()
                .map(|&(path, label)| NavLink {
                    path,
                    label,
                    current: path == current_path,
                })
                .collect(),
        }
    }
}

/// Layout data for a back office page.
pub async fn admin_page(state: &AppState, session: &Session, title: &str) -> PageContext {
    PageContext::load(state, session, format!("{title} | Admin")).await
}

/// Flash the outcome of a backend mutation and redirect.
///
/// Rejections show the backend's message. Outages are logged (and reported
/// through the tracing layer) and shown as a generic failure.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn finish<T>(
    session: &Session,
    outcome: std::result::Result<T, ApiError>,
    success: &str,
    redirect_to: &str,
) -> Result<Response> {
    let flash = match outcome {
        Ok(_) => Flash::success(success),
        Err(e) if e.is_client_error() => Flash::error(e.user_message()),
        Err(e) => {
            tracing::error!(error = %e, "Admin action failed");
            Flash::error(e.user_message())
        }
    };
    set_flash(session, flash).await?;
    Ok(Redirect::to(redirect_to).into_response())
}

/// Flash an error and redirect, for input rejected before reaching the backend.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn reject(
    session: &Session,
    message: impl Into<String>,
    redirect_to: &str,
) -> Result<Response> {
    set_flash(session, Flash::error(message)).await?;
    Ok(Redirect::to(redirect_to).into_response())
}

/// Back office router, nested under `/admin`.
///
/// Bodies up to `max_upload_bytes` are accepted so several product photos
/// fit in one form.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        // Products
        .route("/products", get(products::index).post(products::create))
        .route("/products/new", get(products::new_product))
        .route(
            "/products/description-image",
            post(products::upload_description_image),
        )
        .route("/products/{id}", post(products::update))
        .route("/products/{id}/edit", get(products::edit))
        .route("/products/{id}/delete", post(products::delete))
        // Categories
        .route("/categories", get(categories::index).post(categories::create))
        .route("/categories/{id}", post(categories::update))
        .route("/categories/{id}/edit", get(categories::edit))
        .route("/categories/{id}/delete", post(categories::delete))
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/export", get(orders::export))
        .route("/orders/delete-all", post(orders::delete_all))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/orders/{id}/delete", post(orders::delete))
        .route("/orders/{id}/restore", post(orders::restore))
        // Users
        .route("/users", get(users::index))
        .route("/users/{id}/role", post(users::update_role))
        .route("/users/{id}/delete", post(users::delete))
        // Reviews
        .route("/reviews", get(reviews::index))
        .route("/reviews/{id}/approve", post(reviews::approve))
        .route("/reviews/{id}/delete", post(reviews::delete))
        // Packs
        .route("/packs", get(packs::index).post(packs::create))
        .route("/packs/new", get(packs::new_pack))
        .route("/packs/{id}", post(packs::update))
        .route("/packs/{id}/edit", get(packs::edit))
        .route("/packs/{id}/delete", post(packs::delete))
        // Custom packs
        .route("/custom-packs", get(custom_packs::index).post(custom_packs::create))
        .route("/custom-packs/new", get(custom_packs::new_custom_pack))
        .route("/custom-packs/{id}", post(custom_packs::update))
        .route("/custom-packs/{id}/edit", get(custom_packs::edit))
        .route("/custom-packs/{id}/delete", post(custom_packs::delete))
        // Coupons
        .route("/coupons", get(coupons::index).post(coupons::create))
        .route("/coupons/{id}", get(coupons::show))
        .route("/coupons/{id}/delete", post(coupons::delete))
        // Storefront widgets
        .route(
            "/announcement",
            get(promotions::announcement).post(promotions::save_announcement),
        )
        .route(
            "/countdown",
            get(promotions::countdown).post(promotions::save_countdown),
        )
        .route(
            "/visitor-counter",
            get(promotions::visitor_counter).post(promotions::save_visitor_counter),
        )
        // Settings
        .route("/settings", get(settings::index).post(settings::save))
        .route("/hero", get(settings::hero).post(settings::save_hero))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
