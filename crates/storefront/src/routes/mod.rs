//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page
//!
//! # Catalog
//! GET  /products                      - Product listing (filters, sort, paging)
//! GET  /products/{id}                 - Product detail with comments
//! POST /products/{id}/comments        - Add a comment (requires auth)
//!
//! # Packs
//! GET  /packs                         - Pack listing
//! GET  /packs/{id}                    - Pack detail (?item_<slot>=<product> selections)
//! GET  /packs/{id}/composite.svg      - Composite image of the selection
//! POST /packs/{id}/cart               - Add every selected item to the cart
//! POST /packs/{id}/defaults           - Save selection as the pack defaults (admin)
//! GET  /custom-packs                  - Custom pack listing
//! GET  /custom-packs/{id}             - Builder (?product=<id> repeated)
//! POST /custom-packs/{id}/cart        - Add the selection to the cart
//!
//! # Cart & checkout
//! GET  /cart                          - Cart page
//! POST /cart/add                      - Add to cart
//! POST /cart/remove                   - Remove a line
//! GET  /checkout                      - Delivery form and totals
//! POST /checkout                      - Place the order
//! POST /checkout/coupon               - Apply a coupon code
//! POST /checkout/coupon/remove        - Drop the coupon
//!
//! # Auth (form posts are rate limited)
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action
//! GET  /auth/register                 - Register page
//! POST /auth/register                 - Register action
//! GET  /auth/confirm                  - Email confirmation page
//! POST /auth/confirm                  - Confirm with the emailed code
//! GET  /auth/forgot-password          - Forgot password page
//! POST /auth/forgot-password          - Send reset link
//! GET  /auth/reset-password           - Reset password page (?token=)
//! POST /auth/reset-password           - Reset password action
//! POST /auth/logout                   - Logout action
//!
//! # Account & community
//! GET  /profile                       - Profile and order history (requires auth)
//! GET  /reviews                       - Approved store reviews
//! POST /reviews                       - Submit a review (requires auth)
//!
//! # Widgets
//! GET  /widgets/visitor-count         - Visitor counter JSON for polling
//! POST /widgets/feedback              - Feedback widget
//!
//! # Back office
//! /admin/...                          - See [`admin`]
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod custom_packs;
pub mod forms;
pub mod home;
pub mod packs;
pub mod products;
pub mod reviews;
pub mod widgets;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Only the form posts sit behind the rate limiter; the pages do not.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/confirm", post(auth::confirm))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/confirm", get(auth::confirm_page))
        .route("/forgot-password", get(auth::forgot_password_page))
        .route("/reset-password", get(auth::reset_password_page))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/comments", post(products::add_comment))
}

/// Create the pack routes router.
pub fn pack_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(packs::index))
        .route("/{id}", get(packs::show))
        .route("/{id}/composite.svg", get(packs::composite))
        .route("/{id}/cart", post(packs::add_to_cart))
        .route("/{id}/defaults", post(packs::save_defaults))
}

/// Create the custom pack routes router.
pub fn custom_pack_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(custom_packs::index))
        .route("/{id}", get(custom_packs::show))
        .route("/{id}/cart", post(custom_packs::add_to_cart))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place_order))
        .route("/coupon", post(checkout::apply_coupon))
        .route("/coupon/remove", post(checkout::remove_coupon))
}

/// Create the widget routes router.
pub fn widget_routes() -> Router<AppState> {
    Router::new()
        .route("/visitor-count", get(widgets::visitor_count))
        .route("/feedback", post(widgets::feedback))
}

/// Create all routes for the storefront.
///
/// `max_upload_bytes` bounds admin form bodies, which carry image uploads.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Catalog
        .nest("/products", product_routes())
        .nest("/packs", pack_routes())
        .nest("/custom-packs", custom_pack_routes())
        // Cart & checkout
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        // Auth
        .nest("/auth", auth_routes())
        // Account & community
        .route("/profile", get(account::profile))
        .route("/reviews", get(reviews::index).post(reviews::submit))
        // Widgets
        .nest("/widgets", widget_routes())
        // Back office
        .nest("/admin", admin::routes(max_upload_bytes))
}
