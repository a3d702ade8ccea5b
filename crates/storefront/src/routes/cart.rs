//! Cart route handlers.
//!
//! Logged-in shoppers use the backend cart. Guests keep their lines in the
//! session until they check out.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::ProductId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::session::{guest_cart, save_guest_cart, set_flash};
use crate::models::{Flash, GuestCartLine};
use crate::routes::widgets::safe_return_path;
use crate::state::AppState;
use crate::views::{CartContents, PageContext};

/// Largest quantity accepted in one add.
pub const MAX_QUANTITY: u32 = 99;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
    pub return_to: Option<String>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartContents,
}

/// Display cart page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let cart = match CartContents::load(&state, &session, user.as_ref()).await {
        Ok(cart) => cart,
        Err(e) if !e.is_server_error() => return Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load cart");
            set_flash(&session, Flash::error("Failed to load your cart.")).await?;
            CartContents::new(Vec::new(), state.config().shipping_cost)
        }
    };
    let page = PageContext::load(&state, &session, "Your Cart").await;
    Ok(CartShowTemplate { page, cart })
}

/// Add a product to the cart.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let quantity = form.quantity.unwrap_or(1).clamp(1, MAX_QUANTITY);
    let back = safe_return_path(form.return_to.as_deref()).to_string();

    let outcome = match &user {
        Some(user) => state
            .api()
            .add_to_cart(&user.token, form.product_id, quantity)
            .await,
        None => match state.api().product(form.product_id).await {
            Ok(product) => {
                let mut cart = guest_cart(&session).await;
                cart.add(GuestCartLine {
                    product_id: product.id,
                    name: product.name.clone(),
                    unit_price: product.price(),
                    quantity,
                    image_url: product.first_image().map(str::to_string),
                    category_id: product.category_id,
                });
                save_guest_cart(&session, &cart).await?;
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    match outcome {
        Ok(()) => {
            let product_id = form.product_id.to_string();
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", product_id.as_str())]),
            );
            set_flash(&session, Flash::success("Product added to cart!")).await?;
        }
        Err(e) if e.is_client_error() => {
            set_flash(&session, Flash::error(e.user_message())).await?;
        }
        Err(e) => return Err(AppError::from(e)),
    }
    Ok(Redirect::to(&back).into_response())
}

/// Remove a product from the cart.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    match &user {
        Some(user) => {
            state
                .api()
                .remove_from_cart(&user.token, form.product_id)
                .await?;
        }
        None => {
            let mut cart = guest_cart(&session).await;
            if cart.remove(form.product_id) {
                save_guest_cart(&session, &cart).await?;
            }
        }
    }
    set_flash(&session, Flash::info("Item removed from cart.")).await?;
    Ok(Redirect::to("/cart").into_response())
}
