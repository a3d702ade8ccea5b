//! Custom pack listing and builder.
//!
//! The builder keeps its selection in the query string: every product card
//! links to the same page with that product toggled.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::custom_pack::CustomPackRules;
use vitrine_core::{CustomPackId, Price, ProductId};

use crate::api::{CustomPack, Product};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::session::{guest_cart, save_guest_cart, set_flash};
use crate::models::{Flash, GuestCartLine};
use crate::routes::forms::FormPairs;
use crate::state::AppState;
use crate::views::PageContext;

/// Current builder state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub products: Vec<ProductId>,
    /// Set when a toggle was refused.
    pub warning: Option<String>,
}

/// Rebuild the selection from submitted `product` fields, then apply `toggle`.
///
/// Products outside the packable catalog are ignored and the maximum is
/// enforced while replaying the list.
#[must_use]
pub fn selection_from(pairs: &FormPairs, rules: &CustomPackRules, packable: &[Product]) -> Selection {
    let offered = |id: &ProductId| packable.iter().any(|p| p.id == *id);
    let max_items = usize::try_from(rules.max_items).unwrap_or(usize::MAX);
    let mut products = Vec::new();
    for id in pairs.all::<ProductId>("product").into_iter().filter(offered) {
        // Past the maximum the rest of a tampered list is dropped.
        if products.len() < max_items && !products.contains(&id) {
            products.push(id);
        }
    }

    let warning = pairs
        .all::<ProductId>("toggle")
        .into_iter()
        .find(offered)
        .and_then(|id| rules.toggle(&mut products, id).err())
        .map(|e| e.to_string());

    Selection { products, warning }
}

fn selection_query(products: &[ProductId]) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for id in products {
        query.append_pair("product", &id.to_string());
    }
    query.finish()
}

/// A product card in the builder grid.
pub struct CandidateView {
    pub product: Product,
    pub selected: bool,
    pub toggle_href: String,
}

/// Custom pack listing template.
#[derive(Template, WebTemplate)]
#[template(path = "custom_packs/index.html")]
pub struct CustomPacksIndexTemplate {
    pub page: PageContext,
    pub packs: Vec<CustomPack>,
}

/// Custom pack builder template.
#[derive(Template, WebTemplate)]
#[template(path = "custom_packs/show.html")]
pub struct CustomPackShowTemplate {
    pub page: PageContext,
    pub pack: CustomPack,
    pub pack_id: CustomPackId,
    pub candidates: Vec<CandidateView>,
    pub selected: Vec<ProductId>,
    pub selected_count: usize,
    /// Enough products are picked to order the pack.
    pub complete: bool,
    pub total: Price,
    pub warning: Option<String>,
}

/// Display every custom pack.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let (page, packs) = tokio::join!(
        PageContext::load(&state, &session, "Create Your Own Pack"),
        state.api().custom_packs()
    );
    Ok(CustomPacksIndexTemplate {
        page,
        packs: packs?,
    })
}

fn selected_prices(packable: &[Product], products: &[ProductId]) -> Vec<Price> {
    products
        .iter()
        .filter_map(|id| packable.iter().find(|p| p.id == *id))
        .map(Product::price)
        .collect()
}

/// Display the builder with the selection carried in the query string.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CustomPackId>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let (pack, packable) = tokio::join!(state.api().custom_pack(id), state.api().packable_products());
    let (pack, packable) = (pack?, packable?);
    let rules = pack.rules();

    let selection = selection_from(&FormPairs::from_query(query.as_deref()), &rules, &packable);
    let total = rules.price(&selected_prices(&packable, &selection.products));

    let candidates = packable
        .into_iter()
        .map(|product| {
            let mut toggled = selection.products.clone();
            // A refused toggle still links back to the page so the warning shows.
            let href_products = if rules.toggle(&mut toggled, product.id).is_ok() {
                selection_query(&toggled)
            } else {
                format!(
                    "{}&toggle={}",
                    selection_query(&selection.products),
                    product.id
                )
            };
            CandidateView {
                selected: selection.products.contains(&product.id),
                toggle_href: format!("/custom-packs/{id}?{href_products}"),
                product,
            }
        })
        .collect();

    let page = PageContext::load(&state, &session, pack.name.clone()).await;
    Ok(CustomPackShowTemplate {
        page,
        pack,
        pack_id: id,
        candidates,
        selected_count: selection.products.len(),
        complete: rules.validate(&selection.products).is_ok(),
        selected: selection.products,
        total,
        warning: selection.warning,
    })
}

/// Put every product of a finished custom pack in the cart.
#[instrument(skip(state, session, user, body))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<CustomPackId>,
    body: Bytes,
) -> Result<Response> {
    let (pack, packable) = tokio::join!(state.api().custom_pack(id), state.api().packable_products());
    let (pack, packable) = (pack?, packable?);
    let rules = pack.rules();
    let selection = selection_from(&FormPairs::parse(&body), &rules, &packable);
    let back = format!("/custom-packs/{id}?{}", selection_query(&selection.products));

    if let Err(e) = rules.validate(&selection.products) {
        set_flash(&session, Flash::error(e.to_string())).await?;
        return Ok(Redirect::to(&back).into_response());
    }

    match &user {
        Some(user) => {
            for product_id in &selection.products {
                if let Err(e) = state.api().add_to_cart(&user.token, *product_id, 1).await {
                    tracing::warn!(error = %e, product_id = %product_id, "Custom pack add to cart failed");
                    if !e.is_client_error() {
                        return Err(e.into());
                    }
                    set_flash(&session, Flash::error("Failed to add items to cart.")).await?;
                    return Ok(Redirect::to(&back).into_response());
                }
            }
        }
        None => {
            let mut cart = guest_cart(&session).await;
            for product in selection
                .products
                .iter()
                .filter_map(|pid| packable.iter().find(|p| p.id == *pid))
            {
                cart.add(GuestCartLine {
                    product_id: product.id,
                    name: product.name.clone(),
                    unit_price: product.price(),
                    quantity: 1,
                    image_url: product.first_image().map(str::to_string),
                    category_id: product.category_id,
                });
            }
            save_guest_cart(&session, &cart).await?;
        }
    }

    let custom_pack_id = id.to_string();
    add_breadcrumb(
        "cart",
        "Added custom pack to cart",
        Some(&[("custom_pack_id", custom_pack_id.as_str())]),
    );
    set_flash(&session, Flash::success("Custom pack added to cart!")).await?;
    Ok(Redirect::to("/cart").into_response())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use vitrine_core::custom_pack::Pricing;

    use super::*;

    fn packable() -> Vec<Product> {
        (1..=4)
            .map(|id| Product {
                id: ProductId::new(id),
                name: format!("Product {id}"),
                price: Decimal::from(10 * id),
                ..Product::default()
            })
            .collect()
    }

    fn rules() -> CustomPackRules {
        CustomPackRules {
            min_items: 2,
            max_items: 3,
            pricing: Pricing::Dynamic(Decimal::new(2, 1)),
        }
    }

    #[test]
    fn test_selection_ignores_unknown_and_duplicate_products() {
        let pairs = FormPairs::parse(b"product=1&product=1&product=99&product=2");
        let selection = selection_from(&pairs, &rules(), &packable());
        assert_eq!(selection.products, vec![ProductId::new(1), ProductId::new(2)]);
        assert_eq!(selection.warning, None);
    }

    #[test]
    fn test_replayed_selection_stops_at_maximum() {
        let pairs = FormPairs::parse(b"product=1&product=2&product=3&product=4");
        let selection = selection_from(&pairs, &rules(), &packable());
        assert_eq!(
            selection.products,
            vec![ProductId::new(1), ProductId::new(2), ProductId::new(3)]
        );
        assert_eq!(selection.warning, None);
    }

    #[test]
    fn test_toggle_removes_selected_product() {
        let pairs = FormPairs::parse(b"product=1&product=2&toggle=1");
        let selection = selection_from(&pairs, &rules(), &packable());
        assert_eq!(selection.products, vec![ProductId::new(2)]);
    }

    #[test]
    fn test_toggle_past_maximum_warns() {
        let pairs = FormPairs::parse(b"product=1&product=2&product=3&toggle=4");
        let selection = selection_from(&pairs, &rules(), &packable());
        assert_eq!(selection.products.len(), 3);
        assert_eq!(
            selection.warning.as_deref(),
            Some("You can select a maximum of 3 items.")
        );
    }

    #[test]
    fn test_dynamic_total() {
        let packable = packable();
        let products = [ProductId::new(1), ProductId::new(3)];
        let total = rules().price(&selected_prices(&packable, &products));
        assert_eq!(total, Price::from_cents(3200));
    }

    #[test]
    fn test_custom_pack_rules_from_wire() {
        let pack: CustomPack = serde_json::from_str(
            r#"{"id": 1, "name": "Trio", "minItems": 2, "maxItems": 3, "pricingType": "FIXED", "fixedPrice": 49.9}"#,
        )
        .unwrap_or_default();
        assert_eq!(pack.rules().pricing, Pricing::Fixed(Price::from_cents(4990)));
    }
}
