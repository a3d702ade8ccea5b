//! Pack pages: listing, per-slot customisation, composite image, add to cart.
//!
//! The current selection travels in the query string (`item_<slot>=<product>`)
//! so a customised pack is a plain link that can be reloaded or shared.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::pack::{
    CompositeLayout, ImageSize, PackConfigurator, PackOption, PackSelection, PackSlot,
    composite_layout,
};
use vitrine_core::{PackId, PackItemId, Price, ProductId};

use crate::api::{Pack, Product};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::models::session::{guest_cart, save_guest_cart, set_flash};
use crate::models::{Flash, GuestCartLine};
use crate::routes::forms::{FormPairs, PACK_SLOT_PREFIX};
use crate::state::AppState;
use crate::views::PageContext;

/// Height of each tile in the composite image.
pub const COMPOSITE_TILE_SIZE: u32 = 300;

/// Placeholder drawn for products without an image.
pub const PLACEHOLDER_IMAGE: &str = "/static/img/placeholder.svg";

/// Build the pricing model of a pack. Slots without a default product are skipped.
#[must_use]
pub fn configurator(pack: &Pack) -> PackConfigurator {
    let slots = pack
        .items
        .iter()
        .filter_map(|item| {
            let default = item.default_product.as_ref()?;
            Some(PackSlot {
                item_id: item.id,
                default: option(default),
                variations: item.variation_products.iter().map(option).collect(),
            })
        })
        .collect();
    PackConfigurator::new(pack.price(), slots)
}

fn option(product: &Product) -> PackOption {
    PackOption {
        product_id: product.id,
        price: product.price(),
    }
}

/// Find a product offered anywhere in the pack.
fn pack_product(pack: &Pack, id: ProductId) -> Option<&Product> {
    pack.items.iter().find_map(|item| {
        item.default_product
            .iter()
            .chain(item.variation_products.iter())
            .find(|p| p.id == id)
    })
}

/// One choice inside a slot.
pub struct OptionView {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image_url: String,
    pub is_default: bool,
    pub selected: bool,
}

/// A slot with its choices.
pub struct SlotView {
    pub item_id: PackItemId,
    pub field: String,
    pub title: String,
    pub options: Vec<OptionView>,
}

fn slot_views(pack: &Pack, selection: &PackSelection) -> Vec<SlotView> {
    pack.items
        .iter()
        .filter_map(|item| {
            let default = item.default_product.as_ref()?;
            let chosen = selection.chosen(item.id).unwrap_or(default.id);
            let options = std::iter::once((default, true))
                .chain(item.variation_products.iter().map(|p| (p, false)))
                .map(|(product, is_default)| OptionView {
                    product_id: product.id,
                    name: product.name.clone(),
                    price: product.price(),
                    image_url: product
                        .first_image()
                        .unwrap_or(PLACEHOLDER_IMAGE)
                        .to_string(),
                    is_default,
                    selected: product.id == chosen,
                })
                .collect();
            Some(SlotView {
                item_id: item.id,
                field: format!("{PACK_SLOT_PREFIX}{}", item.id),
                title: default.name.clone(),
                options,
            })
        })
        .collect()
}

/// Query string describing a selection.
fn selection_query(selection: &PackSelection) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (item, product) in selection.iter() {
        query.append_pair(&format!("{PACK_SLOT_PREFIX}{item}"), &product.to_string());
    }
    query.finish()
}

/// Packs listing template.
#[derive(Template, WebTemplate)]
#[template(path = "packs/index.html")]
pub struct PacksIndexTemplate {
    pub page: PageContext,
    pub packs: Vec<Pack>,
}

/// Pack detail template.
#[derive(Template, WebTemplate)]
#[template(path = "packs/show.html")]
pub struct PackShowTemplate {
    pub page: PageContext,
    pub pack: Pack,
    pub slots: Vec<SlotView>,
    pub price: Price,
    pub base_price: Price,
    pub composite_url: String,
    pub selection_error: Option<String>,
}

/// Composite image template (SVG).
#[derive(Template)]
#[template(path = "packs/composite.svg", escape = "html")]
pub struct CompositeTemplate {
    pub title: String,
    pub layout: CompositeLayout,
    pub images: Vec<String>,
}

impl CompositeTemplate {
    /// Tiles paired with their image URLs.
    #[must_use]
    pub fn placed(&self) -> Vec<(u32, u32, &str)> {
        self.layout
            .tiles
            .iter()
            .zip(&self.images)
            .map(|(tile, href)| (tile.x, tile.width, href.as_str()))
            .collect()
    }
}

/// Display every pack.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let (page, packs) = tokio::join!(
        PageContext::load(&state, &session, "Packs"),
        state.api().packs()
    );
    Ok(PacksIndexTemplate {
        page,
        packs: packs?,
    })
}

/// Display a pack with the selection from the query string.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<PackId>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let pack = state.api().pack(id).await?;
    let config = configurator(&pack);

    let (selection, selection_error) =
        match config.selection_from(FormPairs::from_query(query.as_deref()).pack_slots()) {
            Ok(selection) => (selection, None),
            Err(e) => (config.default_selection(), Some(e.to_string())),
        };

    let page = PageContext::load(&state, &session, pack.name.clone()).await;
    Ok(PackShowTemplate {
        slots: slot_views(&pack, &selection),
        price: config.price(&selection),
        base_price: pack.price(),
        composite_url: format!("/packs/{id}/composite.svg?{}", selection_query(&selection)),
        selection_error,
        page,
        pack,
    })
}

/// Source sizes for the composite strip.
///
/// Images whose size is unknown are drawn as squares at the height of the
/// first known image, or at [`COMPOSITE_TILE_SIZE`] when none is known.
fn tile_sizes(known: &[Option<ImageSize>]) -> Vec<ImageSize> {
    let height = known
        .iter()
        .flatten()
        .next()
        .map_or(COMPOSITE_TILE_SIZE, |size| size.height);
    known
        .iter()
        .map(|size| {
            size.unwrap_or(ImageSize {
                width: height,
                height,
            })
        })
        .collect()
}

/// Render the selected products side by side as one SVG.
#[instrument(skip(state))]
pub async fn composite(
    State(state): State<AppState>,
    Path(id): Path<PackId>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let pack = state.api().pack(id).await?;
    let config = configurator(&pack);
    let selection = config
        .selection_from(FormPairs::from_query(query.as_deref()).pack_slots())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let images: Vec<String> = config
        .products(&selection)
        .into_iter()
        .map(|product_id| {
            pack_product(&pack, product_id)
                .and_then(Product::first_image)
                .unwrap_or(PLACEHOLDER_IMAGE)
                .to_string()
        })
        .collect();

    let api = state.api();
    let known = futures::future::join_all(images.iter().map(|src| async move {
        if src == PLACEHOLDER_IMAGE {
            None
        } else {
            api.image_size(src).await
        }
    }))
    .await;
    let layout = composite_layout(&tile_sizes(&known), None)
        .filter(|layout| !layout.tiles.is_empty())
        .ok_or_else(|| AppError::NotFound(format!("pack {id} has no products")))?;

    let svg = CompositeTemplate {
        title: pack.name,
        layout,
        images,
    }
    .render()
    .map_err(|e| AppError::Internal(format!("composite render failed: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        svg,
    )
        .into_response())
}

/// Put every selected product of the pack in the cart.
#[instrument(skip(state, session, user, body))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<PackId>,
    body: Bytes,
) -> Result<Response> {
    let pack = state.api().pack(id).await?;
    let config = configurator(&pack);
    let selection = match config.selection_from(FormPairs::parse(&body).pack_slots()) {
        Ok(selection) => selection,
        Err(e) => {
            set_flash(&session, Flash::error(e.to_string())).await?;
            return Ok(Redirect::to(&format!("/packs/{id}")).into_response());
        }
    };
    let products = config.products(&selection);

    match &user {
        Some(user) => {
            for product_id in &products {
                if let Err(e) = state.api().add_to_cart(&user.token, *product_id, 1).await {
                    if !e.is_client_error() {
                        return Err(e.into());
                    }
                    set_flash(&session, Flash::error(e.user_message())).await?;
                    return Ok(
                        Redirect::to(&format!("/packs/{id}?{}", selection_query(&selection)))
                            .into_response(),
                    );
                }
            }
        }
        None => {
            let mut cart = guest_cart(&session).await;
            for product in products.iter().filter_map(|pid| pack_product(&pack, *pid)) {
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

    let pack_id = id.to_string();
    add_breadcrumb("cart", "Added pack to cart", Some(&[("pack_id", pack_id.as_str())]));
    set_flash(
        &session,
        Flash::success("All selected pack items have been added to your cart!"),
    )
    .await?;
    Ok(Redirect::to("/cart").into_response())
}

/// Make the current selection the pack's defaults (admins only).
#[instrument(skip(state, session, admin, body))]
pub async fn save_defaults(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<PackId>,
    body: Bytes,
) -> Result<Response> {
    let pack = state.api().pack(id).await?;
    let config = configurator(&pack);
    let selection = config
        .selection_from(FormPairs::parse(&body).pack_slots())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut changed = 0_u32;
    for slot in config.slots() {
        let Some(chosen) = selection.chosen(slot.item_id) else {
            continue;
        };
        if chosen == slot.default.product_id {
            continue;
        }
        state
            .api()
            .update_pack_default_product(&admin.token, id, slot.item_id, chosen)
            .await?;
        changed += 1;
    }

    let message = if changed == 0 {
        Flash::info("The selection already matches the pack defaults.")
    } else {
        Flash::success(format!("Updated {changed} default product(s)."))
    };
    set_flash(&session, message).await?;
    Ok(Redirect::to(&format!("/packs/{id}")).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::api::PackItem;

    fn product(id: i64, price: i64, image: Option<&str>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::from(price),
            images: image.map(|i| vec![i.to_string()]).unwrap_or_default(),
            ..Product::default()
        }
    }

    fn pack() -> Pack {
        Pack {
            id: PackId::new(1),
            name: "Glow kit".to_string(),
            description: String::new(),
            price: Decimal::from(100),
            image_url: None,
            items: vec![
                PackItem {
                    id: PackItemId::new(10),
                    default_product: Some(product(1, 40, Some("https://cdn.example/1.jpg"))),
                    variation_products: vec![product(2, 55, None)],
                },
                PackItem {
                    id: PackItemId::new(11),
                    default_product: Some(product(3, 60, None)),
                    variation_products: Vec::new(),
                },
                PackItem {
                    id: PackItemId::new(12),
                    default_product: None,
                    variation_products: vec![product(9, 5, None)],
                },
            ],
        }
    }

    #[test]
    fn test_configurator_skips_slots_without_default() {
        let config = configurator(&pack());
        assert_eq!(config.slots().len(), 2);
        assert_eq!(config.price(&config.default_selection()), Price::from_cents(10_000));
    }

    #[test]
    fn test_swapping_adjusts_price() {
        let config = configurator(&pack());
        let selection = config
            .selection_from([(PackItemId::new(10), ProductId::new(2))])
            .unwrap();
        assert_eq!(config.price(&selection), Price::from_cents(11_500));
        assert_eq!(selection_query(&selection), "item_10=2&item_11=3");
    }

    #[test]
    fn test_slot_views_mark_selection() {
        let pack = pack();
        let config = configurator(&pack);
        let selection = config
            .selection_from([(PackItemId::new(10), ProductId::new(2))])
            .unwrap();
        let slots = slot_views(&pack, &selection);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].field, "item_10");
        assert!(!slots[0].options[0].selected);
        assert!(slots[0].options[1].selected);
        assert_eq!(slots[0].options[1].image_url, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_unknown_sizes_become_squares_at_first_known_height() {
        let wide = ImageSize {
            width: 800,
            height: 400,
        };
        let sizes = tile_sizes(&[None, Some(wide), None]);
        assert_eq!(
            sizes,
            vec![
                ImageSize {
                    width: 400,
                    height: 400
                },
                wide,
                ImageSize {
                    width: 400,
                    height: 400
                },
            ]
        );
        let layout = composite_layout(&sizes, None).unwrap();
        assert_eq!(layout.width, 1600);

        let fallback = tile_sizes(&[None]);
        assert_eq!(fallback[0].height, COMPOSITE_TILE_SIZE);
    }

    #[test]
    fn test_composite_svg_places_tiles() {
        let template = CompositeTemplate {
            title: "Glow <kit>".to_string(),
            layout: composite_layout(
                &[
                    ImageSize {
                        width: COMPOSITE_TILE_SIZE,
                        height: COMPOSITE_TILE_SIZE,
                    };
                    2
                ],
                Some(COMPOSITE_TILE_SIZE),
            )
            .unwrap(),
            images: vec!["https://cdn.example/1.jpg".to_string(), PLACEHOLDER_IMAGE.to_string()],
        };
        let svg = template.render().unwrap();
        assert!(svg.contains(r#"width="600""#));
        assert!(svg.contains(r#"x="300""#));
        assert!(svg.contains("Glow &#60;kit&#62;") || svg.contains("Glow &lt;kit&gt;"));
    }
}
