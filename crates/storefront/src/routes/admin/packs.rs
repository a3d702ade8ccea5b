//! Pack management.
//!
//! The pack form has a fixed number of slot rows. Row `n` posts
//! `slot_<n>_default` (one product) and `slot_<n>_variations` (repeated);
//! rows without a default product are ignored.

use std::collections::BTreeSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::{PackId, ProductId};

use super::{AdminNav, SelectOption, admin_page, finish, reject};
use crate::api::{Pack, PackInput, PackItemInput, Product};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::forms::{FormPairs, MultipartForm};
use crate::state::AppState;
use crate::views::PageContext;

/// Slot rows shown on the pack form.
pub const MAX_PACK_SLOTS: usize = 6;

#[derive(Template, WebTemplate)]
#[template(path = "admin/packs/index.html")]
pub struct PacksIndexTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub packs: Vec<Pack>,
}

/// One slot row of the form.
pub struct SlotRow {
    pub index: usize,
    pub defaults: Vec<SelectOption>,
    pub variations: Vec<SelectOption>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/packs/form.html")]
pub struct PackFormTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    /// Blank for the create form.
    pub pack: Pack,
    pub is_new: bool,
    pub action: String,
    pub slots: Vec<SlotRow>,
}

impl PackFormTemplate {
    fn new(page: PageContext, pack: Pack, action: String, products: &[Product]) -> Self {
        let slots = (0..MAX_PACK_SLOTS)
            .map(|index| {
                let item = pack.items.get(index);
                let default = item.and_then(|i| i.default_product.as_ref()).map(|p| p.id);
                let variations: BTreeSet<ProductId> = item
                    .map(|i| i.variation_products.iter().map(|p| p.id).collect())
                    .unwrap_or_default();
                SlotRow {
                    index,
                    defaults: products
                        .iter()
                        .map(|p| SelectOption::new(p.id, p.name.clone(), default == Some(p.id)))
                        .collect(),
                    variations: products
                        .iter()
                        .map(|p| SelectOption::new(p.id, p.name.clone(), variations.contains(&p.id)))
                        .collect(),
                }
            })
            .collect();
        Self {
            page,
            nav: AdminNav::new("/admin/packs"),
            is_new: pack.id == PackId::default(),
            action,
            slots,
            pack,
        }
    }
}

/// Slot rows of a submitted form, in row order.
fn pack_items(fields: &FormPairs) -> Vec<PackItemInput> {
    (0..MAX_PACK_SLOTS)
        .filter_map(|n| {
            let default_product_id: ProductId =
                fields.get(&format!("slot_{n}_default"))?.parse().ok()?;
            let mut seen = BTreeSet::from([default_product_id]);
            let variation_product_ids = fields
                .all::<ProductId>(&format!("slot_{n}_variations"))
                .into_iter()
                .filter(|id| seen.insert(*id))
                .collect();
            Some(PackItemInput {
                default_product_id,
                variation_product_ids,
            })
        })
        .collect()
}

fn pack_input(form: &MultipartForm) -> std::result::Result<PackInput, AppError> {
    let price: Decimal = form.parse("price")?;
    if price.is_sign_negative() {
        return Err(AppError::BadRequest("Price cannot be negative.".to_string()));
    }
    let items = pack_items(&form.fields);
    if items.is_empty() {
        return Err(AppError::BadRequest(
            "Choose a default product for at least one item.".to_string(),
        ));
    }
    Ok(PackInput {
        name: form.required("name")?,
        description: form.fields.get("description").unwrap_or_default().to_string(),
        price,
        items,
    })
}

#[instrument(skip(state, session, _user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let packs = state.api().packs().await?;
    Ok(PacksIndexTemplate {
        page: admin_page(&state, &session, "Packs").await,
        nav: AdminNav::new("/admin/packs"),
        packs,
    })
}

#[instrument(skip(state, session, _user))]
pub async fn new_pack(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let products = state.api().all_products().await?;
    Ok(PackFormTemplate::new(
        admin_page(&state, &session, "New pack").await,
        Pack::default(),
        "/admin/packs".to_string(),
        &products,
    ))
}

#[instrument(skip(state, session, _user))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
    Path(id): Path<PackId>,
) -> Result<impl IntoResponse> {
    let (pack, products) = tokio::join!(state.api().pack(id), state.api().all_products());
    let (pack, products) = (pack?, products?);
    Ok(PackFormTemplate::new(
        admin_page(&state, &session, &format!("Edit {}", pack.name)).await,
        pack,
        format!("/admin/packs/{id}"),
        &products,
    ))
}

#[instrument(skip(state, session, user, multipart))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let input = match pack_input(&form) {
        Ok(input) => input,
        Err(e) => return reject(&session, e.user_message(), "/admin/packs/new").await,
    };
    let image = form.take_files("image").into_iter().next();
    let outcome = state.api().create_pack(&user.token, &input, image).await;
    finish(&session, outcome, "Pack created.", "/admin/packs").await
}

#[instrument(skip(state, session, user, multipart))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<PackId>,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let input = match pack_input(&form) {
        Ok(input) => input,
        Err(e) => {
            return reject(&session, e.user_message(), &format!("/admin/packs/{id}/edit")).await;
        }
    };
    let image = form.take_files("image").into_iter().next();
    let outcome = state.api().update_pack(&user.token, id, &input, image).await;
    finish(&session, outcome, "Pack updated.", "/admin/packs").await
}

#[instrument(skip(state, session, user))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<PackId>,
) -> Result<Response> {
    let outcome = state.api().delete_pack(&user.token, id).await;
    finish(&session, outcome, "Pack deleted.", "/admin/packs").await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::PackItem;

    fn product(id: i64, name: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            ..Product::default()
        }
    }

    #[test]
    fn test_pack_items_skip_blank_rows_and_duplicates() {
        let fields = FormPairs::parse(
            b"slot_0_default=1&slot_0_variations=2&slot_0_variations=1&slot_0_variations=2\
              &slot_1_default=&slot_1_variations=5\
              &slot_2_default=3",
        );
        assert_eq!(
            pack_items(&fields),
            vec![
                PackItemInput {
                    default_product_id: ProductId::new(1),
                    variation_product_ids: vec![ProductId::new(2)],
                },
                PackItemInput {
                    default_product_id: ProductId::new(3),
                    variation_product_ids: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn test_pack_input_needs_an_item() {
        let form = MultipartForm {
            fields: FormPairs::parse(b"name=Duo&price=30"),
            files: Vec::new(),
        };
        assert!(matches!(pack_input(&form), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_form_prefills_existing_slots() {
        let pack = Pack {
            id: PackId::new(4),
            items: vec![PackItem {
                default_product: Some(product(1, "Rose")),
                variation_products: vec![product(2, "Jasmine")],
                ..PackItem::default()
            }],
            ..Pack::default()
        };
        let products = [product(1, "Rose"), product(2, "Jasmine")];
        let form = PackFormTemplate::new(
            PageContext::default(),
            pack,
            "/admin/packs/4".to_string(),
            &products,
        );
        assert!(!form.is_new);
        assert_eq!(form.slots.len(), MAX_PACK_SLOTS);
        let first = form.slots.first().unwrap();
        assert!(first.defaults.iter().any(|o| o.selected && o.value == "1"));
        assert!(first.variations.iter().any(|o| o.selected && o.value == "2"));
        assert!(form.slots.get(1).unwrap().defaults.iter().all(|o| !o.selected));
    }
}
