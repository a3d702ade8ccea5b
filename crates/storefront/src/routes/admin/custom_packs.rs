//! Custom pack management.
//!
//! The discount rate is entered as a percentage and stored as a fraction.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::{CustomPackId, PricingType};

use super::{AdminNav, SelectOption, admin_page, finish, reject};
use crate::api::CustomPack;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::forms::FormPairs;
use crate::state::AppState;
use crate::views::PageContext;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Template, WebTemplate)]
#[template(path = "admin/custom_packs/index.html")]
pub struct CustomPacksIndexTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub packs: Vec<CustomPack>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/custom_packs/form.html")]
pub struct CustomPackFormTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub pack: CustomPack,
    pub is_new: bool,
    pub action: String,
    pub pricing_types: Vec<SelectOption>,
    /// Fixed price as typed in the form, blank when unset.
    pub fixed_price: String,
    /// Discount rate as a percentage, blank when unset.
    pub discount_percent: String,
}

impl CustomPackFormTemplate {
    fn new(page: PageContext, pack: CustomPack, action: String) -> Self {
        Self {
            page,
            nav: AdminNav::new("/admin/custom-packs"),
            is_new: pack.id.is_none(),
            action,
            pricing_types: PricingType::ALL
                .iter()
                .map(|t| SelectOption::new(t.as_str(), t.label(), *t == pack.pricing_type))
                .collect(),
            fixed_price: pack.fixed_price.map(|p| p.to_string()).unwrap_or_default(),
            discount_percent: pack
                .discount_rate
                .map(|r| (r * HUNDRED).normalize().to_string())
                .unwrap_or_default(),
            pack,
        }
    }
}

/// Validate a submitted form into the backend's shape.
fn custom_pack_input(fields: &FormPairs) -> std::result::Result<CustomPack, String> {
    let name = fields.get("name").ok_or("Name is required.")?.to_string();
    let min_items: u32 = fields
        .get("min_items")
        .and_then(|v| v.parse().ok())
        .ok_or("Minimum items must be a whole number.")?;
    let max_items: u32 = fields
        .get("max_items")
        .and_then(|v| v.parse().ok())
        .ok_or("Maximum items must be a whole number.")?;
    if min_items == 0 {
        return Err("Minimum items must be at least 1.".to_string());
    }
    if min_items > max_items {
        return Err("Minimum items cannot exceed maximum items.".to_string());
    }
    let pricing_type: PricingType = fields
        .get("pricing_type")
        .and_then(|v| v.parse().ok())
        .ok_or("Choose a pricing type.")?;

    let (fixed_price, discount_rate) = match pricing_type {
        PricingType::Fixed => {
            let price: Decimal = fields
                .get("fixed_price")
                .and_then(|v| v.parse().ok())
                .ok_or("A fixed price is required.")?;
            if price.is_sign_negative() {
                return Err("Price cannot be negative.".to_string());
            }
            (Some(price), None)
        }
        PricingType::Dynamic => {
            let percent: Decimal = fields
                .get("discount_percent")
                .and_then(|v| v.parse().ok())
                .ok_or("A discount rate is required.")?;
            if percent.is_sign_negative() || percent > HUNDRED {
                return Err("Discount rate must be between 0 and 100.".to_string());
            }
            (None, Some(percent / HUNDRED))
        }
    };

    Ok(CustomPack {
        id: None,
        name,
        description: fields.get("description").unwrap_or_default().to_string(),
        min_items,
        max_items,
        pricing_type,
        fixed_price,
        discount_rate,
    })
}

#[instrument(skip(state, session, _user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let packs = state.api().custom_packs().await?;
    Ok(CustomPacksIndexTemplate {
        page: admin_page(&state, &session, "Custom packs").await,
        nav: AdminNav::new("/admin/custom-packs"),
        packs,
    })
}

#[instrument(skip(state, session, _user))]
pub async fn new_custom_pack(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> impl IntoResponse {
    CustomPackFormTemplate::new(
        admin_page(&state, &session, "New custom pack").await,
        CustomPack::default(),
        "/admin/custom-packs".to_string(),
    )
}

#[instrument(skip(state, session, _user))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
    Path(id): Path<CustomPackId>,
) -> Result<impl IntoResponse> {
    let pack = state.api().custom_pack(id).await?;
    Ok(CustomPackFormTemplate::new(
        admin_page(&state, &session, &format!("Edit {}", pack.name)).await,
        pack,
        format!("/admin/custom-packs/{id}"),
    ))
}

#[instrument(skip(state, session, user, body))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    body: Bytes,
) -> Result<Response> {
    let input = match custom_pack_input(&FormPairs::parse(&body)) {
        Ok(input) => input,
        Err(message) => return reject(&session, message, "/admin/custom-packs/new").await,
    };
    let outcome = state.api().create_custom_pack(&user.token, &input).await;
    finish(&session, outcome, "Custom pack created.", "/admin/custom-packs").await
}

#[instrument(skip(state, session, user, body))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<CustomPackId>,
    body: Bytes,
) -> Result<Response> {
    let mut input = match custom_pack_input(&FormPairs::parse(&body)) {
        Ok(input) => input,
        Err(message) => {
            return reject(&session, message, &format!("/admin/custom-packs/{id}/edit")).await;
        }
    };
    input.id = Some(id);
    let outcome = state.api().update_custom_pack(&user.token, id, &input).await;
    finish(&session, outcome, "Custom pack updated.", "/admin/custom-packs").await
}

#[instrument(skip(state, session, user))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<CustomPackId>,
) -> Result<Response> {
    let outcome = state.api().delete_custom_pack(&user.token, id).await;
    finish(&session, outcome, "Custom pack deleted.", "/admin/custom-packs").await
}
