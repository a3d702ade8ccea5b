//! Coupon management and usage statistics.
//!
//! The create form posts `applicable_product_ids` and
//! `applicable_category_ids` once per ticked box, so it is read through
//! [`FormPairs`]. Leaving both empty makes the coupon apply to every product.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::{CouponId, CouponType, DiscountType};

use super::{AdminNav, SelectOption, admin_page, finish, reject};
use crate::api::{Coupon, CouponDailyUsage, CouponUsagePoint, parse_backend_datetime};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::checkout::coupon_label;
use crate::routes::forms::FormPairs;
use crate::state::AppState;
use crate::views::PageContext;

/// A coupon as listed.
pub struct CouponRow {
    pub coupon: Coupon,
    pub label: String,
    /// `used / limit`, with `∞` for unlimited coupons.
    pub usage: String,
    pub expired: bool,
}

impl CouponRow {
    fn new(coupon: Coupon, now: DateTime<Utc>) -> Self {
        let limit = if coupon.usage_limit == 0 {
            "∞".to_string()
        } else {
            coupon.usage_limit.to_string()
        };
        Self {
            label: coupon_label(&coupon),
            usage: format!("{} / {limit}", coupon.times_used),
            expired: coupon.expiry_date.is_some_and(|expiry| expiry < now),
            coupon,
        }
    }
}

/// One bar of a usage chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageBar {
    pub date: String,
    pub count: i64,
    /// Height relative to the busiest day, 0 to 100.
    pub percent: i64,
}

/// Scale daily counts against the busiest day.
fn usage_bars(points: impl IntoIterator<Item = (String, i64)>) -> Vec<UsageBar> {
    let points: Vec<_> = points.into_iter().collect();
    let peak = points.iter().map(|(_, count)| *count).max().unwrap_or(0).max(1);
    points
        .into_iter()
        .map(|(date, count)| UsageBar {
            percent: count.max(0) * 100 / peak,
            date,
            count,
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/coupons/index.html")]
pub struct CouponsTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub coupons: Vec<CouponRow>,
    pub usage: Vec<UsageBar>,
    pub discount_types: Vec<SelectOption>,
    pub coupon_types: Vec<SelectOption>,
    pub products: Vec<SelectOption>,
    pub categories: Vec<SelectOption>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/coupons/show.html")]
pub struct CouponUsageTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub coupon: CouponRow,
    pub usage: Vec<UsageBar>,
    pub total_uses: u64,
}

/// Validate the create form.
fn coupon_input(fields: &FormPairs) -> std::result::Result<Coupon, String> {
    let code = fields
        .get("code")
        .ok_or("Code is required.")?
        .to_ascii_uppercase();
    let discount_type: DiscountType = fields
        .get("discount_type")
        .and_then(|v| v.parse().ok())
        .ok_or("Choose a discount type.")?;
    let discount_value = match discount_type {
        DiscountType::FreeShipping => Decimal::ZERO,
        DiscountType::Percentage | DiscountType::FixedAmount => {
            let value: Decimal = fields
                .get("discount_value")
                .and_then(|v| v.parse().ok())
                .ok_or("Discount value is required.")?;
            if value <= Decimal::ZERO {
                return Err("Discount value must be positive.".to_string());
            }
            if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
                return Err("A percentage cannot exceed 100.".to_string());
            }
            value
        }
    };
    let expiry_date = match fields.get("expiry_date") {
        Some(raw) => Some(parse_backend_datetime(raw).ok_or("Expiry date is invalid.")?),
        None => None,
    };
    let min_purchase_amount = match fields.get("min_purchase_amount") {
        Some(raw) => Some(
            raw.parse::<Decimal>()
                .ok()
                .filter(|v| !v.is_sign_negative())
                .ok_or("Minimum purchase must be a positive amount.")?,
        ),
        None => None,
    };
    let usage_limit = match fields.get("usage_limit") {
        Some(raw) => raw.parse::<u32>().map_err(|_| "Usage limit must be a whole number.")?,
        None => 0,
    };

    Ok(Coupon {
        id: None,
        code,
        discount_value,
        discount_type,
        expiry_date,
        coupon_type: fields
            .get("coupon_type")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default(),
        min_purchase_amount,
        usage_limit,
        times_used: 0,
        first_time_only: fields.checked("first_time_only"),
        applicable_product_ids: fields.all("applicable_product_ids"),
        applicable_category_ids: fields.all("applicable_category_ids"),
    })
}

/// Coupons, the create form and usage across all coupons.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let api = state.api();
    let (coupons, usage, products, categories) = tokio::join!(
        api.coupons(&user.token),
        api.coupon_usage(&user.token),
        api.all_products(),
        api.categories(),
    );
    let usage = usage.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load coupon usage");
        Vec::new()
    });
    let now = Utc::now();

    Ok(CouponsTemplate {
        page: admin_page(&state, &session, "Coupons").await,
        nav: AdminNav::new("/admin/coupons"),
        coupons: coupons?
            .into_iter()
            .map(|c| CouponRow::new(c, now))
            .collect(),
        usage: usage_bars(
            usage
                .into_iter()
                .map(|CouponUsagePoint { date, count }| (date, count)),
        ),
        discount_types: DiscountType::ALL
            .iter()
            .map(|t| SelectOption::new(t.as_str(), t.label(), *t == DiscountType::default()))
            .collect(),
        coupon_types: CouponType::ALL
            .iter()
            .map(|t| SelectOption::new(t.as_str(), t.label(), *t == CouponType::default()))
            .collect(),
        products: products?
            .into_iter()
            .map(|p| SelectOption::new(p.id, p.name, false))
            .collect(),
        categories: categories?
            .into_iter()
            .map(|c| SelectOption::new(c.id, c.name, false))
            .collect(),
    })
}

/// Daily usage of one coupon.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<CouponId>,
) -> Result<impl IntoResponse> {
    let (coupons, usage) = tokio::join!(
        state.api().coupons(&user.token),
        state.api().coupon_usage_by_id(&user.token, id),
    );
    let coupon = coupons?
        .into_iter()
        .find(|c| c.id == Some(id))
        .ok_or_else(|| AppError::NotFound(format!("coupon {id}")))?;
    let mut usage = usage?;
    usage.sort_by_key(|day| day.date);
    let total_uses = usage.iter().map(|day| u64::from(day.usage_count)).sum();

    Ok(CouponUsageTemplate {
        page: admin_page(&state, &session, &format!("Coupon {}", coupon.code)).await,
        nav: AdminNav::new("/admin/coupons"),
        coupon: CouponRow::new(coupon, Utc::now()),
        usage: usage_bars(usage.into_iter().map(
            |CouponDailyUsage {
                 date, usage_count, ..
             }| {
                (
                    date.map(|d| d.to_string()).unwrap_or_default(),
                    i64::from(usage_count),
                )
            },
        )),
        total_uses,
    })
}

#[instrument(skip(state, session, user, body))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    body: Bytes,
) -> Result<Response> {
    let input = match coupon_input(&FormPairs::parse(&body)) {
        Ok(input) => input,
        Err(message) => return reject(&session, message, "/admin/coupons").await,
    };
    let outcome = state.api().create_coupon(&user.token, &input).await;
    let message = format!("Coupon {} created.", input.code);
    finish(&session, outcome, &message, "/admin/coupons").await
}

#[instrument(skip(state, session, user))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<CouponId>,
) -> Result<Response> {
    let outcome = state.api().delete_coupon(&user.token, id).await;
    finish(&session, outcome, "Coupon deleted.", "/admin/coupons").await
}
