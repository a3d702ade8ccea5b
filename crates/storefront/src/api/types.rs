//! Backend wire types.
//!
//! Mirrors the JSON the REST backend exchanges. Every response struct is
//! lenient (`#[serde(default)]`) since the backend omits nulls and some
//! fields only exist on newer deployments.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vitrine_core::coupon::CouponRules;
use vitrine_core::custom_pack::{CustomPackRules, Pricing};
use vitrine_core::promo::{
    AnimationType, DEFAULT_BANNER_BACKGROUND, DEFAULT_BANNER_TEXT, DEFAULT_COUNTDOWN_BACKGROUND,
    DEFAULT_COUNTDOWN_TEXT,
};
use vitrine_core::variant::{ProductVariant, VariantType};
use vitrine_core::{
    CartItemId, CategoryId, CommentId, CouponId, CouponType, CustomPackId, DiscountType, OrderId,
    OrderItemId, OrderStatus, PackId, PackItemId, Price, PricingType, ProductId, ProductType,
    ReviewId, UserId, UserRole,
};

// =============================================================================
// Paging
// =============================================================================

/// A page of results in the backend's paging envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_pages: u32,
    pub total_elements: u64,
    /// Zero-based page index.
    pub number: u32,
    pub size: u32,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            total_pages: 0,
            total_elements: 0,
            number: 0,
            size: 0,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub images: Vec<String>,
    pub comments: Vec<Comment>,
    pub brand: Option<String>,
    pub bestseller: bool,
    pub new_arrival: bool,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
    pub variant_types: Vec<VariantType>,
    pub variants: Vec<ProductVariant>,
}

impl Product {
    #[must_use]
    pub fn price(&self) -> Price {
        Price::new(self.price)
    }

    #[must_use]
    pub fn first_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// JSON part of the product create/update multipart request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i32,
    pub brand: Option<String>,
    pub bestseller: bool,
    pub new_arrival: bool,
    pub category_id: CategoryId,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    /// Existing image URLs to keep on update.
    pub images: Vec<String>,
    /// Empty when the product has no variants.
    pub variant_types: Vec<VariantType>,
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub id: Option<CommentId>,
    pub content: String,
    pub score: Option<u8>,
    pub user_full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentInput {
    pub content: String,
    pub score: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
}

/// Products listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Zero-based page index.
    pub page: u32,
    pub size: Option<u32>,
    /// Sort expression, e.g. `price,asc`.
    pub sort: Option<String>,
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub brand: Option<String>,
    pub product_type: Option<ProductType>,
}

impl ProductQuery {
    /// Query string pairs, skipping unset filters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string())];
        if let Some(size) = self.size {
            pairs.push(("size", size.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(category_id) = self.category_id {
            pairs.push(("categoryId", category_id.to_string()));
        }
        if let Some(min_price) = self.min_price {
            pairs.push(("minPrice", min_price.to_string()));
        }
        if let Some(max_price) = self.max_price {
            pairs.push(("maxPrice", max_price.to_string()));
        }
        if let Some(brand) = self.brand.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("brand", brand.to_string()));
        }
        if let Some(product_type) = self.product_type {
            pairs.push(("type", product_type.as_str().to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hero {
    pub title: String,
    pub subtitle: String,
    pub link_text: String,
    pub link_url: String,
    pub image_url: Option<String>,
}

// =============================================================================
// Packs
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pack {
    pub id: PackId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub items: Vec<PackItem>,
}

impl Pack {
    #[must_use]
    pub fn price(&self) -> Price {
        Price::new(self.price)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackItem {
    pub id: PackItemId,
    pub default_product: Option<Product>,
    pub variation_products: Vec<Product>,
}

/// JSON part of the pack create/update multipart request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackInput {
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub items: Vec<PackItemInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackItemInput {
    pub default_product_id: ProductId,
    pub variation_product_ids: Vec<ProductId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomPack {
    pub id: Option<CustomPackId>,
    pub name: String,
    pub description: String,
    pub min_items: u32,
    pub max_items: u32,
    pub pricing_type: PricingType,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub fixed_price: Option<Decimal>,
    /// Fraction off the subtotal for dynamic packs (`0.2` is 20%).
    #[serde(with = "rust_decimal::serde::float_option")]
    pub discount_rate: Option<Decimal>,
}

impl CustomPack {
    /// Selection bounds and pricing for the builder page.
    #[must_use]
    pub fn rules(&self) -> CustomPackRules {
        let pricing = match self.pricing_type {
            PricingType::Fixed => Pricing::Fixed(Price::new(self.fixed_price.unwrap_or_default())),
            PricingType::Dynamic => Pricing::Dynamic(self.discount_rate.unwrap_or_default()),
        };
        CustomPackRules {
            min_items: self.min_items,
            max_items: self.max_items,
            pricing,
        }
    }
}

// =============================================================================
// Cart & orders
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cart {
    pub id: Option<i64>,
    pub items: Vec<CartItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartItem {
    pub id: Option<CartItemId>,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(alias = "image")]
    pub image_url: Option<String>,
}

/// The four delivery fields every order needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
    pub client_full_name: String,
    pub city: String,
    pub address: String,
    pub phone_number: String,
}

impl DeliveryDetails {
    /// Whether every field holds something other than whitespace.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.client_full_name,
            &self.city,
            &self.address,
            &self.phone_number,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestOrderRequest {
    #[serde(flatten)]
    pub delivery: DeliveryDetails,
    pub email: String,
    pub coupon_code: Option<String>,
    pub cart_items: Vec<GuestCartItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub client_full_name: String,
    pub city: String,
    pub address: String,
    pub phone_number: String,
    pub status: OrderStatus,
    #[serde(with = "backend_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    pub order_items: Vec<OrderItem>,
    pub discount_amount: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
    pub coupon_code: Option<String>,
}

impl Order {
    /// Sum of the order's lines.
    #[must_use]
    pub fn items_total(&self) -> Price {
        self.order_items
            .iter()
            .map(|item| Price::new(item.price).times(item.quantity))
            .sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderItem {
    pub id: Option<OrderItemId>,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Decimal,
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Coupon {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<CouponId>,
    pub code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_value: Decimal,
    pub discount_type: DiscountType,
    #[serde(with = "backend_datetime")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub min_purchase_amount: Option<Decimal>,
    pub usage_limit: u32,
    pub times_used: u32,
    pub first_time_only: bool,
    pub applicable_product_ids: Vec<ProductId>,
    pub applicable_category_ids: Vec<CategoryId>,
}

impl Coupon {
    /// The eligibility rules used for checkout previews.
    #[must_use]
    pub fn rules(&self) -> CouponRules {
        CouponRules {
            code: self.code.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            expires_at: self.expiry_date,
            min_purchase: self.min_purchase_amount.map(Price::new),
            usage_limit: self.usage_limit,
            times_used: self.times_used,
            first_time_only: self.first_time_only,
            applicable_products: self.applicable_product_ids.clone(),
            applicable_categories: self.applicable_category_ids.clone(),
        }
    }
}

/// Coupon uses per day across all coupons.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CouponUsagePoint {
    #[serde(alias = "day")]
    pub date: String,
    #[serde(alias = "usageCount", alias = "usage_count")]
    pub count: i64,
}

/// Uses of a single coupon on one day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CouponDailyUsage {
    pub coupon_id: Option<CouponId>,
    pub date: Option<NaiveDate>,
    pub usage_count: u32,
}

// =============================================================================
// Users & auth
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub email_confirmation: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "accessToken", alias = "jwt")]
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Review {
    pub id: ReviewId,
    pub content: String,
    pub rating: u8,
    pub user_email: Option<String>,
    pub user_full_name: Option<String>,
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewInput {
    pub content: String,
    pub rating: u8,
}

// =============================================================================
// Storefront widgets & settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Announcement {
    pub text: String,
    pub background_color: String,
    pub text_color: String,
    pub enabled: bool,
    pub animation_type: AnimationType,
}

impl Default for Announcement {
    fn default() -> Self {
        Self {
            text: String::new(),
            background_color: DEFAULT_BANNER_BACKGROUND.to_string(),
            text_color: DEFAULT_BANNER_TEXT.to_string(),
            enabled: false,
            animation_type: AnimationType::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Countdown {
    pub title: String,
    #[serde(with = "backend_datetime")]
    pub end_date: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub background_color: String,
    pub text_color: String,
}

impl Default for Countdown {
    fn default() -> Self {
        Self {
            title: String::new(),
            end_date: None,
            enabled: false,
            background_color: DEFAULT_COUNTDOWN_BACKGROUND.to_string(),
            text_color: DEFAULT_COUNTDOWN_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorCounterSettings {
    pub enabled: bool,
    pub min: u32,
    pub max: u32,
}

impl Default for VisitorCounterSettings {
    fn default() -> Self {
        vitrine_core::promo::VisitorCounterSettings::default().into()
    }
}

impl From<vitrine_core::promo::VisitorCounterSettings> for VisitorCounterSettings {
    fn from(settings: vitrine_core::promo::VisitorCounterSettings) -> Self {
        Self {
            enabled: settings.enabled,
            min: settings.min,
            max: settings.max,
        }
    }
}

impl From<VisitorCounterSettings> for vitrine_core::promo::VisitorCounterSettings {
    fn from(settings: VisitorCounterSettings) -> Self {
        Self {
            enabled: settings.enabled,
            min: settings.min,
            max: settings.max,
        }
    }
}

/// Free-form store settings.
pub type Settings = BTreeMap<String, String>;

/// Settings key holding the Meta pixel id.
pub const FACEBOOK_PIXEL_KEY: &str = "facebookPixelId";

// =============================================================================
// Dates
// =============================================================================

/// Parse a timestamp the way the backend or an HTML form may send it:
/// RFC 3339, a zone-less `LocalDateTime` (read as UTC), a
/// `datetime-local` value without seconds, or a bare date.
#[must_use]
pub fn parse_backend_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serde adapter for the backend's zone-less timestamps.
pub mod backend_datetime {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Wire format for outgoing timestamps (`LocalDateTime`).
    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&value.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// # Errors
    ///
    /// Fails when the value is a string in none of the accepted formats.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => super::parse_backend_datetime(raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
        }
    }
}
