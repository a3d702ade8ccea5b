//! Product listing and detail pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::{ProductId, ProductType};

use crate::api::{CommentInput, Pack, Product, ProductQuery};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::models::session::set_flash;
use crate::routes::widgets::initial_visitor_count;
use crate::state::AppState;
use crate::views::{PageContext, SelectOption};

/// Products per listing page.
pub const PAGE_SIZE: u32 = 12;

/// Sort choices offered on the listing page.
pub const SORT_OPTIONS: &[(&str, &str)] = &[
    ("name,asc", "Name: A-Z"),
    ("name,desc", "Name: Z-A"),
    ("price,asc", "Price: Low to High"),
    ("price,desc", "Price: High to Low"),
];

/// Listing filters as submitted by the filter form. Everything is optional
/// text so blank inputs do not fail deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub page: Option<u32>,
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub brand: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    /// `products` (default) or `packs`.
    pub view: Option<String>,
    pub sort: Option<String>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

impl ListingQuery {
    #[must_use]
    pub fn shows_packs(&self) -> bool {
        self.view.as_deref() == Some("packs")
    }

    /// One-based page requested.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn sort(&self) -> &str {
        self.sort
            .as_deref()
            .filter(|s| SORT_OPTIONS.iter().any(|(value, _)| value == s))
            .unwrap_or("name,asc")
    }

    /// Backend query for this listing; unparsable filters are dropped.
    #[must_use]
    pub fn to_backend(&self) -> ProductQuery {
        ProductQuery {
            page: self.page() - 1,
            size: Some(PAGE_SIZE),
            sort: Some(self.sort().to_string()),
            search: non_blank(self.search.as_ref()),
            category_id: non_blank(self.category_id.as_ref()).and_then(|v| v.parse().ok()),
            min_price: non_blank(self.min_price.as_ref()).and_then(|v| v.parse::<Decimal>().ok()),
            max_price: non_blank(self.max_price.as_ref()).and_then(|v| v.parse::<Decimal>().ok()),
            brand: non_blank(self.brand.as_ref()),
            product_type: non_blank(self.product_type.as_ref())
                .and_then(|v| v.parse::<ProductType>().ok()),
        }
    }

    /// Query string for page `page` keeping every other filter.
    #[must_use]
    pub fn href_for_page(&self, page: u32) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let fields = [
            ("search", self.search.as_ref()),
            ("category_id", self.category_id.as_ref()),
            ("min_price", self.min_price.as_ref()),
            ("max_price", self.max_price.as_ref()),
            ("brand", self.brand.as_ref()),
            ("type", self.product_type.as_ref()),
            ("view", self.view.as_ref()),
        ];
        for (key, value) in fields {
            if let Some(value) = non_blank(value) {
                query.append_pair(key, &value);
            }
        }
        query.append_pair("sort", self.sort());
        query.append_pair("page", &page.to_string());
        format!("/products?{}", query.finish())
    }
}

/// A numbered link in the pager.
pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

/// Form values echoed back into the filter form.
pub struct FilterValues {
    pub search: String,
    pub min_price: String,
    pub max_price: String,
    pub brand: String,
    pub packs: bool,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<Product>,
    pub packs: Vec<Pack>,
    pub form: FilterValues,
    pub categories: Vec<SelectOption>,
    pub sort_options: Vec<SelectOption>,
    pub product_types: Vec<SelectOption>,
    pub page_links: Vec<PageLink>,
    pub total_elements: u64,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: Product,
    pub visitor_count: Option<u32>,
    pub can_comment: bool,
}

/// Display the product (or pack) listing.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    let api = state.api();
    let page = PageContext::load(&state, &session, "Shop").await;

    let categories = api.categories().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories");
        Vec::new()
    });

    let (products, packs, total_pages, total_elements) = if query.shows_packs() {
        let packs = api.packs().await?;
        let total = packs.len() as u64;
        (Vec::new(), packs, 1, total)
    } else {
        let result = api.products(&query.to_backend()).await?;
        (result.content, Vec::new(), result.total_pages, result.total_elements)
    };

    let current = query.page();
    let page_links = if total_pages > 1 {
        (1..=total_pages)
            .map(|number| PageLink {
                number,
                href: query.href_for_page(number),
                current: number == current,
            })
            .collect()
    } else {
        Vec::new()
    };

    let backend = query.to_backend();
    let sort = query.sort();
    Ok(ProductsIndexTemplate {
        page,
        products,
        packs,
        categories: categories
            .iter()
            .map(|c| SelectOption::new(c.id, c.name.as_str(), backend.category_id == Some(c.id)))
            .collect(),
        sort_options: SORT_OPTIONS
            .iter()
            .map(|(value, label)| SelectOption::new(value, *label, *value == sort))
            .collect(),
        product_types: ProductType::ALL
            .iter()
            .map(|t| SelectOption::new(t.as_str(), t.label(), backend.product_type == Some(*t)))
            .collect(),
        form: FilterValues {
            search: backend.search.unwrap_or_default(),
            min_price: backend.min_price.map(|p| p.to_string()).unwrap_or_default(),
            max_price: backend.max_price.map(|p| p.to_string()).unwrap_or_default(),
            brand: backend.brand.unwrap_or_default(),
            packs: query.shows_packs(),
        },
        page_links,
        total_elements,
    })
}

/// Display a product with its comments and the visitor counter.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let (product, visitor_count) =
        tokio::join!(state.api().product(id), initial_visitor_count(&state));
    let product = product?;
    let page = PageContext::load(&state, &session, product.name.clone()).await;
    let can_comment = page.user.is_some();

    Ok(ProductShowTemplate {
        page,
        product,
        visitor_count,
        can_comment,
    })
}

/// Comment form data.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub content: String,
    pub score: u8,
}

/// Post a comment on a product.
#[instrument(skip(state, session, user, form))]
pub async fn add_comment(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    Form(form): Form<CommentForm>,
) -> Result<Response> {
    let content = form.content.trim();
    let flash = if content.is_empty() {
        Flash::error("Please write a comment before posting.")
    } else {
        let input = CommentInput {
            content: content.to_string(),
            score: form.score.clamp(1, 5),
        };
        match state.api().add_comment(&user.token, id, &input).await {
            Ok(_) => Flash::success("Thanks, your comment was posted."),
            Err(e) if e.is_client_error() => Flash::error(e.user_message()),
            Err(e) => return Err(e.into()),
        }
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&format!("/products/{id}#comments")).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vitrine_core::variant::{ProductVariant, VariantType};

    use super::*;

    #[test]
    fn test_detail_lists_variants() {
        let product = Product {
            id: ProductId::new(9),
            name: "Tee".to_string(),
            quantity: 5,
            variant_types: vec![VariantType::from_list("Size", "S, M")],
            variants: vec![
                ProductVariant {
                    variant_map: [("Size".to_string(), "S".to_string())].into(),
                    price: Decimal::new(1500, 2),
                    stock: 0,
                    image_url: None,
                },
                ProductVariant {
                    variant_map: [("Size".to_string(), "M".to_string())].into(),
                    price: Decimal::new(1700, 2),
                    stock: 4,
                    image_url: None,
                },
            ],
            ..Product::default()
        };
        let html = ProductShowTemplate {
            page: PageContext::default(),
            product,
            visitor_count: None,
            can_comment: false,
        }
        .render()
        .unwrap();
        assert!(html.contains("<td>Size: S</td>"));
        assert!(html.contains("<td>$17.00</td>"));
        assert!(html.contains("Out of stock"));
    }

    #[test]
    fn test_listing_query_to_backend() {
        let query = ListingQuery {
            page: Some(3),
            search: Some("  argan ".to_string()),
            category_id: Some(String::new()),
            min_price: Some("10".to_string()),
            max_price: Some("abc".to_string()),
            product_type: Some("women".to_string()),
            sort: Some("price,desc".to_string()),
            ..ListingQuery::default()
        };
        let backend = query.to_backend();
        assert_eq!(backend.page, 2);
        assert_eq!(backend.search.as_deref(), Some("argan"));
        assert_eq!(backend.category_id, None);
        assert_eq!(backend.min_price, Some(Decimal::from(10)));
        assert_eq!(backend.max_price, None);
        assert_eq!(backend.product_type, Some(ProductType::Women));
        assert_eq!(backend.sort.as_deref(), Some("price,desc"));
    }

    #[test]
    fn test_unknown_sort_falls_back() {
        let query = ListingQuery {
            sort: Some("id;drop".to_string()),
            page: Some(0),
            ..ListingQuery::default()
        };
        assert_eq!(query.sort(), "name,asc");
        assert_eq!(query.page(), 1);
    }

    #[test]
    fn test_page_href_keeps_filters() {
        let query = ListingQuery {
            search: Some("soap bar".to_string()),
            brand: Some(String::new()),
            ..ListingQuery::default()
        };
        assert_eq!(
            query.href_for_page(2),
            "/products?search=soap+bar&sort=name%2Casc&page=2"
        );
    }
}
