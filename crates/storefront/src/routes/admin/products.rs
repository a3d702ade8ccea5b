//! Product management.
//!
//! Create and update post `multipart/form-data`: text fields, new image files
//! under `images`, and one `existing_image` field per kept image URL.
//!
//! Variant types and variants arrive as numbered rows (`variant_type0.name`,
//! `variant0.attr.Size`); blank rows are ignored.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::variant::{ProductVariant, VariantType, validate_variants};
use vitrine_core::{ProductId, ProductType};

use super::{AdminNav, SelectOption, admin_page, finish, reject};
use crate::api::{Category, Product, ProductInput};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Flash;
use crate::models::session::set_flash;
use crate::routes::forms::{FormPairs, MultipartForm};
use crate::state::AppState;
use crate::views::PageContext;

/// Product list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub products: Vec<Product>,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    /// Blank for the create form.
    pub product: Product,
    pub is_new: bool,
    pub action: String,
    pub categories: Vec<SelectOption>,
    pub product_types: Vec<SelectOption>,
    pub has_variants: bool,
    pub variant_types: Vec<VariantTypeRow>,
    pub variants: Vec<VariantRow>,
}

/// Blank rows offered below the saved ones.
const SPARE_ROWS: usize = 2;

/// One variant type input row.
pub struct VariantTypeRow {
    pub index: usize,
    pub name: String,
    pub options: String,
}

/// One variant input row with a select per saved variant type.
pub struct VariantRow {
    pub index: usize,
    pub price: String,
    pub stock: String,
    pub image_url: String,
    pub attributes: Vec<AttributeSelect>,
}

/// Option picker for one variant type within a variant row.
pub struct AttributeSelect {
    pub field: String,
    pub label: String,
    pub options: Vec<SelectOption>,
}

fn variant_type_rows(types: &[VariantType]) -> Vec<VariantTypeRow> {
    let saved = types.iter().map(|t| (t.name.clone(), t.options_list()));
    let spare = std::iter::repeat_with(|| (String::new(), String::new())).take(SPARE_ROWS);
    saved
        .chain(spare)
        .enumerate()
        .map(|(index, (name, options))| VariantTypeRow {
            index,
            name,
            options,
        })
        .collect()
}

fn variant_rows(types: &[VariantType], variants: &[ProductVariant]) -> Vec<VariantRow> {
    let blank = ProductVariant::default();
    variants
        .iter()
        .map(Some)
        .chain(std::iter::repeat_n(None, SPARE_ROWS))
        .enumerate()
        .map(|(index, saved)| {
            let variant = saved.unwrap_or(&blank);
            VariantRow {
                index,
                price: saved.map(|v| v.price.to_string()).unwrap_or_default(),
                stock: saved.map(|v| v.stock.to_string()).unwrap_or_default(),
                image_url: variant.image_url.clone().unwrap_or_default(),
                attributes: types
                    .iter()
                    .map(|t| {
                        let chosen = variant.variant_map.get(&t.name);
                        AttributeSelect {
                            field: format!("{VARIANT_PREFIX}{index}.{ATTRIBUTE_PREFIX}{}", t.name),
                            label: t.name.clone(),
                            options: t
                                .options
                                .iter()
                                .map(|o| SelectOption::new(o, o.clone(), chosen == Some(o)))
                                .collect(),
                        }
                    })
                    .collect(),
            }
        })
        .collect()
}

impl ProductFormTemplate {
    fn new(page: PageContext, product: Product, action: String, categories: &[Category]) -> Self {
        let product_type = product.product_type.unwrap_or_default();
        Self {
            page,
            nav: AdminNav::new("/admin/products"),
            is_new: product.id == ProductId::default(),
            action,
            categories: categories
                .iter()
                .map(|c| SelectOption::new(c.id, c.name.clone(), product.category_id == Some(c.id)))
                .collect(),
            product_types: ProductType::ALL
                .iter()
                .map(|t| SelectOption::new(t.as_str(), t.label(), *t == product_type))
                .collect(),
            has_variants: !product.variant_types.is_empty(),
            variant_types: variant_type_rows(&product.variant_types),
            variants: variant_rows(&product.variant_types, &product.variants),
            product,
        }
    }
}

/// Row prefix of variant type fields.
const VARIANT_TYPE_PREFIX: &str = "variant_type";
/// Row prefix of variant fields.
const VARIANT_PREFIX: &str = "variant";
/// Field prefix, within a variant row, of its chosen options.
const ATTRIBUTE_PREFIX: &str = "attr.";

/// Variant types and variants of a product form.
///
/// Both are empty unless `has_variants` is ticked.
fn variant_input(
    fields: &FormPairs,
) -> std::result::Result<(Vec<VariantType>, Vec<ProductVariant>), AppError> {
    if !fields.checked("has_variants") {
        return Ok((Vec::new(), Vec::new()));
    }

    let types: Vec<VariantType> = fields
        .rows(VARIANT_TYPE_PREFIX)
        .iter()
        .filter(|row| !row.is_blank())
        .map(|row| {
            VariantType::from_list(
                row.get("name").unwrap_or_default(),
                row.get("options").unwrap_or_default(),
            )
        })
        .collect();

    let mut variants = Vec::new();
    for row in fields.rows(VARIANT_PREFIX).iter().filter(|row| !row.is_blank()) {
        let price = match row.get("price") {
            Some(price) => price
                .parse()
                .map_err(|_| AppError::BadRequest("Variant price is invalid.".to_string()))?,
            None => Decimal::ZERO,
        };
        let stock = match row.get("stock") {
            Some(stock) => stock
                .parse()
                .map_err(|_| AppError::BadRequest("Variant stock is invalid.".to_string()))?,
            None => 0,
        };
        variants.push(ProductVariant {
            variant_map: row
                .prefixed(ATTRIBUTE_PREFIX)
                .into_iter()
                .map(|(name, option)| (name.to_string(), option.to_string()))
                .collect(),
            price,
            stock,
            image_url: row.get("image_url").map(ToString::to_string),
        });
    }

    validate_variants(&types, &variants).map_err(|e| AppError::BadRequest(format!("{e}.")))?;
    Ok((types, variants))
}

/// Keep redirects after an upload inside the product pages.
fn return_path(requested: Option<&str>) -> String {
    requested
        .filter(|path| path.starts_with("/admin/products") && !path.contains("//"))
        .unwrap_or("/admin/products")
        .to_string()
}

/// Read the text fields of a product form.
fn product_input(form: &MultipartForm) -> std::result::Result<ProductInput, AppError> {
    let price: Decimal = form.parse("price")?;
    if price.is_sign_negative() {
        return Err(AppError::BadRequest("Price cannot be negative.".to_string()));
    }
    let quantity: i32 = form.parse("quantity")?;
    if quantity < 0 {
        return Err(AppError::BadRequest("Quantity cannot be negative.".to_string()));
    }
    let (variant_types, variants) = variant_input(&form.fields)?;
    Ok(ProductInput {
        name: form.required("name")?,
        description: form.fields.get("description").unwrap_or_default().to_string(),
        price,
        quantity,
        brand: form.fields.get("brand").map(ToString::to_string),
        bestseller: form.fields.checked("bestseller"),
        new_arrival: form.fields.checked("new_arrival"),
        category_id: form.parse("category_id")?,
        product_type: form.parse("product_type")?,
        images: form.fields.all("existing_image"),
        variant_types,
        variants,
    })
}

/// Product list.
#[instrument(skip(state, session, _user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let mut products = state.api().all_products().await?;
    products.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(ProductsIndexTemplate {
        page: admin_page(&state, &session, "Products").await,
        nav: AdminNav::new("/admin/products"),
        products,
    })
}

/// New product form.
#[instrument(skip(state, session, _user))]
pub async fn new_product(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let categories = state.api().categories().await?;
    Ok(ProductFormTemplate::new(
        admin_page(&state, &session, "New product").await,
        Product::default(),
        "/admin/products".to_string(),
        &categories,
    ))
}

/// Edit product form.
#[instrument(skip(state, session, _user))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let (product, categories) = tokio::join!(state.api().product(id), state.api().categories());
    let (product, categories) = (product?, categories?);
    Ok(ProductFormTemplate::new(
        admin_page(&state, &session, &format!("Edit {}", product.name)).await,
        product,
        format!("/admin/products/{id}"),
        &categories,
    ))
}

/// Create a product.
#[instrument(skip(state, session, user, multipart))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let input = match product_input(&form) {
        Ok(input) => input,
        Err(e) => return reject(&session, e.user_message(), "/admin/products/new").await,
    };
    let images = form.take_files("images");
    if images.is_empty() {
        return reject(&session, "Add at least one image.", "/admin/products/new").await;
    }
    let outcome = state.api().create_product(&user.token, &input, images).await;
    finish(&session, outcome, "Product created.", "/admin/products").await
}

/// Update a product.
#[instrument(skip(state, session, user, multipart))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response> {
    let edit_path = format!("/admin/products/{id}/edit");
    let mut form = MultipartForm::read(multipart).await?;
    let input = match product_input(&form) {
        Ok(input) => input,
        Err(e) => return reject(&session, e.user_message(), &edit_path).await,
    };
    let images = form.take_files("images");
    if input.images.is_empty() && images.is_empty() {
        return reject(&session, "A product needs at least one image.", &edit_path).await;
    }
    let outcome = state.api().update_product(&user.token, id, &input, images).await;
    finish(&session, outcome, "Product updated.", "/admin/products").await
}

/// Upload an image for a product description and flash its URL.
#[instrument(skip(state, session, user, multipart))]
pub async fn upload_description_image(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let return_to = return_path(form.fields.get("return_to"));
    let Some(image) = form.take_files("image").into_iter().next() else {
        return reject(&session, "Choose an image to upload.", &return_to).await;
    };
    match state.api().upload_description_image(&user.token, image).await {
        Ok(url) => {
            set_flash(
                &session,
                Flash::success(format!("Image uploaded. Use {url} in the description.")),
            )
            .await?;
            Ok(Redirect::to(&return_to).into_response())
        }
        Err(e) => finish(&session, Err::<(), _>(e), "", &return_to).await,
    }
}

/// Delete a product.
#[instrument(skip(state, session, user))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let outcome = state.api().delete_product(&user.token, id).await;
    finish(&session, outcome, "Product deleted.", "/admin/products").await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vitrine_core::CategoryId;

    use super::*;
    use crate::routes::forms::FormPairs;

    fn form(body: &str) -> MultipartForm {
        MultipartForm {
            fields: FormPairs::parse(body.as_bytes()),
            files: Vec::new(),
        }
    }

    #[test]
    fn test_product_input_reads_fields() {
        let input = product_input(&form(
            "name=Oud&price=120.50&quantity=4&category_id=2&product_type=WOMEN\
             &bestseller=on&existing_image=%2Fa.jpg&existing_image=%2Fb.jpg",
        ))
        .unwrap();
        assert_eq!(input.name, "Oud");
        assert_eq!(input.price, Decimal::new(12050, 2));
        assert_eq!(input.category_id, CategoryId::new(2));
        assert_eq!(input.product_type, ProductType::Women);
        assert!(input.bestseller);
        assert!(!input.new_arrival);
        assert_eq!(input.brand, None);
        assert_eq!(input.images, vec!["/a.jpg".to_string(), "/b.jpg".to_string()]);
    }

    #[test]
    fn test_product_input_rejects_negative_price() {
        let err = product_input(&form(
            "name=Oud&price=-1&quantity=4&category_id=2&product_type=MEN",
        ))
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_product_input_requires_category() {
        let err = product_input(&form("name=Oud&price=1&quantity=4&product_type=MEN")).unwrap_err();
        assert_eq!(err.to_string(), "Bad request: category_id is required");
    }

    const BASE: &str = "name=Tee&price=10&quantity=4&category_id=2&product_type=MEN";

    #[test]
    fn test_variants_ignored_unless_enabled() {
        let input = product_input(&form(&format!(
            "{BASE}&variant_type0.name=Size&variant_type0.options=S,M&variant0.price=10&variant0.attr.Size=S"
        )))
        .unwrap();
        assert!(input.variant_types.is_empty());
        assert!(input.variants.is_empty());
    }

    #[test]
    fn test_variant_rows_are_read() {
        let input = product_input(&form(&format!(
            "{BASE}&has_variants=on\
             &variant_type0.name=Size&variant_type0.options=S,+M\
             &variant_type1.name=&variant_type1.options=\
             &variant0.attr.Size=M&variant0.price=12.5&variant0.stock=3&variant0.image_url=\
             &variant1.attr.Size=&variant1.price=&variant1.stock=&variant1.image_url="
        )))
        .unwrap();
        assert_eq!(input.variant_types, vec![VariantType::from_list("Size", "S, M")]);
        assert_eq!(input.variants.len(), 1);
        let variant = &input.variants[0];
        assert_eq!(variant.variant_map.get("Size").map(String::as_str), Some("M"));
        assert_eq!(variant.price, Decimal::new(125, 1));
        assert_eq!(variant.stock, 3);
        assert_eq!(variant.image_url, None);
    }

    #[test]
    fn test_invalid_variants_are_rejected() {
        let err = product_input(&form(&format!(
            "{BASE}&has_variants=on&variant_type0.name=Size&variant_type0.options=S\
             &variant0.attr.Size=XL&variant0.price=5"
        )))
        .unwrap_err();
        assert_eq!(err.user_message(), "Bad request: 'XL' is not an option of Size.");

        let err = product_input(&form(&format!(
            "{BASE}&has_variants=on&variant_type0.name=Size&variant_type0.options=S\
             &variant0.attr.Size=S&variant0.stock=2"
        )))
        .unwrap_err();
        assert_eq!(
            err.user_message(),
            "Bad request: All variants must have a valid positive price."
        );
    }

    #[test]
    fn test_form_lists_saved_and_spare_variant_rows() {
        let sizes = VariantType::from_list("Size", "S, M");
        let product = Product {
            id: ProductId::new(3),
            variant_types: vec![sizes],
            variants: vec![ProductVariant {
                variant_map: [("Size".to_string(), "M".to_string())].into(),
                price: Decimal::new(1500, 2),
                stock: 2,
                image_url: None,
            }],
            ..Product::default()
        };
        let form = ProductFormTemplate::new(
            PageContext::default(),
            product,
            "/admin/products/3".to_string(),
            &[],
        );
        assert!(form.has_variants);
        assert_eq!(form.variant_types.len(), 1 + SPARE_ROWS);
        assert_eq!(form.variant_types[0].options, "S, M");
        assert_eq!(form.variants.len(), 1 + SPARE_ROWS);

        let saved = &form.variants[0];
        assert_eq!(saved.price, "15.00");
        assert_eq!(saved.attributes[0].field, "variant0.attr.Size");
        let chosen: Vec<_> = saved.attributes[0]
            .options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(chosen, vec!["M"]);

        let spare = &form.variants[2];
        assert_eq!(spare.index, 2);
        assert!(spare.price.is_empty());
        assert!(spare.attributes[0].options.iter().all(|o| !o.selected));
    }

    #[test]
    fn test_upload_returns_to_product_pages_only() {
        assert_eq!(return_path(Some("/admin/products/4/edit")), "/admin/products/4/edit");
        assert_eq!(return_path(Some("https://evil.example/")), "/admin/products");
        assert_eq!(return_path(Some("/admin/products//evil.example")), "/admin/products");
        assert_eq!(return_path(None), "/admin/products");
    }

    #[test]
    fn test_form_preselects_category_and_type() {
        let product = Product {
            id: ProductId::new(3),
            category_id: Some(CategoryId::new(2)),
            product_type: Some(ProductType::Men),
            ..Product::default()
        };
        let categories = [
            Category {
                id: CategoryId::new(1),
                name: "Oils".to_string(),
                ..Category::default()
            },
            Category {
                id: CategoryId::new(2),
                name: "Perfumes".to_string(),
                ..Category::default()
            },
        ];
        let form = ProductFormTemplate::new(
            PageContext::default(),
            product,
            "/admin/products/3".to_string(),
            &categories,
        );
        assert!(!form.is_new);
        let selected: Vec<_> = form.categories.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].label, "Perfumes");
        let types: Vec<_> = form.product_types.iter().filter(|o| o.selected).collect();
        assert_eq!(types[0].value, "MEN");
    }
}
