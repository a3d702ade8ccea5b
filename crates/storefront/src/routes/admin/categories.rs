//! Category management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::CategoryId;

use super::{AdminNav, admin_page, finish, reject};
use crate::api::{Category, CategoryInput};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::routes::forms::MultipartForm;
use crate::state::AppState;
use crate::views::PageContext;

/// Category list with the create form.
#[derive(Template, WebTemplate)]
#[template(path = "admin/categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub categories: Vec<Category>,
}

/// Edit form.
#[derive(Template, WebTemplate)]
#[template(path = "admin/categories/edit.html")]
pub struct CategoryEditTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub category: Category,
}

fn category_input(form: &MultipartForm) -> std::result::Result<CategoryInput, AppError> {
    Ok(CategoryInput {
        name: form.required("name")?,
        description: form.fields.get("description").unwrap_or_default().to_string(),
    })
}

#[instrument(skip(state, session, _user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let categories = state.api().categories().await?;
    Ok(CategoriesIndexTemplate {
        page: admin_page(&state, &session, "Categories").await,
        nav: AdminNav::new("/admin/categories"),
        categories,
    })
}

#[instrument(skip(state, session, _user))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<impl IntoResponse> {
    let category = state
        .api()
        .categories()
        .await?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))?;
    Ok(CategoryEditTemplate {
        page: admin_page(&state, &session, &format!("Edit {}", category.name)).await,
        nav: AdminNav::new("/admin/categories"),
        category,
    })
}

#[instrument(skip(state, session, user, multipart))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let input = match category_input(&form) {
        Ok(input) => input,
        Err(e) => return reject(&session, e.user_message(), "/admin/categories").await,
    };
    let image = form.take_files("image").into_iter().next();
    let outcome = state.api().create_category(&user.token, &input, image).await;
    finish(&session, outcome, "Category created.", "/admin/categories").await
}

#[instrument(skip(state, session, user, multipart))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<CategoryId>,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let input = match category_input(&form) {
        Ok(input) => input,
        Err(e) => {
            return reject(&session, e.user_message(), &format!("/admin/categories/{id}/edit"))
                .await;
        }
    };
    let image = form.take_files("image").into_iter().next();
    let outcome = state.api().update_category(&user.token, id, &input, image).await;
    finish(&session, outcome, "Category updated.", "/admin/categories").await
}

/// The backend refuses to delete a category that still has products.
#[instrument(skip(state, session, user))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Response> {
    let outcome = state.api().delete_category(&user.token, id).await;
    finish(&session, outcome, "Category deleted.", "/admin/categories").await
}
