//! Review moderation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::ReviewId;

use super::{AdminNav, admin_page, finish};
use crate::api::Review;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;
use crate::views::PageContext;

#[derive(Template, WebTemplate)]
#[template(path = "admin/reviews/index.html")]
pub struct PendingReviewsTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub reviews: Vec<Review>,
}

/// Reviews waiting for approval.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let reviews = state.api().pending_reviews(&user.token).await?;
    Ok(PendingReviewsTemplate {
        page: admin_page(&state, &session, "Reviews").await,
        nav: AdminNav::new("/admin/reviews"),
        reviews,
    })
}

#[instrument(skip(state, session, user))]
pub async fn approve(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Response> {
    let outcome = state.api().approve_review(&user.token, id).await;
    finish(&session, outcome, "Review approved.", "/admin/reviews").await
}

#[instrument(skip(state, session, user))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Response> {
    let outcome = state.api().delete_review(&user.token, id).await;
    finish(&session, outcome, "Review deleted.", "/admin/reviews").await
}
