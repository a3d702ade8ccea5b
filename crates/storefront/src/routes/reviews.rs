//! Store reviews: approved list and submission.
//!
//! Submitted reviews wait for an admin to approve them.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{Review, ReviewInput};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::models::session::set_flash;
use crate::state::AppState;
use crate::views::PageContext;

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub content: String,
    pub rating: u8,
}

/// Reviews page template.
#[derive(Template, WebTemplate)]
#[template(path = "reviews/index.html")]
pub struct ReviewsTemplate {
    pub page: PageContext,
    pub reviews: Vec<Review>,
}

/// Display approved reviews and the submission form.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let (page, reviews) = tokio::join!(
        PageContext::load(&state, &session, "Reviews"),
        state.api().approved_reviews()
    );
    let reviews = reviews.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load reviews");
        Vec::new()
    });
    ReviewsTemplate { page, reviews }
}

/// Submit a review for moderation.
#[instrument(skip(state, session, user, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ReviewForm>,
) -> Result<Response> {
    let content = form.content.trim();
    let flash = if content.is_empty() {
        Flash::error("Please write something before submitting.")
    } else {
        let review = ReviewInput {
            content: content.to_string(),
            rating: form.rating.clamp(1, 5),
        };
        match state.api().add_review(&user.token, &review).await {
            Ok(()) => Flash::success("Thank you! Your review will appear once approved."),
            Err(e) if e.is_client_error() => Flash::error(e.user_message()),
            Err(e) => return Err(e.into()),
        }
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to("/reviews").into_response())
}
