//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{Category, Hero, Pack, Product, Review};
use crate::filters;
use crate::state::AppState;
use crate::views::PageContext;

/// Approved reviews shown on the home page.
const HOME_REVIEW_COUNT: usize = 6;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub hero: Hero,
    pub categories: Vec<Category>,
    pub bestsellers: Vec<Product>,
    pub new_arrivals: Vec<Product>,
    pub packs: Vec<Pack>,
    pub reviews: Vec<Review>,
}

fn or_empty<T: Default, E: std::fmt::Display>(result: Result<T, E>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to fetch {what}");
        T::default()
    })
}

/// Display the home page.
///
/// Each section degrades to empty on its own if its backend call fails.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let api = state.api();
    let (page, hero, categories, bestsellers, new_arrivals, packs, reviews) = tokio::join!(
        PageContext::load(&state, &session, "Home"),
        api.hero(),
        api.categories(),
        api.bestsellers(),
        api.new_arrivals(),
        api.packs(),
        api.approved_reviews(),
    );

    let mut reviews = or_empty(reviews, "reviews");
    reviews.truncate(HOME_REVIEW_COUNT);

    HomeTemplate {
        page,
        hero: or_empty(hero, "hero"),
        categories: or_empty(categories, "categories"),
        bestsellers: or_empty(bestsellers, "bestsellers"),
        new_arrivals: or_empty(new_arrivals, "new arrivals"),
        packs: or_empty(packs, "packs"),
        reviews,
    }
}
