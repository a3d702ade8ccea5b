//! Cosmetic widgets: visitor counter polling and the feedback buttons.

use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::promo::{VISITOR_COUNT_REFRESH_SECS, VisitorCounterSettings};

use crate::error::{Result, add_breadcrumb};
use crate::models::Flash;
use crate::models::session::set_flash;
use crate::state::AppState;

/// Sample a visitor count, `None` when the widget is off or unreachable.
pub async fn initial_visitor_count(state: &AppState) -> Option<u32> {
    let settings: VisitorCounterSettings = state
        .api()
        .visitor_counter_settings()
        .await
        .inspect_err(|e| tracing::debug!(error = %e, "Visitor counter settings unavailable"))
        .ok()?
        .into();
    settings.sample(&mut rand::rng())
}

/// Body of `GET /widgets/visitor-count`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitorCount {
    pub enabled: bool,
    pub count: Option<u32>,
    /// Seconds until the client should poll again.
    pub refresh_secs: u64,
}

/// A fresh visitor count for the polling script.
#[instrument(skip(state))]
pub async fn visitor_count(State(state): State<AppState>) -> Json<VisitorCount> {
    let count = initial_visitor_count(&state).await;
    Json(VisitorCount {
        enabled: count.is_some(),
        count,
        refresh_secs: VISITOR_COUNT_REFRESH_SECS,
    })
}

/// Ratings offered by the feedback widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FeedbackRating {
    Good,
    Okay,
    Bad,
}

impl FeedbackRating {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Okay => "Okay",
            Self::Bad => "Bad",
        }
    }
}

/// Feedback form data.
#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    pub rating: FeedbackRating,
    pub return_to: Option<String>,
}

/// Local path to go back to; anything else falls back to the home page.
#[must_use]
pub fn safe_return_path(candidate: Option<&str>) -> &str {
    candidate
        .filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.contains('\\'))
        .unwrap_or("/")
}

/// Record a shopping-experience rating.
#[instrument(skip(session))]
pub async fn feedback(session: Session, Form(form): Form<FeedbackForm>) -> Result<Response> {
    let rating = form.rating.as_str();
    tracing::info!(rating, "Shopper feedback received");
    add_breadcrumb("feedback", "user_rating", Some(&[("rating", rating)]));

    set_flash(&session, Flash::success("Thank you for your feedback!")).await?;
    Ok(Redirect::to(safe_return_path(form.return_to.as_deref())).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_return_path() {
        assert_eq!(safe_return_path(Some("/products/4")), "/products/4");
        assert_eq!(safe_return_path(Some("//evil.example")), "/");
        assert_eq!(safe_return_path(Some("https://evil.example")), "/");
        assert_eq!(safe_return_path(None), "/");
    }
}
