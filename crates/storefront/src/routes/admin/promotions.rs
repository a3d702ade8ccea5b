//! Announcement bar, countdown timer and visitor counter settings.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::promo::{
    AnimationType, DEFAULT_BANNER_BACKGROUND, DEFAULT_BANNER_TEXT, DEFAULT_COUNTDOWN_BACKGROUND,
    DEFAULT_COUNTDOWN_TEXT, HexColor,
};

use super::{AdminNav, SelectOption, admin_page, finish, reject};
use crate::api::{Announcement, Countdown, VisitorCounterSettings, parse_backend_datetime};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::forms::FormPairs;
use crate::state::AppState;
use crate::views::PageContext;

/// `datetime-local` input format.
const DATETIME_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

// =============================================================================
// Announcement
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "admin/promotions/announcement.html")]
pub struct AnnouncementTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub announcement: Announcement,
    pub animations: Vec<SelectOption>,
}

fn announcement_input(fields: &FormPairs) -> Announcement {
    Announcement {
        text: fields.get("text").unwrap_or_default().to_string(),
        background_color: HexColor::parse_or(
            fields.get("background_color").unwrap_or_default(),
            DEFAULT_BANNER_BACKGROUND,
        )
        .to_string(),
        text_color: HexColor::parse_or(
            fields.get("text_color").unwrap_or_default(),
            DEFAULT_BANNER_TEXT,
        )
        .to_string(),
        enabled: fields.checked("enabled"),
        animation_type: fields
            .get("animation_type")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default(),
    }
}

#[instrument(skip(state, session, _user))]
pub async fn announcement(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let announcement = state.api().announcement().await?;
    let current = announcement.animation_type;
    Ok(AnnouncementTemplate {
        page: admin_page(&state, &session, "Announcement").await,
        nav: AdminNav::new("/admin/announcement"),
        announcement,
        animations: AnimationType::ALL
            .iter()
            .map(|a| SelectOption::new(a.as_str(), a.label(), *a == current))
            .collect(),
    })
}

#[instrument(skip(state, session, user, body))]
pub async fn save_announcement(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    body: Bytes,
) -> Result<Response> {
    let input = announcement_input(&FormPairs::parse(&body));
    if input.enabled && input.text.is_empty() {
        return reject(&session, "An enabled announcement needs some text.", "/admin/announcement")
            .await;
    }
    let outcome = state.api().update_announcement(&user.token, &input).await;
    finish(&session, outcome, "Announcement saved.", "/admin/announcement").await
}

// =============================================================================
// Countdown
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "admin/promotions/countdown.html")]
pub struct CountdownTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub countdown: Countdown,
    /// End date in `datetime-local` form, blank when unset.
    pub end_date: String,
}

fn countdown_input(fields: &FormPairs) -> std::result::Result<Countdown, &'static str> {
    let end_date = match fields.get("end_date") {
        Some(raw) => Some(parse_backend_datetime(raw).ok_or("End date is invalid.")?),
        None => None,
    };
    let enabled = fields.checked("enabled");
    if enabled && end_date.is_none() {
        return Err("An enabled countdown needs an end date.");
    }
    Ok(Countdown {
        title: fields.get("title").unwrap_or_default().to_string(),
        end_date,
        enabled,
        background_color: HexColor::parse_or(
            fields.get("background_color").unwrap_or_default(),
            DEFAULT_COUNTDOWN_BACKGROUND,
        )
        .to_string(),
        text_color: HexColor::parse_or(
            fields.get("text_color").unwrap_or_default(),
            DEFAULT_COUNTDOWN_TEXT,
        )
        .to_string(),
    })
}

#[instrument(skip(state, session, _user))]
pub async fn countdown(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let countdown = state.api().countdown().await?;
    Ok(CountdownTemplate {
        page: admin_page(&state, &session, "Countdown").await,
        nav: AdminNav::new("/admin/countdown"),
        end_date: countdown
            .end_date
            .map(|end| end.format(DATETIME_INPUT_FORMAT).to_string())
            .unwrap_or_default(),
        countdown,
    })
}

#[instrument(skip(state, session, user, body))]
pub async fn save_countdown(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    body: Bytes,
) -> Result<Response> {
    let input = match countdown_input(&FormPairs::parse(&body)) {
        Ok(input) => input,
        Err(message) => return reject(&session, message, "/admin/countdown").await,
    };
    let outcome = state.api().save_countdown(&user.token, &input).await;
    finish(&session, outcome, "Countdown saved.", "/admin/countdown").await
}

// =============================================================================
// Visitor counter
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "admin/promotions/visitor_counter.html")]
pub struct VisitorCounterTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub settings: VisitorCounterSettings,
}

fn visitor_counter_input(fields: &FormPairs) -> std::result::Result<VisitorCounterSettings, String> {
    let bound = |name: &str, label: &str| {
        fields
            .get(name)
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| format!("{label} must be a whole number."))
    };
    let settings = vitrine_core::promo::VisitorCounterSettings {
        enabled: fields.checked("enabled"),
        min: bound("min", "Minimum")?,
        max: bound("max", "Maximum")?,
    };
    settings.validate().map_err(|e| e.to_string())?;
    Ok(settings.into())
}

#[instrument(skip(state, session, _user))]
pub async fn visitor_counter(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let settings = state.api().visitor_counter_settings().await?;
    Ok(VisitorCounterTemplate {
        page: admin_page(&state, &session, "Visitor counter").await,
        nav: AdminNav::new("/admin/visitor-counter"),
        settings,
    })
}

#[instrument(skip(state, session, user, body))]
pub async fn save_visitor_counter(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    body: Bytes,
) -> Result<Response> {
    let input = match visitor_counter_input(&FormPairs::parse(&body)) {
        Ok(input) => input,
        Err(message) => return reject(&session, message, "/admin/visitor-counter").await,
    };
    let outcome = state
        .api()
        .save_visitor_counter_settings(&user.token, &input)
        .await;
    finish(&session, outcome, "Visitor counter saved.", "/admin/visitor-counter").await
}
