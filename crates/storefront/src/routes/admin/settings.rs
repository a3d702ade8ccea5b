//! Store settings and the home page hero section.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{AdminNav, admin_page, finish, reject};
use crate::api::{FACEBOOK_PIXEL_KEY, Hero, Settings};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::forms::MultipartForm;
use crate::state::AppState;
use crate::views::PageContext;

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub facebook_pixel_id: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/settings/index.html")]
pub struct SettingsTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub facebook_pixel_id: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/settings/hero.html")]
pub struct HeroTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub hero: Hero,
}

/// Meta pixel ids are numeric.
fn is_valid_pixel_id(id: &str) -> bool {
    id.is_empty() || id.chars().all(|c| c.is_ascii_digit())
}

fn hero_input(form: &MultipartForm) -> std::result::Result<Hero, AppError> {
    let field = |name: &str| form.fields.get(name).unwrap_or_default().to_string();
    Ok(Hero {
        title: form.required("title")?,
        subtitle: field("subtitle"),
        link_text: field("link_text"),
        link_url: field("link_url"),
        image_url: form.fields.get("image_url").map(ToString::to_string),
    })
}

#[instrument(skip(state, session, _user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let settings = state.api().settings().await?;
    Ok(SettingsTemplate {
        page: admin_page(&state, &session, "Settings").await,
        nav: AdminNav::new("/admin/settings"),
        facebook_pixel_id: settings.get(FACEBOOK_PIXEL_KEY).cloned().unwrap_or_default(),
    })
}

/// Save settings, keeping keys this form does not edit.
#[instrument(skip(state, session, user, form))]
pub async fn save(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Form(form): Form<SettingsForm>,
) -> Result<Response> {
    let pixel_id = form.facebook_pixel_id.trim();
    if !is_valid_pixel_id(pixel_id) {
        return reject(&session, "The pixel id should only contain digits.", "/admin/settings").await;
    }
    let mut settings: Settings = match state.api().settings().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load settings before saving");
            Settings::new()
        }
    };
    settings.insert(FACEBOOK_PIXEL_KEY.to_string(), pixel_id.to_string());
    let outcome = state.api().save_settings(&user.token, &settings).await;
    finish(&session, outcome, "Settings saved.", "/admin/settings").await
}

#[instrument(skip(state, session, _user))]
pub async fn hero(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(_user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let hero = state.api().hero().await?;
    Ok(HeroTemplate {
        page: admin_page(&state, &session, "Hero section").await,
        nav: AdminNav::new("/admin/hero"),
        hero,
    })
}

#[instrument(skip(state, session, user, multipart))]
pub async fn save_hero(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    multipart: Multipart,
) -> Result<Response> {
    let mut form = MultipartForm::read(multipart).await?;
    let input = match hero_input(&form) {
        Ok(input) => input,
        Err(e) => return reject(&session, e.user_message(), "/admin/hero").await,
    };
    let image = form.take_files("image").into_iter().next();
    let outcome = state.api().update_hero(&user.token, &input, image).await;
    finish(&session, outcome, "Hero section saved.", "/admin/hero").await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::routes::forms::FormPairs;

    #[test]
    fn test_pixel_id_validation() {
        assert!(is_valid_pixel_id("123456789012345"));
        assert!(is_valid_pixel_id(""));
        assert!(!is_valid_pixel_id("fbq('init')"));
    }

    #[test]
    fn test_hero_keeps_current_image() {
        let form = MultipartForm {
            fields: FormPairs::parse(b"title=Spring&subtitle=&image_url=%2Fimg%2Fhero.jpg"),
            files: Vec::new(),
        };
        let hero = hero_input(&form).unwrap();
        assert_eq!(hero.title, "Spring");
        assert_eq!(hero.subtitle, "");
        assert_eq!(hero.image_url.as_deref(), Some("/img/hero.jpg"));
    }
}
