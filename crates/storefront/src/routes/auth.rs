//! Authentication route handlers.
//!
//! Handles login, registration, email confirmation and password reset
//! against the backend's auth endpoints. The bearer token it returns is kept
//! in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::Email;

use crate::api::{ConfirmEmailRequest, LoginRequest, RegisterRequest, ResetPasswordRequest};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::session::{guest_cart, save_guest_cart, set_flash};
use crate::models::{CurrentUser, Flash, GuestCart};
use crate::routes::widgets::safe_return_path;
use crate::state::AppState;
use crate::views::PageContext;

/// Shortest password accepted at registration and reset.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Email confirmation form data.
#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    pub email: String,
    pub code: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Where to go after logging in.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Email prefilled on the confirmation page.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmQuery {
    pub email: Option<String>,
}

/// Token from the reset link.
#[derive(Debug, Default, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub next: String,
    pub email: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub full_name: String,
    pub email: String,
    pub error: Option<String>,
}

/// Email confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/confirm.html")]
pub struct ConfirmTemplate {
    pub page: PageContext,
    pub email: String,
    pub error: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub page: PageContext,
    pub sent: bool,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub page: PageContext,
    pub token: String,
    pub error: Option<String>,
}

/// Check a new password and its confirmation.
///
/// # Errors
///
/// Returns the message to show when they differ or the password is too short.
pub fn check_new_password(password: &str, confirm: &str) -> std::result::Result<(), String> {
    if password != confirm {
        return Err("Passwords do not match.".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        page: PageContext::load(&state, &session, "Login").await,
        next: safe_return_path(query.next.as_deref()).to_string(),
        email: String::new(),
        error: None,
    }
}

/// Move a guest's session cart into their backend cart after login.
async fn merge_guest_cart(state: &AppState, session: &Session, user: &CurrentUser) {
    let cart = guest_cart(session).await;
    if cart.is_empty() {
        return;
    }
    for line in &cart.lines {
        if let Err(e) = state
            .api()
            .add_to_cart(&user.token, line.product_id, line.quantity)
            .await
        {
            tracing::warn!(product_id = %line.product_id, error = %e, "Guest cart line not merged");
        }
    }
    if let Err(e) = save_guest_cart(session, &GuestCart::default()).await {
        tracing::error!(error = %e, "Failed to clear guest cart after login");
    }
}

/// Handle login form submission.
///
/// Exchanges the credentials for a token, then reads the profile for the
/// user's name and role.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_return_path(form.next.as_deref()).to_string();
    let request = LoginRequest {
        email: form.email.trim().to_string(),
        password: form.password,
    };

    let attempt = match state.api().login(&request).await {
        Ok(token) => state
            .api()
            .profile(&token)
            .await
            .map(|profile| (token, profile)),
        Err(e) => Err(e),
    };

    let (token, profile) = match attempt {
        Ok(found) => found,
        Err(e) if e.is_client_error() => {
            tracing::warn!(error = %e, "Login failed");
            let error = match e {
                crate::api::ApiError::Rejected { message, .. } => message,
                _ => "Invalid email or password.".to_string(),
            };
            return Ok(LoginTemplate {
                page: PageContext::load(&state, &session, "Login").await,
                next,
                email: request.email,
                error: Some(error),
            }
            .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let user = CurrentUser {
        token,
        email: profile.email,
        full_name: profile.full_name,
        role: profile.role,
    };
    set_current_user(&session, &user).await?;
    set_sentry_user(&user.email);
    merge_guest_cart(&state, &session, &user).await;

    tracing::info!(email = %user.email, role = %user.role, "User logged in");
    set_flash(&session, Flash::success(format!("Welcome back, {}!", user.full_name))).await?;
    Ok(Redirect::to(&next).into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    RegisterTemplate {
        page: PageContext::load(&state, &session, "Register").await,
        full_name: String::new(),
        email: String::new(),
        error: None,
    }
}

/// Handle registration form submission.
///
/// The backend emails a confirmation code; the user confirms before logging in.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let full_name = form.full_name.trim().to_string();
    let checked = if full_name.is_empty() {
        Err("Please enter your full name.".to_string())
    } else {
        Email::parse(&form.email)
            .map_err(|e| e.to_string())
            .and_then(|email| {
                check_new_password(&form.password, &form.password_confirm).map(|()| email)
            })
    };

    let outcome = match checked {
        Ok(email) => state
            .api()
            .register(&RegisterRequest {
                full_name: full_name.clone(),
                email: email.to_string(),
                password: form.password,
            })
            .await
            .map(|()| email)
            .inspect_err(|e| tracing::warn!(error = %e, "Registration failed")),
        Err(message) => {
            return Ok(RegisterTemplate {
                page: PageContext::load(&state, &session, "Register").await,
                full_name,
                email: form.email,
                error: Some(message),
            }
            .into_response());
        }
    };

    match outcome {
        Ok(email) => {
            set_flash(
                &session,
                Flash::success("Registration successful! Check your email for a confirmation code."),
            )
            .await?;
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("email", email.as_str());
            Ok(Redirect::to(&format!("/auth/confirm?{}", query.finish())).into_response())
        }
        Err(e) if e.is_client_error() => Ok(RegisterTemplate {
            page: PageContext::load(&state, &session, "Register").await,
            full_name,
            email: form.email,
            error: Some(e.user_message()),
        }
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Email Confirmation Routes
// =============================================================================

/// Display the email confirmation page.
pub async fn confirm_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ConfirmQuery>,
) -> impl IntoResponse {
    ConfirmTemplate {
        page: PageContext::load(&state, &session, "Confirm Email").await,
        email: query.email.unwrap_or_default(),
        error: None,
    }
}

/// Handle email confirmation form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ConfirmForm>,
) -> Result<Response> {
    let request = ConfirmEmailRequest {
        email: form.email.trim().to_string(),
        code: form.code.trim().to_string(),
    };
    match state.api().confirm_email(&request).await {
        Ok(()) => {
            set_flash(
                &session,
                Flash::success("Email confirmed! You can now log in."),
            )
            .await?;
            Ok(Redirect::to("/auth/login").into_response())
        }
        Err(e) if e.is_client_error() => Ok(ConfirmTemplate {
            page: PageContext::load(&state, &session, "Confirm Email").await,
            email: request.email,
            error: Some(e.user_message()),
        }
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(
    State(state): State<AppState>,
    session: Session,
) -> impl IntoResponse {
    ForgotPasswordTemplate {
        page: PageContext::load(&state, &session, "Forgot Password").await,
        sent: false,
    }
}

/// Handle forgot password form submission.
///
/// Always reports success so the form cannot be used to discover accounts.
#[instrument(skip(state, session, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> impl IntoResponse {
    if let Err(e) = state.api().forgot_password(form.email.trim()).await {
        tracing::warn!(error = %e, "Password recovery request failed");
    }
    ForgotPasswordTemplate {
        page: PageContext::load(&state, &session, "Forgot Password").await,
        sent: true,
    }
}

/// Display the reset password page.
///
/// Called when the user follows the link from the reset email.
pub async fn reset_password_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ResetQuery>,
) -> Result<Response> {
    match query.token.filter(|t| !t.trim().is_empty()) {
        Some(token) => Ok(ResetPasswordTemplate {
            page: PageContext::load(&state, &session, "Reset Password").await,
            token,
            error: None,
        }
        .into_response()),
        None => {
            set_flash(&session, Flash::error("This reset link is invalid.")).await?;
            Ok(Redirect::to("/auth/forgot-password").into_response())
        }
    }
}

/// Handle reset password form submission.
#[instrument(skip(state, session, form))]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response> {
    let outcome = match check_new_password(&form.password, &form.password_confirm) {
        Ok(()) => state
            .api()
            .reset_password(&ResetPasswordRequest {
                token: form.token.clone(),
                new_password: form.password,
            })
            .await
            .map_err(|e| {
                if e.is_client_error() {
                    Ok(e.user_message())
                } else {
                    Err(e)
                }
            }),
        Err(message) => Err(Ok(message)),
    };

    match outcome {
        Ok(()) => {
            set_flash(
                &session,
                Flash::success("Your password has been reset. Please log in."),
            )
            .await?;
            Ok(Redirect::to("/auth/login").into_response())
        }
        Err(Ok(message)) => Ok(ResetPasswordTemplate {
            page: PageContext::load(&state, &session, "Reset Password").await,
            token: form.token,
            error: Some(message),
        }
        .into_response()),
        Err(Err(e)) => Err(e.into()),
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// Tokens are stateless on the backend, so dropping the session is enough.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();
    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_new_password() {
        assert!(check_new_password("long enough", "long enough").is_ok());
        assert_eq!(
            check_new_password("long enough", "different"),
            Err("Passwords do not match.".to_string())
        );
        assert_eq!(
            check_new_password("short", "short"),
            Err("Password must be at least 8 characters.".to_string())
        );
    }
}
