//! Authentication extractors.
//!
//! The backend validates tokens; these extractors only gate pages on what the
//! session says about the user.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.full_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a logged-in user with the admin role.
pub struct RequireAdmin(pub CurrentUser);

/// Error returned when a page needs a user the session does not have.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page, remembering where to come back to.
    RedirectToLogin(String),
    /// Unauthorized response (for JSON endpoints).
    Unauthorized,
    /// Logged in, but not an admin.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => {
                let mut url = url::form_urlencoded::Serializer::new(String::new());
                url.append_pair("next", &next);
                Redirect::to(&format!("/auth/login?{}", url.finish())).into_response()
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => {
                (StatusCode::FORBIDDEN, "You are not allowed to view this page.").into_response()
            }
        }
    }
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// The URI as the client sent it, before nested routers stripped their prefix.
fn request_uri(parts: &Parts) -> &Uri {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0)
}

fn login_rejection(parts: &Parts) -> AuthRejection {
    let uri = request_uri(parts);
    if uri.path().starts_with("/widgets/") {
        return AuthRejection::Unauthorized;
    }
    let next = uri
        .path_and_query()
        .map_or_else(|| "/".to_string(), ToString::to_string);
    AuthRejection::RedirectToLogin(next)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| login_rejection(parts))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await
            .ok_or_else(|| login_rejection(parts))?;
        if !user.is_admin() {
            tracing::warn!(email = %user.email, path = %request_uri(parts).path(), "Non-admin hit admin page");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Store the logged-in user in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Clear the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn nested_parts(inner: &str, original: &str) -> Parts {
        Request::builder()
            .uri(inner)
            .extension(OriginalUri(original.parse().unwrap()))
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_next_keeps_nested_prefix() {
        let parts = nested_parts("/orders?status=PREPARING", "/admin/orders?status=PREPARING");
        match login_rejection(&parts) {
            AuthRejection::RedirectToLogin(next) => {
                assert_eq!(next, "/admin/orders?status=PREPARING");
            }
            other => panic!("unexpected rejection: {other:?}"),
        }
    }

    #[test]
    fn test_widget_endpoints_get_unauthorized() {
        let parts = nested_parts("/visitor-count", "/widgets/visitor-count");
        assert!(matches!(login_rejection(&parts), AuthRejection::Unauthorized));
    }

    #[test]
    fn test_falls_back_to_request_uri() {
        let parts = Request::builder()
            .uri("/profile")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        assert!(matches!(
            login_rejection(&parts),
            AuthRejection::RedirectToLogin(next) if next == "/profile"
        ));
    }

    #[test]
    fn test_redirect_encodes_next() {
        let response = AuthRejection::RedirectToLogin("/admin/orders".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[axum::http::header::LOCATION],
            "/auth/login?next=%2Fadmin%2Forders"
        );
    }
}
