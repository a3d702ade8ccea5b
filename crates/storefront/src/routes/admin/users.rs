//! User management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::{UserId, UserRole};

use super::{AdminNav, SelectOption, admin_page, finish, reject};
use crate::api::User;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::CurrentUser;
use crate::state::AppState;
use crate::views::PageContext;

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: UserRole,
}

/// A user row with its role picker.
pub struct UserRow {
    pub user: User,
    pub roles: Vec<SelectOption>,
    /// The signed-in admin's own row, which cannot be demoted or deleted here.
    pub is_self: bool,
}

impl UserRow {
    fn new(user: User, current: &CurrentUser) -> Self {
        Self {
            roles: UserRole::ALL
                .iter()
                .map(|r| SelectOption::new(r.as_str(), r.label(), *r == user.role))
                .collect(),
            is_self: user.email.eq_ignore_ascii_case(&current.email),
            user,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users/index.html")]
pub struct UsersTemplate {
    pub page: PageContext,
    pub nav: AdminNav,
    pub users: Vec<UserRow>,
}

/// Whether `id` is the signed-in admin, looked up by email.
async fn is_current_user(state: &AppState, current: &CurrentUser, id: UserId) -> Result<bool> {
    let users = state.api().users(&current.token).await?;
    Ok(users
        .iter()
        .any(|u| u.id == id && u.email.eq_ignore_ascii_case(&current.email)))
}

#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
) -> Result<impl IntoResponse> {
    let mut users = state.api().users(&user.token).await?;
    users.sort_by(|a, b| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()));
    Ok(UsersTemplate {
        page: admin_page(&state, &session, "Users").await,
        nav: AdminNav::new("/admin/users"),
        users: users.into_iter().map(|u| UserRow::new(u, &user)).collect(),
    })
}

#[instrument(skip(state, session, user, form))]
pub async fn update_role(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<UserId>,
    Form(form): Form<RoleForm>,
) -> Result<Response> {
    if form.role != UserRole::Admin && is_current_user(&state, &user, id).await? {
        return reject(&session, "You cannot remove your own admin role.", "/admin/users").await;
    }
    let outcome = state.api().update_user_role(&user.token, id, form.role).await;
    finish(&session, outcome, "Role updated.", "/admin/users").await
}

#[instrument(skip(state, session, user))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Response> {
    if is_current_user(&state, &user, id).await? {
        return reject(&session, "You cannot delete your own account.", "/admin/users").await;
    }
    let outcome = state.api().delete_user(&user.token, id).await;
    finish(&session, outcome, "User deleted.", "/admin/users").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_row_is_flagged() {
        let current = CurrentUser {
            token: "t".to_string(),
            email: "admin@example.com".to_string(),
            full_name: "Admin".to_string(),
            role: UserRole::Admin,
        };
        let own = UserRow::new(
            User {
                email: "Admin@Example.com".to_string(),
                role: UserRole::Admin,
                ..User::default()
            },
            &current,
        );
        let other = UserRow::new(
            User {
                email: "shopper@example.com".to_string(),
                ..User::default()
            },
            &current,
        );
        assert!(own.is_self);
        assert!(!other.is_self);
        assert!(own.roles.iter().any(|r| r.selected && r.value == "ADMIN"));
    }
}
