//! Authentication, user administration and site reviews.

use reqwest::Method;
use tracing::instrument;
use vitrine_core::{ReviewId, UserId, UserRole};

use super::{
    ApiError, BackendClient, CacheKey, ConfirmEmailRequest, LoginRequest, LoginResponse,
    RegisterRequest, ResetPasswordRequest, Review, ReviewInput, User,
};

#[derive(serde::Serialize)]
struct ForgotPasswordRequest<'a> {
    email: &'a str,
}

impl BackendClient {
    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] or [`ApiError::Rejected`] for bad credentials.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<String, ApiError> {
        let url = self.url("auth/login")?;
        let response = Self::send(self.request(Method::POST, url, None).json(request)).await?;
        let body = response.text().await?;
        token_from_body(&body)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] if the email is taken or the input invalid.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let url = self.url("auth/register")?;
        self.send_json_discard(Method::POST, url, None, request).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for a wrong or expired code.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn confirm_email(&self, request: &ConfirmEmailRequest) -> Result<(), ApiError> {
        let url = self.url("auth/confirm-email")?;
        self.send_json_discard(Method::POST, url, None, request).await
    }

    /// Ask the backend to email a password reset link.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let url = self.url("auth/forgot-password")?;
        self.send_json_discard(Method::POST, url, None, &ForgotPasswordRequest { email })
            .await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for an invalid or expired reset token.
    #[instrument(skip(self, request))]
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<(), ApiError> {
        let url = self.url("auth/reset-password")?;
        self.send_json_discard(Method::POST, url, None, request).await
    }

    /// The profile behind a token, including its role.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for an expired token.
    #[instrument(skip(self, token))]
    pub async fn profile(&self, token: &str) -> Result<User, ApiError> {
        let url = self.url("auth/user/profile")?;
        self.get_json(url, Some(token)).await
    }

    // =========================================================================
    // Users (admin)
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn users(&self, token: &str) -> Result<Vec<User>, ApiError> {
        let url = self.url("users")?;
        self.get_json(url, Some(token)).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(user_id = %id, role = %role))]
    pub async fn update_user_role(
        &self,
        token: &str,
        id: UserId,
        role: UserRole,
    ) -> Result<(), ApiError> {
        let url = self.url_with_query(
            &format!("users/{id}/role"),
            &[("role", role.as_str().to_string())],
        )?;
        self.send_empty(Method::PUT, url, Some(token)).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(user_id = %id))]
    pub async fn delete_user(&self, token: &str, id: UserId) -> Result<(), ApiError> {
        let url = self.url(&format!("users/{id}"))?;
        self.send_empty(Method::DELETE, url, Some(token)).await
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Submit a site review; it stays hidden until an admin approves it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the review.
    #[instrument(skip(self, token, review), fields(rating = review.rating))]
    pub async fn add_review(&self, token: &str, review: &ReviewInput) -> Result<(), ApiError> {
        let url = self.url("reviews")?;
        self.send_json_discard(Method::POST, url, Some(token), review)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn approved_reviews(&self) -> Result<Vec<Review>, ApiError> {
        self.get_cached(CacheKey::ApprovedReviews, "reviews/approved")
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn pending_reviews(&self, token: &str) -> Result<Vec<Review>, ApiError> {
        let url = self.url("reviews/pending")?;
        self.get_json(url, Some(token)).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(review_id = %id))]
    pub async fn approve_review(&self, token: &str, id: ReviewId) -> Result<(), ApiError> {
        let url = self.url(&format!("reviews/{id}/approve"))?;
        self.send_empty(Method::PUT, url, Some(token)).await?;
        self.inner.cache.invalidate(&CacheKey::ApprovedReviews).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(review_id = %id))]
    pub async fn delete_review(&self, token: &str, id: ReviewId) -> Result<(), ApiError> {
        let url = self.url(&format!("reviews/{id}"))?;
        self.send_empty(Method::DELETE, url, Some(token)).await?;
        self.inner.cache.invalidate(&CacheKey::ApprovedReviews).await;
        Ok(())
    }
}

/// The login endpoint answers `{"token": "..."}`; older builds send the bare token.
fn token_from_body(body: &str) -> Result<String, ApiError> {
    let body = body.trim();
    if body.starts_with('{') {
        let response: LoginResponse = serde_json::from_str(body)?;
        return Ok(response.token);
    }
    let token = body.trim_matches('"');
    if token.is_empty() {
        return Err(ApiError::Unauthorized);
    }
    Ok(token.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_json_body() {
        assert_eq!(token_from_body(r#"{"token": "abc.def"}"#).unwrap(), "abc.def");
        assert_eq!(token_from_body(r#"{"accessToken": "xyz"}"#).unwrap(), "xyz");
    }

    #[test]
    fn test_token_from_plain_body() {
        assert_eq!(token_from_body("abc.def\n").unwrap(), "abc.def");
        assert_eq!(token_from_body("\"abc.def\"").unwrap(), "abc.def");
        assert!(matches!(token_from_body(""), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_token_json_without_token_is_parse_error() {
        assert!(matches!(token_from_body(r#"{"user": 1}"#), Err(ApiError::Parse(_))));
    }
}
