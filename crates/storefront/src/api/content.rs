//! Storefront widgets and free-form settings.

use reqwest::Method;
use tracing::instrument;

use super::{
    Announcement, ApiError, BackendClient, CacheKey, Countdown, Settings, VisitorCounterSettings,
};

impl BackendClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn announcement(&self) -> Result<Announcement, ApiError> {
        self.get_cached(CacheKey::Announcement, "announcement").await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the announcement.
    #[instrument(skip(self, token, announcement))]
    pub async fn update_announcement(
        &self,
        token: &str,
        announcement: &Announcement,
    ) -> Result<(), ApiError> {
        let url = self.url("announcement")?;
        self.send_json_discard(Method::PUT, url, Some(token), announcement)
            .await?;
        self.inner.cache.invalidate(&CacheKey::Announcement).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn countdown(&self) -> Result<Countdown, ApiError> {
        self.get_cached(CacheKey::Countdown, "countdown").await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the countdown.
    #[instrument(skip(self, token, countdown))]
    pub async fn save_countdown(&self, token: &str, countdown: &Countdown) -> Result<(), ApiError> {
        let url = self.url("countdown")?;
        self.send_json_discard(Method::POST, url, Some(token), countdown)
            .await?;
        self.inner.cache.invalidate(&CacheKey::Countdown).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn visitor_counter_settings(&self) -> Result<VisitorCounterSettings, ApiError> {
        self.get_cached(CacheKey::VisitorCounter, "visitor-counter-settings")
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the settings.
    #[instrument(skip(self, token))]
    pub async fn save_visitor_counter_settings(
        &self,
        token: &str,
        settings: &VisitorCounterSettings,
    ) -> Result<(), ApiError> {
        let url = self.url("visitor-counter-settings")?;
        self.send_json_discard(Method::POST, url, Some(token), settings)
            .await?;
        self.inner.cache.invalidate(&CacheKey::VisitorCounter).await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn settings(&self) -> Result<Settings, ApiError> {
        self.get_cached(CacheKey::Settings, "settings").await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the settings.
    #[instrument(skip(self, token, settings), fields(keys = settings.len()))]
    pub async fn save_settings(&self, token: &str, settings: &Settings) -> Result<(), ApiError> {
        let url = self.url("settings")?;
        self.send_json_discard(Method::POST, url, Some(token), settings)
            .await?;
        self.inner.cache.invalidate(&CacheKey::Settings).await;
        Ok(())
    }
}
