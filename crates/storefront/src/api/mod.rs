//! REST backend client.
//!
//! # Architecture
//!
//! - The backend owns every entity and is authoritative for validation; this
//!   client only forwards calls and decodes responses
//! - A single `reqwest::Client` attaches `Authorization: Bearer <token>` when
//!   the caller has a session token
//! - Public catalog reads are cached in `moka` for `BACKEND_CACHE_TTL_SECS`;
//!   any admin mutation clears the cache
//!
//! Endpoint groups live in their own files, each adding methods to
//! [`BackendClient`]:
//!
//! - `catalog` - products, categories, hero section, comments
//! - `packs` - packs and custom packs
//! - `orders` - cart, orders, coupons
//! - `accounts` - authentication, users, reviews
//! - `content` - announcement, countdown, visitor counter, settings
//! - `media` - description image uploads and image dimensions
//!
//! # Example
//!
//! ```rust,ignore
//! let client = BackendClient::new(&config.backend)?;
//! let product = client.product(ProductId::new(7)).await?;
//! client.add_to_cart(&token, product.id, 2).await?;
//! ```

mod accounts;
mod catalog;
mod content;
mod media;
mod orders;
mod packs;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;
use vitrine_core::pack::ImageSize;
use vitrine_core::{CustomPackId, PackId, ProductId};

use crate::config::BackendConfig;

pub use types::*;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection refused, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined to the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// 404 from the backend.
    #[error("Not found: {0}")]
    NotFound(String),

    /// 401: missing or expired token.
    #[error("Unauthorized")]
    Unauthorized,

    /// 403: authenticated but not allowed.
    #[error("Forbidden")]
    Forbidden,

    /// 429 with the advertised retry delay.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other 4xx; the message comes from the backend and is safe to show.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// 5xx from the backend.
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },
}

impl ApiError {
    /// Whether the backend refused the request because of its content,
    /// as opposed to an outage on our side or theirs.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Unauthorized | Self::Forbidden | Self::Rejected { .. }
        )
    }

    /// A message fit for a flash banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::NotFound(_) => "The requested item could not be found.".to_string(),
            Self::Unauthorized => "Please log in to continue.".to_string(),
            Self::Forbidden => "You are not allowed to do that.".to_string(),
            Self::RateLimited(_) => "Too many requests, please try again shortly.".to_string(),
            Self::Http(_) | Self::Parse(_) | Self::Url(_) | Self::Upstream { .. } => {
                "The store is temporarily unavailable. Please try again.".to_string()
            }
        }
    }
}

/// A file forwarded from an admin upload form.
#[derive(Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// How long image dimensions stay cached.
const IMAGE_SIZE_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache key for public catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Bestsellers,
    NewArrivals,
    Categories,
    Packs,
    Pack(PackId),
    CustomPacks,
    CustomPack(CustomPackId),
    Hero,
    ApprovedReviews,
    Announcement,
    Countdown,
    VisitorCounter,
    Settings,
}

/// Client for the REST backend.
///
/// Cheap to clone; all clones share the connection pool and cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    /// Raw JSON bodies, decoded on every hit.
    cache: Cache<CacheKey, Arc<str>>,
    /// Image dimensions by source path.
    image_sizes: Cache<String, ImageSize>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("vitrine-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        let image_sizes = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(IMAGE_SIZE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.api_url.clone(),
                cache,
                image_sizes,
            }),
        })
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Resolve an endpoint path against the base URL.
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Resolve an endpoint path and append query parameters.
    fn url_with_query(&self, path: &str, pairs: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = self.url(path)?;
        if !pairs.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(pairs.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and turn non-success statuses into [`ApiError`]s.
    async fn send(builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned server error"
            );
        } else {
            debug!(status = %status, "Backend rejected request");
        }

        Err(error_for_status(status, &body, retry_after))
    }

    /// Decode a JSON body, logging the payload on failure.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        decode_text(&text)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let response = Self::send(self.request(Method::GET, url, token)).await?;
        Self::decode(response).await
    }

    /// GET a public endpoint through the catalog cache.
    async fn get_cached<T: DeserializeOwned>(
        &self,
        key: CacheKey,
        path: &str,
    ) -> Result<T, ApiError> {
        if let Some(body) = self.inner.cache.get(&key).await {
            debug!(key = ?key, "Cache hit");
            return decode_text(&body);
        }

        let url = self.url(path)?;
        let response = Self::send(self.request(Method::GET, url, None)).await?;
        let text = response.text().await?;
        let value = decode_text(&text)?;
        self.inner.cache.insert(key, Arc::from(text)).await;
        Ok(value)
    }

    /// Send a JSON body and decode the JSON response.
    async fn send_json<B, T>(
        &self,
        method: Method,
        url: Url,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = Self::send(self.request(method, url, token).json(body)).await?;
        Self::decode(response).await
    }

    /// Send a JSON body and ignore whatever comes back.
    async fn send_json_discard<B>(
        &self,
        method: Method,
        url: Url,
        token: Option<&str>,
        body: &B,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        Self::send(self.request(method, url, token).json(body)).await?;
        Ok(())
    }

    /// Send a request whose response body is ignored.
    async fn send_empty(
        &self,
        method: Method,
        url: Url,
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        Self::send(self.request(method, url, token)).await?;
        Ok(())
    }

    /// Send a multipart form with one JSON part plus file parts.
    async fn send_multipart<B, T>(
        &self,
        method: Method,
        url: Url,
        token: Option<&str>,
        json_part: (&'static str, &B),
        files: (&'static str, Vec<Upload>),
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (json_name, json_body) = json_part;
        let json = reqwest::multipart::Part::text(serde_json::to_string(json_body)?)
            .file_name(format!("{json_name}.json"))
            .mime_str("application/json")?;
        let mut form = reqwest::multipart::Form::new().part(json_name, json);

        let (file_field, uploads) = files;
        for upload in uploads {
            let part = reqwest::multipart::Part::bytes(upload.bytes)
                .file_name(upload.file_name)
                .mime_str(&upload.content_type)?;
            form = form.part(file_field, part);
        }

        let response = Self::send(self.request(method, url, token).multipart(form)).await?;
        Self::decode(response).await
    }

    /// Cheap reachability check used by the readiness endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or answers with an error.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), ApiError> {
        let url = self.url("hello")?;
        self.send_empty(Method::GET, url, None).await
    }
}

fn decode_text<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        ApiError::Parse(e)
    })
}

/// Map a non-success status and body to an [`ApiError`].
fn error_for_status(status: StatusCode, body: &str, retry_after: Option<u64>) -> ApiError {
    let message = extract_message(body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden,
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited(retry_after.unwrap_or(1)),
        s if s.is_server_error() => ApiError::Upstream {
            status: s.as_u16(),
            message,
        },
        s => ApiError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

/// Pull a human-readable message out of an error body.
///
/// The backend answers with `{"message": "..."}` (sometimes `error`), or a
/// bare string for validation failures.
fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let found = ["message", "error", "detail"]
            .iter()
            .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
            .or_else(|| value.as_str());
        return found
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(str::to_string);
    }

    // Plain text, but never echo an HTML error page back to the user.
    if body.starts_with('<') {
        return None;
    }
    Some(body.chars().take(300).collect())
}

#[cfg(test)]
pub(crate) mod testing {
    //! An in-process stand-in for the backend, bound to an ephemeral port.

    use axum::Router;
    use url::Url;

    pub(crate) use super::media::fixtures::png_header;
    use super::BackendClient;
    use crate::config::BackendConfig;

    /// Serve `router` on 127.0.0.1 and return a client pointed at it.
    pub(crate) async fn mock_backend(router: Router) -> BackendClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("mock backend");
        });

        let url = Url::parse(&format!("http://{addr}/api/")).expect("mock backend url");
        BackendClient::new(&BackendConfig::new(url)).expect("backend client")
    }
}
