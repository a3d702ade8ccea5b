//! Product media: description image uploads and image dimensions.

use reqwest::Method;
use tracing::{debug, instrument, warn};
use url::Url;
use vitrine_core::pack::ImageSize;

use super::{ApiError, BackendClient, Upload};

/// Bytes read from an image before giving up on finding its dimensions.
const IMAGE_HEADER_LIMIT: usize = 256 * 1024;

impl BackendClient {
    /// Upload an image for use inside a product description.
    ///
    /// The backend answers with `{"url": "..."}` or a bare JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is refused or the answer carries no URL.
    #[instrument(skip(self, token, image), fields(file_name = %image.file_name))]
    pub async fn upload_description_image(
        &self,
        token: &str,
        image: Upload,
    ) -> Result<String, ApiError> {
        let url = self.url("products/description-image")?;
        let part = reqwest::multipart::Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response =
            Self::send(self.request(Method::POST, url, Some(token)).multipart(form)).await?;
        let body: serde_json::Value = Self::decode(response).await?;
        body.get("url")
            .unwrap_or(&body)
            .as_str()
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::Upstream {
                status: 200,
                message: "upload response has no image URL".to_string(),
            })
    }

    /// Pixel dimensions of an image, read from the start of its file.
    ///
    /// Relative paths resolve against the backend. Results are cached; any
    /// failure yields `None` so callers can fall back to a default shape.
    #[instrument(skip(self))]
    pub async fn image_size(&self, src: &str) -> Option<ImageSize> {
        if let Some(size) = self.inner.image_sizes.get(src).await {
            return Some(size);
        }

        let url = match self.inner.base_url.join(src) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                debug!(scheme = url.scheme(), "Image is not fetched over HTTP");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "Image path does not resolve");
                return None;
            }
        };

        match self.read_image_size(url).await {
            Ok(Some(size)) => {
                self.inner.image_sizes.insert(src.to_string(), size).await;
                Some(size)
            }
            Ok(None) => {
                debug!("Image header not recognised");
                None
            }
            Err(e) => {
                warn!(error = %e, "Could not read image dimensions");
                None
            }
        }
    }

    /// Stream the image until its header parses or the limit is reached.
    async fn read_image_size(&self, url: Url) -> Result<Option<ImageSize>, ApiError> {
        let mut response = Self::send(self.request(Method::GET, url, None)).await?;
        let mut head = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            head.extend_from_slice(&chunk);
            if let Ok(dimensions) = imagesize::blob_size(&head) {
                return Ok(pixel_size(&dimensions));
            }
            if head.len() >= IMAGE_HEADER_LIMIT {
                break;
            }
        }
        Ok(None)
    }
}

fn pixel_size(dimensions: &imagesize::ImageSize) -> Option<ImageSize> {
    let width = u32::try_from(dimensions.width).ok()?;
    let height = u32::try_from(dimensions.height).ok()?;
    (width > 0 && height > 0).then_some(ImageSize { width, height })
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// The first bytes of a PNG: signature plus an IHDR chunk.
    pub(crate) fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&13_u32.to_be_bytes());
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&width.to_be_bytes());
        png.extend_from_slice(&height.to_be_bytes());
        // Bit depth, colour type, compression, filter, interlace.
        png.extend_from_slice(&[8, 6, 0, 0, 0]);
        // CRC, not checked when reading dimensions.
        png.extend_from_slice(&[0, 0, 0, 0]);
        png
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Multipart, State};
    use axum::http::{StatusCode, header};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    use super::fixtures::png_header;
    use super::*;
    use crate::api::testing::mock_backend;

    fn png_route(width: u32, height: u32, hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/img/photo.png",
                get(move |State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    ([(header::CONTENT_TYPE, "image/png")], png_header(width, height))
                }),
            )
            .with_state(hits)
    }

    #[tokio::test]
    async fn test_image_size_reads_header_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let client = mock_backend(png_route(640, 480, Arc::clone(&hits))).await;

        let expected = Some(ImageSize {
            width: 640,
            height: 480,
        });
        assert_eq!(client.image_size("/img/photo.png").await, expected);
        assert_eq!(client.image_size("/img/photo.png").await, expected);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreadable_images_have_no_size() {
        let router = Router::new()
            .route("/img/text.png", get(|| async { "not an image" }))
            .route("/img/gone.png", get(|| async { StatusCode::NOT_FOUND }));
        let client = mock_backend(router).await;

        assert_eq!(client.image_size("/img/text.png").await, None);
        assert_eq!(client.image_size("/img/gone.png").await, None);
        assert_eq!(client.image_size("data:image/png;base64,AAAA").await, None);
    }

    #[test]
    fn test_zero_dimensions_are_rejected() {
        let empty = imagesize::ImageSize {
            width: 0,
            height: 10,
        };
        assert_eq!(pixel_size(&empty), None);
    }

    #[tokio::test]
    async fn test_description_image_upload_returns_url() {
        async fn upload(mut multipart: Multipart) -> Json<serde_json::Value> {
            let field = multipart.next_field().await.unwrap().unwrap();
            assert_eq!(field.name(), Some("image"));
            assert_eq!(field.file_name(), Some("detail.png"));
            Json(serde_json::json!({"url": "/uploads/detail.png"}))
        }

        let client =
            mock_backend(Router::new().route("/api/products/description-image", post(upload)))
                .await;
        let url = client
            .upload_description_image(
                "admin-token",
                Upload {
                    file_name: "detail.png".to_string(),
                    content_type: "image/png".to_string(),
                    bytes: png_header(10, 10),
                },
            )
            .await
            .unwrap();
        assert_eq!(url, "/uploads/detail.png");
    }
}
