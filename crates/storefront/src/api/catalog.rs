//! Products, categories, the hero section and product comments.

use reqwest::Method;
use tracing::instrument;
use vitrine_core::{CategoryId, ProductId};

use super::{
    ApiError, BackendClient, CacheKey, Category, CategoryInput, Comment, CommentInput, Hero, Page,
    Product, ProductInput, ProductQuery, Upload,
};

impl BackendClient {
    // =========================================================================
    // Products
    // =========================================================================

    /// Search, filter, sort and page the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the page cannot be decoded.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        let url = self.url_with_query("products", &query.to_pairs())?;
        self.get_json(url, None).await
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.get_cached(CacheKey::Product(id), &format!("products/{id}"))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn bestsellers(&self) -> Result<Vec<Product>, ApiError> {
        self.get_cached(CacheKey::Bestsellers, "products/bestsellers")
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn new_arrivals(&self) -> Result<Vec<Product>, ApiError> {
        self.get_cached(CacheKey::NewArrivals, "products/new-arrivals")
            .await
    }

    /// Products that may be picked in a custom pack.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn packable_products(&self) -> Result<Vec<Product>, ApiError> {
        let url = self.url("products/packable")?;
        self.get_json(url, None).await
    }

    /// Every product, for admin pickers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn all_products(&self) -> Result<Vec<Product>, ApiError> {
        let query = ProductQuery {
            size: Some(1000),
            sort: Some("name,asc".to_string()),
            ..ProductQuery::default()
        };
        Ok(self.products(&query).await?.content)
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the product.
    #[instrument(skip(self, token, images), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        token: &str,
        input: &ProductInput,
        images: Vec<Upload>,
    ) -> Result<Product, ApiError> {
        let url = self.url("products")?;
        let product = self
            .send_multipart(Method::POST, url, Some(token), ("product", input), ("images", images))
            .await?;
        self.invalidate_catalog();
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, images), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        token: &str,
        id: ProductId,
        input: &ProductInput,
        images: Vec<Upload>,
    ) -> Result<Product, ApiError> {
        let url = self.url(&format!("products/{id}"))?;
        let product = self
            .send_multipart(Method::PUT, url, Some(token), ("product", input), ("images", images))
            .await?;
        self.invalidate_catalog();
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(&self, token: &str, id: ProductId) -> Result<(), ApiError> {
        let url = self.url(&format!("products/{id}"))?;
        self.send_empty(Method::DELETE, url, Some(token)).await?;
        self.invalidate_catalog();
        Ok(())
    }

    /// Post a comment on a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the comment.
    #[instrument(skip(self, token, input), fields(product_id = %product_id))]
    pub async fn add_comment(
        &self,
        token: &str,
        product_id: ProductId,
        input: &CommentInput,
    ) -> Result<Comment, ApiError> {
        let url = self.url(&format!("comments/product/{product_id}"))?;
        let comment = self
            .send_json(Method::POST, url, Some(token), input)
            .await?;
        self.inner.cache.invalidate(&CacheKey::Product(product_id)).await;
        Ok(comment)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_cached(CacheKey::Categories, "categories").await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the category.
    #[instrument(skip(self, token, image), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        token: &str,
        input: &CategoryInput,
        image: Option<Upload>,
    ) -> Result<Category, ApiError> {
        let url = self.url("categories")?;
        let category = self
            .send_multipart(
                Method::POST,
                url,
                Some(token),
                ("category", input),
                ("image", image.into_iter().collect()),
            )
            .await?;
        self.invalidate_catalog();
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, image), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        token: &str,
        id: CategoryId,
        input: &CategoryInput,
        image: Option<Upload>,
    ) -> Result<Category, ApiError> {
        let url = self.url(&format!("categories/{id}"))?;
        let category = self
            .send_multipart(
                Method::PUT,
                url,
                Some(token),
                ("category", input),
                ("image", image.into_iter().collect()),
            )
            .await?;
        self.invalidate_catalog();
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token), fields(category_id = %id))]
    pub async fn delete_category(&self, token: &str, id: CategoryId) -> Result<(), ApiError> {
        let url = self.url(&format!("categories/{id}"))?;
        self.send_empty(Method::DELETE, url, Some(token)).await?;
        self.invalidate_catalog();
        Ok(())
    }

    // =========================================================================
    // Hero section
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn hero(&self) -> Result<Hero, ApiError> {
        self.get_cached(CacheKey::Hero, "hero").await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, hero, image))]
    pub async fn update_hero(
        &self,
        token: &str,
        hero: &Hero,
        image: Option<Upload>,
    ) -> Result<Hero, ApiError> {
        let url = self.url("hero")?;
        let hero = self
            .send_multipart(
                Method::PUT,
                url,
                Some(token),
                ("hero", hero),
                ("image", image.into_iter().collect()),
            )
            .await?;
        self.inner.cache.invalidate(&CacheKey::Hero).await;
        Ok(hero)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::extract::RawQuery;
    use axum::routing::get;
    use axum::{Json, Router};
    use vitrine_core::ProductType;

    use super::super::testing::mock_backend;
    use super::*;

    #[tokio::test]
    async fn test_products_forwards_filters_and_decodes_page() {
        let router = Router::new().route(
            "/api/products",
            get(|RawQuery(query): RawQuery| async move {
                Json(serde_json::json!({
                    "content": [{"id": 1, "name": "Musk", "price": 99.0}],
                    "totalPages": 3,
                    "number": 0,
                    "query": query,
                }))
            }),
        );
        let client = mock_backend(router).await;

        let query = ProductQuery {
            page: 0,
            sort: Some("price,desc".to_string()),
            search: Some("musk oil".to_string()),
            product_type: Some(ProductType::Both),
            ..ProductQuery::default()
        };
        let page = client.products(&query).await.unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.content[0].name, "Musk");
    }

    #[tokio::test]
    async fn test_query_string_is_encoded() {
        let router = Router::new().route(
            "/api/products",
            get(|RawQuery(query): RawQuery| async move {
                let query = query.unwrap_or_default();
                let name = if query.contains("search=musk+oil") && query.contains("sort=price%2Cdesc") {
                    "encoded"
                } else {
                    "raw"
                };
                Json(serde_json::json!({"content": [{"id": 1, "name": name}]}))
            }),
        );
        let client = mock_backend(router).await;
        let query = ProductQuery {
            sort: Some("price,desc".to_string()),
            search: Some("musk oil".to_string()),
            ..ProductQuery::default()
        };
        let page = client.products(&query).await.unwrap();
        assert_eq!(page.content[0].name, "encoded");
    }
}
