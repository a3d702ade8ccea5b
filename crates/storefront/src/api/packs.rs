//! Packs and custom packs.

use reqwest::Method;
use tracing::instrument;
use vitrine_core::{CustomPackId, PackId, PackItemId, ProductId};

use super::{ApiError, BackendClient, CacheKey, CustomPack, Pack, PackInput, Upload};

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct DefaultProductUpdate {
    product_id: ProductId,
}

impl BackendClient {
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn packs(&self) -> Result<Vec<Pack>, ApiError> {
        self.get_cached(CacheKey::Packs, "packs").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the pack does not exist.
    #[instrument(skip(self), fields(pack_id = %id))]
    pub async fn pack(&self, id: PackId) -> Result<Pack, ApiError> {
        self.get_cached(CacheKey::Pack(id), &format!("packs/{id}"))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the pack.
    #[instrument(skip(self, token, image), fields(name = %input.name))]
    pub async fn create_pack(
        &self,
        token: &str,
        input: &PackInput,
        image: Option<Upload>,
    ) -> Result<Pack, ApiError> {
        let url = self.url("packs")?;
        let pack = self
            .send_multipart(
                Method::POST,
                url,
                Some(token),
                ("pack", input),
                ("image", image.into_iter().collect()),
            )
            .await?;
        self.invalidate_catalog();
        Ok(pack)
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, image), fields(pack_id = %id))]
    pub async fn update_pack(
        &self,
        token: &str,
        id: PackId,
        input: &PackInput,
        image: Option<Upload>,
    ) -> Result<Pack, ApiError> {
        let url = self.url(&format!("packs/{id}"))?;
        let pack = self
            .send_multipart(
                Method::PUT,
                url,
                Some(token),
                ("pack", input),
                ("image", image.into_iter().collect()),
            )
            .await?;
        self.invalidate_catalog();
        Ok(pack)
    }

    /// Change which product a pack slot ships with by default.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the product for that slot.
    #[instrument(skip(self, token), fields(pack_id = %pack_id, item_id = %item_id))]
    pub async fn update_pack_default_product(
        &self,
        token: &str,
        pack_id: PackId,
        item_id: PackItemId,
        product_id: ProductId,
    ) -> Result<Pack, ApiError> {
        let url = self.url(&format!("packs/{pack_id}/items/{item_id}/default-product"))?;
        let pack = self
            .send_json(
                Method::PUT,
                url,
                Some(token),
                &DefaultProductUpdate { product_id },
            )
            .await?;
        self.invalidate_catalog();
        Ok(pack)
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token), fields(pack_id = %id))]
    pub async fn delete_pack(&self, token: &str, id: PackId) -> Result<(), ApiError> {
        let url = self.url(&format!("packs/{id}"))?;
        self.send_empty(Method::DELETE, url, Some(token)).await?;
        self.invalidate_catalog();
        Ok(())
    }

    // =========================================================================
    // Custom packs
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn custom_packs(&self) -> Result<Vec<CustomPack>, ApiError> {
        self.get_cached(CacheKey::CustomPacks, "custom-packs").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the custom pack does not exist.
    #[instrument(skip(self), fields(custom_pack_id = %id))]
    pub async fn custom_pack(&self, id: CustomPackId) -> Result<CustomPack, ApiError> {
        self.get_cached(CacheKey::CustomPack(id), &format!("custom-packs/{id}"))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the custom pack.
    #[instrument(skip(self, token, pack), fields(name = %pack.name))]
    pub async fn create_custom_pack(
        &self,
        token: &str,
        pack: &CustomPack,
    ) -> Result<CustomPack, ApiError> {
        let url = self.url("custom-packs")?;
        let created = self.send_json(Method::POST, url, Some(token), pack).await?;
        self.invalidate_catalog();
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, token, pack), fields(custom_pack_id = %id))]
    pub async fn update_custom_pack(
        &self,
        token: &str,
        id: CustomPackId,
        pack: &CustomPack,
    ) -> Result<CustomPack, ApiError> {
        let url = self.url(&format!("custom-packs/{id}"))?;
        let updated = self.send_json(Method::PUT, url, Some(token), pack).await?;
        self.invalidate_catalog();
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the deletion.
    #[instrument(skip(self, token), fields(custom_pack_id = %id))]
    pub async fn delete_custom_pack(&self, token: &str, id: CustomPackId) -> Result<(), ApiError> {
        let url = self.url(&format!("custom-packs/{id}"))?;
        self.send_empty(Method::DELETE, url, Some(token)).await?;
        self.invalidate_catalog();
        Ok(())
    }
}
