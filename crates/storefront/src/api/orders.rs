//! Cart, orders and coupons.

use reqwest::Method;
use tracing::instrument;
use vitrine_core::{CouponId, OrderId, OrderStatus, ProductId};

use super::{
    ApiError, BackendClient, Cart, Coupon, CouponDailyUsage, CouponUsagePoint, DeliveryDetails,
    GuestOrderRequest, Order,
};

impl BackendClient {
    // =========================================================================
    // Cart (authenticated shoppers)
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn cart(&self, token: &str) -> Result<Cart, ApiError> {
        let url = self.url("cart")?;
        self.get_json(url, Some(token)).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the line (e.g. out of stock).
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        token: &str,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let url = self.url_with_query(
            "cart/add",
            &[
                ("productId", product_id.to_string()),
                ("quantity", quantity.to_string()),
            ],
        )?;
        self.send_empty(Method::POST, url, Some(token)).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn remove_from_cart(&self, token: &str, product_id: ProductId) -> Result<(), ApiError> {
        let url = self.url(&format!("cart/{product_id}"))?;
        self.send_empty(Method::DELETE, url, Some(token)).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order from the authenticated shopper's backend cart.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] with the backend's reason (unconfirmed
    /// email, empty cart, coupon refused, not enough stock, ...).
    #[instrument(skip(self, token, delivery), fields(city = %delivery.city))]
    pub async fn create_order(
        &self,
        token: &str,
        delivery: &DeliveryDetails,
        coupon_code: Option<&str>,
    ) -> Result<Order, ApiError> {
        let mut pairs = vec![
            ("clientFullName", delivery.client_full_name.clone()),
            ("city", delivery.city.clone()),
            ("address", delivery.address.clone()),
            ("phoneNumber", delivery.phone_number.clone()),
        ];
        if let Some(code) = coupon_code {
            pairs.push(("couponCode", code.to_string()));
        }
        let url = self.url_with_query("orders", &pairs)?;
        let response = Self::send(self.request(Method::POST, url, Some(token))).await?;
        Self::decode(response).await
    }

    /// Place an order for a shopper without an account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] with the backend's reason.
    #[instrument(skip(self, request), fields(city = %request.delivery.city, lines = request.cart_items.len()))]
    pub async fn create_guest_order(&self, request: &GuestOrderRequest) -> Result<Order, ApiError> {
        let url = self.url("orders/guest")?;
        self.send_json(Method::POST, url, None, request).await
    }

    /// The authenticated shopper's order history.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn user_orders(&self, token: &str) -> Result<Vec<Order>, ApiError> {
        let url = self.url("orders/user")?;
        self.get_json(url, Some(token)).await
    }

    /// Every active order (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn orders(&self, token: &str) -> Result<Vec<Order>, ApiError> {
        let url = self.url("orders")?;
        self.get_json(url, Some(token)).await
    }

    /// Soft-deleted orders (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn deleted_orders(&self, token: &str) -> Result<Vec<Order>, ApiError> {
        let url = self.url("orders/deleted")?;
        self.get_json(url, Some(token)).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the transition.
    #[instrument(skip(self, token), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        token: &str,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        let url = self.url_with_query(
            &format!("orders/{id}/status"),
            &[("status", status.as_str().to_string())],
        )?;
        self.send_empty(Method::PUT, url, Some(token)).await
    }

    /// Soft-delete an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn delete_order(&self, token: &str, id: OrderId) -> Result<(), ApiError> {
        let url = self.url(&format!("orders/{id}"))?;
        self.send_empty(Method::DELETE, url, Some(token)).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn restore_order(&self, token: &str, id: OrderId) -> Result<(), ApiError> {
        let url = self.url(&format!("orders/{id}/restore"))?;
        self.send_empty(Method::POST, url, Some(token)).await
    }

    /// Soft-delete every order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn delete_all_orders(&self, token: &str) -> Result<(), ApiError> {
        let url = self.url("orders/all")?;
        self.send_empty(Method::DELETE, url, Some(token)).await
    }

    /// CSV export of every order, as produced by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn export_orders(&self, token: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.url("orders/export")?;
        let response = Self::send(self.request(Method::GET, url, Some(token))).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Look a coupon up by code. The backend refuses unknown and expired codes.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] or [`ApiError::Rejected`] for unusable codes.
    #[instrument(skip(self, token))]
    pub async fn validate_coupon(&self, token: Option<&str>, code: &str) -> Result<Coupon, ApiError> {
        let mut url = self.url("coupons/validate/")?;
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(code.trim());
        }
        self.get_json(url, token).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn coupons(&self, token: &str) -> Result<Vec<Coupon>, ApiError> {
        let url = self.url("coupons")?;
        self.get_json(url, Some(token)).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the coupon (e.g. duplicate code).
    #[instrument(skip(self, token, coupon), fields(code = %coupon.code))]
    pub async fn create_coupon(&self, token: &str, coupon: &Coupon) -> Result<Coupon, ApiError> {
        let url = self.url("coupons")?;
        self.send_json(Method::POST, url, Some(token), coupon).await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(coupon_id = %id))]
    pub async fn delete_coupon(&self, token: &str, id: CouponId) -> Result<(), ApiError> {
        let url = self.url(&format!("coupons/{id}"))?;
        self.send_empty(Method::DELETE, url, Some(token)).await
    }

    /// Coupon uses per day, all coupons combined.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn coupon_usage(&self, token: &str) -> Result<Vec<CouponUsagePoint>, ApiError> {
        let url = self.url("coupons/usage-statistics")?;
        self.get_json(url, Some(token)).await
    }

    /// Uses per day of a single coupon.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(coupon_id = %id))]
    pub async fn coupon_usage_by_id(
        &self,
        token: &str,
        id: CouponId,
    ) -> Result<Vec<CouponDailyUsage>, ApiError> {
        let url = self.url(&format!("coupons/{id}/usage-statistics"))?;
        self.get_json(url, Some(token)).await
    }
}
