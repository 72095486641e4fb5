//! Catalog gateway
//!
//! The assistant never touches catalog storage directly. Every product, cart
//! and order operation goes through [`CatalogGateway`], so the storefront
//! backend can be swapped without touching the dialogue logic.

use async_trait::async_trait;
use pharmacy_assistant_core::{
    Cart, CartUpdate, CustomerId, CustomerProfile, OrderId, OrderStatus, OrderSummary,
    OrderTracking, Product, ProductId, ProductType, ReorderOutcome, SubstituteList,
};
use thiserror::Error;

/// Gateway errors
///
/// Every variant except [`GatewayError::Internal`] is a domain failure whose
/// message is safe to show to the customer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Only {available} units available")]
    StockInsufficient { available: u32 },

    #[error("Medicine not found")]
    ProductNotFound,

    #[error("Item not found in cart")]
    NotInCart,

    #[error("Order not found")]
    OrderNotFound,

    #[error("No orders found")]
    NoOrders,

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Cannot cancel order with status: {status}")]
    NotCancellable { status: OrderStatus },

    #[error("No previous orders found")]
    NoPreviousOrder,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    /// Business-rule failure rather than an infrastructure fault
    pub fn is_domain(&self) -> bool {
        !matches!(self, GatewayError::Internal(_))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Catalog, cart and order operations used by the dialogue dispatcher
///
/// Implementations must re-read stock and order status inside the same
/// critical section that mutates them.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Case-insensitive name search, at most 10 results
    async fn search_products(&self, query: &str) -> GatewayResult<Vec<Product>>;

    /// Every product name, for fuzzy resolution
    async fn product_names(&self) -> GatewayResult<Vec<String>>;

    async fn get_product(&self, product_id: ProductId) -> GatewayResult<Product>;

    async fn get_cart(&self, customer_id: CustomerId) -> GatewayResult<Cart>;

    /// Add to an existing line or create one. Fails when the resulting line
    /// quantity would exceed stock.
    async fn add_to_cart(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> GatewayResult<CartUpdate>;

    /// Returns the removed product's name
    async fn remove_from_cart(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> GatewayResult<String>;

    /// Set a line's quantity; zero removes the line
    async fn update_cart_quantity(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> GatewayResult<CartUpdate>;

    async fn clear_cart(&self, customer_id: CustomerId) -> GatewayResult<()>;

    /// Newest first
    async fn get_orders(
        &self,
        customer_id: CustomerId,
        limit: usize,
    ) -> GatewayResult<Vec<OrderSummary>>;

    /// Tracking for `order_id`, or for the latest order when `None`
    async fn track_order(
        &self,
        customer_id: CustomerId,
        order_id: Option<OrderId>,
    ) -> GatewayResult<OrderTracking>;

    /// Cancel a Pending Review or Approved order and restore its stock
    async fn cancel_order(
        &self,
        customer_id: CustomerId,
        order_id: OrderId,
    ) -> GatewayResult<OrderSummary>;

    /// Re-add the lines of the latest order that are still in stock
    async fn reorder_last(&self, customer_id: CustomerId) -> GatewayResult<ReorderOutcome>;

    /// In-stock products by stock level, at most 5
    async fn get_recommendations(
        &self,
        customer_id: Option<CustomerId>,
        category: Option<ProductType>,
    ) -> GatewayResult<Vec<Product>>;

    /// In-stock products of the same type, at most 5
    async fn find_substitutes(&self, product_id: ProductId) -> GatewayResult<SubstituteList>;

    async fn get_customer_profile(&self, customer_id: CustomerId)
        -> GatewayResult<CustomerProfile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GatewayError::StockInsufficient { available: 3 }.to_string(),
            "Only 3 units available"
        );
        assert_eq!(
            GatewayError::NotCancellable {
                status: OrderStatus::OutForDelivery
            }
            .to_string(),
            "Cannot cancel order with status: Out for Delivery"
        );
        assert_eq!(GatewayError::ProductNotFound.to_string(), "Medicine not found");
    }

    #[test]
    fn test_domain_classification() {
        assert!(GatewayError::NoPreviousOrder.is_domain());
        assert!(GatewayError::NotInCart.is_domain());
        assert!(!GatewayError::internal("pool exhausted").is_domain());
    }
}
