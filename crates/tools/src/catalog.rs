//! In-process catalog gateway
//!
//! Holds products, carts, orders and customers behind a single
//! `parking_lot::Mutex`. Each operation takes the lock once, re-reads the
//! stock or status it depends on and mutates in the same critical section.
//! No await point is ever reached while the lock is held.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pharmacy_assistant_core::{
    Cart, CartLine, CartUpdate, CustomerId, CustomerProfile, OrderId, OrderStatus, OrderSummary,
    OrderTracking, Product, ProductId, ProductType, ReorderOutcome, Substitute, SubstituteList,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

use crate::gateway::{CatalogGateway, GatewayError, GatewayResult};

const SEARCH_LIMIT: usize = 10;
const RECOMMENDATION_LIMIT: usize = 5;
const SUBSTITUTE_LIMIT: usize = 5;

/// Seed file errors
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Failed to read catalog seed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog seed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid catalog seed: {0}")]
    Invalid(String),
}

/// One line of a stored order
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price at the time of ordering; defaults to the current product price
    #[serde(default)]
    pub unit_price: Option<f64>,
}

#[derive(Debug, Clone)]
struct StoredOrder {
    order_id: OrderId,
    customer_id: CustomerId,
    order_date: DateTime<Utc>,
    status: OrderStatus,
    prescription_status: Option<String>,
    requires_prescription: bool,
    items: Vec<OrderItem>,
    total_amount: f64,
    status_history: Vec<(OrderStatus, DateTime<Utc>)>,
    /// Stock was taken when the order was placed
    stock_reserved: bool,
}

impl StoredOrder {
    fn summary(&self) -> OrderSummary {
        OrderSummary {
            order_id: self.order_id,
            order_date: self.order_date,
            total_amount: self.total_amount,
            status: self.status,
            prescription_status: self.prescription_status.clone(),
            requires_prescription: self.requires_prescription,
        }
    }

    fn tracking(&self) -> OrderTracking {
        OrderTracking {
            order_id: self.order_id,
            current_status: self.status,
            order_date: self.order_date,
            total_amount: self.total_amount,
            prescription_status: self.prescription_status.clone(),
            tracking_stages: self.status.tracking_stages(),
        }
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    products: BTreeMap<ProductId, Product>,
    customers: BTreeMap<CustomerId, CustomerProfile>,
    /// Cart lines per customer, in insertion order
    carts: HashMap<CustomerId, Vec<(ProductId, u32)>>,
    orders: Vec<StoredOrder>,
    next_order_id: OrderId,
}

impl CatalogState {
    fn product(&self, product_id: ProductId) -> GatewayResult<&Product> {
        self.products
            .get(&product_id)
            .ok_or(GatewayError::ProductNotFound)
    }

    fn cart(&self, customer_id: CustomerId) -> Cart {
        let lines = self
            .carts
            .get(&customer_id)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|(product_id, quantity)| {
                        let product = self.products.get(product_id)?;
                        Some(CartLine {
                            product_id: *product_id,
                            product_name: product.name.clone(),
                            price: product.price,
                            quantity: *quantity,
                            subtotal: product.price * f64::from(*quantity),
                            requires_prescription: product.requires_prescription(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Cart::from_lines(lines)
    }

    /// Merge `quantity` into the customer's line for `product_id`. Saturates at
    /// `u32::MAX`; callers check stock before merging.
    fn merge_line(&mut self, customer_id: CustomerId, product_id: ProductId, quantity: u32) {
        let lines = self.carts.entry(customer_id).or_default();
        match lines.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, existing)) => *existing = existing.saturating_add(quantity),
            None => lines.push((product_id, quantity)),
        }
    }

    fn line_quantity(&self, customer_id: CustomerId, product_id: ProductId) -> Option<u32> {
        self.carts
            .get(&customer_id)?
            .iter()
            .find(|(id, _)| *id == product_id)
            .map(|(_, q)| *q)
    }

    /// Orders of one customer, newest first
    fn customer_orders(&self, customer_id: CustomerId) -> Vec<&StoredOrder> {
        let mut orders: Vec<&StoredOrder> = self
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .collect();
        orders.sort_by(|a, b| {
            b.order_date
                .cmp(&a.order_date)
                .then(b.order_id.cmp(&a.order_id))
        });
        orders
    }

    fn order_total(&self, items: &[OrderItem]) -> f64 {
        items
            .iter()
            .map(|item| {
                let price = item
                    .unit_price
                    .or_else(|| self.products.get(&item.product_id).map(|p| p.price))
                    .unwrap_or(0.0);
                price * f64::from(item.quantity)
            })
            .sum()
    }
}

/// Seed document: products, customers and historical orders
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub customers: Vec<CustomerProfile>,
    #[serde(default)]
    pub orders: Vec<SeedOrder>,
}

#[derive(Debug, Deserialize)]
pub struct SeedOrder {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub customer_id: CustomerId,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub prescription_status: Option<String>,
    pub items: Vec<OrderItem>,
}

/// Catalog gateway backed by process memory
#[derive(Debug)]
pub struct InMemoryCatalog {
    state: Mutex<CatalogState>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CatalogState {
                next_order_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Build a catalog from a seed document. Seeded orders are history and do
    /// not reserve stock.
    pub fn from_seed(seed: CatalogSeed) -> Result<Self, SeedError> {
        let catalog = Self::new();
        {
            let mut state = catalog.state.lock();
            for product in seed.products {
                if state.products.insert(product.id, product.clone()).is_some() {
                    return Err(SeedError::Invalid(format!(
                        "duplicate product id {}",
                        product.id
                    )));
                }
            }
            for customer in seed.customers {
                state.customers.insert(customer.customer_id, customer);
            }
            for order in seed.orders {
                let order_id = order.order_id.unwrap_or(state.next_order_id);
                if state.orders.iter().any(|o| o.order_id == order_id) {
                    return Err(SeedError::Invalid(format!("duplicate order id {order_id}")));
                }
                let order_date = order.order_date.unwrap_or_else(Utc::now);
                let requires_prescription = order.items.iter().any(|item| {
                    state
                        .products
                        .get(&item.product_id)
                        .is_some_and(|p| p.requires_prescription())
                });
                let total_amount = state.order_total(&order.items);
                state.orders.push(StoredOrder {
                    order_id,
                    customer_id: order.customer_id,
                    order_date,
                    status: order.status,
                    prescription_status: order.prescription_status,
                    requires_prescription,
                    items: order.items,
                    total_amount,
                    status_history: vec![(order.status, order_date)],
                    stock_reserved: false,
                });
                state.next_order_id = state.next_order_id.max(order_id + 1);
            }
        }
        Ok(catalog)
    }

    /// Load a seed document from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let seed: CatalogSeed = serde_json::from_str(&raw)?;
        let catalog = Self::from_seed(seed)?;
        tracing::info!(
            path = %path.display(),
            products = catalog.state.lock().products.len(),
            "Loaded catalog seed"
        );
        Ok(catalog)
    }

    /// Add or replace a product
    pub fn upsert_product(&self, product: Product) {
        self.state.lock().products.insert(product.id, product);
    }

    pub fn upsert_customer(&self, customer: CustomerProfile) {
        self.state
            .lock()
            .customers
            .insert(customer.customer_id, customer);
    }

    /// Place an order, reserving stock for every line
    pub fn insert_order(
        &self,
        customer_id: CustomerId,
        items: Vec<(ProductId, u32)>,
        status: OrderStatus,
    ) -> GatewayResult<OrderId> {
        let mut state = self.state.lock();

        for (product_id, quantity) in &items {
            let product = state.product(*product_id)?;
            if product.quantity < *quantity {
                return Err(GatewayError::StockInsufficient {
                    available: product.quantity,
                });
            }
        }

        let mut order_items = Vec::with_capacity(items.len());
        let mut requires_prescription = false;
        for (product_id, quantity) in items {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.quantity -= quantity;
                requires_prescription |= product.requires_prescription();
                order_items.push(OrderItem {
                    product_id,
                    quantity,
                    unit_price: Some(product.price),
                });
            }
        }

        let order_id = state.next_order_id;
        state.next_order_id += 1;
        let now = Utc::now();
        let total_amount = state.order_total(&order_items);
        state.orders.push(StoredOrder {
            order_id,
            customer_id,
            order_date: now,
            status,
            prescription_status: requires_prescription.then(|| "Pending".to_string()),
            requires_prescription,
            items: order_items,
            total_amount,
            status_history: vec![(status, now)],
            stock_reserved: true,
        });

        Ok(order_id)
    }

    /// Current stock of a product
    pub fn product_stock(&self, product_id: ProductId) -> Option<u32> {
        self.state.lock().products.get(&product_id).map(|p| p.quantity)
    }

    /// Status transitions recorded for an order, oldest first
    pub fn status_history(&self, order_id: OrderId) -> Vec<OrderStatus> {
        self.state
            .lock()
            .orders
            .iter()
            .find(|o| o.order_id == order_id)
            .map(|o| o.status_history.iter().map(|(s, _)| *s).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CatalogGateway for InMemoryCatalog {
    async fn search_products(&self, query: &str) -> GatewayResult<Vec<Product>> {
        let needle = query.trim().to_lowercase();
        let state = self.state.lock();
        Ok(state
            .products
            .values()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .take(SEARCH_LIMIT)
            .cloned()
            .collect())
    }

    async fn product_names(&self) -> GatewayResult<Vec<String>> {
        let state = self.state.lock();
        Ok(state.products.values().map(|p| p.name.clone()).collect())
    }

    async fn get_product(&self, product_id: ProductId) -> GatewayResult<Product> {
        self.state.lock().product(product_id).cloned()
    }

    async fn get_cart(&self, customer_id: CustomerId) -> GatewayResult<Cart> {
        Ok(self.state.lock().cart(customer_id))
    }

    async fn add_to_cart(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> GatewayResult<CartUpdate> {
        let mut state = self.state.lock();
        let product = state.product(product_id)?;
        let product_name = product.name.clone();
        let available = product.quantity;

        let in_cart = state.line_quantity(customer_id, product_id).unwrap_or(0);
        in_cart
            .checked_add(quantity)
            .filter(|total| *total <= available)
            .ok_or(GatewayError::StockInsufficient { available })?;

        state.merge_line(customer_id, product_id, quantity);
        tracing::debug!(customer_id, product_id, quantity, "Added to cart");

        Ok(CartUpdate {
            product_name,
            cart: state.cart(customer_id),
        })
    }

    async fn remove_from_cart(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> GatewayResult<String> {
        let mut state = self.state.lock();
        let lines = state
            .carts
            .get_mut(&customer_id)
            .ok_or(GatewayError::NotInCart)?;
        let position = lines
            .iter()
            .position(|(id, _)| *id == product_id)
            .ok_or(GatewayError::NotInCart)?;
        lines.remove(position);

        let name = state
            .products
            .get(&product_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        Ok(name)
    }

    async fn update_cart_quantity(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> GatewayResult<CartUpdate> {
        let mut state = self.state.lock();
        if state.line_quantity(customer_id, product_id).is_none() {
            return Err(GatewayError::NotInCart);
        }
        let product = state.product(product_id)?;
        let product_name = product.name.clone();
        if product.quantity < quantity {
            return Err(GatewayError::StockInsufficient {
                available: product.quantity,
            });
        }

        if let Some(lines) = state.carts.get_mut(&customer_id) {
            if quantity == 0 {
                lines.retain(|(id, _)| *id != product_id);
            } else if let Some((_, existing)) = lines.iter_mut().find(|(id, _)| *id == product_id)
            {
                *existing = quantity;
            }
        }

        Ok(CartUpdate {
            product_name,
            cart: state.cart(customer_id),
        })
    }

    async fn clear_cart(&self, customer_id: CustomerId) -> GatewayResult<()> {
        self.state.lock().carts.remove(&customer_id);
        Ok(())
    }

    async fn get_orders(
        &self,
        customer_id: CustomerId,
        limit: usize,
    ) -> GatewayResult<Vec<OrderSummary>> {
        let state = self.state.lock();
        Ok(state
            .customer_orders(customer_id)
            .into_iter()
            .take(limit)
            .map(StoredOrder::summary)
            .collect())
    }

    async fn track_order(
        &self,
        customer_id: CustomerId,
        order_id: Option<OrderId>,
    ) -> GatewayResult<OrderTracking> {
        let state = self.state.lock();
        let orders = state.customer_orders(customer_id);
        match order_id {
            Some(id) => orders
                .into_iter()
                .find(|o| o.order_id == id)
                .map(StoredOrder::tracking)
                .ok_or(GatewayError::OrderNotFound),
            None => orders
                .first()
                .map(|o| o.tracking())
                .ok_or(GatewayError::NoOrders),
        }
    }

    async fn cancel_order(
        &self,
        customer_id: CustomerId,
        order_id: OrderId,
    ) -> GatewayResult<OrderSummary> {
        let mut state = self.state.lock();
        let index = state
            .orders
            .iter()
            .position(|o| o.order_id == order_id && o.customer_id == customer_id)
            .ok_or(GatewayError::OrderNotFound)?;

        let status = state.orders[index].status;
        if !status.is_cancellable() {
            return Err(GatewayError::NotCancellable { status });
        }

        // Seeded history never took stock, so there is nothing to give back
        if state.orders[index].stock_reserved {
            let items = state.orders[index].items.clone();
            for item in &items {
                if let Some(product) = state.products.get_mut(&item.product_id) {
                    product.quantity = product.quantity.saturating_add(item.quantity);
                }
            }
        }

        let order = &mut state.orders[index];
        order.status = OrderStatus::Cancelled;
        order.status_history.push((OrderStatus::Cancelled, Utc::now()));
        tracing::info!(customer_id, order_id, previous = %status, "Order cancelled");

        Ok(order.summary())
    }

    async fn reorder_last(&self, customer_id: CustomerId) -> GatewayResult<ReorderOutcome> {
        let mut state = self.state.lock();
        let (order_id, items) = state
            .customer_orders(customer_id)
            .first()
            .map(|o| (o.order_id, o.items.clone()))
            .ok_or(GatewayError::NoPreviousOrder)?;

        let mut added = Vec::new();
        for item in items {
            let Some(product) = state.products.get(&item.product_id) else {
                continue;
            };
            if product.quantity < item.quantity {
                continue;
            }
            added.push(product.name.clone());
            state.merge_line(customer_id, item.product_id, item.quantity);
        }

        Ok(ReorderOutcome {
            order_id,
            items: added,
        })
    }

    async fn get_recommendations(
        &self,
        _customer_id: Option<CustomerId>,
        category: Option<ProductType>,
    ) -> GatewayResult<Vec<Product>> {
        let state = self.state.lock();
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.in_stock())
            .filter(|p| category.map_or(true, |c| p.product_type == c))
            .cloned()
            .collect();
        products.sort_by(|a, b| b.quantity.cmp(&a.quantity));
        products.truncate(RECOMMENDATION_LIMIT);
        Ok(products)
    }

    async fn find_substitutes(&self, product_id: ProductId) -> GatewayResult<SubstituteList> {
        let state = self.state.lock();
        let original = state.product(product_id)?;

        let substitutes = state
            .products
            .values()
            .filter(|p| {
                p.id != original.id && p.product_type == original.product_type && p.in_stock()
            })
            .take(SUBSTITUTE_LIMIT)
            .map(|p| Substitute {
                product: p.clone(),
                price_difference: p.price - original.price,
            })
            .collect();

        Ok(SubstituteList {
            original: original.name.clone(),
            generic_name: original.generic_name.clone(),
            substitutes,
        })
    }

    async fn get_customer_profile(
        &self,
        customer_id: CustomerId,
    ) -> GatewayResult<CustomerProfile> {
        self.state
            .lock()
            .customers
            .get(&customer_id)
            .cloned()
            .ok_or(GatewayError::CustomerNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: ProductId, name: &str, price: f64, quantity: u32, rx: bool) -> Product {
        Product {
            id,
            name: name.to_string(),
            generic_name: name.to_string(),
            company: "Acme Pharma".to_string(),
            price,
            quantity,
            product_type: if rx { ProductType::Rx } else { ProductType::Otc },
        }
    }

    fn catalog() -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        catalog.upsert_product(product(1, "Aspirin", 5.0, 10, false));
        catalog.upsert_product(product(2, "Paracetamol 500mg", 2.5, 50, false));
        catalog.upsert_product(product(3, "Amoxicillin", 12.0, 3, true));
        catalog.upsert_product(product(4, "Crocin", 3.0, 0, false));
        catalog
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let catalog = catalog();
        let found = catalog.search_products("PARA").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Paracetamol 500mg");
        assert!(catalog.search_products("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_merges_lines() {
        let catalog = catalog();
        catalog.add_to_cart(7, 1, 2).await.unwrap();
        let update = catalog.add_to_cart(7, 1, 2).await.unwrap();

        assert_eq!(update.product_name, "Aspirin");
        assert_eq!(update.cart.items.len(), 1);
        assert_eq!(update.cart.items[0].quantity, 4);
        assert!((update.cart.total - 20.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_add_checks_accumulated_quantity() {
        let catalog = catalog();
        catalog.add_to_cart(7, 3, 2).await.unwrap();
        let err = catalog.add_to_cart(7, 3, 2).await.unwrap_err();
        assert_eq!(err, GatewayError::StockInsufficient { available: 3 });
        assert_eq!(err.to_string(), "Only 3 units available");

        let cart = catalog.get_cart(7).await.unwrap();
        assert_eq!(cart.items[0].quantity, 2);
        assert!(cart.requires_prescription);
    }

    #[tokio::test]
    async fn test_add_rejects_quantity_overflow() {
        let catalog = catalog();
        catalog.add_to_cart(7, 1, 1).await.unwrap();
        let err = catalog.add_to_cart(7, 1, u32::MAX).await.unwrap_err();
        assert_eq!(err, GatewayError::StockInsufficient { available: 10 });

        let cart = catalog.get_cart(7).await.unwrap();
        assert_eq!(cart.items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_remove_and_update() {
        let catalog = catalog();
        assert_eq!(
            catalog.remove_from_cart(7, 1).await.unwrap_err(),
            GatewayError::NotInCart
        );

        catalog.add_to_cart(7, 1, 1).await.unwrap();
        let update = catalog.update_cart_quantity(7, 1, 5).await.unwrap();
        assert_eq!(update.cart.items[0].quantity, 5);
        assert_eq!(
            catalog.update_cart_quantity(7, 1, 11).await.unwrap_err(),
            GatewayError::StockInsufficient { available: 10 }
        );

        assert_eq!(catalog.remove_from_cart(7, 1).await.unwrap(), "Aspirin");
        assert!(catalog.get_cart(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let catalog = catalog();
        let order_id = catalog
            .insert_order(7, vec![(1, 4)], OrderStatus::PendingReview)
            .unwrap();
        assert_eq!(catalog.product_stock(1), Some(6));

        let summary = catalog.cancel_order(7, order_id).await.unwrap();
        assert_eq!(summary.status, OrderStatus::Cancelled);
        assert_eq!(catalog.product_stock(1), Some(10));
        assert_eq!(
            catalog.status_history(order_id),
            vec![OrderStatus::PendingReview, OrderStatus::Cancelled]
        );

        // Already cancelled
        assert_eq!(
            catalog.cancel_order(7, order_id).await.unwrap_err(),
            GatewayError::NotCancellable {
                status: OrderStatus::Cancelled
            }
        );
    }

    #[tokio::test]
    async fn test_cancel_seeded_order_keeps_stock() {
        let seed = CatalogSeed {
            products: vec![product(1, "Aspirin", 5.0, 10, false)],
            customers: Vec::new(),
            orders: vec![SeedOrder {
                order_id: Some(500),
                customer_id: 7,
                order_date: None,
                status: OrderStatus::PendingReview,
                prescription_status: None,
                items: vec![OrderItem {
                    product_id: 1,
                    quantity: 3,
                    unit_price: None,
                }],
            }],
        };
        let catalog = InMemoryCatalog::from_seed(seed).unwrap();

        let summary = catalog.cancel_order(7, 500).await.unwrap();
        assert_eq!(summary.status, OrderStatus::Cancelled);
        assert_eq!(catalog.product_stock(1), Some(10));

        // Orders placed at runtime still give their stock back
        let placed = catalog
            .insert_order(7, vec![(1, 2)], OrderStatus::Approved)
            .unwrap();
        assert_eq!(catalog.product_stock(1), Some(8));
        catalog.cancel_order(7, placed).await.unwrap();
        assert_eq!(catalog.product_stock(1), Some(10));
    }

    #[tokio::test]
    async fn test_cancel_allowed_while_processing() {
        let catalog = catalog();
        let order_id = catalog
            .insert_order(7, vec![(2, 5)], OrderStatus::Processing)
            .unwrap();
        let summary = catalog.cancel_order(7, order_id).await.unwrap();
        assert_eq!(summary.status, OrderStatus::Cancelled);
        assert_eq!(catalog.product_stock(2), Some(50));
    }

    #[tokio::test]
    async fn test_cancel_rejected_in_fulfilment() {
        let catalog = catalog();
        let order_id = catalog
            .insert_order(7, vec![(2, 5)], OrderStatus::OutForDelivery)
            .unwrap();
        let err = catalog.cancel_order(7, order_id).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot cancel order with status: Out for Delivery"
        );
        assert_eq!(catalog.product_stock(2), Some(45));

        // Someone else's order
        assert_eq!(
            catalog.cancel_order(8, order_id).await.unwrap_err(),
            GatewayError::OrderNotFound
        );
    }

    #[tokio::test]
    async fn test_track_latest_order() {
        let catalog = catalog();
        assert_eq!(
            catalog.track_order(7, None).await.unwrap_err(),
            GatewayError::NoOrders
        );

        catalog.insert_order(7, vec![(1, 1)], OrderStatus::Delivered).unwrap();
        let latest = catalog
            .insert_order(7, vec![(2, 1)], OrderStatus::Processing)
            .unwrap();

        let tracking = catalog.track_order(7, None).await.unwrap();
        assert_eq!(tracking.order_id, latest);
        let done: Vec<bool> = tracking.tracking_stages.iter().map(|s| s.completed).collect();
        assert_eq!(done, vec![true, true, false, false]);

        let orders = catalog.get_orders(7, 10).await.unwrap();
        assert_eq!(orders[0].order_id, latest);
    }

    #[tokio::test]
    async fn test_reorder_skips_short_stock() {
        let catalog = catalog();
        catalog
            .insert_order(7, vec![(1, 2), (3, 3)], OrderStatus::Delivered)
            .unwrap();
        // Amoxicillin stock is now 0

        let outcome = catalog.reorder_last(7).await.unwrap();
        assert_eq!(outcome.items, vec!["Aspirin".to_string()]);
        assert_eq!(catalog.get_cart(7).await.unwrap().items.len(), 1);

        assert_eq!(
            catalog.reorder_last(8).await.unwrap_err(),
            GatewayError::NoPreviousOrder
        );
    }

    #[tokio::test]
    async fn test_recommendations_and_substitutes() {
        let catalog = catalog();
        let recommended = catalog.get_recommendations(None, None).await.unwrap();
        let names: Vec<&str> = recommended.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Paracetamol 500mg", "Aspirin", "Amoxicillin"]);

        let rx_only = catalog
            .get_recommendations(None, Some(ProductType::Rx))
            .await
            .unwrap();
        assert_eq!(rx_only.len(), 1);

        let subs = catalog.find_substitutes(1).await.unwrap();
        assert_eq!(subs.original, "Aspirin");
        // Crocin is out of stock, Amoxicillin is Rx
        assert_eq!(subs.substitutes.len(), 1);
        assert_eq!(subs.substitutes[0].product.name, "Paracetamol 500mg");
        assert!((subs.substitutes[0].price_difference + 2.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "products": [{
                    "id": 1, "name": "Aspirin", "generic_name": "Acetylsalicylic acid",
                    "company": "Bayer", "price": 5.0, "quantity": 10, "product_type": "OTC"
                }],
                "customers": [{"customer_id": 7, "name": "Asha"}],
                "orders": [{"order_id": 41, "customer_id": 7, "items": [{"product_id": 1, "quantity": 2}]}]
            })
            .to_string(),
        )
        .unwrap();

        let catalog = InMemoryCatalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.product_stock(1), Some(10));
        assert_eq!(catalog.get_customer_profile(7).await.unwrap().name, "Asha");
        let orders = catalog.get_orders(7, 10).await.unwrap();
        assert_eq!(orders[0].order_id, 41);
        assert_eq!(orders[0].status, OrderStatus::PendingReview);
        assert!((orders[0].total_amount - 10.0).abs() < f64::EPSILON);

        // Ids continue after the seeded ones
        let next = catalog.insert_order(7, vec![(1, 1)], OrderStatus::Approved).unwrap();
        assert_eq!(next, 42);
    }
}
