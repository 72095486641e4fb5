//! Integration tests for the action dispatcher (classify -> gateway -> reply)
//!
//! The catalog is wrapped in a counting gateway so tests can check how many
//! backend calls a message caused.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use pharmacy_assistant_agent::{ContextStore, Dispatcher, InMemoryContextStore};
use pharmacy_assistant_core::{
    AuthContext, Cart, CartUpdate, CustomerId, CustomerProfile, DialoguePayload, Intent, OrderId,
    OrderStatus, OrderSummary, OrderTracking, Product, ProductId, ProductType, ReorderOutcome,
    SubstituteList,
};
use pharmacy_assistant_persistence::{AuditLog, AuditRecord, InMemoryAuditLog, PersistenceError};
use pharmacy_assistant_tools::{CatalogGateway, GatewayResult, InMemoryCatalog};

const CUSTOMER: CustomerId = 7;

/// Delegating gateway that counts calls and can be slowed down
struct CountingGateway {
    inner: Arc<InMemoryCatalog>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingGateway {
    fn new(inner: Arc<InMemoryCatalog>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    fn slow(inner: Arc<InMemoryCatalog>, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(inner)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CatalogGateway for CountingGateway {
    async fn search_products(&self, query: &str) -> GatewayResult<Vec<Product>> {
        self.tick().await;
        self.inner.search_products(query).await
    }

    async fn product_names(&self) -> GatewayResult<Vec<String>> {
        self.tick().await;
        self.inner.product_names().await
    }

    async fn get_product(&self, product_id: ProductId) -> GatewayResult<Product> {
        self.tick().await;
        self.inner.get_product(product_id).await
    }

    async fn get_cart(&self, customer_id: CustomerId) -> GatewayResult<Cart> {
        self.tick().await;
        self.inner.get_cart(customer_id).await
    }

    async fn add_to_cart(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> GatewayResult<CartUpdate> {
        self.tick().await;
        self.inner.add_to_cart(customer_id, product_id, quantity).await
    }

    async fn remove_from_cart(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> GatewayResult<String> {
        self.tick().await;
        self.inner.remove_from_cart(customer_id, product_id).await
    }

    async fn update_cart_quantity(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> GatewayResult<CartUpdate> {
        self.tick().await;
        self.inner
            .update_cart_quantity(customer_id, product_id, quantity)
            .await
    }

    async fn clear_cart(&self, customer_id: CustomerId) -> GatewayResult<()> {
        self.tick().await;
        self.inner.clear_cart(customer_id).await
    }

    async fn get_orders(
        &self,
        customer_id: CustomerId,
        limit: usize,
    ) -> GatewayResult<Vec<OrderSummary>> {
        self.tick().await;
        self.inner.get_orders(customer_id, limit).await
    }

    async fn track_order(
        &self,
        customer_id: CustomerId,
        order_id: Option<OrderId>,
    ) -> GatewayResult<OrderTracking> {
        self.tick().await;
        self.inner.track_order(customer_id, order_id).await
    }

    async fn cancel_order(
        &self,
        customer_id: CustomerId,
        order_id: OrderId,
    ) -> GatewayResult<OrderSummary> {
        self.tick().await;
        self.inner.cancel_order(customer_id, order_id).await
    }

    async fn reorder_last(&self, customer_id: CustomerId) -> GatewayResult<ReorderOutcome> {
        self.tick().await;
        self.inner.reorder_last(customer_id).await
    }

    async fn get_recommendations(
        &self,
        customer_id: Option<CustomerId>,
        category: Option<ProductType>,
    ) -> GatewayResult<Vec<Product>> {
        self.tick().await;
        self.inner.get_recommendations(customer_id, category).await
    }

    async fn find_substitutes(&self, product_id: ProductId) -> GatewayResult<SubstituteList> {
        self.tick().await;
        self.inner.find_substitutes(product_id).await
    }

    async fn get_customer_profile(
        &self,
        customer_id: CustomerId,
    ) -> GatewayResult<CustomerProfile> {
        self.tick().await;
        self.inner.get_customer_profile(customer_id).await
    }
}

/// Audit log whose every write fails
struct BrokenAuditLog;

#[async_trait]
impl AuditLog for BrokenAuditLog {
    async fn append(&self, _record: AuditRecord) -> Result<Uuid, PersistenceError> {
        Err(PersistenceError::Unavailable("disk full".to_string()))
    }

    async fn get(&self, _id: Uuid) -> Result<Option<AuditRecord>, PersistenceError> {
        Ok(None)
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<AuditRecord>, PersistenceError> {
        Ok(Vec::new())
    }

    async fn flag(&self, _id: Uuid) -> Result<bool, PersistenceError> {
        Ok(false)
    }
}

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

fn catalog() -> Arc<InMemoryCatalog> {
    let catalog = InMemoryCatalog::new();
    catalog.upsert_product(product(1, "Aspirin", 5.0, 10, false));
    catalog.upsert_product(product(2, "Paracetamol 500mg", 2.5, 50, false));
    catalog.upsert_product(product(3, "Amoxicillin", 12.0, 3, true));
    catalog.upsert_customer(CustomerProfile {
        customer_id: CUSTOMER,
        name: "Asha".to_string(),
        email: None,
        phone: None,
    });
    Arc::new(catalog)
}

struct Harness {
    dispatcher: Dispatcher,
    gateway: Arc<CountingGateway>,
    catalog: Arc<InMemoryCatalog>,
    contexts: Arc<InMemoryContextStore>,
    audit: Arc<InMemoryAuditLog>,
}

fn harness() -> Harness {
    let catalog = catalog();
    let gateway = Arc::new(CountingGateway::new(catalog.clone()));
    let contexts = Arc::new(InMemoryContextStore::new(5, None));
    let audit = Arc::new(InMemoryAuditLog::new());
    let dispatcher = Dispatcher::new(gateway.clone(), contexts.clone(), audit.clone()).unwrap();
    Harness {
        dispatcher,
        gateway,
        catalog,
        contexts,
        audit,
    }
}

fn customer() -> Option<AuthContext> {
    Some(AuthContext::customer(CUSTOMER))
}

#[tokio::test]
async fn test_unauthenticated_add_makes_no_gateway_call() {
    let h = harness();
    let result = h
        .dispatcher
        .handle_query("add aspirin to cart", "anonymous", None)
        .await;

    assert_eq!(result.intent, Intent::AddToCart);
    assert!(result.requires_auth);
    assert_eq!(
        result.answer,
        "To add items to your cart, you'll need to log in or create an account first.\n\nWould you like me to guide you to the login page?"
    );
    assert_eq!(h.gateway.calls(), 0);
    // Still audited
    assert!(result.log_id.is_some());
}

#[tokio::test]
async fn test_repeated_add_merges_quantity() {
    let h = harness();
    h.dispatcher
        .handle_query("add 2 aspirin to cart", "customer:7", customer())
        .await;
    let result = h
        .dispatcher
        .handle_query("add 2 aspirin to cart", "customer:7", customer())
        .await;

    let Some(DialoguePayload::Cart(cart)) = &result.payload else {
        panic!("expected a cart payload, got {:?}", result.payload);
    };
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.line(1).map(|l| l.quantity), Some(4));
    assert!(result.answer.starts_with("Added Aspirin to cart"));
    assert!(result.answer.ends_with("Your cart total is now ₹20.00."));
    assert_eq!(
        result.suggested_actions,
        vec!["view_cart", "continue_shopping", "checkout"]
    );
}

#[tokio::test]
async fn test_follow_up_uses_context_entity() {
    let h = harness();
    let first = h
        .dispatcher
        .handle_query("tell me about paracetamol", "s1", None)
        .await;
    assert_eq!(first.intent, Intent::ProductInfo);
    assert_eq!(first.entity.as_deref(), Some("Paracetamol 500mg"));
    assert!(!first.from_context);

    let follow_up = h.dispatcher.handle_query("is it available", "s1", None).await;
    assert_eq!(follow_up.intent, Intent::CheckAvailability);
    assert_eq!(follow_up.entity.as_deref(), Some("Paracetamol 500mg"));
    assert!(follow_up.from_context);
    assert_eq!(
        follow_up.answer,
        "Yes, **Paracetamol 500mg** is available! We have 50 units in stock at ₹2.50 each."
    );

    // Another session has no history to fall back on
    let calls = h.gateway.calls();
    let other = h.dispatcher.handle_query("is it available", "s2", None).await;
    assert!(other.needs_clarification);
    assert_eq!(h.gateway.calls(), calls);
}

#[tokio::test]
async fn test_cancel_follows_status_rules() {
    let h = harness();
    let shipped = h
        .catalog
        .insert_order(CUSTOMER, vec![(1, 2)], OrderStatus::OutForDelivery)
        .unwrap();
    let pending = h
        .catalog
        .insert_order(CUSTOMER, vec![(1, 3)], OrderStatus::PendingReview)
        .unwrap();
    assert_eq!(h.catalog.product_stock(1), Some(5));

    let result = h
        .dispatcher
        .handle_query(&format!("cancel order {shipped}"), "customer:7", customer())
        .await;
    assert_eq!(
        result.answer,
        "I encountered an issue: Cannot cancel order with status: Out for Delivery\n\nPlease try again or contact support if the problem persists."
    );

    let result = h
        .dispatcher
        .handle_query(&format!("cancel order #{pending}"), "customer:7", customer())
        .await;
    assert_eq!(result.answer, format!("✅ Order #{pending} has been cancelled"));
    assert_eq!(h.catalog.product_stock(1), Some(8));
    assert_eq!(
        h.catalog.status_history(pending),
        vec![OrderStatus::PendingReview, OrderStatus::Cancelled]
    );
}

#[tokio::test]
async fn test_cancel_without_orders() {
    let h = harness();
    let result = h
        .dispatcher
        .handle_query("cancel my order", "customer:7", customer())
        .await;
    assert_eq!(result.answer, "You don't have any orders to cancel.");
}

#[tokio::test]
async fn test_failed_call_keeps_last_entity() {
    let h = harness();
    h.dispatcher
        .handle_query("tell me about paracetamol", "customer:7", customer())
        .await;

    let result = h
        .dispatcher
        .handle_query("add 100 paracetamol to cart", "customer:7", customer())
        .await;
    assert!(result
        .answer
        .starts_with("I encountered an issue: Only 50 units available"));

    let context = h.contexts.get("customer:7").await.unwrap();
    assert_eq!(context.history_len(), 2);
    assert_eq!(context.get_last_entity(), Some("Paracetamol 500mg"));
    assert_eq!(context.current_intent(), Some("add_to_cart"));
}

#[tokio::test]
async fn test_audit_failure_does_not_change_reply() {
    let catalog = catalog();
    let broken = Dispatcher::new(
        Arc::new(CountingGateway::new(catalog.clone())),
        Arc::new(InMemoryContextStore::new(5, None)),
        Arc::new(BrokenAuditLog),
    )
    .unwrap();
    let h = harness();

    let failed = broken.handle_query("do you have aspirin", "s1", None).await;
    let logged = h.dispatcher.handle_query("do you have aspirin", "s1", None).await;

    assert_eq!(failed.answer, logged.answer);
    assert_eq!(failed.intent, logged.intent);
    assert!(failed.log_id.is_none());

    let record = h.audit.get(logged.log_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(record.intent.as_deref(), Some("search_product"));
    assert_eq!(record.entities["entity"], "aspirin");
}

#[tokio::test]
async fn test_audit_records_extracted_entities() {
    let h = harness();
    let added = h
        .dispatcher
        .handle_query("add 2 aspirin to cart", "customer:7", customer())
        .await;
    let record = h.audit.get(added.log_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(record.entities["entity"], "2 aspirin");
    assert_eq!(record.entities["medicine"], "Aspirin");
    assert_eq!(record.entities["quantity"], 2);
    assert!(record.entities["order_id"].is_null());

    let cancel = h
        .dispatcher
        .handle_query("cancel order #55", "anonymous", None)
        .await;
    let record = h.audit.get(cancel.log_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(record.entities["order_id"], 55);
    assert_eq!(record.entities["product_id"], 55);

    let dosage = h
        .dispatcher
        .handle_query("how much aspirin 500 mg twice a day", "s2", None)
        .await;
    let record = h.audit.get(dosage.log_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(record.entities["structured"]["frequency"][0], "twice");
    assert_eq!(record.entities["structured"]["dosage_amount"][0][0], "500");
}

#[tokio::test]
async fn test_history_is_capped() {
    let h = harness();
    for _ in 0..8 {
        h.dispatcher.handle_query("hello", "s1", None).await;
    }
    let context = h.contexts.get("s1").await.unwrap();
    assert_eq!(context.history_len(), 5);
}

#[tokio::test]
async fn test_misspelled_search_is_retried() {
    let h = harness();
    let result = h.dispatcher.handle_query("do you have asprin", "s1", None).await;
    assert!(result
        .answer
        .starts_with("(Showing results for 'Aspirin')\n\nYes, we have **Aspirin** for ₹5.00."));
    assert_eq!(result.products().map(|p| p.len()), Some(1));
}

#[tokio::test]
async fn test_slow_gateway_is_an_internal_error() {
    let catalog = catalog();
    let dispatcher = Dispatcher::new(
        Arc::new(CountingGateway::slow(catalog, Duration::from_millis(200))),
        Arc::new(InMemoryContextStore::new(5, None)),
        Arc::new(InMemoryAuditLog::new()),
    )
    .unwrap()
    .with_gateway_timeout(Duration::from_millis(20));

    let result = dispatcher.handle_query("do you have aspirin", "s1", None).await;
    assert_eq!(
        result.answer,
        "I encountered an error. Please try again or contact support."
    );
}

#[tokio::test]
async fn test_greeting_uses_profile_name() {
    let h = harness();
    let result = h.dispatcher.handle_query("hi there", "customer:7", customer()).await;
    assert!(result.answer.starts_with("Hello Asha! 👋"));

    let result = h.dispatcher.handle_query("hi there", "anonymous", None).await;
    assert!(result.answer.starts_with("Hello! 👋 Welcome to Medi-Flow Systems."));
}

#[tokio::test]
async fn test_prescription_order_requests_upload() {
    let h = harness();
    let result = h
        .dispatcher
        .handle_query("upload prescription", "customer:7", customer())
        .await;
    assert_eq!(result.intent, Intent::PrescriptionOrder);
    assert!(result.requires_file_upload);
    assert_eq!(result.interactive_components.len(), 1);
}

#[tokio::test]
async fn test_drug_info_without_expert_uses_static_advice() {
    let h = harness();
    let result = h
        .dispatcher
        .handle_query("side effects of aspirin", "s1", None)
        .await;
    assert_eq!(result.intent, Intent::DrugInfo);
    assert!(result.answer.starts_with("For detailed medical information about medicines"));
    assert_eq!(h.gateway.calls(), 0);
}

#[tokio::test]
async fn test_confidence_reflects_settled_entity() {
    let h = harness();
    let found = h.dispatcher.handle_query("tell me about aspirin", "s1", None).await;
    let unknown = h.dispatcher.handle_query("xyzzy", "s2", None).await;
    assert!(found.confidence > unknown.confidence);
    assert_eq!(unknown.intent, Intent::Unknown);
}
