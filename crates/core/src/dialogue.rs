//! Dispatcher output and caller identity

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{
    Cart, CustomerId, OrderSummary, OrderTracking, Product, ReorderOutcome, SubstituteList,
};
use crate::intent::Intent;

/// Identity of an authenticated customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub customer_id: CustomerId,
}

impl AuthContext {
    pub fn customer(customer_id: CustomerId) -> Self {
        Self { customer_id }
    }
}

/// Structured data behind a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DialoguePayload {
    Products(Vec<Product>),
    Cart(Cart),
    Tracking(OrderTracking),
    Orders(Vec<OrderSummary>),
    Substitutes(SubstituteList),
    Reorder(ReorderOutcome),
}

/// UI hint attached to a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractiveComponent {
    ProductCard { products: Vec<Product> },
    CartActions { actions: Vec<String> },
    CartSummary { cart: Cart },
    OrderTracking { tracking_data: OrderTracking },
    OrderList { orders: Vec<OrderSummary> },
    FileUpload {
        accept: String,
        max_size: u64,
        endpoint: String,
    },
    CheckoutButton,
}

impl InteractiveComponent {
    pub fn cart_actions(actions: &[&str]) -> Self {
        InteractiveComponent::CartActions {
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Prescription upload widget
    pub fn prescription_upload() -> Self {
        InteractiveComponent::FileUpload {
            accept: ".png,.jpg,.jpeg,.pdf".to_string(),
            max_size: 5 * 1024 * 1024,
            endpoint: "/api/customer/orders/place".to_string(),
        }
    }
}

/// Everything the caller gets back for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueResult {
    pub answer: String,
    pub intent: Intent,
    pub entity: Option<String>,
    #[serde(default)]
    pub from_context: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<DialoguePayload>,
    #[serde(default)]
    pub requires_auth: bool,
    #[serde(default)]
    pub requires_file_upload: bool,
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default)]
    pub interactive_components: Vec<InteractiveComponent>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    /// Blended 0-1 confidence
    #[serde(default)]
    pub confidence: f64,
    pub log_id: Option<Uuid>,
}

impl DialogueResult {
    pub fn new(intent: Intent, answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            intent,
            entity: None,
            from_context: false,
            payload: None,
            requires_auth: false,
            requires_file_upload: false,
            needs_clarification: false,
            interactive_components: Vec::new(),
            suggested_actions: Vec::new(),
            confidence: 0.0,
            log_id: None,
        }
    }

    pub fn with_payload(mut self, payload: DialoguePayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_component(mut self, component: InteractiveComponent) -> Self {
        if let InteractiveComponent::CartActions { actions } = &component {
            self.suggested_actions.extend(actions.iter().cloned());
        }
        self.interactive_components.push(component);
        self
    }

    pub fn with_entity(mut self, entity: Option<String>, from_context: bool) -> Self {
        self.entity = entity;
        self.from_context = from_context;
        self
    }

    /// Products carried by the payload, if it is a product list
    pub fn products(&self) -> Option<&[Product]> {
        match &self.payload {
            Some(DialoguePayload::Products(p)) => Some(p),
            _ => None,
        }
    }
}
