//! Catalog, cart and order records exchanged with the catalog gateway

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ProductId = u64;
pub type CustomerId = u64;
pub type OrderId = u64;

/// Dispensing class of a medicine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductType {
    /// Prescription only
    Rx,
    /// Over the counter
    #[default]
    #[serde(rename = "OTC")]
    Otc,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Rx => "Rx",
            ProductType::Otc => "OTC",
        }
    }

    pub fn requires_prescription(&self) -> bool {
        matches!(self, ProductType::Rx)
    }
}

/// A sellable medicine as seen by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub generic_name: String,
    pub company: String,
    pub price: f64,
    /// Units currently in stock
    pub quantity: u32,
    pub product_type: ProductType,
}

impl Product {
    pub fn requires_prescription(&self) -> bool {
        self.product_type.requires_prescription()
    }

    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: f64,
    pub quantity: u32,
    pub subtotal: f64,
    pub requires_prescription: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Cart {
    pub items: Vec<CartLine>,
    pub total: f64,
    pub item_count: usize,
    pub requires_prescription: bool,
}

impl Cart {
    /// Build a cart snapshot, computing the derived totals from the lines
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let total = items.iter().map(|l| l.subtotal).sum();
        let requires_prescription = items.iter().any(|l| l.requires_prescription);
        Self {
            item_count: items.len(),
            items,
            total,
            requires_prescription,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.items.iter().find(|l| l.product_id == product_id)
    }
}

/// Result of a successful add-to-cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartUpdate {
    pub product_name: String,
    pub cart: Cart,
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Pending Review")]
    PendingReview,
    Approved,
    Processing,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingReview => "Pending Review",
            OrderStatus::Approved => "Approved",
            OrderStatus::Processing => "Processing",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Orders can be cancelled until they leave the pharmacy
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingReview | OrderStatus::Approved | OrderStatus::Processing
        )
    }

    /// Tracking checklist for this status
    pub fn tracking_stages(&self) -> Vec<TrackingStage> {
        use OrderStatus::*;
        let stage = |name: &str, completed: bool| TrackingStage {
            stage: name.to_string(),
            completed,
        };
        vec![
            stage("Order Placed", true),
            stage(
                "Processing",
                matches!(self, Processing | OutForDelivery | Delivered),
            ),
            stage("Out for Delivery", matches!(self, OutForDelivery | Delivered)),
            stage("Delivered", matches!(self, Delivered)),
        ]
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub order_date: DateTime<Utc>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub prescription_status: Option<String>,
    pub requires_prescription: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingStage {
    pub stage: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTracking {
    pub order_id: OrderId,
    pub current_status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub total_amount: f64,
    pub prescription_status: Option<String>,
    pub tracking_stages: Vec<TrackingStage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitute {
    pub product: Product,
    /// Substitute price minus original price
    pub price_difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstituteList {
    pub original: String,
    pub generic_name: String,
    pub substitutes: Vec<Substitute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderOutcome {
    pub order_id: OrderId,
    /// Names of the lines that were re-added
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}
