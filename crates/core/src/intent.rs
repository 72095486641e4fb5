//! Intent taxonomy for the action assistant

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a customer message asks the assistant to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SearchProduct,
    AddToCart,
    ViewCart,
    TrackOrder,
    OrderHistory,
    PrescriptionOrder,
    CheckAvailability,
    ProductInfo,
    /// Medical information question, answered by the drug expert
    DrugInfo,
    Greeting,
    Help,
    ClearCart,
    RemoveFromCart,
    UpdateQuantity,
    CancelOrder,
    Reorder,
    #[serde(rename = "recommend_products")]
    Recommend,
    ComparePrices,
    FindSubstitutes,
    BulkAdd,
    Checkout,
    Unknown,
}

impl Intent {
    /// Every intent, in rule-table order followed by Unknown
    pub const ALL: [Intent; 22] = [
        Intent::SearchProduct,
        Intent::AddToCart,
        Intent::ViewCart,
        Intent::TrackOrder,
        Intent::OrderHistory,
        Intent::PrescriptionOrder,
        Intent::CheckAvailability,
        Intent::ProductInfo,
        Intent::DrugInfo,
        Intent::Greeting,
        Intent::Help,
        Intent::ClearCart,
        Intent::RemoveFromCart,
        Intent::UpdateQuantity,
        Intent::CancelOrder,
        Intent::Reorder,
        Intent::Recommend,
        Intent::ComparePrices,
        Intent::FindSubstitutes,
        Intent::BulkAdd,
        Intent::Checkout,
        Intent::Unknown,
    ];

    /// Stable wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::SearchProduct => "search_product",
            Intent::AddToCart => "add_to_cart",
            Intent::ViewCart => "view_cart",
            Intent::TrackOrder => "track_order",
            Intent::OrderHistory => "order_history",
            Intent::PrescriptionOrder => "prescription_order",
            Intent::CheckAvailability => "check_availability",
            Intent::ProductInfo => "product_info",
            Intent::DrugInfo => "drug_info",
            Intent::Greeting => "greeting",
            Intent::Help => "help",
            Intent::ClearCart => "clear_cart",
            Intent::RemoveFromCart => "remove_from_cart",
            Intent::UpdateQuantity => "update_quantity",
            Intent::CancelOrder => "cancel_order",
            Intent::Reorder => "reorder",
            Intent::Recommend => "recommend_products",
            Intent::ComparePrices => "compare_prices",
            Intent::FindSubstitutes => "find_substitutes",
            Intent::BulkAdd => "bulk_add",
            Intent::Checkout => "checkout",
            Intent::Unknown => "unknown",
        }
    }

    /// Parse a wire label back into an intent
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.as_str() == label)
    }

    /// Action phrase used in the login guidance, for intents that need a customer identity
    pub fn auth_action(&self) -> Option<&'static str> {
        match self {
            Intent::AddToCart | Intent::BulkAdd => Some("add items to your cart"),
            Intent::ViewCart => Some("view your cart"),
            Intent::TrackOrder => Some("track your orders"),
            Intent::OrderHistory => Some("view your order history"),
            Intent::PrescriptionOrder => Some("order with prescription"),
            Intent::ClearCart => Some("clear your cart"),
            Intent::RemoveFromCart => Some("remove items from cart"),
            Intent::UpdateQuantity => Some("update your cart"),
            Intent::CancelOrder => Some("cancel orders"),
            Intent::Reorder => Some("reorder"),
            Intent::Checkout => Some("checkout"),
            _ => None,
        }
    }

    pub fn requires_auth(&self) -> bool {
        self.auth_action().is_some()
    }

    /// Whether the intent acts on a named product or drug
    pub fn uses_entity(&self) -> bool {
        matches!(
            self,
            Intent::SearchProduct
                | Intent::AddToCart
                | Intent::CheckAvailability
                | Intent::ProductInfo
                | Intent::DrugInfo
                | Intent::RemoveFromCart
                | Intent::UpdateQuantity
                | Intent::ComparePrices
                | Intent::FindSubstitutes
        )
    }

    /// Whether a search result list should be remembered for follow-ups
    pub fn is_search_like(&self) -> bool {
        matches!(
            self,
            Intent::SearchProduct
                | Intent::CheckAvailability
                | Intent::ProductInfo
                | Intent::Recommend
                | Intent::ComparePrices
                | Intent::FindSubstitutes
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
