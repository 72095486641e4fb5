//! Reply templates for the action assistant
//!
//! Pure formatting: the same inputs always give the same text. Money is
//! shown with two decimals after the configured currency symbol.

use pharmacy_assistant_config::AssistantConfig;
use pharmacy_assistant_core::{
    Cart, CartUpdate, Intent, OrderSummary, OrderTracking, Product, ReorderOutcome,
    SubstituteList,
};
use std::fmt::Write;

/// Most products or orders listed in one reply
const LIST_LIMIT: usize = 5;

const RX_CART_WARNING: &str = "⚠️ Your cart contains prescription medicines.";

#[derive(Debug, Clone)]
pub struct ResponseRenderer {
    currency: String,
    store_name: String,
}

impl Default for ResponseRenderer {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

impl ResponseRenderer {
    pub fn new(currency: impl Into<String>, store_name: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            store_name: store_name.into(),
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(&config.currency_symbol, &config.store_name)
    }

    fn money(&self, amount: f64) -> String {
        format!("{}{:.2}", self.currency, amount)
    }

    fn badge(product: &Product) -> &'static str {
        product.product_type.as_str()
    }

    pub fn product_search(&self, products: &[Product]) -> String {
        match products {
            [] => "I couldn't find any products matching your search. Would you like to try a different search term?".to_string(),
            [product] => {
                let mut text = format!(
                    "Yes, we have **{}** for {}. ",
                    product.name,
                    self.money(product.price)
                );
                if product.requires_prescription() {
                    text.push_str("This is a **prescription (Rx) medicine**. ");
                } else {
                    text.push_str("This is an **over-the-counter (OTC) medicine**. ");
                }
                if product.in_stock() {
                    let _ = write!(text, "We have {} units in stock. ", product.quantity);
                } else {
                    text.push_str("Currently out of stock. ");
                }
                text.push_str("\n\nWould you like to add it to your cart?");
                text
            }
            _ => {
                let mut text = format!("I found {} products:\n\n", products.len());
                self.numbered_products(&mut text, products.iter().take(LIST_LIMIT));
                text.push_str("\nWhich one would you like to know more about?");
                text
            }
        }
    }

    fn numbered_products<'a>(&self, text: &mut String, products: impl Iterator<Item = &'a Product>) {
        for (i, product) in products.enumerate() {
            let _ = writeln!(
                text,
                "{}. **{}** - {} [{}]",
                i + 1,
                product.name,
                self.money(product.price),
                Self::badge(product)
            );
        }
    }

    pub fn cart(&self, cart: &Cart) -> String {
        if cart.is_empty() {
            return self.empty_cart();
        }

        let mut text = format!("You have **{} item(s)** in your cart:\n\n", cart.items.len());
        for line in &cart.items {
            let _ = writeln!(
                text,
                "• **{}** - Qty: {} - {}",
                line.product_name,
                line.quantity,
                self.money(line.subtotal)
            );
        }
        let _ = write!(text, "\n**Cart Total: {}**\n\n", self.money(cart.total));
        if cart.requires_prescription {
            let _ = write!(
                text,
                "{RX_CART_WARNING} You'll need to upload a prescription during checkout.\n\n"
            );
        }
        text.push_str("Ready to checkout?");
        text
    }

    pub fn empty_cart(&self) -> String {
        "Your cart is empty. Would you like to browse our products?".to_string()
    }

    pub fn tracking(&self, tracking: &OrderTracking) -> String {
        let mut text = format!(
            "**Order #{}**\n\nCurrent Status: **{}**\n\n",
            tracking.order_id, tracking.current_status
        );
        if !tracking.tracking_stages.is_empty() {
            text.push_str("Progress:\n");
            for stage in &tracking.tracking_stages {
                let icon = if stage.completed { "✅" } else { "⏳" };
                let _ = writeln!(text, "{} {}", icon, stage.stage);
            }
        }
        if let Some(status) = &tracking.prescription_status {
            let _ = write!(text, "\nPrescription Status: **{}**", status);
        }
        text
    }

    pub fn order_history(&self, orders: &[OrderSummary]) -> String {
        if orders.is_empty() {
            return "You haven't placed any orders yet. Would you like to start shopping?"
                .to_string();
        }

        let mut text = format!("You have **{} order(s)**:\n\n", orders.len());
        for order in orders.iter().take(LIST_LIMIT) {
            let _ = writeln!(
                text,
                "• **Order #{}** - {} - {} - Status: {}",
                order.order_id,
                order.order_date.format("%Y-%m-%d"),
                self.money(order.total_amount),
                order.status
            );
        }
        text.push_str("\nWould you like to track any of these orders?");
        text
    }

    pub fn prescription_guide(&self) -> String {
        "I can help you order prescription medicines! Here's how it works:\n\n\
         1. Upload your prescription (PNG, JPG, or PDF)\n\
         2. Our pharmacists will review it\n\
         3. Once approved, we'll add the medicines to your order\n\
         4. You'll receive a confirmation when ready\n\n\
         Please use the file upload button below to submit your prescription."
            .to_string()
    }

    pub fn greeting(&self, customer_name: Option<&str>) -> String {
        let mut text = match customer_name {
            Some(name) => format!("Hello {}! 👋 How can I help you today?\n\n", name),
            None => format!(
                "Hello! 👋 Welcome to {}. How can I help you today?\n\n",
                self.store_name
            ),
        };
        text.push_str(
            "I can help you with:\n\
             • 🔍 Search for medicines\n\
             • 🛒 Add items to your cart\n\
             • 📦 Track your orders\n\
             • 💊 Order with prescription\n\
             • ℹ️ Get medicine information\n\n\
             Just ask me anything!",
        );
        text
    }

    pub fn help(&self) -> String {
        "**Here's what I can do for you:**\n\n\
         **Shopping:**\n\
         • \"Do you have Paracetamol?\" - Search products\n\
         • \"Add Crocin to cart\" - Add items to cart\n\
         • \"Show my cart\" - View cart contents\n\n\
         **Orders:**\n\
         • \"Track my order\" - Check order status\n\
         • \"Order history\" - View past orders\n\
         • \"Order with prescription\" - Upload Rx\n\n\
         **Information:**\n\
         • \"Tell me about Aspirin\" - Product details\n\
         • \"Dosage of Paracetamol\" - Medicine info\n\n\
         What would you like to do?"
            .to_string()
    }

    pub fn unknown(&self) -> String {
        "I'm not sure I understand. I can help you with:\n\n\
         • Searching for medicines\n\
         • Adding items to cart\n\
         • Tracking orders\n\
         • Ordering with prescription\n\n\
         What would you like to do?"
            .to_string()
    }

    /// Question asked when an intent needs a product and none is known
    pub fn clarification(&self, intent: Intent) -> String {
        let prompt = match intent {
            Intent::SearchProduct => "What medicine are you looking for?",
            Intent::CheckAvailability => "Which medicine would you like to check availability for?",
            Intent::ProductInfo => "Which product would you like to know more about?",
            Intent::RemoveFromCart => "Which item would you like to remove from your cart?",
            Intent::FindSubstitutes => "Which medicine would you like to find substitutes for?",
            Intent::AddToCart | Intent::BulkAdd => {
                "Which product would you like to add to your cart? Please specify the product name or ID."
            }
            Intent::UpdateQuantity => "Which item's quantity would you like to change, and to how many?",
            Intent::ComparePrices => "Which medicine would you like to compare prices for?",
            Intent::DrugInfo => "Which medicine would you like information about?",
            _ => return self.unknown(),
        };
        prompt.to_string()
    }

    pub fn availability(&self, product: &Product) -> String {
        if product.in_stock() {
            format!(
                "Yes, **{}** is available! We have {} units in stock at {} each.",
                product.name,
                product.quantity,
                self.money(product.price)
            )
        } else {
            format!(
                "Sorry, **{}** is currently out of stock. Would you like to check similar products?",
                product.name
            )
        }
    }

    pub fn not_in_catalog(&self, entity: &str) -> String {
        format!(
            "I couldn't find '{}' in our catalog. Please check the spelling or try a different name.",
            entity
        )
    }

    pub fn product_info(&self, product: &Product) -> String {
        let kind = if product.requires_prescription() {
            "Prescription (Rx)"
        } else {
            "Over-the-Counter (OTC)"
        };
        format!(
            "**{}**\n\nGeneric Name: {}\nCompany: {}\nPrice: {}\nType: {}\nStock: {} units available\n\nWould you like to add it to your cart?",
            product.name,
            product.generic_name,
            product.company,
            self.money(product.price),
            kind,
            product.quantity
        )
    }

    pub fn product_info_missing(&self, entity: &str) -> String {
        format!(
            "I couldn't find information about '{}'. Please check the spelling.",
            entity
        )
    }

    pub fn substitutes(&self, list: &SubstituteList) -> String {
        if list.substitutes.is_empty() {
            return format!("No substitutes found for {}.", list.original);
        }

        let mut text = format!(
            "**Substitutes for {}**\n\nGeneric Name: {}\n\nAlternatives:\n",
            list.original, list.generic_name
        );
        for (i, sub) in list.substitutes.iter().enumerate() {
            let direction = if sub.price_difference < 0.0 {
                "cheaper"
            } else {
                "more expensive"
            };
            let _ = writeln!(
                text,
                "{}. **{}** - {} ({} {})",
                i + 1,
                sub.product.name,
                self.money(sub.product.price),
                self.money(sub.price_difference.abs()),
                direction
            );
        }
        text.push_str("\nAll contain the same active ingredient.");
        text
    }

    pub fn substitutes_target_missing(&self, entity: &str) -> String {
        format!("I couldn't find '{}' in our catalog.", entity)
    }

    pub fn recommendations(&self, products: &[Product]) -> String {
        let mut text = "Here are our top recommended products:\n\n".to_string();
        self.numbered_products(&mut text, products.iter());
        text.push_str("\nWould you like to add any of these to your cart?");
        text
    }

    /// Products matching a name, cheapest first
    pub fn price_comparison(&self, products: &[Product]) -> String {
        let mut sorted: Vec<&Product> = products.iter().collect();
        sorted.sort_by(|a, b| a.price.total_cmp(&b.price));
        let Some(cheapest) = sorted.first() else {
            return self.product_search(&[]);
        };

        let mut text = format!("**Price comparison ({} products):**\n\n", sorted.len());
        self.numbered_products(&mut text, sorted.iter().copied().take(LIST_LIMIT));
        let _ = write!(
            text,
            "\nBest price: **{}** at {}.",
            cheapest.name,
            self.money(cheapest.price)
        );
        text
    }

    pub fn added_to_cart(&self, update: &CartUpdate) -> String {
        format!(
            "Added {} to cart\n\nYour cart total is now {}.",
            update.product_name,
            self.money(update.cart.total)
        )
    }

    /// Summary of a multi-item add; `failed` pairs a name with the reason
    pub fn bulk_add(&self, added: &[String], failed: &[(String, String)], cart: Option<&Cart>) -> String {
        let mut text = String::new();
        if added.is_empty() {
            text.push_str("I couldn't add any of those items:\n");
        } else {
            let _ = writeln!(text, "✅ Added {} item(s) to your cart:", added.len());
            for name in added {
                let _ = writeln!(text, "• {}", name);
            }
            if !failed.is_empty() {
                text.push_str("\nCould not add:\n");
            }
        }
        for (name, reason) in failed {
            let _ = writeln!(text, "• {} ({})", name, reason);
        }
        if let Some(cart) = cart {
            let _ = write!(text, "\nYour cart total is now {}.", self.money(cart.total));
        }
        text.trim_end().to_string()
    }

    pub fn removed_from_cart(&self, product_name: &str) -> String {
        format!("✅ Removed {} from cart", product_name)
    }

    pub fn not_in_cart(&self, entity: &str) -> String {
        format!("I couldn't find '{}' in your cart.", entity)
    }

    pub fn quantity_updated(&self, update: &CartUpdate, quantity: u32) -> String {
        if quantity == 0 {
            return self.removed_from_cart(&update.product_name);
        }
        format!(
            "✅ Updated {} quantity to {}\n\nYour cart total is now {}.",
            update.product_name,
            quantity,
            self.money(update.cart.total)
        )
    }

    pub fn cart_cleared(&self) -> String {
        "✅ Your cart has been cleared successfully! Ready to start fresh?".to_string()
    }

    pub fn order_cancelled(&self, order: &OrderSummary) -> String {
        format!("✅ Order #{} has been cancelled", order.order_id)
    }

    pub fn no_orders_to_cancel(&self) -> String {
        "You don't have any orders to cancel.".to_string()
    }

    pub fn reordered(&self, outcome: &ReorderOutcome) -> String {
        let mut text = format!(
            "✅ Added {} items from your last order\n\nItems added:\n",
            outcome.items.len()
        );
        for item in &outcome.items {
            let _ = writeln!(text, "• {}", item);
        }
        text.push_str("\nWould you like to view your cart or proceed to checkout?");
        text
    }

    pub fn checkout(&self, cart: &Cart) -> String {
        if cart.is_empty() {
            return self.empty_cart();
        }

        let mut text = format!(
            "Great! Let me take you to checkout.\n\n**Cart Summary:**\n• {} item(s)\n• Total: {}\n\n",
            cart.item_count,
            self.money(cart.total)
        );
        if cart.requires_prescription {
            let _ = write!(text, "{RX_CART_WARNING} You'll need to upload a prescription.\n\n");
        }
        text.push_str("Click below to proceed to checkout.");
        text
    }

    pub fn drug_info_fallback(&self) -> String {
        "For detailed medical information about medicines (dosage, side effects, interactions), \
         please consult our pharmacist or refer to the product information leaflet.\n\n\
         ⚠️ **Important**: I cannot provide medical advice. Always consult a healthcare professional."
            .to_string()
    }

    pub fn auth_required(&self, action: &str) -> String {
        format!(
            "To {}, you'll need to log in or create an account first.\n\nWould you like me to guide you to the login page?",
            action
        )
    }

    pub fn domain_error(&self, reason: &dyn std::fmt::Display) -> String {
        format!(
            "I encountered an issue: {}\n\nPlease try again or contact support if the problem persists.",
            reason
        )
    }

    pub fn internal_error(&self) -> String {
        "I encountered an error. Please try again or contact support.".to_string()
    }

    /// Prefix a reply that answers for a corrected name
    pub fn showing_results_for(&self, name: &str, body: &str) -> String {
        format!("(Showing results for '{}')\n\n{}", name, body)
    }
}
