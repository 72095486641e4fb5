//! Default rule table for the action assistant
//!
//! Order matters: the classifier stops at the first pattern that matches, so
//! broad patterns (`add\s+(.+)`, `help`) shadow the narrower ones declared after
//! them. Keep new rules in the position where they should win.

use pharmacy_assistant_core::Intent;

/// Uncompiled rule: a pattern and the intent it selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub intent: Intent,
    pub pattern: String,
    /// Capture group holding the product or drug name. `None` means group 1
    /// when the pattern has groups, otherwise no entity.
    pub entity_group: Option<usize>,
    /// Capture group holding a quantity
    pub quantity_group: Option<usize>,
}

impl RuleSpec {
    pub fn new(intent: Intent, pattern: impl Into<String>) -> Self {
        Self {
            intent,
            pattern: pattern.into(),
            entity_group: None,
            quantity_group: None,
        }
    }

    pub fn with_entity_group(mut self, group: usize) -> Self {
        self.entity_group = Some(group);
        self
    }

    pub fn with_quantity_group(mut self, group: usize) -> Self {
        self.quantity_group = Some(group);
        self
    }
}

fn group(intent: Intent, patterns: &[&str]) -> Vec<RuleSpec> {
    patterns.iter().map(|p| RuleSpec::new(intent, *p)).collect()
}

/// The shipped table, in evaluation order
pub fn default_rules() -> Vec<RuleSpec> {
    let mut rules = Vec::with_capacity(64);

    rules.extend(group(
        Intent::SearchProduct,
        &[
            r"(?:do you have|search|find|looking for|need|want)\s+(.+)",
            r"(?:price of|cost of|how much is)\s+(.+)",
            r"(?:show me|get me)\s+(.+)",
        ],
    ));
    rules.extend(group(
        Intent::AddToCart,
        &[
            r"add\s+(.+?)\s+to\s+(?:my\s+)?cart",
            r"(?:i want to buy|buy|purchase)\s+(.+)",
            r"add\s+(.+)",
        ],
    ));
    rules.extend(group(
        Intent::ViewCart,
        &[
            r"(?:show|view|check|see)\s+(?:my\s+)?cart",
            r"what'?s?\s+in\s+my\s+cart",
            r"cart\s+(?:items|contents)",
        ],
    ));
    rules.extend(group(
        Intent::TrackOrder,
        &[
            r"(?:track|where is|status of)\s+(?:my\s+)?order",
            r"order\s+(?:status|tracking)",
            r"where'?s?\s+my\s+(?:order|package|delivery)",
        ],
    ));
    rules.extend(group(
        Intent::OrderHistory,
        &[
            r"(?:my\s+)?(?:order\s+)?history",
            r"(?:previous|past|old)\s+orders",
            r"show\s+(?:my\s+)?orders",
        ],
    ));
    rules.extend(group(
        Intent::PrescriptionOrder,
        &[
            r"(?:order|buy|need)\s+(?:with\s+)?(?:my\s+)?prescription",
            r"(?:rx|prescription)\s+(?:order|medicine|drug)",
            r"upload\s+prescription",
        ],
    ));
    rules.extend(group(
        Intent::CheckAvailability,
        &[
            r"(?:is|are)\s+(.+?)\s+(?:available|in stock)",
            r"(?:do you have|got)\s+(.+?)\s+(?:available|in stock)",
        ],
    ));
    rules.extend(group(
        Intent::ProductInfo,
        &[
            r"(?:tell me about|info about|information on|details of)\s+(.+)",
            r"what is\s+(.+)",
        ],
    ));
    rules.extend(group(
        Intent::DrugInfo,
        &[
            r"(?:dosage|dose|side effects|interactions)\s+(?:of|for)?\s*(.+)",
            r"how to take\s+(.+)",
            r"contraindications\s+(?:of|for)?\s*(.+)",
        ],
    ));
    rules.extend(group(
        Intent::Greeting,
        &[
            r"^(?:hi|hello|hey|good morning|good afternoon|good evening)",
            r"^(?:start|begin)",
        ],
    ));
    rules.extend(group(
        Intent::Help,
        &[r"help", r"what can you do", r"how do i", r"commands"],
    ));
    rules.extend(group(
        Intent::ClearCart,
        &[
            r"(?:clear|empty|remove all|delete all)\s+(?:my\s+)?cart",
            r"start over",
            r"reset\s+cart",
        ],
    ));
    rules.extend(group(
        Intent::RemoveFromCart,
        &[
            r"remove\s+(.+?)\s+from\s+cart",
            r"delete\s+(.+?)\s+from\s+cart",
            r"take out\s+(.+)",
        ],
    ));
    rules.push(
        RuleSpec::new(
            Intent::UpdateQuantity,
            r"(?:change|update|set)\s+(?:quantity|qty)\s+(?:of\s+)?(.+?)\s+to\s+(\d+)",
        )
        .with_quantity_group(2),
    );
    rules.push(
        RuleSpec::new(
            Intent::UpdateQuantity,
            r"(?:make it|change to)\s+(\d+)\s+(.+)",
        )
        .with_entity_group(2)
        .with_quantity_group(1),
    );
    rules.extend(group(
        Intent::CancelOrder,
        &[
            r"cancel\s+(?:my\s+)?order",
            r"cancel\s+order\s+#?(\d+)",
            r"(?:i want to|need to)\s+cancel",
        ],
    ));
    rules.extend(group(
        Intent::Reorder,
        &[
            r"(?:reorder|order again|buy again)\s+(?:from\s+)?(?:my\s+)?(?:last|previous)\s+order",
            r"same as last time",
            r"repeat\s+(?:my\s+)?(?:last|previous)\s+order",
        ],
    ));
    rules.extend(group(
        Intent::Recommend,
        &[
            r"(?:recommend|suggest|show me)\s+(?:some\s+)?(?:products|medicines|items)",
            r"what should i (?:buy|get|order)",
            r"(?:popular|best selling|trending)\s+(?:products|medicines)",
        ],
    ));
    rules.extend(group(
        Intent::ComparePrices,
        &[
            r"compare\s+(?:prices of\s+)?(.+)",
            r"(?:cheaper|better price)\s+(?:than|for)\s+(.+)",
            r"price comparison",
        ],
    ));
    rules.extend(group(
        Intent::FindSubstitutes,
        &[
            r"(?:substitute|alternative|replacement)\s+(?:for|of)?\s*(.+)",
            r"(?:similar to|like)\s+(.+)",
            r"generic\s+(?:version of|for)\s+(.+)",
        ],
    ));
    rules.extend(group(
        Intent::BulkAdd,
        &[r"add\s+(.+?)\s+and\s+(.+)", r"(?:i need|get me)\s+(.+?),\s*(.+)"],
    ));
    rules.extend(group(
        Intent::Checkout,
        &[
            r"(?:proceed to|go to|start)\s+checkout",
            r"(?:i want to|ready to)\s+(?:checkout|pay|complete order)",
            r"finish\s+(?:my\s+)?order",
        ],
    ));

    rules
}
