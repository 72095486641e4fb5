//! Intent classification for the action assistant
//!
//! A first-match scan over an ordered regex table. Every input yields exactly
//! one intent; text that no rule matches is [`Intent::Unknown`].
//!
//! # Example
//!
//! ```
//! use pharmacy_assistant_core::Intent;
//! use pharmacy_assistant_text_processing::intent::IntentClassifier;
//!
//! let classifier = IntentClassifier::new().unwrap();
//! let result = classifier.classify("Add Aspirin to my cart");
//!
//! assert_eq!(result.intent, Intent::AddToCart);
//! assert_eq!(result.entity.as_deref(), Some("aspirin"));
//! ```

mod rules;

pub use rules::{default_rules, RuleSpec};

use pharmacy_assistant_core::Intent;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Invalid pattern for {intent}: {pattern}: {source}")]
    InvalidPattern {
        intent: Intent,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Compiled rule
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub intent: Intent,
    pub regex: Regex,
    entity_group: Option<usize>,
    quantity_group: Option<usize>,
}

impl PatternRule {
    pub fn compile(spec: &RuleSpec) -> Result<Self, ClassifierError> {
        let regex = Regex::new(&spec.pattern).map_err(|source| ClassifierError::InvalidPattern {
            intent: spec.intent,
            pattern: spec.pattern.clone(),
            source,
        })?;

        // Group 0 is the whole match
        let has_groups = regex.captures_len() > 1;
        let entity_group = spec.entity_group.or(if has_groups { Some(1) } else { None });

        Ok(Self {
            intent: spec.intent,
            regex,
            entity_group,
            quantity_group: spec.quantity_group,
        })
    }
}

/// Result of classifying one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    /// Trimmed entity capture; `None` when the rule has no entity group or it
    /// captured only whitespace
    pub entity: Option<String>,
    /// Parsed quantity capture, for rules that declare one
    pub quantity: Option<u32>,
    /// Every capture group after group 0, in order
    pub captures: Vec<Option<String>>,
    /// Index of the matching rule in the table
    pub rule: Option<usize>,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            entity: None,
            quantity: None,
            captures: Vec::new(),
            rule: None,
        }
    }

    /// Capture group `n` (1-based), trimmed
    pub fn capture(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.captures.get(i))
            .and_then(|c| c.as_deref())
    }
}

/// Ordered first-match intent classifier
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<PatternRule>,
}

impl IntentClassifier {
    /// Classifier over the shipped rule table
    pub fn new() -> Result<Self, ClassifierError> {
        Self::with_rules(&default_rules())
    }

    /// Classifier over a custom table, evaluated in the given order
    pub fn with_rules(specs: &[RuleSpec]) -> Result<Self, ClassifierError> {
        let rules = specs
            .iter()
            .map(PatternRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Classify a message
    pub fn classify(&self, text: &str) -> Classification {
        let text = text.trim().to_lowercase();

        for (index, rule) in self.rules.iter().enumerate() {
            let Some(caps) = rule.regex.captures(&text) else {
                continue;
            };

            let captures: Vec<Option<String>> = caps
                .iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().trim().to_string()))
                .collect();

            let entity = rule
                .entity_group
                .and_then(|g| caps.get(g))
                .map(|m| m.as_str().trim().to_string())
                .filter(|e| !e.is_empty());

            let quantity = rule
                .quantity_group
                .and_then(|g| caps.get(g))
                .and_then(|m| m.as_str().trim().parse().ok());

            tracing::debug!(intent = %rule.intent, rule = index, entity = ?entity, "Classified query");

            return Classification {
                intent: rule.intent,
                entity,
                quantity,
                captures,
                rule: Some(index),
            };
        }

        tracing::debug!("No rule matched, classified as unknown");
        Classification::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new().unwrap()
    }

    #[test]
    fn test_classification_is_total() {
        let c = classifier();
        for text in ["", "   ", "xyzzy", "12345", "¿qué?"] {
            let result = c.classify(text);
            assert_eq!(result.intent, Intent::Unknown, "{text:?}");
            assert!(result.entity.is_none());
            assert!(result.rule.is_none());
        }
    }

    #[test]
    fn test_first_match_precedence() {
        let c = classifier();

        // add\s+(.+) is declared before the bulk-add pattern
        let result = c.classify("add aspirin and ibuprofen");
        assert_eq!(result.intent, Intent::AddToCart);
        assert_eq!(result.entity.as_deref(), Some("aspirin and ibuprofen"));

        // show me\s+(.+) is declared before the recommendation pattern
        let result = c.classify("show me products");
        assert_eq!(result.intent, Intent::SearchProduct);
        assert_eq!(result.entity.as_deref(), Some("products"));
    }

    #[test]
    fn test_entity_is_lowercased_and_trimmed() {
        let result = classifier().classify("  Do you have Paracetamol 500mg   ");
        assert_eq!(result.intent, Intent::SearchProduct);
        assert_eq!(result.entity.as_deref(), Some("paracetamol 500mg"));
    }

    #[test]
    fn test_common_intents() {
        let c = classifier();
        let cases = [
            ("hello there", Intent::Greeting),
            ("what's in my cart", Intent::ViewCart),
            ("track my order", Intent::TrackOrder),
            ("order history", Intent::OrderHistory),
            ("upload prescription", Intent::PrescriptionOrder),
            ("is paracetamol available", Intent::CheckAvailability),
            ("tell me about crocin", Intent::ProductInfo),
            ("dosage of paracetamol", Intent::DrugInfo),
            ("clear my cart", Intent::ClearCart),
            ("remove aspirin from cart", Intent::RemoveFromCart),
            ("cancel my order", Intent::CancelOrder),
            ("reorder my last order", Intent::Reorder),
            ("what should i buy", Intent::Recommend),
            ("compare prices of crocin", Intent::ComparePrices),
            ("substitute for crocin", Intent::FindSubstitutes),
            ("proceed to checkout", Intent::Checkout),
        ];
        for (text, expected) in cases {
            assert_eq!(c.classify(text).intent, expected, "{text}");
        }
    }

    #[test]
    fn test_rules_without_groups_have_no_entity() {
        let result = classifier().classify("track my order");
        assert!(result.entity.is_none());
        assert!(result.captures.is_empty());
    }

    #[test]
    fn test_update_quantity_captures() {
        let c = classifier();

        let result = c.classify("change quantity of aspirin to 3");
        assert_eq!(result.intent, Intent::UpdateQuantity);
        assert_eq!(result.entity.as_deref(), Some("aspirin"));
        assert_eq!(result.quantity, Some(3));

        let result = c.classify("make it 2 crocin");
        assert_eq!(result.intent, Intent::UpdateQuantity);
        assert_eq!(result.entity.as_deref(), Some("crocin"));
        assert_eq!(result.quantity, Some(2));
        assert_eq!(result.capture(1), Some("2"));

        let result = c.classify("change to 4 paracetamol 500mg");
        assert_eq!(result.entity.as_deref(), Some("paracetamol 500mg"));
        assert_eq!(result.quantity, Some(4));
    }

    #[test]
    fn test_bulk_add_second_capture() {
        let result = classifier().classify("i need aspirin, crocin");
        // "need\s+(.+)" from the search group wins
        assert_eq!(result.intent, Intent::SearchProduct);

        let custom = IntentClassifier::with_rules(&[RuleSpec::new(
            Intent::BulkAdd,
            r"add\s+(.+?)\s+and\s+(.+)",
        )])
        .unwrap();
        let result = custom.classify("add aspirin and crocin");
        assert_eq!(result.intent, Intent::BulkAdd);
        assert_eq!(result.capture(1), Some("aspirin"));
        assert_eq!(result.capture(2), Some("crocin"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = IntentClassifier::with_rules(&[RuleSpec::new(Intent::Help, "(unclosed")])
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidPattern { intent: Intent::Help, .. }));
    }
}
