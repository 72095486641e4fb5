//! Conversation turn types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One exchange between the customer and the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Customer text
    pub query: String,
    /// Rendered reply
    pub response: String,
    /// Product or drug the turn was about, if one was settled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Intent label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// When the turn occurred
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn stamped with the current time
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        entity: Option<String>,
        intent: Option<String>,
    ) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            entity,
            intent,
            timestamp: Utc::now(),
        }
    }

    /// Entity, ignoring blank strings
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref().filter(|e| !e.trim().is_empty())
    }
}

/// Read-only view of a conversation context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub current_entity: Option<String>,
    pub current_intent: Option<String>,
    pub history_length: usize,
    /// Distinct entities in history, first seen first
    pub recent_entities: Vec<String>,
    /// Distinct intents in history, first seen first
    pub recent_intents: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_entity_is_ignored() {
        let turn = Turn::new("q", "r", Some("  ".into()), None);
        assert_eq!(turn.entity(), None);

        let turn = Turn::new("q", "r", Some("Aspirin".into()), None);
        assert_eq!(turn.entity(), Some("Aspirin"));
    }
}
