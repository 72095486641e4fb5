//! Query analysis types shared by both assistant engines

use serde::{Deserialize, Serialize};

/// Structured entities pulled from a query by the secondary patterns
///
/// Empty kinds are omitted on the wire so the payload only lists what was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredEntities {
    /// (amount, unit) pairs such as ("500", "mg")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage_amount: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frequency: Vec<String>,
    /// Hour counts from "every N hours"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interval: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_of_day: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub age: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_condition: Option<String>,
}

impl StructuredEntities {
    pub fn is_empty(&self) -> bool {
        self.dosage_amount.is_empty()
            && self.frequency.is_empty()
            && self.interval.is_empty()
            && self.time_of_day.is_empty()
            && self.age.is_empty()
            && self.special_condition.is_none()
    }

    /// First parsable age, if any
    pub fn first_age(&self) -> Option<u32> {
        self.age.iter().find_map(|a| a.parse().ok())
    }

    pub fn mentions_pregnancy(&self) -> bool {
        self.special_condition.as_deref() == Some("pregnancy_lactation")
    }
}

/// A free-text entity resolved to a known name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub name: String,
    /// Similarity score, 0-100
    pub confidence: u8,
    /// Taken from conversation history rather than the current query
    pub from_context: bool,
}

impl Resolution {
    pub fn matched(name: impl Into<String>, confidence: u8) -> Self {
        Self {
            name: name.into(),
            confidence,
            from_context: false,
        }
    }

    pub fn from_context(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            confidence: 0,
            from_context: true,
        }
    }
}

/// Full analysis of one incoming query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Primary intent label
    pub intent: String,
    pub intent_confidence: f64,
    /// Every scored intent, best first
    #[serde(default)]
    pub all_intents: Vec<(String, f64)>,
    pub raw_entity: Option<String>,
    pub resolved_entity: Option<String>,
    /// 0-100
    pub resolution_confidence: u8,
    #[serde(default)]
    pub from_context: bool,
    pub entities: StructuredEntities,
    /// 0.0-1.0, rounded to two decimals
    pub overall_confidence: f64,
    pub query_length: usize,
}

impl QueryAnalysis {
    /// Substitute an entity remembered from earlier turns
    pub fn apply_context_entity(&mut self, name: impl Into<String>) {
        self.resolved_entity = Some(name.into());
        self.from_context = true;
    }
}
