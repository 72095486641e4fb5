//! Feedback kinds and payloads submitted against logged replies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Rating,
    IntentCorrection,
    DrugCorrection,
    Helpful,
    NotHelpful,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 5] = [
        FeedbackKind::Rating,
        FeedbackKind::IntentCorrection,
        FeedbackKind::DrugCorrection,
        FeedbackKind::Helpful,
        FeedbackKind::NotHelpful,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Rating => "rating",
            FeedbackKind::IntentCorrection => "intent_correction",
            FeedbackKind::DrugCorrection => "drug_correction",
            FeedbackKind::Helpful => "helpful",
            FeedbackKind::NotHelpful => "not_helpful",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!(
                    "Invalid feedback_type. Must be one of: {}",
                    valid.join(", ")
                )
            })
    }
}

/// Loose payload; which fields matter depends on the feedback kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_drug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_drug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(
            "drug_correction".parse::<FeedbackKind>(),
            Ok(FeedbackKind::DrugCorrection)
        );
        let err = "thumbs".parse::<FeedbackKind>().unwrap_err();
        assert!(err.starts_with("Invalid feedback_type. Must be one of: rating,"));
    }
}
