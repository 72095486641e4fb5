//! Structured entity extraction
//!
//! Pulls dosage amounts, frequencies, intervals, times of day, ages and the
//! pregnancy/lactation flag out of a query. The extracted entities never decide
//! which drug a query is about; they only feed patient warnings and the
//! confidence blend.
//!
//! # Example
//!
//! ```
//! use pharmacy_assistant_text_processing::entities::EntityExtractor;
//!
//! let entities = EntityExtractor::new().extract("500mg twice a day for my 8 year old");
//!
//! assert_eq!(entities.dosage_amount, vec![("500".to_string(), "mg".to_string())]);
//! assert_eq!(entities.frequency, vec!["twice".to_string()]);
//! assert_eq!(entities.first_age(), Some(8));
//! ```

use once_cell::sync::Lazy;
use pharmacy_assistant_core::StructuredEntities;
use regex::Regex;

/// Marker stored in `special_condition` for pregnancy or lactation mentions
pub const PREGNANCY_LACTATION: &str = "pregnancy_lactation";

// Compiled regex patterns
static DOSAGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(mg|ml|g|mcg|iu)").unwrap());

static FREQUENCY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(once|twice|thrice|three times)\s*(?:a|per)?\s*day\b").unwrap()
});

static INTERVAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bevery\s+(\d+)\s+hours?\b").unwrap());

static TIME_OF_DAY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(daily|morning|evening|night|bedtime)\b").unwrap());

static AGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:year|yr|month|mo)s?\s*old").unwrap());

static SPECIAL_CONDITION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(pregnan|lactation|breastfeed)").unwrap());

/// Regex-based extractor for dosing and patient details
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every entity kind from `text`
    pub fn extract(&self, text: &str) -> StructuredEntities {
        let text = text.to_lowercase();

        let dosage_amount = DOSAGE_PATTERN
            .captures_iter(&text)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();

        let special_condition = SPECIAL_CONDITION_PATTERN
            .is_match(&text)
            .then(|| PREGNANCY_LACTATION.to_string());

        StructuredEntities {
            dosage_amount,
            frequency: first_groups(&FREQUENCY_PATTERN, &text),
            interval: first_groups(&INTERVAL_PATTERN, &text),
            time_of_day: first_groups(&TIME_OF_DAY_PATTERN, &text),
            age: first_groups(&AGE_PATTERN, &text),
            special_condition,
        }
    }
}

fn first_groups(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}
