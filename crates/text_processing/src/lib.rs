//! Text processing for the pharmacy assistant
//!
//! This crate provides:
//! - **Intent classification**: ordered first-match regex table for shopping actions
//! - **Fuzzy matching**: matching-blocks similarity used for drug-name resolution
//! - **Entity extraction**: dosage, frequency, age and pregnancy mentions
//! - **Name resolution**: free text to a known catalog or knowledge-base name
//! - **Query analysis**: topic scoring and confidence blending for drug questions

pub mod analyzer;
pub mod entities;
pub mod fuzzy;
pub mod intent;
pub mod resolver;

pub use analyzer::{blend_confidence, round2, DrugTopic, QueryAnalyzer};
pub use entities::EntityExtractor;
pub use fuzzy::FUZZY_MATCH_THRESHOLD;
pub use intent::{Classification, ClassifierError, IntentClassifier, PatternRule, RuleSpec};
pub use resolver::{is_pronoun, EntityResolver};
