//! Query analysis for the drug expert
//!
//! Scores a query against medical topics, resolves the drug it is about,
//! extracts structured entities and blends everything into one confidence.

use once_cell::sync::Lazy;
use pharmacy_assistant_core::QueryAnalysis;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::EntityExtractor;
use crate::resolver::EntityResolver;

/// Medical topic a drug question is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrugTopic {
    Dosage,
    SideEffects,
    Substitutes,
    Indications,
    Contraindications,
    Interactions,
    Storage,
    Pregnancy,
    General,
}

impl DrugTopic {
    /// Topics with patterns, in scoring order
    pub const SCORED: [DrugTopic; 8] = [
        DrugTopic::Dosage,
        DrugTopic::SideEffects,
        DrugTopic::Substitutes,
        DrugTopic::Indications,
        DrugTopic::Contraindications,
        DrugTopic::Interactions,
        DrugTopic::Storage,
        DrugTopic::Pregnancy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrugTopic::Dosage => "dosage",
            DrugTopic::SideEffects => "side_effects",
            DrugTopic::Substitutes => "substitutes",
            DrugTopic::Indications => "indications",
            DrugTopic::Contraindications => "contraindications",
            DrugTopic::Interactions => "interactions",
            DrugTopic::Storage => "storage",
            DrugTopic::Pregnancy => "pregnancy",
            DrugTopic::General => "general",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::SCORED
            .iter()
            .copied()
            .chain(std::iter::once(DrugTopic::General))
            .find(|t| t.as_str() == label)
    }

    fn patterns(&self) -> &'static [Regex] {
        match self {
            DrugTopic::Dosage => &DOSAGE[..],
            DrugTopic::SideEffects => &SIDE_EFFECTS[..],
            DrugTopic::Substitutes => &SUBSTITUTES[..],
            DrugTopic::Indications => &INDICATIONS[..],
            DrugTopic::Contraindications => &CONTRAINDICATIONS[..],
            DrugTopic::Interactions => &INTERACTIONS[..],
            DrugTopic::Storage => &STORAGE[..],
            DrugTopic::Pregnancy => &PREGNANCY[..],
            DrugTopic::General => &[],
        }
    }
}

impl fmt::Display for DrugTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compile<const N: usize>(patterns: [&str; N]) -> [Regex; N] {
    patterns.map(|p| Regex::new(p).unwrap())
}

static DOSAGE: Lazy<[Regex; 2]> = Lazy::new(|| {
    compile([
        r"\b(dosage|dose|how much|quantity|amount|take|consume)\b",
        r"\b(mg|ml|tablet|capsule|times|daily|frequency)\b",
    ])
});
static SIDE_EFFECTS: Lazy<[Regex; 2]> = Lazy::new(|| {
    compile([
        r"\b(side effect|adverse|reaction|problem|issue|harm|danger)\b",
        r"\b(after taking|caused by|because of)\b",
    ])
});
static SUBSTITUTES: Lazy<[Regex; 2]> = Lazy::new(|| {
    compile([
        r"\b(substitute|alternative|replace|instead|similar|equivalent)\b",
        r"\b(other option|different|change)\b",
    ])
});
static INDICATIONS: Lazy<[Regex; 2]> = Lazy::new(|| {
    compile([
        r"\b(indication|use|used for|treat|cure|help|purpose)\b",
        r"\b(what is.*for|why take|benefit)\b",
    ])
});
static CONTRAINDICATIONS: Lazy<[Regex; 2]> = Lazy::new(|| {
    compile([
        r"\b(contraindication|avoid|not take|should not|cannot|forbidden)\b",
        r"\b(when not|who should not|danger|risk)\b",
    ])
});
static INTERACTIONS: Lazy<[Regex; 2]> = Lazy::new(|| {
    compile([
        r"\b(interact|combination|together|with|along with)\b",
        r"\b(mix|combine|take with)\b",
    ])
});
static STORAGE: Lazy<[Regex; 2]> = Lazy::new(|| {
    compile([
        r"\b(store|storage|keep|preserve|shelf life|expiry)\b",
        r"\b(temperature|refrigerate|room temperature)\b",
    ])
});
static PREGNANCY: Lazy<[Regex; 2]> = Lazy::new(|| {
    compile([
        r"\b(pregnan|lactation|breastfeed|nursing|mother)\b",
        r"\b(safe during pregnancy|while pregnant)\b",
    ])
});

/// Words that mark a query as a question when they open it
const QUESTION_WORDS: [&str; 11] = [
    "what", "when", "where", "how", "why", "which", "who", "can", "should", "is", "are",
];

/// Blend drug, intent, entity and length signals into one 0-1 score
///
/// `drug_score` is the 0-100 resolution confidence; `query_length` counts
/// characters of the raw query.
pub fn blend_confidence(
    drug_score: u8,
    intent_confidence: f64,
    has_entities: bool,
    query_length: usize,
) -> f64 {
    const DRUG_WEIGHT: f64 = 0.4;
    const INTENT_WEIGHT: f64 = 0.3;
    const ENTITY_WEIGHT: f64 = 0.2;
    const QUERY_WEIGHT: f64 = 0.1;

    let drug = f64::from(drug_score) / 100.0;
    let entity = if has_entities { 1.0 } else { 0.5 };
    let length = if query_length > 5 {
        (query_length as f64 / 50.0).min(1.0)
    } else {
        0.5
    };

    let blended = drug * DRUG_WEIGHT
        + intent_confidence * INTENT_WEIGHT
        + entity * ENTITY_WEIGHT
        + length * QUERY_WEIGHT;
    round2(blended)
}

/// Round to 2 decimals, ties to the even digit (0.125 -> 0.12, 0.375 -> 0.38)
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    let floor = scaled.floor();
    let rounded = if scaled - floor == 0.5 {
        if floor % 2.0 == 0.0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        scaled.round()
    };
    rounded / 100.0
}

/// Topic scoring, drug resolution and entity extraction in one pass
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryAnalyzer {
    resolver: EntityResolver,
    extractor: EntityExtractor,
}

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank topics for a query, best first; never empty
    pub fn classify_topics(&self, query: &str) -> Vec<(DrugTopic, f64)> {
        let lowered = query.to_lowercase();

        let mut scores: Vec<(DrugTopic, f64)> = DrugTopic::SCORED
            .iter()
            .filter_map(|topic| {
                let patterns = topic.patterns();
                let matches = patterns.iter().filter(|p| p.is_match(&lowered)).count();
                (matches > 0).then(|| (*topic, (matches as f64 / patterns.len() as f64).min(1.0)))
            })
            .collect();

        if scores.is_empty() {
            let is_question = lowered
                .split_whitespace()
                .take(3)
                .any(|word| QUESTION_WORDS.contains(&word));
            let score = if is_question { 0.5 } else { 0.3 };
            return vec![(DrugTopic::General, score)];
        }

        // Stable sort keeps declaration order among ties
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores
    }

    /// Full analysis of a drug question against the known drug names
    pub fn parse_query<S: AsRef<str>>(&self, query: &str, drug_names: &[S]) -> QueryAnalysis {
        let resolution = self.resolver.extract_drug_name(query, drug_names);
        let topics = self.classify_topics(query);
        let (primary, intent_confidence) = topics[0];
        let entities = self.extractor.extract(query);

        let drug_score = resolution.as_ref().map_or(0, |r| r.confidence);
        let query_length = query.chars().count();
        let overall_confidence =
            blend_confidence(drug_score, intent_confidence, !entities.is_empty(), query_length);

        tracing::debug!(
            topic = %primary,
            drug = ?resolution.as_ref().map(|r| &r.name),
            confidence = overall_confidence,
            "Analyzed drug query"
        );

        QueryAnalysis {
            intent: primary.as_str().to_string(),
            intent_confidence,
            all_intents: topics
                .iter()
                .map(|(t, s)| (t.as_str().to_string(), *s))
                .collect(),
            raw_entity: None,
            resolved_entity: resolution.as_ref().map(|r| r.name.clone()),
            resolution_confidence: drug_score,
            from_context: false,
            entities,
            overall_confidence,
            query_length,
        }
    }
}
