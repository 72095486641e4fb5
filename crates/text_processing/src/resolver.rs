//! Drug and product name resolution
//!
//! Resolves free text to one of a list of known names: an exact
//! case-insensitive containment wins outright, otherwise candidate words are
//! fuzzy-scored against every known name.

use once_cell::sync::Lazy;
use pharmacy_assistant_core::Resolution;
use regex::Regex;

use crate::fuzzy::{extract_one, FUZZY_MATCH_THRESHOLD};

// Candidate sources, scanned in this order over the original-case text
static AFTER_PREPOSITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:about|for|regarding|concerning|of)\s+([A-Za-z]+)").unwrap()
});

static AFTER_DRUG_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:drug|medicine|medication|tablet)\s+([A-Za-z]+)").unwrap());

static DRUG_SUFFIX_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+(?:in|ol|ide|ine|ate|one))\b").unwrap());

static LONG_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Za-z]{4,}\b").unwrap());

/// Words such as "it" or "that one" that refer back to an earlier product
const PRONOUNS: [&str; 6] = ["it", "this", "that", "them", "this one", "that one"];

/// Whether `entity` is a pronoun rather than a name
pub fn is_pronoun(entity: &str) -> bool {
    let entity = entity.trim().to_lowercase();
    PRONOUNS.contains(&entity.as_str())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntityResolver;

impl EntityResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the drug a query mentions, if any
    pub fn extract_drug_name<S: AsRef<str>>(&self, text: &str, known: &[S]) -> Option<Resolution> {
        let lowered = text.to_lowercase();
        if let Some(name) = known
            .iter()
            .map(|name| name.as_ref())
            .find(|name| lowered.contains(&name.to_lowercase()))
        {
            return Some(Resolution::matched(name, 100));
        }

        let mut best: Option<(&str, u8)> = None;
        for candidate in candidates(text) {
            let Some((name, score)) = extract_one(candidate, known) else {
                continue;
            };
            let current = best.map_or(0, |(_, s)| s);
            if score > current && score >= FUZZY_MATCH_THRESHOLD {
                best = Some((name, score));
            }
        }

        if let Some((name, score)) = best {
            tracing::debug!(name, score, "Fuzzy-resolved drug name");
        }
        best.map(|(name, score)| Resolution::matched(name, score))
    }

    /// Fuzzy-match a single name fragment, for "did you mean" retries
    pub fn closest_name<'a, S: AsRef<str>>(&self, fragment: &str, known: &'a [S]) -> Option<(&'a str, u8)> {
        extract_one(fragment, known).filter(|(_, score)| *score >= FUZZY_MATCH_THRESHOLD)
    }
}

fn candidates(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for pattern in [&*AFTER_PREPOSITION, &*AFTER_DRUG_WORD, &*DRUG_SUFFIX_WORD] {
        out.extend(
            pattern
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str()),
        );
    }
    out.extend(LONG_WORD.find_iter(text).map(|m| m.as_str()));
    out
}
