//! Drug knowledge base
//!
//! Read-only lookup of drug monographs by name, used by the drug expert.

use async_trait::async_trait;
use pharmacy_assistant_core::{DrugData, KnowledgeEntry};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Knowledge base errors
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Failed to read knowledge base: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse knowledge base: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid knowledge base record: {0}")]
    InvalidRecord(String),

    #[error("Knowledge base unavailable: {0}")]
    Backend(String),
}

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Every drug name, in name order
    async fn names(&self) -> Result<Vec<String>, KnowledgeError>;

    /// First entry (in name order) whose name contains `fragment`,
    /// ignoring case
    async fn find_containing(&self, fragment: &str)
        -> Result<Option<KnowledgeEntry>, KnowledgeError>;

    /// Entry with exactly this name, ignoring case
    async fn get_by_name(&self, name: &str) -> Result<Option<KnowledgeEntry>, KnowledgeError>;
}

/// Flat record as stored in `drugs.json`
#[derive(Debug, Deserialize)]
struct DrugRecord {
    drug_id: String,
    name: String,
    #[serde(flatten)]
    data: DrugData,
}

/// Knowledge base held in memory, sorted by name
#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl InMemoryKnowledgeBase {
    pub fn new(mut entries: Vec<KnowledgeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    /// Load a JSON array of drug records; `drug_id` and `name` are required
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, KnowledgeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let kb = Self::from_json_str(&raw)?;
        tracing::info!(path = %path.display(), drugs = kb.len(), "Loaded drug knowledge base");
        Ok(kb)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, KnowledgeError> {
        let records: Vec<DrugRecord> = serde_json::from_str(raw)?;
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            if record.drug_id.trim().is_empty() || record.name.trim().is_empty() {
                return Err(KnowledgeError::InvalidRecord(
                    "drug_id and name must not be empty".to_string(),
                ));
            }
            if entries
                .iter()
                .any(|e: &KnowledgeEntry| e.drug_id == record.drug_id)
            {
                return Err(KnowledgeError::InvalidRecord(format!(
                    "duplicate drug_id {}",
                    record.drug_id
                )));
            }
            entries.push(KnowledgeEntry {
                drug_id: record.drug_id,
                name: record.name,
                data: record.data,
            });
        }
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KnowledgeBase for InMemoryKnowledgeBase {
    async fn names(&self) -> Result<Vec<String>, KnowledgeError> {
        Ok(self.entries.iter().map(|e| e.name.clone()).collect())
    }

    async fn find_containing(
        &self,
        fragment: &str,
    ) -> Result<Option<KnowledgeEntry>, KnowledgeError> {
        let fragment = fragment.to_lowercase();
        Ok(self
            .entries
            .iter()
            .find(|e| e.name.to_lowercase().contains(&fragment))
            .cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<KnowledgeEntry>, KnowledgeError> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRUGS: &str = r#"[
        {"drug_id": "D2", "name": "Paracetamol 500mg", "class": "Analgesic",
         "adult_dosage": "500-1000mg every 4-6 hours", "side_effects": ["Nausea"]},
        {"drug_id": "D1", "name": "Ibuprofen", "class": "NSAID",
         "prescription_required": false, "storage_note": "Keep dry"}
    ]"#;

    #[tokio::test]
    async fn test_load_sorts_by_name() {
        let kb = InMemoryKnowledgeBase::from_json_str(DRUGS).unwrap();
        assert_eq!(
            kb.names().await.unwrap(),
            vec!["Ibuprofen".to_string(), "Paracetamol 500mg".to_string()]
        );
    }

    #[tokio::test]
    async fn test_lookup() {
        let kb = InMemoryKnowledgeBase::from_json_str(DRUGS).unwrap();

        let entry = kb.find_containing("paracetamol").await.unwrap().unwrap();
        assert_eq!(entry.drug_id, "D2");
        assert_eq!(entry.data.side_effects, vec!["Nausea".to_string()]);
        // Identity fields are not duplicated into the attribute bag
        assert!(!entry.data.extra.contains_key("name"));

        let entry = kb.get_by_name("IBUPROFEN").await.unwrap().unwrap();
        assert_eq!(entry.data.class_or_default(), "NSAID");
        assert_eq!(entry.data.extra["storage_note"], "Keep dry");

        assert!(kb.find_containing("aspirin").await.unwrap().is_none());
    }

    #[test]
    fn test_rejects_missing_identity() {
        assert!(matches!(
            InMemoryKnowledgeBase::from_json_str(r#"[{"name": "X"}]"#),
            Err(KnowledgeError::Parse(_))
        ));
        assert!(matches!(
            InMemoryKnowledgeBase::from_json_str(r#"[{"drug_id": "", "name": "X"}]"#),
            Err(KnowledgeError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drugs.json");
        std::fs::write(&path, DRUGS).unwrap();
        assert_eq!(InMemoryKnowledgeBase::from_json_file(&path).unwrap().len(), 2);

        assert!(matches!(
            InMemoryKnowledgeBase::from_json_file(dir.path().join("missing.json")),
            Err(KnowledgeError::Io(_))
        ));
    }
}
