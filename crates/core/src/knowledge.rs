//! Drug knowledge base records used by the expert engine

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute bag for one drug
///
/// Known attributes are typed; anything else in the source record is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adult_dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paediatric_dosage: Option<String>,
    #[serde(default)]
    pub side_effects: Vec<String>,
    #[serde(default)]
    pub substitutes: Vec<String>,
    #[serde(default)]
    pub indications: Vec<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub drug_class: Option<String>,
    #[serde(default)]
    pub prescription_required: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DrugData {
    /// Drug class, or the generic word "medication"
    pub fn class_or_default(&self) -> &str {
        self.drug_class.as_deref().unwrap_or("medication")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub drug_id: String,
    pub name: String,
    pub data: DrugData,
}
