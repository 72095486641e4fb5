//! Drug expert
//!
//! Rule-based answers to medical questions about a single drug. The query is
//! scored against medical topics, the drug is resolved against the knowledge
//! base, and a per-topic template is filled from the drug's monograph.

use pharmacy_assistant_core::{
    ContextSummary, CustomerId, KnowledgeEntry, QueryAnalysis, StructuredEntities,
};
use pharmacy_assistant_persistence::{AuditLog, AuditRecord};
use pharmacy_assistant_text_processing::{DrugTopic, EntityResolver, QueryAnalyzer};
use pharmacy_assistant_tools::KnowledgeBase;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::{ContextStore, ConversationContext};
use crate::training::FeedbackTracker;
use crate::AgentError;

/// Patient facts pulled from the query, used for safety warnings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientContext {
    pub age: Option<u32>,
    pub conditions: Vec<String>,
}

impl PatientContext {
    pub fn from_entities(entities: &StructuredEntities) -> Self {
        let mut conditions = Vec::new();
        if entities.mentions_pregnancy() {
            conditions.push("pregnancy".to_string());
        }
        Self {
            age: entities.first_age(),
            conditions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.age.is_none() && self.conditions.is_empty()
    }
}

/// Template output for one topic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedResponse {
    pub response: String,
    pub confidence: f64,
    pub category: Option<DrugTopic>,
    pub requires_prescription: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl GeneratedResponse {
    fn new(topic: DrugTopic, lines: Vec<String>, confidence: f64, entry: &KnowledgeEntry) -> Self {
        Self {
            response: lines.join("\n"),
            confidence,
            category: Some(topic),
            requires_prescription: entry.data.prescription_required,
            suggestions: Vec::new(),
        }
    }
}

fn numbered(items: &[String]) -> impl Iterator<Item = String> + '_ {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
}

fn lines<'a>(items: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
    items.iter().map(|s| s.to_string())
}

/// Fill the template for `topic` from a knowledge base entry
pub fn generate_response(
    topic: DrugTopic,
    entry: Option<&KnowledgeEntry>,
    entities: &StructuredEntities,
) -> GeneratedResponse {
    let Some(entry) = entry else {
        return GeneratedResponse {
            response: "I don't have information about that medication in my knowledge base."
                .to_string(),
            confidence: 0.2,
            category: None,
            requires_prescription: false,
            suggestions: vec![
                "Please check the spelling".to_string(),
                "Try using the generic name".to_string(),
            ],
        };
    };

    match topic {
        DrugTopic::Dosage => dosage(entry, entities),
        DrugTopic::SideEffects => side_effects(entry),
        DrugTopic::Substitutes => substitutes(entry),
        DrugTopic::Indications => indications(entry),
        DrugTopic::Contraindications => contraindications(entry),
        DrugTopic::Interactions => interactions(entry),
        DrugTopic::Storage => storage(entry),
        DrugTopic::Pregnancy => pregnancy(entry),
        DrugTopic::General => general(entry),
    }
}

fn empty(topic: DrugTopic, text: String, confidence: f64, entry: &KnowledgeEntry) -> GeneratedResponse {
    GeneratedResponse::new(topic, vec![text], confidence, entry)
}

fn dosage(entry: &KnowledgeEntry, entities: &StructuredEntities) -> GeneratedResponse {
    let data = &entry.data;
    let mut response = [
        format!("**{} Dosage Information:**\n", entry.name),
        format!(
            "• **Adult Dosage:** {}",
            data.adult_dosage.as_deref().unwrap_or("Not specified")
        ),
        format!(
            "• **Pediatric Dosage:** {}",
            data.paediatric_dosage.as_deref().unwrap_or("Not specified")
        ),
    ]
    .join("\n");

    let mut warnings = Vec::new();
    if !entities.age.is_empty() {
        warnings.push("⚠️ Dosage should be adjusted based on patient age");
    }
    if data.prescription_required {
        warnings.push("⚠️ This medication requires a prescription");
    }
    if !warnings.is_empty() {
        response.push_str("\n\n");
        response.push_str(&warnings.join("\n"));
    }

    response.push_str(
        &[
            "\n**Administration Tips:**",
            "• Take as directed by your physician",
            "• Complete the full course if it's an antibiotic",
            "• Do not exceed the recommended dose",
        ]
        .join("\n"),
    );

    GeneratedResponse {
        response,
        confidence: 0.95,
        category: Some(DrugTopic::Dosage),
        requires_prescription: data.prescription_required,
        suggestions: Vec::new(),
    }
}

fn side_effects(entry: &KnowledgeEntry) -> GeneratedResponse {
    let effects = &entry.data.side_effects;
    if effects.is_empty() {
        return empty(
            DrugTopic::SideEffects,
            format!(
                "No significant side effects are documented for {}. However, always monitor for any unusual reactions.",
                entry.name
            ),
            0.8,
            entry,
        );
    }

    let mut out = vec![
        format!("**{} - Possible Side Effects:**\n", entry.name),
        "**Common Side Effects:**".to_string(),
    ];
    out.extend(numbered(effects));
    out.extend(lines(&[
        "\n**When to Seek Medical Attention:**",
        "• Severe allergic reactions (rash, difficulty breathing, swelling)",
        "• Persistent or worsening symptoms",
        "• Any unusual or severe side effects",
        "\n💡 **Note:** Not everyone experiences side effects. Contact your healthcare provider if you have concerns.",
    ]));
    GeneratedResponse::new(DrugTopic::SideEffects, out, 0.92, entry)
}

fn substitutes(entry: &KnowledgeEntry) -> GeneratedResponse {
    let substitutes = &entry.data.substitutes;
    if substitutes.is_empty() {
        return empty(
            DrugTopic::Substitutes,
            format!(
                "No documented substitutes for {} are available in the database. Consult your physician for alternatives.",
                entry.name
            ),
            0.7,
            entry,
        );
    }

    let mut out = vec![
        format!("**Possible Substitutes for {}:**\n", entry.name),
        format!("Drug Class: {}\n", entry.data.class_or_default()),
        "**Alternative Medications:**".to_string(),
    ];
    out.extend(numbered(substitutes));
    out.extend(lines(&[
        "\n⚠️ **Important:**",
        "• Always consult your healthcare provider before switching medications",
        "• Substitutes may have different dosages or side effect profiles",
        "• Your doctor will consider your specific medical condition",
    ]));
    GeneratedResponse::new(DrugTopic::Substitutes, out, 0.88, entry)
}

fn indications(entry: &KnowledgeEntry) -> GeneratedResponse {
    let class = entry.data.class_or_default();
    let indications = &entry.data.indications;
    if indications.is_empty() {
        return empty(
            DrugTopic::Indications,
            format!(
                "{} is a {}. Specific indications are not listed in the database.",
                entry.name, class
            ),
            0.75,
            entry,
        );
    }

    let mut out = vec![
        format!("**{} - Medical Uses:**\n", entry.name),
        format!("Drug Class: {}\n", class),
        "**Approved Indications:**".to_string(),
    ];
    out.extend(numbered(indications));
    out.push("\n📋 **Additional Information:**".to_string());
    out.push(format!("• {} belongs to the {} class", entry.name, class));
    out.extend(lines(&[
        "• Use only as prescribed by your healthcare provider",
        "• Do not use for conditions not approved by your doctor",
    ]));
    GeneratedResponse::new(DrugTopic::Indications, out, 0.93, entry)
}

fn contraindications(entry: &KnowledgeEntry) -> GeneratedResponse {
    let contraindications = &entry.data.contraindications;
    if contraindications.is_empty() {
        return empty(
            DrugTopic::Contraindications,
            format!(
                "No specific contraindications are documented for {}. However, inform your doctor about all your medical conditions.",
                entry.name
            ),
            0.8,
            entry,
        );
    }

    let mut out = vec![
        format!("**{} - Contraindications:**\n", entry.name),
        "⚠️ **Do NOT use this medication if you have:**".to_string(),
    ];
    out.extend(numbered(contraindications));
    out.extend(lines(&[
        "\n**Important Safety Information:**",
        "• Always inform your doctor about your complete medical history",
        "• Mention all medications and supplements you're taking",
        "• Report any allergies to medications",
        "• Inform if you're pregnant, planning pregnancy, or breastfeeding",
    ]));
    GeneratedResponse::new(DrugTopic::Contraindications, out, 0.94, entry)
}

fn interactions(entry: &KnowledgeEntry) -> GeneratedResponse {
    let mut out = vec![format!("**{} - Drug Interactions:**\n", entry.name)];
    out.extend(lines(&[
        "⚠️ **General Interaction Precautions:**",
        "• Inform your doctor about ALL medications you're taking",
        "• Include prescription drugs, over-the-counter medicines, and supplements",
        "• Avoid alcohol unless approved by your doctor",
        "• Some foods may interact with this medication",
    ]));

    let class = entry
        .data
        .drug_class
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    if class.contains("nsaid") {
        out.extend(lines(&[
            "\n**Specific Warnings for NSAIDs:**",
            "• May interact with blood thinners (increased bleeding risk)",
            "• Avoid combining with other NSAIDs",
            "• Use caution with blood pressure medications",
        ]));
    } else if class.contains("antibiotic") {
        out.extend(lines(&[
            "\n**Specific Warnings for Antibiotics:**",
            "• May reduce effectiveness of birth control pills",
            "• Avoid dairy products (for some antibiotics)",
            "• Complete the full course as prescribed",
        ]));
    }
    GeneratedResponse::new(DrugTopic::Interactions, out, 0.85, entry)
}

fn storage(entry: &KnowledgeEntry) -> GeneratedResponse {
    let mut out = vec![format!("**{} - Storage Guidelines:**\n", entry.name)];
    out.extend(lines(&[
        "**General Storage Instructions:**",
        "• Store at room temperature (15-30°C / 59-86°F)",
        "• Keep away from moisture and direct sunlight",
        "• Store in original container with lid tightly closed",
        "• Keep out of reach of children and pets",
        "\n**Additional Tips:**",
        "• Do not store in bathroom (humidity can affect medication)",
        "• Check expiration date before use",
        "• Dispose of expired medications properly",
        "• Do not freeze unless specifically instructed",
    ]));
    GeneratedResponse::new(DrugTopic::Storage, out, 0.90, entry)
}

fn pregnancy(entry: &KnowledgeEntry) -> GeneratedResponse {
    let mut out = vec![format!("**{} - Pregnancy & Lactation:**\n", entry.name)];
    let contraindicated = entry
        .data
        .contraindications
        .iter()
        .any(|c| c.to_lowercase().contains("pregnan"));

    if contraindicated {
        out.extend(lines(&[
            "⚠️ **WARNING:** This medication may be contraindicated during pregnancy.",
            "\n**Important:**",
            "• Do NOT use during pregnancy without doctor's approval",
            "• Inform your doctor if you are pregnant or planning pregnancy",
            "• Discuss risks and benefits with your healthcare provider",
        ]));
    } else {
        out.extend(lines(&[
            "**General Pregnancy Guidelines:**",
            "• Always consult your doctor before taking any medication during pregnancy",
            "• Risk category information should be discussed with your healthcare provider",
            "• Benefits must be weighed against potential risks",
            "\n**Breastfeeding:**",
            "• Consult your doctor before use while breastfeeding",
            "• Some medications pass into breast milk",
        ]));
    }
    GeneratedResponse::new(DrugTopic::Pregnancy, out, 0.87, entry)
}

fn general(entry: &KnowledgeEntry) -> GeneratedResponse {
    let data = &entry.data;
    let mut out = vec![
        format!("**{} - Overview:**\n", entry.name),
        format!("**Drug Class:** {}", data.class_or_default()),
        format!(
            "**Prescription Required:** {}",
            if data.prescription_required { "Yes" } else { "No" }
        ),
    ];
    if !data.indications.is_empty() {
        let uses: Vec<&str> = data.indications.iter().take(3).map(String::as_str).collect();
        out.push(format!("\n**Primary Uses:** {}", uses.join(", ")));
    }
    out.extend(lines(&[
        "\n**What would you like to know?**",
        "• Dosage information",
        "• Side effects",
        "• Substitutes or alternatives",
        "• Contraindications",
        "• Drug interactions",
        "\nPlease ask a specific question for detailed information.",
    ]));
    GeneratedResponse::new(DrugTopic::General, out, 0.80, entry)
}

/// Safety warnings for a patient taking the drug
pub fn apply_rules(entry: &KnowledgeEntry, patient: &PatientContext) -> Vec<String> {
    let mut warnings = Vec::new();
    if patient.is_empty() {
        return warnings;
    }

    match patient.age {
        Some(age) if age < 18 => {
            warnings.push("⚠️ Pediatric dosing required - consult healthcare provider".to_string())
        }
        Some(age) if age >= 65 => {
            warnings.push("⚠️ Elderly patient - consider dose adjustment".to_string())
        }
        _ => {}
    }

    if entry.data.prescription_required {
        warnings.push("📋 Prescription required for this medication".to_string());
    }

    for condition in &patient.conditions {
        let condition_lower = condition.to_lowercase();
        if entry
            .data
            .contraindications
            .iter()
            .any(|c| c.to_lowercase().contains(&condition_lower))
        {
            warnings.push(format!("🚫 CONTRAINDICATED: Patient has {}", condition));
        }
    }

    warnings
}

/// Reply from the drug expert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpertAnswer {
    pub answer: String,
    pub confidence: f64,
    pub drug_name: Option<String>,
    pub intent: String,
    pub suggestions: Vec<String>,
    pub query_analysis: QueryAnalysis,
    pub log_id: Option<Uuid>,
    pub category: Option<DrugTopic>,
    pub context: ContextSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Whether a knowledge base entry backed the answer
    #[serde(skip)]
    pub found: bool,
}

/// Drug expert assistant
pub struct ExpertAssistant {
    analyzer: QueryAnalyzer,
    resolver: EntityResolver,
    knowledge: Arc<dyn KnowledgeBase>,
    contexts: Arc<dyn ContextStore>,
    audit: Arc<dyn AuditLog>,
    tracker: Arc<FeedbackTracker>,
}

impl ExpertAssistant {
    pub fn new(
        knowledge: Arc<dyn KnowledgeBase>,
        contexts: Arc<dyn ContextStore>,
        audit: Arc<dyn AuditLog>,
        tracker: Arc<FeedbackTracker>,
    ) -> Self {
        Self {
            analyzer: QueryAnalyzer::new(),
            resolver: EntityResolver::new(),
            knowledge,
            contexts,
            audit,
            tracker,
        }
    }

    /// Answer a drug question on a session
    ///
    /// Writes an audit record and, when a drug entry was found, a context turn.
    pub async fn answer(
        &self,
        query: &str,
        session_key: &str,
        user_id: Option<CustomerId>,
    ) -> Result<ExpertAnswer, AgentError> {
        let handle = self.contexts.acquire(session_key).await;
        let mut context = handle.lock().await;

        let mut answer = self.respond(query, &context).await?;

        let record = AuditRecord::new(session_key, query, &answer.answer)
            .with_user(user_id)
            .with_intent(&answer.intent)
            .with_entities(serde_json::json!({
                "drug": answer.drug_name,
                "entities": answer.query_analysis.entities,
            }));
        match self.audit.append(record).await {
            Ok(id) => answer.log_id = Some(id),
            Err(e) => tracing::warn!(session = %session_key, error = %e, "Failed to write audit record"),
        }

        if answer.found {
            context.add_turn(
                query,
                answer.answer.clone(),
                answer.drug_name.clone(),
                Some(answer.intent.clone()),
            );
        }
        answer.context = context.summary();

        tracing::info!(
            session = %session_key,
            intent = %answer.intent,
            drug = ?answer.drug_name,
            confidence = answer.confidence,
            "Answered drug question"
        );
        Ok(answer)
    }

    /// Build an answer against an already-locked context without recording it
    pub async fn respond(
        &self,
        query: &str,
        context: &ConversationContext,
    ) -> Result<ExpertAnswer, AgentError> {
        let names = self.knowledge.names().await?;
        let mut analysis = self.analyzer.parse_query(query, &names);

        if analysis.resolved_entity.is_none() {
            if let Some(last) = context.get_last_entity() {
                analysis.apply_context_entity(last);
            }
        }

        let suggestions = self.tracker.suggest_improvements(&analysis);
        let topic = DrugTopic::from_label(&analysis.intent).unwrap_or(DrugTopic::General);

        let mut answer = ExpertAnswer {
            answer: String::new(),
            confidence: analysis.overall_confidence,
            drug_name: analysis.resolved_entity.clone(),
            intent: analysis.intent.clone(),
            suggestions,
            query_analysis: analysis.clone(),
            log_id: None,
            category: None,
            context: context.summary(),
            warnings: Vec::new(),
            found: false,
        };

        let Some(drug) = analysis.resolved_entity.as_deref() else {
            answer.answer = "I couldn't identify a specific medication in your query. Please mention the medication name clearly.".to_string();
            return Ok(answer);
        };

        let (entry, corrected) = match self.knowledge.find_containing(drug).await? {
            Some(entry) => (Some(entry), None),
            None => match self.resolver.closest_name(drug, &names) {
                Some((name, score)) => {
                    tracing::debug!(drug, name, score, "Fuzzy-matched knowledge base entry");
                    let entry = self.knowledge.get_by_name(name).await?;
                    let corrected = entry.as_ref().map(|e| e.name.clone());
                    (entry, corrected)
                }
                None => (None, None),
            },
        };

        let Some(entry) = entry else {
            answer.answer = format!(
                "I don't have information about '{}' in my knowledge base. Please check the spelling or try the generic name.",
                drug
            );
            answer.confidence = 0.3;
            answer.suggestions = vec![
                "Check medication spelling".to_string(),
                "Try using generic name".to_string(),
                "Browse available medications".to_string(),
            ];
            return Ok(answer);
        };

        let generated = generate_response(topic, Some(&entry), &analysis.entities);
        let warnings = apply_rules(&entry, &PatientContext::from_entities(&analysis.entities));

        let mut text = generated.response;
        if !warnings.is_empty() {
            text.push_str("\n\n");
            text.push_str(&warnings.join("\n"));
        }
        if let Some(name) = &corrected {
            text = format!("(Showing results for '{}')\n\n{}", name, text);
        }

        answer.answer = text;
        answer.confidence = generated.confidence;
        answer.category = generated.category;
        answer.drug_name = Some(entry.name.clone());
        answer.warnings = warnings;
        answer.found = true;
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InMemoryContextStore;
    use pharmacy_assistant_persistence::{InMemoryAuditLog, InMemoryFeedbackStore};
    use pharmacy_assistant_tools::InMemoryKnowledgeBase;

    const DRUGS: &str = r#"[
        {"drug_id": "D1", "name": "Ibuprofen", "class": "NSAID",
         "adult_dosage": "200-400mg every 4-6 hours", "paediatric_dosage": "5-10mg/kg",
         "side_effects": ["Nausea", "Heartburn"],
         "contraindications": ["Peptic ulcer", "Third trimester of pregnancy"],
         "indications": ["Pain", "Fever", "Inflammation", "Arthritis"]},
        {"drug_id": "D2", "name": "Amoxicillin", "class": "Penicillin antibiotic",
         "prescription_required": true, "substitutes": ["Ampicillin"]}
    ]"#;

    fn kb() -> InMemoryKnowledgeBase {
        InMemoryKnowledgeBase::from_json_str(DRUGS).unwrap()
    }

    fn entry(name: &str) -> KnowledgeEntry {
        let records: Vec<serde_json::Value> = serde_json::from_str(DRUGS).unwrap();
        let mut record = records.into_iter().find(|r| r["name"] == name).unwrap();
        let fields = record.as_object_mut().unwrap();
        let drug_id = fields.remove("drug_id").unwrap().as_str().unwrap().to_string();
        fields.remove("name");
        KnowledgeEntry {
            drug_id,
            name: name.to_string(),
            data: serde_json::from_value(record).unwrap(),
        }
    }

    async fn assistant() -> (ExpertAssistant, Arc<InMemoryAuditLog>) {
        let audit = Arc::new(InMemoryAuditLog::new());
        let tracker = FeedbackTracker::load(
            Arc::new(InMemoryFeedbackStore::new()),
            audit.clone(),
            std::env::temp_dir(),
        )
        .await
        .unwrap();
        let assistant = ExpertAssistant::new(
            Arc::new(kb()),
            Arc::new(InMemoryContextStore::new(5, None)),
            audit.clone(),
            Arc::new(tracker),
        );
        (assistant, audit)
    }

    #[test]
    fn test_dosage_template() {
        let entities = StructuredEntities {
            age: vec!["8".into()],
            ..Default::default()
        };
        let generated = generate_response(DrugTopic::Dosage, Some(&entry("Amoxicillin")), &entities);
        assert_eq!(generated.confidence, 0.95);
        assert!(generated.requires_prescription);
        assert_eq!(
            generated.response,
            "**Amoxicillin Dosage Information:**\n\n\
             • **Adult Dosage:** Not specified\n\
             • **Pediatric Dosage:** Not specified\n\n\
             ⚠️ Dosage should be adjusted based on patient age\n\
             ⚠️ This medication requires a prescription\n\
             **Administration Tips:**\n\
             • Take as directed by your physician\n\
             • Complete the full course if it's an antibiotic\n\
             • Do not exceed the recommended dose"
        );
    }

    #[test]
    fn test_empty_data_lowers_confidence() {
        let none = StructuredEntities::default();
        let generated = generate_response(DrugTopic::SideEffects, Some(&entry("Amoxicillin")), &none);
        assert_eq!(generated.confidence, 0.8);
        assert!(generated.response.starts_with("No significant side effects are documented for Amoxicillin."));

        let generated = generate_response(DrugTopic::Indications, Some(&entry("Amoxicillin")), &none);
        assert_eq!(generated.confidence, 0.75);
        assert_eq!(
            generated.response,
            "Amoxicillin is a Penicillin antibiotic. Specific indications are not listed in the database."
        );

        let generated = generate_response(DrugTopic::Substitutes, Some(&entry("Ibuprofen")), &none);
        assert_eq!(generated.confidence, 0.7);
    }

    #[test]
    fn test_missing_entry() {
        let generated = generate_response(DrugTopic::Dosage, None, &StructuredEntities::default());
        assert_eq!(generated.confidence, 0.2);
        assert_eq!(generated.category, None);
        assert_eq!(generated.suggestions.len(), 2);
    }

    #[test]
    fn test_interaction_blocks_follow_class() {
        let none = StructuredEntities::default();
        let nsaid = generate_response(DrugTopic::Interactions, Some(&entry("Ibuprofen")), &none);
        assert!(nsaid.response.contains("**Specific Warnings for NSAIDs:**"));
        assert!(!nsaid.response.contains("Antibiotics"));

        let antibiotic = generate_response(DrugTopic::Interactions, Some(&entry("Amoxicillin")), &none);
        assert!(antibiotic.response.contains("**Specific Warnings for Antibiotics:**"));
    }

    #[test]
    fn test_pregnancy_and_general() {
        let none = StructuredEntities::default();
        let generated = generate_response(DrugTopic::Pregnancy, Some(&entry("Ibuprofen")), &none);
        assert!(generated.response.contains("may be contraindicated during pregnancy"));

        let generated = generate_response(DrugTopic::General, Some(&entry("Ibuprofen")), &none);
        assert!(generated.response.contains("\n**Primary Uses:** Pain, Fever, Inflammation\n"));
        assert!(generated.response.contains("**Prescription Required:** No"));
        assert_eq!(generated.confidence, 0.80);
    }

    #[test]
    fn test_apply_rules() {
        let ibuprofen = entry("Ibuprofen");
        assert!(apply_rules(&ibuprofen, &PatientContext::default()).is_empty());

        let patient = PatientContext {
            age: Some(70),
            conditions: vec!["pregnancy".into()],
        };
        assert_eq!(
            apply_rules(&ibuprofen, &patient),
            vec![
                "⚠️ Elderly patient - consider dose adjustment",
                "🚫 CONTRAINDICATED: Patient has pregnancy",
            ]
        );

        let child = PatientContext {
            age: Some(10),
            conditions: vec![],
        };
        assert_eq!(
            apply_rules(&entry("Amoxicillin"), &child),
            vec![
                "⚠️ Pediatric dosing required - consult healthcare provider",
                "📋 Prescription required for this medication",
            ]
        );
    }

    #[tokio::test]
    async fn test_answer_records_audit_and_context() {
        let (assistant, audit) = assistant().await;
        let answer = assistant
            .answer("Does Ibuprofen cause any side effect?", "s1", Some(7))
            .await
            .unwrap();

        assert_eq!(answer.drug_name.as_deref(), Some("Ibuprofen"));
        assert_eq!(answer.category, Some(DrugTopic::SideEffects));
        assert_eq!(answer.confidence, 0.92);
        assert_eq!(answer.context.history_length, 1);
        assert_eq!(answer.context.current_entity.as_deref(), Some("Ibuprofen"));

        let record = audit.get(answer.log_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(record.user_id, Some(7));
        assert_eq!(record.intent.as_deref(), Some("side_effects"));
    }

    #[tokio::test]
    async fn test_follow_up_uses_context_drug() {
        let (assistant, _) = assistant().await;
        assistant.answer("dosage of Ibuprofen", "s1", None).await.unwrap();

        let answer = assistant.answer("how should I store it", "s1", None).await.unwrap();
        assert!(answer.query_analysis.from_context);
        assert_eq!(answer.category, Some(DrugTopic::Storage));
        assert!(answer.answer.starts_with("**Ibuprofen - Storage Guidelines:**"));
    }

    #[tokio::test]
    async fn test_unknown_drug_paths() {
        let (assistant, _) = assistant().await;

        let answer = assistant.answer("hello there", "s1", None).await.unwrap();
        assert!(answer.answer.starts_with("I couldn't identify a specific medication"));
        assert!(answer.drug_name.is_none());
        // No entry found, so no turn is recorded
        assert_eq!(answer.context.history_length, 0);
    }

    #[tokio::test]
    async fn test_patient_warnings_are_appended() {
        let (assistant, _) = assistant().await;
        let answer = assistant
            .answer("Is Ibuprofen safe during pregnancy?", "s1", None)
            .await
            .unwrap();
        assert_eq!(answer.category, Some(DrugTopic::Pregnancy));
        assert_eq!(answer.warnings, vec!["🚫 CONTRAINDICATED: Patient has pregnancy"]);
        assert!(answer.answer.ends_with("\n\n🚫 CONTRAINDICATED: Patient has pregnancy"));
    }
}
