//! Feedback tracking and accuracy analytics
//!
//! Feedback never changes classification; it only accumulates accuracy
//! counters and ratings that operators review through the analytics routes.

use parking_lot::RwLock;
use pharmacy_assistant_core::{FeedbackKind, FeedbackPayload, QueryAnalysis};
use pharmacy_assistant_persistence::{
    default_export_path, read_export, write_export, AccuracyCounter, AuditLog, FeedbackEntry,
    FeedbackStore, TrainingSnapshot,
};
use pharmacy_assistant_text_processing::round2;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::AgentError;

/// Accuracy for one predicted intent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentAccuracy {
    pub intent: String,
    pub accuracy: f64,
    pub correct: u64,
    pub total: u64,
}

/// Accuracy across every intent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallIntentAccuracy {
    pub overall_accuracy: f64,
    pub total_queries: u64,
    pub by_intent: BTreeMap<String, IntentAccuracy>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrugRecognitionAccuracy {
    pub overall_accuracy: f64,
    pub total_queries: u64,
    pub correct_recognitions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingInsights {
    pub intent_accuracy: OverallIntentAccuracy,
    pub drug_recognition_accuracy: DrugRecognitionAccuracy,
    pub average_rating: f64,
    pub total_feedback_entries: usize,
    pub recommendations: Vec<String>,
}

fn total(counters: &BTreeMap<String, AccuracyCounter>) -> AccuracyCounter {
    counters
        .values()
        .fold(AccuracyCounter::default(), |mut acc, c| {
            acc.merge(*c);
            acc
        })
}

fn mean(ratings: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = ratings.fold((0.0, 0usize), |(sum, count), r| (sum + r, count + 1));
    if count == 0 {
        0.0
    } else {
        round2(sum / count as f64)
    }
}

/// Feedback tracker
///
/// Holds the training snapshot in memory and writes it through the
/// [`FeedbackStore`] after every change.
pub struct FeedbackTracker {
    snapshot: RwLock<TrainingSnapshot>,
    /// Serializes read-modify-save cycles
    write_gate: tokio::sync::Mutex<()>,
    store: Arc<dyn FeedbackStore>,
    audit: Arc<dyn AuditLog>,
    export_dir: PathBuf,
}

impl FeedbackTracker {
    /// Load the saved snapshot and start tracking
    pub async fn load(
        store: Arc<dyn FeedbackStore>,
        audit: Arc<dyn AuditLog>,
        export_dir: impl Into<PathBuf>,
    ) -> Result<Self, AgentError> {
        let snapshot = store.load().await?;
        tracing::info!(
            entries = snapshot.entry_count(),
            intents = snapshot.intent_accuracy.len(),
            "Loaded training data"
        );
        Ok(Self {
            snapshot: RwLock::new(snapshot),
            write_gate: tokio::sync::Mutex::new(()),
            store,
            audit,
            export_dir: export_dir.into(),
        })
    }

    /// Record feedback against a logged reply
    pub async fn record_feedback(
        &self,
        log_id: Uuid,
        kind: FeedbackKind,
        payload: FeedbackPayload,
    ) -> Result<(), AgentError> {
        let _gate = self.write_gate.lock().await;

        // Changes go to a copy that replaces the live snapshot once saved
        let mut next = self.snapshot.read().clone();
        next.feedback_data
            .entry(log_id)
            .or_default()
            .push(FeedbackEntry::new(log_id, kind, payload.clone()));

        match kind {
            FeedbackKind::IntentCorrection => {
                if let (Some(predicted), Some(correct)) = (
                    payload.predicted_intent.as_deref().filter(|s| !s.is_empty()),
                    payload.correct_intent.as_deref().filter(|s| !s.is_empty()),
                ) {
                    next
                        .intent_accuracy
                        .entry(predicted.to_string())
                        .or_default()
                        .record(predicted == correct);
                }
            }
            FeedbackKind::DrugCorrection => {
                if let (Some(predicted), Some(correct)) = (
                    payload.predicted_drug.as_deref().filter(|s| !s.is_empty()),
                    payload.correct_drug.as_deref().filter(|s| !s.is_empty()),
                ) {
                    next
                        .drug_recognition_accuracy
                        .entry(predicted.to_string())
                        .or_default()
                        .record(predicted.to_lowercase() == correct.to_lowercase());
                }
            }
            FeedbackKind::Rating => {
                if let (Some(intent), Some(rating)) = (
                    payload.intent.as_deref().filter(|s| !s.is_empty()),
                    payload.rating.filter(|r| *r != 0.0),
                ) {
                    next
                        .response_ratings
                        .entry(intent.to_string())
                        .or_default()
                        .push(rating);
                }
            }
            FeedbackKind::Helpful | FeedbackKind::NotHelpful => {}
        }

        self.store.save(&next).await?;
        *self.snapshot.write() = next;

        if kind == FeedbackKind::NotHelpful {
            match self.audit.flag(log_id).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(log_id = %log_id, "Flagged feedback for an unknown log record")
                }
                Err(e) => tracing::warn!(log_id = %log_id, error = %e, "Failed to flag log record"),
            }
        }

        tracing::info!(log_id = %log_id, feedback_type = %kind, "Recorded feedback");
        Ok(())
    }

    pub fn intent_accuracy(&self, intent: &str) -> IntentAccuracy {
        let snapshot = self.snapshot.read();
        let counter = snapshot
            .intent_accuracy
            .get(intent)
            .copied()
            .unwrap_or_default();
        IntentAccuracy {
            intent: intent.to_string(),
            accuracy: round2(counter.accuracy()),
            correct: counter.correct,
            total: counter.total,
        }
    }

    pub fn overall_intent_accuracy(&self) -> OverallIntentAccuracy {
        let intents: Vec<String> = self.snapshot.read().intent_accuracy.keys().cloned().collect();
        let by_intent = intents
            .into_iter()
            .map(|intent| {
                let accuracy = self.intent_accuracy(&intent);
                (intent, accuracy)
            })
            .collect();

        let totals = total(&self.snapshot.read().intent_accuracy);
        OverallIntentAccuracy {
            overall_accuracy: round2(totals.accuracy()),
            total_queries: totals.total,
            by_intent,
        }
    }

    pub fn drug_recognition_accuracy(&self) -> DrugRecognitionAccuracy {
        let totals = total(&self.snapshot.read().drug_recognition_accuracy);
        DrugRecognitionAccuracy {
            overall_accuracy: round2(totals.accuracy()),
            total_queries: totals.total,
            correct_recognitions: totals.correct,
        }
    }

    /// Mean rating for one intent, or across all intents
    pub fn average_rating(&self, intent: Option<&str>) -> f64 {
        let snapshot = self.snapshot.read();
        match intent {
            Some(intent) => mean(
                snapshot
                    .response_ratings
                    .get(intent)
                    .into_iter()
                    .flatten()
                    .copied(),
            ),
            None => mean(snapshot.response_ratings.values().flatten().copied()),
        }
    }

    pub fn insights(&self) -> TrainingInsights {
        let intent_accuracy = self.overall_intent_accuracy();
        let drug_recognition_accuracy = self.drug_recognition_accuracy();
        let average_rating = self.average_rating(None);
        let total_feedback_entries = self.snapshot.read().entry_count();

        let mut recommendations = Vec::new();
        if intent_accuracy.overall_accuracy < 80.0 {
            recommendations.push(
                "Intent classification accuracy is below 80%. Consider adding more training examples."
                    .to_string(),
            );
        }
        if drug_recognition_accuracy.overall_accuracy < 85.0 {
            recommendations.push(
                "Drug recognition accuracy is below 85%. Consider improving fuzzy matching threshold."
                    .to_string(),
            );
        }
        if average_rating < 3.5 {
            recommendations.push(
                "Average user rating is below 3.5/5. Review response templates and add more detailed information."
                    .to_string(),
            );
        }

        let low_accuracy: Vec<&str> = intent_accuracy
            .by_intent
            .values()
            .filter(|a| a.accuracy < 70.0 && a.total >= 5)
            .map(|a| a.intent.as_str())
            .collect();
        if !low_accuracy.is_empty() {
            recommendations.push(format!(
                "Low accuracy intents: {}. Add more pattern examples.",
                low_accuracy.join(", ")
            ));
        }

        TrainingInsights {
            intent_accuracy,
            drug_recognition_accuracy,
            average_rating,
            total_feedback_entries,
            recommendations,
        }
    }

    /// Hints shown alongside a drug-expert answer
    pub fn suggest_improvements(&self, analysis: &QueryAnalysis) -> Vec<String> {
        let mut suggestions = Vec::new();

        if analysis.overall_confidence < 0.6 {
            suggestions.push(
                "Query confidence is low. Consider rephrasing with more specific details."
                    .to_string(),
            );
        }

        let accuracy = self.intent_accuracy(&analysis.intent);
        if accuracy.accuracy < 75.0 && accuracy.total >= 5 {
            suggestions.push(format!(
                "The system has lower accuracy for '{}' queries. Please verify the response.",
                analysis.intent
            ));
        }

        if analysis.resolved_entity.is_none() {
            suggestions.push(
                "No drug name detected. Please mention the specific medication name.".to_string(),
            );
        } else if analysis.resolution_confidence < 80 {
            suggestions.push(
                "Drug name recognition confidence is low. Please verify the spelling.".to_string(),
            );
        }

        suggestions
    }

    /// Write the current data to `path`, or to a timestamped file in the
    /// export directory; returns the written path
    pub async fn export(&self, path: Option<PathBuf>) -> Result<PathBuf, AgentError> {
        let path = path.unwrap_or_else(|| default_export_path(&self.export_dir, chrono::Utc::now()));
        let snapshot = self.snapshot.read().clone();
        write_export(&path, snapshot).await?;
        Ok(path)
    }

    /// Merge an export file into the current data
    pub async fn import(&self, path: impl AsRef<Path>) -> Result<(), AgentError> {
        let incoming = read_export(path.as_ref()).await?;
        let _gate = self.write_gate.lock().await;
        let snapshot = {
            let mut snapshot = self.snapshot.write();
            snapshot.merge(incoming);
            snapshot.clone()
        };
        self.store.save(&snapshot).await?;
        tracing::info!(path = %path.as_ref().display(), "Imported training data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmacy_assistant_core::StructuredEntities;
    use pharmacy_assistant_persistence::{
        AuditRecord, InMemoryAuditLog, InMemoryFeedbackStore, JsonFileFeedbackStore,
        PersistenceError,
    };

    async fn tracker() -> (FeedbackTracker, Arc<InMemoryAuditLog>) {
        let audit = Arc::new(InMemoryAuditLog::new());
        let tracker = FeedbackTracker::load(
            Arc::new(InMemoryFeedbackStore::new()),
            audit.clone(),
            std::env::temp_dir(),
        )
        .await
        .unwrap();
        (tracker, audit)
    }

    fn intent_correction(predicted: &str, correct: &str) -> FeedbackPayload {
        FeedbackPayload {
            predicted_intent: Some(predicted.into()),
            correct_intent: Some(correct.into()),
            ..Default::default()
        }
    }

    fn analysis(intent: &str, drug: Option<&str>, drug_score: u8, confidence: f64) -> QueryAnalysis {
        QueryAnalysis {
            intent: intent.into(),
            intent_confidence: 0.5,
            all_intents: vec![],
            raw_entity: None,
            resolved_entity: drug.map(str::to_string),
            resolution_confidence: drug_score,
            from_context: false,
            entities: StructuredEntities::default(),
            overall_confidence: confidence,
            query_length: 20,
        }
    }

    #[tokio::test]
    async fn test_intent_accuracy() {
        let (tracker, _) = tracker().await;
        let id = Uuid::new_v4();
        tracker
            .record_feedback(id, FeedbackKind::IntentCorrection, intent_correction("dosage", "dosage"))
            .await
            .unwrap();
        tracker
            .record_feedback(id, FeedbackKind::IntentCorrection, intent_correction("dosage", "storage"))
            .await
            .unwrap();
        tracker
            .record_feedback(id, FeedbackKind::IntentCorrection, intent_correction("storage", "storage"))
            .await
            .unwrap();

        let dosage = tracker.intent_accuracy("dosage");
        assert_eq!((dosage.accuracy, dosage.correct, dosage.total), (50.0, 1, 2));

        let overall = tracker.overall_intent_accuracy();
        assert_eq!(overall.overall_accuracy, 66.67);
        assert_eq!(overall.total_queries, 3);
        assert_eq!(overall.by_intent["storage"].accuracy, 100.0);

        assert_eq!(tracker.intent_accuracy("pregnancy").accuracy, 0.0);
    }

    #[tokio::test]
    async fn test_drug_correction_ignores_case() {
        let (tracker, _) = tracker().await;
        let payload = FeedbackPayload {
            predicted_drug: Some("Ibuprofen".into()),
            correct_drug: Some("ibuprofen".into()),
            ..Default::default()
        };
        tracker
            .record_feedback(Uuid::new_v4(), FeedbackKind::DrugCorrection, payload)
            .await
            .unwrap();

        let accuracy = tracker.drug_recognition_accuracy();
        assert_eq!(accuracy.overall_accuracy, 100.0);
        assert_eq!(accuracy.correct_recognitions, 1);
    }

    #[tokio::test]
    async fn test_ratings_skip_zero() {
        let (tracker, _) = tracker().await;
        for rating in [4.0, 5.0, 0.0] {
            let payload = FeedbackPayload {
                intent: Some("dosage".into()),
                rating: Some(rating),
                ..Default::default()
            };
            tracker
                .record_feedback(Uuid::new_v4(), FeedbackKind::Rating, payload)
                .await
                .unwrap();
        }
        assert_eq!(tracker.average_rating(Some("dosage")), 4.5);
        assert_eq!(tracker.average_rating(None), 4.5);
        assert_eq!(tracker.average_rating(Some("storage")), 0.0);
        // Every submission is still kept as a raw entry
        assert_eq!(tracker.insights().total_feedback_entries, 3);
    }

    #[tokio::test]
    async fn test_not_helpful_flags_audit_record() {
        let (tracker, audit) = tracker().await;
        let id = audit
            .append(AuditRecord::new("anonymous", "q", "a"))
            .await
            .unwrap();
        tracker
            .record_feedback(id, FeedbackKind::NotHelpful, FeedbackPayload::default())
            .await
            .unwrap();
        assert!(audit.get(id).await.unwrap().unwrap().flagged);

        // Unknown ids are accepted without error
        tracker
            .record_feedback(Uuid::new_v4(), FeedbackKind::NotHelpful, FeedbackPayload::default())
            .await
            .unwrap();
    }

    /// Store that refuses every write
    struct ReadOnlyStore;

    #[async_trait::async_trait]
    impl FeedbackStore for ReadOnlyStore {
        async fn load(&self) -> Result<TrainingSnapshot, PersistenceError> {
            Ok(TrainingSnapshot::default())
        }

        async fn save(&self, _snapshot: &TrainingSnapshot) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("disk full".into()))
        }
    }

    /// Audit log whose flag call always fails
    struct BrokenFlagAudit;

    #[async_trait::async_trait]
    impl AuditLog for BrokenFlagAudit {
        async fn append(&self, record: AuditRecord) -> Result<Uuid, PersistenceError> {
            Ok(record.id)
        }

        async fn get(&self, _id: Uuid) -> Result<Option<AuditRecord>, PersistenceError> {
            Ok(None)
        }

        async fn recent(&self, _limit: usize) -> Result<Vec<AuditRecord>, PersistenceError> {
            Ok(Vec::new())
        }

        async fn flag(&self, _id: Uuid) -> Result<bool, PersistenceError> {
            Err(PersistenceError::Unavailable("audit offline".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_save_leaves_counters_untouched() {
        let tracker = FeedbackTracker::load(
            Arc::new(ReadOnlyStore),
            Arc::new(InMemoryAuditLog::new()),
            std::env::temp_dir(),
        )
        .await
        .unwrap();

        let result = tracker
            .record_feedback(
                Uuid::new_v4(),
                FeedbackKind::IntentCorrection,
                intent_correction("dosage", "dosage"),
            )
            .await;
        assert!(result.is_err());

        let accuracy = tracker.intent_accuracy("dosage");
        assert_eq!(accuracy.total, 0);
        assert_eq!(tracker.insights().total_feedback_entries, 0);
    }

    #[tokio::test]
    async fn test_flag_failure_still_saves() {
        let store = Arc::new(InMemoryFeedbackStore::new());
        let tracker =
            FeedbackTracker::load(store.clone(), Arc::new(BrokenFlagAudit), std::env::temp_dir())
                .await
                .unwrap();

        tracker
            .record_feedback(Uuid::new_v4(), FeedbackKind::NotHelpful, FeedbackPayload::default())
            .await
            .unwrap();

        assert_eq!(tracker.insights().total_feedback_entries, 1);
        assert_eq!(store.load().await.unwrap().entry_count(), 1);
    }

    #[tokio::test]
    async fn test_insights_recommendations() {
        let (tracker, _) = tracker().await;
        let insights = tracker.insights();
        // No data: accuracies and rating are all zero
        assert_eq!(insights.recommendations.len(), 3);

        for _ in 0..5 {
            tracker
                .record_feedback(
                    Uuid::new_v4(),
                    FeedbackKind::IntentCorrection,
                    intent_correction("storage", "dosage"),
                )
                .await
                .unwrap();
        }
        let insights = tracker.insights();
        assert_eq!(
            insights.recommendations.last().map(String::as_str),
            Some("Low accuracy intents: storage. Add more pattern examples.")
        );
    }

    #[tokio::test]
    async fn test_suggest_improvements() {
        let (tracker, _) = tracker().await;

        let suggestions = tracker.suggest_improvements(&analysis("dosage", None, 0, 0.3));
        assert_eq!(
            suggestions,
            vec![
                "Query confidence is low. Consider rephrasing with more specific details.",
                "No drug name detected. Please mention the specific medication name.",
            ]
        );

        let suggestions = tracker.suggest_improvements(&analysis("dosage", Some("Ibuprofen"), 100, 0.9));
        assert!(suggestions.is_empty());

        let suggestions = tracker.suggest_improvements(&analysis("dosage", Some("Ibuprofen"), 74, 0.9));
        assert_eq!(
            suggestions,
            vec!["Drug name recognition confidence is low. Please verify the spelling."]
        );

        for _ in 0..5 {
            tracker
                .record_feedback(
                    Uuid::new_v4(),
                    FeedbackKind::IntentCorrection,
                    intent_correction("dosage", "storage"),
                )
                .await
                .unwrap();
        }
        let suggestions = tracker.suggest_improvements(&analysis("dosage", Some("Ibuprofen"), 100, 0.9));
        assert_eq!(
            suggestions,
            vec!["The system has lower accuracy for 'dosage' queries. Please verify the response."]
        );
    }

    #[tokio::test]
    async fn test_export_import_merges_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileFeedbackStore::new(dir.path().join("training_data.json")));
        let tracker = FeedbackTracker::load(store.clone(), Arc::new(InMemoryAuditLog::new()), dir.path())
            .await
            .unwrap();

        tracker
            .record_feedback(
                Uuid::new_v4(),
                FeedbackKind::IntentCorrection,
                intent_correction("dosage", "dosage"),
            )
            .await
            .unwrap();

        let exported = tracker.export(None).await.unwrap();
        assert!(exported.starts_with(dir.path()));
        assert!(exported
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("training_export_"));

        tracker.import(&exported).await.unwrap();
        let dosage = tracker.intent_accuracy("dosage");
        assert_eq!((dosage.correct, dosage.total), (2, 2));

        // The merged data was written through the store
        let reloaded = FeedbackTracker::load(store, Arc::new(InMemoryAuditLog::new()), dir.path())
            .await
            .unwrap();
        assert_eq!(reloaded.intent_accuracy("dosage").total, 2);

        assert!(tracker.import(dir.path().join("missing.json")).await.is_err());
    }
}
