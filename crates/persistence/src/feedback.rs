//! Training feedback storage
//!
//! Feedback entries, accuracy counters and ratings are kept as one
//! [`TrainingSnapshot`]. Stores load and save the whole snapshot; exports are
//! the same document stamped with the export time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pharmacy_assistant_core::{FeedbackKind, FeedbackPayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::PersistenceError;

/// Correct/total tally for one predicted label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyCounter {
    pub correct: u64,
    pub total: u64,
}

impl AccuracyCounter {
    pub fn record(&mut self, was_correct: bool) {
        self.total += 1;
        if was_correct {
            self.correct += 1;
        }
    }

    /// Percentage, 0 when nothing was recorded
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64 * 100.0
    }

    pub fn merge(&mut self, other: AccuracyCounter) {
        self.correct += other.correct;
        self.total += other.total;
    }
}

/// Raw feedback as submitted against a logged reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub log_id: Uuid,
    pub feedback_type: FeedbackKind,
    #[serde(default)]
    pub feedback_data: FeedbackPayload,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackEntry {
    pub fn new(log_id: Uuid, feedback_type: FeedbackKind, feedback_data: FeedbackPayload) -> Self {
        Self {
            log_id,
            feedback_type,
            feedback_data,
            timestamp: Utc::now(),
        }
    }
}

/// Everything the feedback tracker learns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    /// Entries per audit log id
    #[serde(default)]
    pub feedback_data: BTreeMap<Uuid, Vec<FeedbackEntry>>,
    /// Counters keyed by predicted intent
    #[serde(default)]
    pub intent_accuracy: BTreeMap<String, AccuracyCounter>,
    /// Counters keyed by predicted drug name
    #[serde(default)]
    pub drug_recognition_accuracy: BTreeMap<String, AccuracyCounter>,
    /// Ratings keyed by intent
    #[serde(default)]
    pub response_ratings: BTreeMap<String, Vec<f64>>,
}

impl TrainingSnapshot {
    pub fn entry_count(&self) -> usize {
        self.feedback_data.values().map(Vec::len).sum()
    }

    /// Append lists and add counters from `other`
    pub fn merge(&mut self, other: TrainingSnapshot) {
        for (log_id, entries) in other.feedback_data {
            self.feedback_data.entry(log_id).or_default().extend(entries);
        }
        for (intent, counter) in other.intent_accuracy {
            self.intent_accuracy.entry(intent).or_default().merge(counter);
        }
        for (drug, counter) in other.drug_recognition_accuracy {
            self.drug_recognition_accuracy
                .entry(drug)
                .or_default()
                .merge(counter);
        }
        for (intent, ratings) in other.response_ratings {
            self.response_ratings.entry(intent).or_default().extend(ratings);
        }
    }
}

/// Training export file: the snapshot plus when it was taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExport {
    #[serde(flatten)]
    pub snapshot: TrainingSnapshot,
    pub export_timestamp: DateTime<Utc>,
}

/// Default export location under `data_dir`
pub fn default_export_path(data_dir: impl AsRef<Path>, at: DateTime<Utc>) -> PathBuf {
    data_dir
        .as_ref()
        .join(format!("training_export_{}.json", at.format("%Y%m%d_%H%M%S")))
}

/// Write a pretty-printed export of `snapshot` to `path`
pub async fn write_export(
    path: impl AsRef<Path>,
    snapshot: TrainingSnapshot,
) -> Result<TrainingExport, PersistenceError> {
    let export = TrainingExport {
        snapshot,
        export_timestamp: Utc::now(),
    };
    write_json_atomic(path.as_ref(), &export).await?;
    tracing::info!(
        path = %path.as_ref().display(),
        entries = export.snapshot.entry_count(),
        "Exported training data"
    );
    Ok(export)
}

/// Read an export (or a plain snapshot file); the timestamp is ignored
pub async fn read_export(path: impl AsRef<Path>) -> Result<TrainingSnapshot, PersistenceError> {
    let path = path.as_ref();
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PersistenceError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&raw)?)
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let encoded = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, encoded).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Feedback store trait
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Current snapshot; empty when nothing was saved yet
    async fn load(&self) -> Result<TrainingSnapshot, PersistenceError>;

    async fn save(&self, snapshot: &TrainingSnapshot) -> Result<(), PersistenceError>;
}

/// Feedback store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryFeedbackStore {
    snapshot: RwLock<TrainingSnapshot>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn load(&self) -> Result<TrainingSnapshot, PersistenceError> {
        Ok(self.snapshot.read().clone())
    }

    async fn save(&self, snapshot: &TrainingSnapshot) -> Result<(), PersistenceError> {
        *self.snapshot.write() = snapshot.clone();
        Ok(())
    }
}

/// Feedback store backed by one JSON document, replaced on every save
#[derive(Debug, Clone)]
pub struct JsonFileFeedbackStore {
    path: PathBuf,
}

impl JsonFileFeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FeedbackStore for JsonFileFeedbackStore {
    async fn load(&self) -> Result<TrainingSnapshot, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No training data yet");
                Ok(TrainingSnapshot::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, snapshot: &TrainingSnapshot) -> Result<(), PersistenceError> {
        write_json_atomic(&self.path, snapshot).await
    }
}
