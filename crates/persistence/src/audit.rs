//! Chat audit log
//!
//! One record per answered query, kept for review and for attaching feedback.
//! The JSONL implementation appends a `record` line per query and a `flag`
//! line when a reply is marked unhelpful; replaying the file on open rebuilds
//! the in-memory view.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pharmacy_assistant_core::CustomerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::PersistenceError;

/// Audit record for one answered query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub user_id: Option<CustomerId>,
    pub session_key: String,
    pub query_text: String,
    pub intent: Option<String>,
    /// Resolved entity and structured entities, as sent to the client
    #[serde(default)]
    pub entities: serde_json::Value,
    pub response_text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub flagged: bool,
}

impl AuditRecord {
    pub fn new(
        session_key: impl Into<String>,
        query_text: impl Into<String>,
        response_text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: None,
            session_key: session_key.into(),
            query_text: query_text.into(),
            intent: None,
            entities: serde_json::Value::Null,
            response_text: response_text.into(),
            timestamp: Utc::now(),
            flagged: false,
        }
    }

    pub fn with_user(mut self, user_id: Option<CustomerId>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_entities(mut self, entities: serde_json::Value) -> Self {
        self.entities = entities;
        self
    }
}

/// Audit log trait
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Store a record and return its id
    async fn append(&self, record: AuditRecord) -> Result<Uuid, PersistenceError>;

    async fn get(&self, id: Uuid) -> Result<Option<AuditRecord>, PersistenceError>;

    /// Newest first
    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, PersistenceError>;

    /// Mark a record as unhelpful. Returns false when no such record exists.
    async fn flag(&self, id: Uuid) -> Result<bool, PersistenceError>;
}

#[derive(Debug, Default)]
struct AuditIndex {
    records: Vec<AuditRecord>,
    positions: HashMap<Uuid, usize>,
}

impl AuditIndex {
    fn insert(&mut self, record: AuditRecord) {
        match self.positions.get(&record.id) {
            Some(&pos) => self.records[pos] = record,
            None => {
                self.positions.insert(record.id, self.records.len());
                self.records.push(record);
            }
        }
    }

    fn flag(&mut self, id: Uuid) -> bool {
        match self.positions.get(&id) {
            Some(&pos) => {
                self.records[pos].flagged = true;
                true
            }
            None => false,
        }
    }
}

/// Audit log held in process memory
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    index: RwLock<AuditIndex>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: Uuid) -> bool {
        self.index.read().positions.contains_key(&id)
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, record: AuditRecord) -> Result<Uuid, PersistenceError> {
        let id = record.id;
        self.index.write().insert(record);
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<AuditRecord>, PersistenceError> {
        let index = self.index.read();
        Ok(index.positions.get(&id).map(|&pos| index.records[pos].clone()))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, PersistenceError> {
        let index = self.index.read();
        Ok(index.records.iter().rev().take(limit).cloned().collect())
    }

    async fn flag(&self, id: Uuid) -> Result<bool, PersistenceError> {
        Ok(self.index.write().flag(id))
    }
}

/// One line of the JSONL audit file
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum AuditLine {
    Record { record: AuditRecord },
    Flag { id: Uuid },
}

/// Append-only JSONL audit log
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    file: tokio::sync::Mutex<tokio::fs::File>,
    memory: InMemoryAuditLog,
}

impl JsonlAuditLog {
    /// Open (or create) the log file and replay it
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let memory = InMemoryAuditLog::new();
        let mut replayed = 0usize;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let mut index = memory.index.write();
                for (line_no, line) in raw.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<AuditLine>(line) {
                        Ok(AuditLine::Record { record }) => {
                            index.insert(record);
                            replayed += 1;
                        }
                        Ok(AuditLine::Flag { id }) => {
                            index.flag(id);
                        }
                        Err(e) => {
                            tracing::warn!(
                                path = %path.display(),
                                line = line_no + 1,
                                error = %e,
                                "Skipping unreadable audit line"
                            );
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        tracing::info!(path = %path.display(), records = replayed, "Opened audit log");

        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
            memory,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_line(&self, line: &AuditLine) -> Result<(), PersistenceError> {
        let mut encoded = serde_json::to_vec(line)?;
        encoded.push(b'\n');
        let mut file = self.file.lock().await;
        file.write_all(&encoded).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl AuditLog for JsonlAuditLog {
    async fn append(&self, record: AuditRecord) -> Result<Uuid, PersistenceError> {
        self.write_line(&AuditLine::Record {
            record: record.clone(),
        })
        .await?;
        self.memory.append(record).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<AuditRecord>, PersistenceError> {
        self.memory.get(id).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, PersistenceError> {
        self.memory.recent(limit).await
    }

    async fn flag(&self, id: Uuid) -> Result<bool, PersistenceError> {
        if !self.memory.contains(id) {
            return Ok(false);
        }
        self.write_line(&AuditLine::Flag { id }).await?;
        self.memory.flag(id).await
    }
}
