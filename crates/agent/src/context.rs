//! Per-session conversation context
//!
//! Each session key owns one [`ConversationContext`] behind its own async
//! mutex. The dispatcher holds that mutex for a whole query, so two messages
//! on the same session are handled one after the other while different
//! sessions run in parallel.

use async_trait::async_trait;
use dashmap::DashMap;
use pharmacy_assistant_config::AssistantConfig;
use pharmacy_assistant_core::{ContextSummary, Product, Turn};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Conversation state for one session
#[derive(Debug, Clone)]
pub struct ConversationContext {
    history_limit: usize,
    history: VecDeque<Turn>,
    current_entity: Option<String>,
    current_intent: Option<String>,
    scratch: HashMap<String, Value>,
    last_products: Vec<Product>,
    last_activity: Instant,
}

impl ConversationContext {
    pub fn new(history_limit: usize) -> Self {
        Self {
            history_limit: history_limit.max(1),
            history: VecDeque::new(),
            current_entity: None,
            current_intent: None,
            scratch: HashMap::new(),
            last_products: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    /// Record an exchange, evicting the oldest turn past the cap
    ///
    /// The current entity and intent only change when a value is given.
    pub fn add_turn(
        &mut self,
        query: impl Into<String>,
        response: impl Into<String>,
        entity: Option<String>,
        intent: Option<String>,
    ) {
        let turn = Turn::new(query, response, entity, intent);
        if let Some(entity) = turn.entity() {
            self.current_entity = Some(entity.to_string());
        }
        if let Some(intent) = &turn.intent {
            self.current_intent = Some(intent.clone());
        }

        self.history.push_back(turn);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
        self.touch();
    }

    /// Most recent non-empty entity in history
    pub fn get_last_entity(&self) -> Option<&str> {
        self.history.iter().rev().find_map(|t| t.entity())
    }

    pub fn summary(&self) -> ContextSummary {
        let mut recent_entities: Vec<String> = Vec::new();
        let mut recent_intents: Vec<String> = Vec::new();
        for turn in &self.history {
            if let Some(entity) = turn.entity() {
                if !recent_entities.iter().any(|e| e == entity) {
                    recent_entities.push(entity.to_string());
                }
            }
            if let Some(intent) = turn.intent.as_deref().filter(|i| !i.is_empty()) {
                if !recent_intents.iter().any(|i| i == intent) {
                    recent_intents.push(intent.to_string());
                }
            }
        }

        ContextSummary {
            current_entity: self.current_entity.clone(),
            current_intent: self.current_intent.clone(),
            history_length: self.history.len(),
            recent_entities,
            recent_intents,
        }
    }

    pub fn set_scratch(&mut self, key: impl Into<String>, value: Value) {
        self.scratch.insert(key.into(), value);
        self.touch();
    }

    pub fn scratch(&self, key: &str) -> Option<&Value> {
        self.scratch.get(key)
    }

    /// Remember the products of the last search-like reply
    pub fn set_last_products(&mut self, products: Vec<Product>) {
        self.last_products = products;
    }

    pub fn last_products(&self) -> &[Product] {
        &self.last_products
    }

    pub fn history(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn current_entity(&self) -> Option<&str> {
        self.current_entity.as_deref()
    }

    pub fn current_intent(&self) -> Option<&str> {
        self.current_intent.as_deref()
    }

    /// Forget everything except the history cap
    pub fn clear(&mut self) {
        self.history.clear();
        self.current_entity = None;
        self.current_intent = None;
        self.scratch.clear();
        self.last_products.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

/// Shared handle to one session's context
pub type ContextHandle = Arc<Mutex<ConversationContext>>;

/// Session-keyed context storage
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Handle for `key`, creating an empty context on first use
    async fn acquire(&self, key: &str) -> ContextHandle;

    /// Copy of the context, if the session exists
    async fn get(&self, key: &str) -> Option<ConversationContext>;

    async fn put(&self, key: &str, context: ConversationContext);

    /// Drop a session; returns whether it existed. A query already running on
    /// the session finishes first.
    async fn evict(&self, key: &str) -> bool;

    /// Drop sessions idle past the TTL; returns how many were dropped
    async fn purge_expired(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process context store
pub struct InMemoryContextStore {
    entries: DashMap<String, ContextHandle>,
    history_limit: usize,
    idle_ttl: Option<Duration>,
}

impl InMemoryContextStore {
    pub fn new(history_limit: usize, idle_ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            history_limit,
            idle_ttl,
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(config.context_history_limit, config.context_idle_ttl())
    }

    pub fn idle_ttl(&self) -> Option<Duration> {
        self.idle_ttl
    }
}

impl Default for InMemoryContextStore {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn acquire(&self, key: &str) -> ContextHandle {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationContext::new(self.history_limit))))
            .value()
            .clone()
    }

    async fn get(&self, key: &str) -> Option<ConversationContext> {
        let handle = self.entries.get(key).map(|e| e.value().clone())?;
        let context = handle.lock().await;
        Some(context.clone())
    }

    async fn put(&self, key: &str, context: ConversationContext) {
        let handle = self.acquire(key).await;
        *handle.lock().await = context;
    }

    async fn evict(&self, key: &str) -> bool {
        let Some(handle) = self.entries.get(key).map(|e| e.value().clone()) else {
            return false;
        };
        handle.lock().await.clear();

        // Map entry plus our clone. Anyone else holding the handle keeps the
        // cleared context alive in the map.
        self.entries.remove_if(key, |_, current| {
            Arc::ptr_eq(current, &handle) && Arc::strong_count(current) == 2
        });
        true
    }

    async fn purge_expired(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };

        let before = self.entries.len();
        // A handle held outside the map belongs to a query that has not
        // locked it yet, or is still running
        self.entries.retain(|_, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            match handle.try_lock() {
                Ok(context) => context.idle_for() < ttl,
                Err(_) => true,
            }
        });
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            tracing::debug!(purged, remaining = self.entries.len(), "Purged idle contexts");
        }
        purged
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
