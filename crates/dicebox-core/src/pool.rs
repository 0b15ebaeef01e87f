use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::idea::{IdeaRecord, PregeneratedIdea, Strategy};
use crate::labels::{ParameterChoice, ParameterQuery};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A pool query/mutation failure. The message is the store's own error
/// text, surfaced verbatim to callers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PoolError {
    #[error("{0}")]
    Query(String),
}

/// A generation collaborator failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerateError {
    #[error("generation request failed: {0}")]
    Request(String),

    #[error("generation service returned status {0}")]
    Status(u16),

    #[error("generation response could not be decoded: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The pregenerated-idea pool, owned by an external store. Futures are
/// `Send` so implementations can be driven from spawned tasks.
pub trait IdeaPool: Clone + Send + Sync + 'static {
    /// The oldest pool row matching the query (set membership per axis,
    /// `created_at` ascending, so the buffer is consumed FIFO).
    fn oldest_matching(
        &self,
        query: &ParameterQuery,
    ) -> impl Future<Output = Result<Option<PregeneratedIdea>, PoolError>> + Send;

    /// How many pool rows match the query.
    fn count_matching(
        &self,
        query: &ParameterQuery,
    ) -> impl Future<Output = Result<u64, PoolError>> + Send;

    /// Insert a freshly generated idea into the pool; the store assigns
    /// `id` and `created_at`.
    fn insert(&self, idea: &IdeaRecord) -> impl Future<Output = Result<(), PoolError>> + Send;

    /// Remove a pool row by id.
    fn remove(&self, id: Uuid) -> impl Future<Output = Result<(), PoolError>> + Send;

    /// Insert a picked idea into the history collection.
    fn archive(&self, idea: &IdeaRecord) -> impl Future<Output = Result<(), PoolError>> + Send;
}

/// The idea generation collaborator.
pub trait IdeaGenerator: Clone + Send + Sync + 'static {
    fn generate(
        &self,
        choice: &ParameterChoice,
        strategy: Strategy,
    ) -> impl Future<Output = Result<IdeaRecord, GenerateError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryPool
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    rows: Vec<PregeneratedIdea>,
    history: Vec<IdeaRecord>,
    fail_next: Option<String>,
}

/// In-memory [`IdeaPool`] used in tests and dry runs. `fail_with` arms a
/// one-shot query failure so error paths can be exercised.
#[derive(Debug, Clone, Default)]
pub struct MemoryPool {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row with an explicit timestamp, for FIFO-order tests.
    pub fn seed(&self, record: IdeaRecord, created_at: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.lock();
        inner.rows.push(PregeneratedIdea {
            id,
            idea: record.idea,
            focus_group: record.focus_group,
            topic: record.topic,
            medium: record.medium,
            created_at,
            illustration_url: record.illustration_url,
            postcard_url: record.postcard_url,
        });
        id
    }

    /// Arm a one-shot failure: the next query operation errors with `msg`.
    pub fn fail_with(&self, msg: impl Into<String>) {
        self.lock().fail_next = Some(msg.into());
    }

    pub fn rows(&self) -> Vec<PregeneratedIdea> {
        self.lock().rows.clone()
    }

    pub fn history(&self) -> Vec<IdeaRecord> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(&self) -> Option<PoolError> {
        self.lock().fail_next.take().map(PoolError::Query)
    }
}

impl IdeaPool for MemoryPool {
    async fn oldest_matching(
        &self,
        query: &ParameterQuery,
    ) -> Result<Option<PregeneratedIdea>, PoolError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let inner = self.lock();
        let oldest = inner
            .rows
            .iter()
            .filter(|row| query.matches(&row.record()))
            .min_by_key(|row| row.created_at)
            .cloned();
        Ok(oldest)
    }

    async fn count_matching(&self, query: &ParameterQuery) -> Result<u64, PoolError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let inner = self.lock();
        let count = inner
            .rows
            .iter()
            .filter(|row| query.matches(&row.record()))
            .count();
        Ok(count as u64)
    }

    async fn insert(&self, idea: &IdeaRecord) -> Result<(), PoolError> {
        self.seed(idea.clone(), Utc::now());
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), PoolError> {
        self.lock().rows.retain(|row| row.id != id);
        Ok(())
    }

    async fn archive(&self, idea: &IdeaRecord) -> Result<(), PoolError> {
        self.lock().history.push(idea.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
